mod accuracy;
mod counters;
mod metric;

pub use accuracy::{MaskedCategoricalAccuracy, SparseCategoricalAccuracy};
pub use counters::{NumBatchesCounter, NumExamplesCounter, NumTokensCounter};
pub use metric::{Metric, MetricSpec};
