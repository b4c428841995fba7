use std::fmt;

use datasets::DatasetErr;
use learning::MlErr;

/// The tasks module's result type.
pub type Result<T> = std::result::Result<T, TaskErr>;

/// All errors that can occur while configuring or running a task.
#[derive(Debug)]
pub enum TaskErr {
    /// The model flag names none of the supported architectures.
    InvalidModel {
        got: String,
        expected: &'static [&'static str],
    },
    /// The federated training data has no clients.
    NoClients,
    /// More clients were asked for in a round than there are.
    NotEnoughClients { requested: usize, available: usize },
    /// The experiment config names a task the given datasets are not for.
    TaskMismatch {
        config: &'static str,
        datasets: &'static str,
    },
    Config(serde_json::Error),
    Dataset(DatasetErr),
    Ml(MlErr),
}

impl fmt::Display for TaskErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidModel { got, expected } => write!(
                f,
                "Cannot handle model flag [{got}], must be one of [{}].",
                expected.join(", ")
            ),
            Self::NoClients => write!(f, "the federated training data has no clients"),
            Self::NotEnoughClients {
                requested,
                available,
            } => write!(
                f,
                "cannot sample {requested} clients per round out of {available}"
            ),
            Self::TaskMismatch { config, datasets } => write!(
                f,
                "the config is for the {config} task but the datasets are for {datasets}"
            ),
            Self::Config(e) => write!(f, "invalid config: {e}"),
            Self::Dataset(e) => write!(f, "dataset error: {e}"),
            Self::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TaskErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Dataset(e) => Some(e),
            Self::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TaskErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e)
    }
}

impl From<DatasetErr> for TaskErr {
    fn from(e: DatasetErr) -> Self {
        Self::Dataset(e)
    }
}

impl From<MlErr> for TaskErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}
