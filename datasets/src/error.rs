use std::{error::Error, fmt, io};

use learning::MlErr;
use ndarray::ShapeError;

/// The datasets module's result type.
pub type Result<T> = std::result::Result<T, DatasetErr>;

/// Dataset loading and preprocessing failures.
#[derive(Debug)]
pub enum DatasetErr {
    Io(io::Error),
    Json(serde_json::Error),
    Shape(ShapeError),
    Ml(MlErr),
    MissingClient {
        id: String,
    },
    MalformedExample {
        client: String,
        index: usize,
        reason: String,
    },
}

impl fmt::Display for DatasetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetErr::Io(e) => write!(f, "io error: {e}"),
            DatasetErr::Json(e) => write!(f, "json error: {e}"),
            DatasetErr::Shape(e) => write!(f, "shape error: {e}"),
            DatasetErr::Ml(e) => write!(f, "{e}"),
            DatasetErr::MissingClient { id } => {
                write!(f, "client {id:?} is listed but has no data")
            }
            DatasetErr::MalformedExample {
                client,
                index,
                reason,
            } => write!(f, "example {index} of client {client:?} is malformed: {reason}"),
        }
    }
}

impl Error for DatasetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DatasetErr::Io(e) => Some(e),
            DatasetErr::Json(e) => Some(e),
            DatasetErr::Shape(e) => Some(e),
            DatasetErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DatasetErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for DatasetErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ShapeError> for DatasetErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<MlErr> for DatasetErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
