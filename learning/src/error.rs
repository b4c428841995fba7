use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::tensor::TensorSpec;

/// The result type used in the entire learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    SpecMismatch {
        what: &'static str,
        got: TensorSpec,
        expected: TensorSpec,
    },
    LabelOutOfRange {
        label: i64,
        num_classes: usize,
    },
    UnknownClient {
        id: String,
    },
    MissingLocalOutput {
        name: &'static str,
    },
    Collaborator {
        what: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
}

impl MlErr {
    /// Wraps an error raised by an external collaborator (a network, a provider, a process).
    ///
    /// # Arguments
    /// * `what` - The collaborator that failed.
    /// * `source` - The originating error.
    ///
    /// # Returns
    /// A new `MlErr::Collaborator`.
    pub fn collaborator<E>(what: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self::Collaborator {
            what,
            source: source.into(),
        }
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::SpecMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "The {what} does not match its spec, got {got} and expected {expected}"
            ),
            MlErr::LabelOutOfRange { label, num_classes } => write!(
                f,
                "Label {label} is out of range for {num_classes} classes"
            ),
            MlErr::UnknownClient { id } => write!(f, "There's no client with id {id:?}"),
            MlErr::MissingLocalOutput { name } => {
                write!(f, "The local outputs have no {name:?} entry")
            }
            MlErr::Collaborator { what, source } => write!(f, "The {what} failed: {source}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Collaborator { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
