use std::fmt::{self, Display};

use ndarray::{ArrayD, ArrayViewD};
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// The element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    F32,
    I64,
}

impl Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::I64 => write!(f, "i64"),
        }
    }
}

/// The type and shape of a tensor, `None` dimensions are unknown (usually the batch one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: DType,
    pub shape: Vec<Option<usize>>,
}

impl TensorSpec {
    /// Creates a new `TensorSpec`.
    ///
    /// # Arguments
    /// * `dtype` - The element type.
    /// * `shape` - The dimensions, `None` for the unknown ones.
    ///
    /// # Returns
    /// A new `TensorSpec` instance.
    pub fn new<I>(dtype: DType, shape: I) -> Self
    where
        I: IntoIterator<Item = Option<usize>>,
    {
        Self {
            dtype,
            shape: shape.into_iter().collect(),
        }
    }

    /// Whether or not a concrete tensor with the given spec could be fed where this spec is
    /// expected.
    pub fn is_compatible_with(&self, other: &TensorSpec) -> bool {
        self.dtype == other.dtype
            && self.shape.len() == other.shape.len()
            && self
                .shape
                .iter()
                .zip(&other.shape)
                .all(|(a, b)| a.is_none() || b.is_none() || a == b)
    }

    /// Checks a tensor against this spec.
    ///
    /// # Arguments
    /// * `what` - The name of the checked tensor, used for error reporting.
    /// * `tensor` - The tensor to check.
    ///
    /// # Returns
    /// An error if the tensor does not conform.
    pub fn check(&self, what: &'static str, tensor: &Tensor) -> Result<()> {
        let got = tensor.spec();
        if !self.is_compatible_with(&got) {
            return Err(MlErr::SpecMismatch {
                what,
                got,
                expected: self.clone(),
            });
        }

        Ok(())
    }
}

impl Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .shape
            .iter()
            .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
            .collect();

        write!(f, "{}[{}]", self.dtype, dims.join(", "))
    }
}

/// The spec of a single dataset element: the model's input and its labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub x: TensorSpec,
    pub y: TensorSpec,
}

impl ElementSpec {
    /// Checks both halves of a batch against this spec.
    pub fn check(&self, batch: &Batch) -> Result<()> {
        self.x.check("input", &batch.x)?;
        self.y.check("labels", &batch.y)
    }
}

/// A dense n-dimensional tensor of one of the supported element types.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    F32(ArrayD<f32>),
    I64(ArrayD<i64>),
}

impl Tensor {
    pub fn dtype(&self) -> DType {
        match self {
            Tensor::F32(_) => DType::F32,
            Tensor::I64(_) => DType::I64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::F32(a) => a.shape(),
            Tensor::I64(a) => a.shape(),
        }
    }

    /// Returns the amount of elements in the tensor.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fully known spec of this tensor.
    pub fn spec(&self) -> TensorSpec {
        TensorSpec::new(self.dtype(), self.shape().iter().map(|&d| Some(d)))
    }

    pub fn as_f32(&self) -> Option<ArrayViewD<'_, f32>> {
        match self {
            Tensor::F32(a) => Some(a.view()),
            Tensor::I64(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<ArrayViewD<'_, i64>> {
        match self {
            Tensor::I64(a) => Some(a.view()),
            Tensor::F32(_) => None,
        }
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(value: ArrayD<f32>) -> Self {
        Self::F32(value)
    }
}

impl From<ArrayD<i64>> for Tensor {
    fn from(value: ArrayD<i64>) -> Self {
        Self::I64(value)
    }
}

/// A batch of examples, the leading dimension of both tensors is the batch dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub x: Tensor,
    pub y: Tensor,
}

impl Batch {
    pub fn new(x: impl Into<Tensor>, y: impl Into<Tensor>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Returns the amount of examples in this batch.
    pub fn num_examples(&self) -> usize {
        self.x.shape().first().copied().unwrap_or(0)
    }
}
