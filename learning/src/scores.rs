use ndarray::{ArrayView1, ArrayViewD, CowArray, Ix2};

use crate::{MlErr, Result};

/// Class scores flattened to one row per label position.
pub(crate) struct ClassRows<'a> {
    pub scores: CowArray<'a, f32, Ix2>,
    pub labels: Vec<i64>,
}

/// Lines up the labels with the rows of scores predicted for them.
///
/// # Arguments
/// * `y_true` - The labels, any shape with one element per predicted position.
/// * `y_pred` - The predictions, classes on the last axis.
///
/// # Returns
/// The scores reshaped to `(positions, classes)` together with the flattened labels.
pub(crate) fn class_rows<'a>(
    y_true: &ArrayViewD<'_, i64>,
    y_pred: &'a ArrayViewD<'_, f32>,
) -> Result<ClassRows<'a>> {
    let num_classes = y_pred.shape().last().copied().unwrap_or(0);
    if num_classes == 0 {
        return Err(MlErr::SizeMismatch {
            what: "prediction classes",
            got: 0,
            expected: 1,
        });
    }

    let rows = y_pred.len() / num_classes;
    if y_true.len() != rows {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: y_true.len(),
            expected: rows,
        });
    }

    let scores = y_pred
        .to_shape((rows, num_classes))
        .map_err(|_| MlErr::SizeMismatch {
            what: "predictions",
            got: y_pred.len(),
            expected: rows * num_classes,
        })?;

    Ok(ClassRows {
        scores,
        labels: y_true.iter().copied().collect(),
    })
}

/// Returns the index of the highest score, the first one on ties.
pub(crate) fn argmax(row: ArrayView1<'_, f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max { (i, v) } else { (best, max) }
        })
        .0
}
