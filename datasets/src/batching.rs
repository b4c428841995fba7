use std::num::NonZeroUsize;

use ndarray::{ArrayD, IxDyn};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::Result;

/// Builds the rng that shuffles a single client's examples.
///
/// # Arguments
/// * `seed` - The base seed, `None` draws the rng from the OS.
/// * `client_index` - The position of the client, so that clients shuffle differently.
///
/// # Returns
/// A new rng.
pub(crate) fn client_rng(seed: Option<u64>, client_index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(client_index as u64)),
        None => StdRng::from_os_rng(),
    }
}

/// Returns the order in which `len` examples are visited over `epochs` passes.
///
/// # Arguments
/// * `len` - The amount of examples.
/// * `epochs` - The amount of passes over the examples.
/// * `rng` - Shuffles the whole repeated order when given.
///
/// # Returns
/// Indices into the examples, each one appearing `epochs` times.
pub(crate) fn epoch_order(len: usize, epochs: NonZeroUsize, rng: Option<&mut StdRng>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..epochs.get()).flat_map(|_| 0..len).collect();
    if let Some(rng) = rng {
        order.shuffle(rng);
    }

    order
}

/// Stacks equally sized rows into a tensor whose leading dimension is the amount of rows.
///
/// # Arguments
/// * `rows` - The rows, each one holding `row_shape.iter().product()` elements.
/// * `row_shape` - The shape of a single row.
///
/// # Returns
/// The stacked tensor or a shape error if a row has the wrong length.
pub(crate) fn stack<T: Clone>(rows: &[&[T]], row_shape: &[usize]) -> Result<ArrayD<T>> {
    let mut shape = Vec::with_capacity(row_shape.len() + 1);
    shape.push(rows.len());
    shape.extend_from_slice(row_shape);

    let flat: Vec<T> = rows.iter().flat_map(|row| row.iter().cloned()).collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), flat)?)
}
