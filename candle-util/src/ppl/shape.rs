//! Checked broadcasting helpers.
//!
//! Candle only broadcasts through the explicit `broadcast_*` calls, so every
//! place that "expands to the batch shape" goes through [`expand`], which
//! reports incompatible shapes as [`PplError::InvalidArgument`].

use candle_core::Tensor;

use super::error::{PplError, PplResult};

/// Common shape of two operands under right-aligned broadcasting.
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> PplResult<Vec<usize>> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![1usize; rank];

    for (k, o) in out.iter_mut().enumerate() {
        // right-aligned, missing leading dims count as 1
        let l = dim_from_right(lhs, rank - k - 1);
        let r = dim_from_right(rhs, rank - k - 1);
        *o = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            (a, b) => {
                return Err(PplError::invalid(format!(
                    "shapes {:?} and {:?} are not broadcast compatible ({} vs {})",
                    lhs, rhs, a, b
                )))
            }
        };
    }
    Ok(out)
}

fn dim_from_right(dims: &[usize], offset: usize) -> usize {
    if offset < dims.len() {
        dims[dims.len() - offset - 1]
    } else {
        1
    }
}

/// Broadcast `x` to exactly `target`; leading dims may be added, existing
/// ones only grow from 1.
pub fn expand(x: &Tensor, target: &[usize]) -> PplResult<Tensor> {
    let dims = x.dims();
    if dims == target {
        return Ok(x.clone());
    }
    let common = broadcast_shapes(dims, target)?;
    if common != target {
        return Err(PplError::invalid(format!(
            "cannot expand {:?} to {:?}",
            dims, target
        )));
    }
    Ok(x.broadcast_as(target)?)
}

/// Broadcast two tensors against each other.
pub fn broadcast_pair(a: &Tensor, b: &Tensor) -> PplResult<(Tensor, Tensor)> {
    let shape = broadcast_shapes(a.dims(), b.dims())?;
    Ok((expand(a, &shape)?, expand(b, &shape)?))
}

/// Split a design tensor `(*batch, n, p)` into `(batch, n, p)`.
pub fn design_dims(design: &Tensor) -> PplResult<(Vec<usize>, usize, usize)> {
    let dims = design.dims();
    if dims.len() < 2 {
        return Err(PplError::invalid(format!(
            "design must have at least two dimensions (n, p), got {:?}",
            dims
        )));
    }
    let k = dims.len();
    Ok((dims[..k - 2].to_vec(), dims[k - 2], dims[k - 1]))
}

/// `batch ++ tail`
pub fn concat_dims(batch: &[usize], tail: &[usize]) -> Vec<usize> {
    batch.iter().chain(tail.iter()).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn broadcast_right_aligned() -> PplResult<()> {
        assert_eq!(broadcast_shapes(&[3, 1], &[4])?, vec![3, 4]);
        assert_eq!(broadcast_shapes(&[], &[2, 5])?, vec![2, 5]);
        assert_eq!(broadcast_shapes(&[7, 1, 3], &[2, 1])?, vec![7, 2, 3]);
        assert!(broadcast_shapes(&[3], &[4]).is_err());
        Ok(())
    }

    #[test]
    fn expand_rejects_shrinking() -> PplResult<()> {
        let x = Tensor::ones((2, 3), DType::F32, &Device::Cpu)?;
        assert!(expand(&x, &[3]).is_err());
        assert!(expand(&x, &[4, 3]).is_err());
        assert_eq!(expand(&x, &[5, 2, 3])?.dims(), &[5, 2, 3]);

        let s = Tensor::new(1f32, &Device::Cpu)?;
        assert_eq!(expand(&s, &[])?.dims(), &[] as &[usize]);
        assert_eq!(expand(&s, &[4, 2])?.dims(), &[4, 2]);
        Ok(())
    }

    #[test]
    fn design_dims_unbatched_and_batched() -> PplResult<()> {
        let x = Tensor::zeros((5, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(design_dims(&x)?, (vec![], 5, 3));
        let x = Tensor::zeros((2, 4, 5, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(design_dims(&x)?, (vec![2, 4], 5, 3));
        let x = Tensor::zeros(5, DType::F32, &Device::Cpu)?;
        assert!(design_dims(&x).is_err());
        Ok(())
    }
}
