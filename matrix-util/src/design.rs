//! Indicator design matrices for grouped observations.

use crate::dmatrix_util::DMatrix;
use crate::traits::ConvertMatOps;
use candle_core::{Device, Tensor};
use candle_util::ppl::{PplError, PplResult};
use log::debug;

/// Convert a vector of group sizes into an `n x p` binary indicator matrix
///
/// Column `i` holds a contiguous run of `trunc(group_sizes[i])` ones,
/// starting right after the run of column `i - 1`; `n` is the truncated sum
/// of the sizes and `p` the number of groups.
///
/// Non-integral sizes can leave rows unassigned after truncation. Those
/// residual rows are assigned to the last column.
///
/// # Arguments
/// * `group_sizes` - number of observations in each group, non-negative
pub fn group_assignment_matrix(group_sizes: &[f32]) -> PplResult<DMatrix<f32>> {
    if let Some(bad) = group_sizes.iter().find(|x| !x.is_finite() || **x < 0.0) {
        return Err(PplError::invalid(format!(
            "group sizes must be finite and non-negative, got {}",
            bad
        )));
    }

    let p = group_sizes.len();
    let n = group_sizes.iter().map(|&x| x as f64).sum::<f64>() as usize;

    let mut xx = DMatrix::<f32>::zeros(n, p);
    let mut t = 0;
    for (col, &size) in group_sizes.iter().enumerate() {
        let i = size as usize;
        for row in t..(t + i).min(n) {
            xx[(row, col)] = 1.;
        }
        t += i;
    }

    if t < n {
        debug!("assigning {} residual rows to the last group", n - t);
        for row in t..n {
            xx[(row, p - 1)] = 1.;
        }
    }
    Ok(xx)
}

/// [`group_assignment_matrix`] as an `(n, p)` F32 tensor
pub fn group_assignment_tensor(group_sizes: &[f32], dev: &Device) -> PplResult<Tensor> {
    group_assignment_matrix(group_sizes)?.to_tensor(dev)
}

/// Stack one indicator matrix per candidate design into `(batch, n, p)`
///
/// All candidates must describe the same number of observations and groups.
pub fn batched_group_assignment(candidates: &[Vec<f32>], dev: &Device) -> PplResult<Tensor> {
    let first = candidates
        .first()
        .ok_or_else(|| PplError::invalid("no candidate designs"))?;
    let expected = group_assignment_matrix(first)?.shape();

    let mats = candidates
        .iter()
        .map(|sizes| {
            let xx = group_assignment_matrix(sizes)?;
            if xx.shape() != expected {
                return Err(PplError::invalid(format!(
                    "candidate design {:?} gives shape {:?}, expected {:?}",
                    sizes,
                    xx.shape(),
                    expected
                )));
            }
            xx.to_tensor(dev)
        })
        .collect::<PplResult<Vec<_>>>()?;

    Ok(Tensor::stack(&mats, 0)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_rows_go_to_last_column() -> PplResult<()> {
        // n = trunc(4.5) = 4, integral parts 1 + 1 + 1 leave one row over
        let xx = group_assignment_matrix(&[1.5, 1.5, 1.5])?;
        assert_eq!(xx.shape(), (4, 3));
        assert_eq!(xx.column(2).sum(), 2.0);
        assert_eq!(xx[(3, 2)], 1.0);
        for r in 0..4 {
            assert_eq!(xx.row(r).sum(), 1.0);
        }
        Ok(())
    }

    #[test]
    fn empty_sizes() -> PplResult<()> {
        let xx = group_assignment_matrix(&[])?;
        assert_eq!(xx.shape(), (0, 0));
        Ok(())
    }
}
