use anyhow::{Context, Result, bail};
use std::{fmt::Debug, ops::RangeBounds};

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

/// Check a weight vector: expected length, non-negative finite entries
/// with a finite sum.
///
/// Entries are not required to sum to one.
pub fn check_vec(vec: &[f64], exp_len: usize) -> Result<()> {
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    if let Some(ele) = vec.iter().find(|ele| !ele.is_finite() || **ele < 0.0) {
        bail!("vector must have only non-negative finite elements, but has {ele}");
    }
    let sum: f64 = vec.iter().sum();
    if !sum.is_finite() {
        bail!("vector elements must have a finite sum, but sum to {sum}");
    }
    Ok(())
}

/// Check a matrix of weight rows with dimensions `exp_dim` (rows, columns).
pub fn check_mat(mat: &[Vec<f64>], exp_dim: (usize, usize)) -> Result<()> {
    let (exp_n_rows, exp_n_cols) = exp_dim;
    let n_rows = mat.len();
    if n_rows != exp_n_rows {
        bail!("matrix must have {exp_n_rows} rows, but has {n_rows}");
    }
    for (i_row, row) in mat.iter().enumerate() {
        check_vec(row, exp_n_cols).with_context(|| format!("invalid row {i_row}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_range() {
        assert!(check_num(3, 1..=6).is_ok());
        assert!(check_num(0, 1..=6).is_err());
        assert!(check_num(7, 0..7).is_err());
    }

    #[test]
    fn vec_shape_and_sign() {
        assert!(check_vec(&[0.0, 2.5], 2).is_ok());
        assert!(check_vec(&[0.0, 2.5], 3).is_err());
        assert!(check_vec(&[0.0, -2.5], 2).is_err());
        assert!(check_vec(&[f64::INFINITY], 1).is_err());
        assert!(check_vec(&[1e308, 1e308], 2).is_err());
    }

    #[test]
    fn mat_shape() {
        let mat = vec![vec![0.5, 0.5], vec![1.0, 0.0]];
        assert!(check_mat(&mat, (2, 2)).is_ok());
        assert!(check_mat(&mat, (3, 2)).is_err());
        assert!(check_mat(&mat, (2, 3)).is_err());
    }
}
