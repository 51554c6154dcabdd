//! Per-dimension standardization of embedding batches

/// Standardize each column to zero mean and unit (population) variance.
///
/// Columns with no variance become all zeros. Rows are assumed to share one
/// length; callers check that before clustering.
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let n = rows.len() as f64;
    let dims = first.len();

    let mut means = vec![0.0; dims];
    for row in rows {
        for (mean, value) in means.iter_mut().zip(row) {
            *mean += value;
        }
    }
    for mean in &mut means {
        *mean /= n;
    }

    let mut stds = vec![0.0; dims];
    for row in rows {
        for ((std, value), mean) in stds.iter_mut().zip(row).zip(&means) {
            *std += (value - mean).powi(2);
        }
    }
    for std in &mut stds {
        *std = (*std / n).sqrt();
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(means.iter().zip(&stds))
                .map(|(value, (mean, std))| {
                    if is_constant(*std, *mean) {
                        0.0
                    } else {
                        (value - mean) / std
                    }
                })
                .collect()
        })
        .collect()
}

// Rounding in the mean leaves a tiny non-zero spread on constant columns
fn is_constant(std: f64, mean: f64) -> bool {
    std <= 10.0 * f64::EPSILON * mean.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaled = standardize(&rows);
        assert_eq!(scaled, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_constant_column_with_rounding_is_zero() {
        let rows = vec![vec![0.1], vec![0.1], vec![0.1]];
        assert!(standardize(&rows).iter().all(|r| r[0] == 0.0));
    }

    #[test]
    fn test_standardize_population_std() {
        let rows = vec![
            vec![1.0],
            vec![1.0],
            vec![1.0],
            vec![1.0],
            vec![0.0],
        ];
        let scaled = standardize(&rows);
        assert!((scaled[0][0] - 0.5).abs() < 1e-12);
        assert!((scaled[4][0] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batch() {
        assert!(standardize(&[]).is_empty());
    }
}
