//! Multiple testing correction for the pooled representation test results.

use anyhow::{Result, anyhow};
use ndarray::Array2;
use std::cmp::Ordering;

/// Apply the Benjamini-Hochberg (BH) procedure for controlling false discovery rate
///
/// The BH procedure controls the false discovery rate (FDR), the expected
/// proportion of false positives among all rejected null hypotheses. Every
/// adjusted value is at least as large as its raw p-value and capped at 1.0.
///
/// # Arguments
/// * `p_values` - A slice of p-values to adjust
///
/// # Returns
/// * `Result<Vec<f64>>` - Vector of adjusted p-values in the input order
///
/// # Example
/// ```
/// use single_representation::testing::correction::benjamini_hochberg_correction;
///
/// let p_values = vec![0.01, 0.03, 0.05];
/// let adjusted = benjamini_hochberg_correction(&p_values).unwrap();
/// assert!(adjusted.iter().all(|&q| q <= 0.05));
/// ```
pub fn benjamini_hochberg_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    let n = p_values.len();
    if n == 0 {
        return Err(anyhow!("Empty p-value array"));
    }

    // Every input must lie in the unit interval
    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(anyhow!("Invalid p-value at index {}: {}", i, p));
        }
    }

    // Indices sorted by p-value in ascending order
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(Ordering::Equal)
    });

    // Walk from the largest rank down, carrying the running minimum so the
    // adjusted values stay monotone along the sorted order
    let mut adjusted_p_values = vec![0.0; n];
    let mut current_min = 1.0;
    for (i, &original_index) in order.iter().enumerate().rev() {
        let rank = i + 1;
        let adjustment = (p_values[original_index] * n as f64 / rank as f64).min(1.0);
        current_min = adjustment.min(current_min);
        adjusted_p_values[original_index] = current_min;
    }

    Ok(adjusted_p_values)
}

/// Apply BH correction jointly over a whole p-value matrix
///
/// The matrix is flattened row-major into a single pooled list, corrected once
/// with [`benjamini_hochberg_correction`], and reshaped back. Correction over the
/// pooled set is deliberate: correcting each row separately would understate the
/// number of hypotheses actually tested.
///
/// # Arguments
/// * `p_values` - A matrix of p-values (for example groups x clusters)
///
/// # Returns
/// * `Result<Array2<f64>>` - Matrix of q-values with the same shape
///
/// # Example
/// ```
/// use ndarray::array;
/// use single_representation::testing::correction::false_discovery_rate;
///
/// let p_values = array![[0.01, 0.2], [0.04, 1.0]];
/// let q_values = false_discovery_rate(&p_values).unwrap();
/// assert_eq!(q_values.dim(), (2, 2));
/// ```
pub fn false_discovery_rate(p_values: &Array2<f64>) -> Result<Array2<f64>> {
    let pooled: Vec<f64> = p_values.iter().copied().collect();
    let adjusted = benjamini_hochberg_correction(&pooled)?;
    Ok(Array2::from_shape_vec(p_values.raw_dim(), adjusted)?)
}
