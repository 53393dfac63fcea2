//! Effect size measures comparing a test distribution against the reference.

use anyhow::{Result, anyhow};
use ndarray::{Array1, ArrayView1};

/// Normalized percent change between a test and a reference count vector
///
/// Both vectors are first normalized to relative frequencies by their own sums,
/// then compared elementwise as `(t - r) / r`. A cluster that is absent from the
/// reference has a reference frequency of zero; the resulting division by zero
/// propagates as infinity (or NaN when the test frequency is also zero) rather
/// than being special-cased, and the sign handling downstream tolerates both.
///
/// # Example
/// ```
/// use ndarray::array;
/// use single_representation::testing::effect::percent_change;
///
/// let reference = array![2.0, 2.0];
/// let observed = array![3.0, 1.0];
/// let change = percent_change(reference.view(), observed.view()).unwrap();
/// assert_eq!(change, array![0.5, -0.5]);
/// ```
pub fn percent_change(
    reference: ArrayView1<f64>,
    observed: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    if reference.len() != observed.len() {
        return Err(anyhow!(
            "reference and test distributions have different sizes: {} != {}",
            reference.len(),
            observed.len()
        ));
    }

    let reference_total = reference.sum();
    let observed_total = observed.sum();
    let changes: Array1<f64> = reference
        .iter()
        .zip(observed.iter())
        .map(|(&r, &t)| {
            let reference_frequency = r / reference_total;
            let observed_frequency = t / observed_total;
            (observed_frequency - reference_frequency) / reference_frequency
        })
        .collect();

    Ok(changes)
}

/// Sign of an effect size
///
/// NumPy-style semantics: positive values map to 1.0, negative values to -1.0,
/// zero to 0.0 and NaN propagates. `f64::signum` is unsuitable here because it
/// maps +0.0 to 1.0.
pub fn sign(value: f64) -> f64 {
    if value.is_nan() {
        f64::NAN
    } else if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
