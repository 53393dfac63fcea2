use crate::testing::Method;
use anyhow::Result;
use ndarray::{Array1, ArrayView1};

pub mod discrete;

/// Test one cluster-distribution row against the reference distribution.
///
/// Dispatches to the strategy selected by `method`. Both strategies return one
/// p-value per cluster and combine the two one-sided tails by taking the smaller,
/// so their results are directly comparable.
pub fn significance_test(
    method: Method,
    reference: ArrayView1<f64>,
    observed: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    match method {
        Method::Hypergeometric => discrete::hypergeometric_test(reference, observed),
        Method::FisherExact => discrete::fisher_exact_test(reference, observed),
    }
}
