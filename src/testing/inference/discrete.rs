use crate::testing::Alternative;
use anyhow::{Result, anyhow};
use ndarray::{Array1, ArrayView1};
use statrs::distribution::{Discrete, DiscreteCDF, Hypergeometric};

/// Per-cluster hypergeometric test of a test distribution against the reference
///
/// Models the test count of each cluster as drawn without replacement from a pool
/// of `sum(reference)` observations of which `reference[c]` belong to cluster `c`,
/// with `sum(observed)` draws in total. The upper tail `P(X >= k)` carries the
/// overrepresentation evidence, the lower tail `P(X <= k)` the underrepresentation
/// evidence; the reported p-value per cluster is the smaller of the two tails.
/// Identical vectors short-circuit to a vector of ones.
///
/// Every test count must stay within its reference count: the pool cannot contain
/// fewer members of a cluster than are drawn from it. Fractional reference counts
/// (mean or median aggregates) are rounded to the nearest integer for the
/// distribution parameters.
pub fn hypergeometric_test(
    reference: ArrayView1<f64>,
    observed: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    validate_counts(reference, observed)?;
    if reference.iter().zip(observed.iter()).any(|(&r, &t)| t > r) {
        return Err(anyhow!(
            "test counts exceed the reference distribution; enlarge the reference set or use the fisher-exact method"
        ));
    }
    if reference == observed {
        return Ok(Array1::ones(reference.len()));
    }

    let population = reference.sum().round() as u64;
    let draws = observed.sum().round() as u64;
    let p_values: Array1<f64> = reference
        .iter()
        .zip(observed.iter())
        .map(|(&r, &t)| {
            let successes = r.round() as u64;
            let k = t.round() as u64;
            match Hypergeometric::new(population, successes, draws) {
                Ok(distribution) => {
                    // sf(k - 1) is P(X >= k); k = 0 makes that tail certain
                    let upper = if k == 0 { 1.0 } else { distribution.sf(k - 1) };
                    let lower = distribution.cdf(k);
                    upper.min(lower)
                }
                Err(_) => 1.0, // Fallback for invalid parameters
            }
        })
        .collect();

    Ok(p_values)
}

/// Per-cluster Fisher exact test of a test distribution against the reference
///
/// For each cluster `c` the 2x2 contingency table
/// `[[r_c, M - r_c], [t_c, N - t_c]]` (with `M`, `N` the vector totals) is
/// evaluated under the one-sided greater and less alternatives; the reported
/// p-value is the smaller tail, matching the hypergeometric strategy's policy.
/// Valid for any non-negative counts, with no elementwise feasibility
/// requirement. Identical vectors short-circuit to a vector of ones.
pub fn fisher_exact_test(
    reference: ArrayView1<f64>,
    observed: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    validate_counts(reference, observed)?;
    if reference == observed {
        return Ok(Array1::ones(reference.len()));
    }

    let reference_total = reference.sum();
    let observed_total = observed.sum();
    let p_values: Array1<f64> = reference
        .iter()
        .zip(observed.iter())
        .map(|(&r, &t)| {
            // Fractional aggregates truncate cell-wise, as integer tables do
            let table = [
                [r as u64, (reference_total - r) as u64],
                [t as u64, (observed_total - t) as u64],
            ];
            let greater = fisher_exact(table, Alternative::Greater);
            let less = fisher_exact(table, Alternative::Less);
            greater.min(less)
        })
        .collect();

    Ok(p_values)
}

/// Fisher exact test on a single 2x2 contingency table
///
/// The table margins fix a hypergeometric law over the top-left cell `a`:
/// `X ~ Hypergeometric(a+b+c+d, a+b, a+c)`. `Alternative::Less` reports
/// `P(X <= a)`, `Alternative::Greater` reports `P(X >= a)`, and
/// `Alternative::TwoSided` sums the probabilities of all tables no more likely
/// than the observed one (minimum-likelihood method).
pub fn fisher_exact(table: [[u64; 2]; 2], alternative: Alternative) -> f64 {
    let [[a, b], [c, d]] = table;
    let population = a + b + c + d;
    let successes = a + b;
    let draws = a + c;
    if population == 0 {
        return 1.0;
    }

    match Hypergeometric::new(population, successes, draws) {
        Ok(distribution) => match alternative {
            Alternative::Less => distribution.cdf(a),
            Alternative::Greater => {
                if a == 0 {
                    1.0
                } else {
                    distribution.sf(a - 1)
                }
            }
            Alternative::TwoSided => {
                let observed_mass = distribution.pmf(a);
                let support_min = (successes + draws).saturating_sub(population);
                let support_max = successes.min(draws);
                let mut p_value = 0.0;
                for k in support_min..=support_max {
                    let mass = distribution.pmf(k);
                    // Relative gate absorbs round-off among tied masses
                    if mass <= observed_mass * (1.0 + 1e-7) {
                        p_value += mass;
                    }
                }
                p_value.min(1.0)
            }
        },
        Err(_) => 1.0, // Fallback for invalid parameters
    }
}

fn validate_counts(reference: ArrayView1<f64>, observed: ArrayView1<f64>) -> Result<()> {
    if reference.len() != observed.len() {
        return Err(anyhow!(
            "reference and test distributions have different sizes: {} != {}",
            reference.len(),
            observed.len()
        ));
    }
    if reference.is_empty() {
        return Err(anyhow!("Empty count distributions"));
    }
    for (i, &value) in reference.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow!("Invalid reference count at index {}: {}", i, value));
        }
    }
    for (i, &value) in observed.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow!("Invalid test count at index {}: {}", i, value));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_hypergeometric_identical_vectors_short_circuit() {
        let reference = array![3.0, 4.0, 2.0];
        let p_values = hypergeometric_test(reference.view(), reference.view()).unwrap();
        assert!(p_values.iter().all(|&p| p == 1.0));
    }

    #[test]
    fn test_hypergeometric_symmetric_half_draw() {
        // Drawing 10 from a pool of 20 with 10 marked: observing 5 sits exactly
        // at the center, so both tails equal (1 + 100 + 2025 + 14400 + 44100 +
        // 63504) / C(20, 10)
        let reference = array![10.0, 10.0];
        let observed = array![5.0, 5.0];
        let p_values = hypergeometric_test(reference.view(), observed.view()).unwrap();
        let expected = 124130.0 / 184756.0;
        assert_relative_eq!(p_values[0], expected, epsilon = 1e-9);
        assert_relative_eq!(p_values[1], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_hypergeometric_zero_test_count() {
        // k = 0 leaves the upper tail certain; the lower tail is pmf(0)
        let reference = array![5.0, 5.0];
        let observed = array![0.0, 3.0];
        let p_values = hypergeometric_test(reference.view(), observed.view()).unwrap();
        assert_relative_eq!(p_values[0], 10.0 / 120.0, epsilon = 1e-10);
        assert_relative_eq!(p_values[1], 10.0 / 120.0, epsilon = 1e-10);
    }

    #[test]
    fn test_hypergeometric_detects_depletion_and_enrichment() {
        let reference = array![18.0, 12.0];
        let observed = array![1.0, 9.0];
        let p_values = hypergeometric_test(reference.view(), observed.view()).unwrap();

        // Expected draw of cluster 0 is 6 of 10; observing 1 is far in the lower tail
        let depleted = (66.0 + 18.0 * 220.0) / 30045015.0;
        assert_relative_eq!(p_values[0], depleted, epsilon = 1e-9);
        assert!(p_values[1] < 0.01);
    }

    #[test]
    fn test_hypergeometric_rejects_overdrawn_test_counts() {
        let reference = array![2.0, 1.0];
        let observed = array![0.0, 2.0];
        let result = hypergeometric_test(reference.view(), observed.view());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("enlarge the reference set")
        );
    }

    #[test]
    fn test_fisher_identical_vectors_short_circuit() {
        let reference = array![7.0, 1.0];
        let p_values = fisher_exact_test(reference.view(), reference.view()).unwrap();
        assert!(p_values.iter().all(|&p| p == 1.0));
    }

    #[test]
    fn test_fisher_vector_known_values() {
        // Cluster 0 table [[2, 1], [0, 2]] and cluster 1 table [[1, 2], [2, 0]]
        // both leave 3/10 in their smaller tail
        let reference = array![2.0, 1.0];
        let observed = array![0.0, 2.0];
        let p_values = fisher_exact_test(reference.view(), observed.view()).unwrap();
        assert_relative_eq!(p_values[0], 0.3, epsilon = 1e-10);
        assert_relative_eq!(p_values[1], 0.3, epsilon = 1e-10);
    }

    #[test]
    fn test_fisher_tolerates_overdrawn_test_counts() {
        // The same vectors the hypergeometric model rejects are fine here
        let reference = array![2.0, 1.0];
        let observed = array![0.0, 5.0];
        let p_values = fisher_exact_test(reference.view(), observed.view()).unwrap();
        assert!(p_values.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_fisher_exact_single_table() {
        let table = [[8, 2], [1, 5]];
        let greater = fisher_exact(table, Alternative::Greater);
        let less = fisher_exact(table, Alternative::Less);
        let two_sided = fisher_exact(table, Alternative::TwoSided);

        // Margins give X ~ Hypergeometric(16, 10, 9) observed at 8
        assert_relative_eq!(greater, 280.0 / 11440.0, epsilon = 1e-9);
        assert_relative_eq!(less, 11430.0 / 11440.0, epsilon = 1e-9);
        assert_relative_eq!(two_sided, 400.0 / 11440.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fisher_exact_degenerate_tables() {
        assert_eq!(fisher_exact([[0, 0], [0, 0]], Alternative::TwoSided), 1.0);
        assert_eq!(fisher_exact([[0, 0], [0, 0]], Alternative::Greater), 1.0);

        // An empty first column keeps every alternative at certainty
        let table = [[0, 4], [0, 6]];
        assert_relative_eq!(
            fisher_exact(table, Alternative::Greater),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(fisher_exact(table, Alternative::Less), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let reference = array![1.0, 2.0];
        let mismatched = array![1.0, 2.0, 3.0];
        assert!(hypergeometric_test(reference.view(), mismatched.view()).is_err());
        assert!(fisher_exact_test(reference.view(), mismatched.view()).is_err());

        let empty = Array1::<f64>::zeros(0);
        assert!(hypergeometric_test(empty.view(), empty.view()).is_err());
        assert!(fisher_exact_test(empty.view(), empty.view()).is_err());

        let negative = array![-1.0, 2.0];
        let observed = array![1.0, 1.0];
        let result = fisher_exact_test(negative.view(), observed.view());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid reference count at index 0")
        );

        let nan = array![f64::NAN, 2.0];
        assert!(hypergeometric_test(reference.view(), nan.view()).is_err());
    }
}
