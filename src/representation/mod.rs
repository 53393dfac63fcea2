//! Differential representation testing of cluster memberships across groups.
//!
//! The entry point is [`RepresentationTest`]: it is constructed from two
//! parallel label sequences (one cluster and one group label per observation),
//! builds the group x cluster count matrix, aggregates the rows of a chosen
//! reference selection into a single reference distribution, and on
//! [`RepresentationTest::fit`] tests every group row against that reference.

use crate::testing::{Aggregation, Method, correction, effect, inference};
use anyhow::{Result, anyhow};
use log::debug;
use ndarray::{Array1, Array2, Axis};
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use std::fmt;

mod utils;

/// Result matrices produced by [`RepresentationTest::fit`].
#[derive(Debug, Clone)]
struct FitMatrices {
    p_values: Array2<f64>,
    q_values: Array2<f64>,
    percent_change: Array2<f64>,
    neg_log_fdr: Array2<f64>,
    signed_neg_log_fdr: Array2<f64>,
}

/// Tests whether cluster memberships are differentially represented between
/// observation groups and a reference selection of those groups.
///
/// Rows of every matrix follow the sorted distinct group labels, columns the
/// sorted distinct cluster labels. The result matrices become available once
/// [`Self::fit`] has run.
///
/// # Example
///
/// ```
/// use single_representation::representation::RepresentationTest;
/// use single_representation::testing::{Aggregation, Method};
///
/// let clusters = ["a", "a", "b", "b", "b", "a"];
/// let groups = ["ctrl", "ctrl", "ctrl", "treat", "treat", "treat"];
/// let mut test = RepresentationTest::new(
///     &clusters,
///     &groups,
///     &["ctrl"],
///     Method::FisherExact,
///     Aggregation::Sum,
/// ).unwrap();
/// test.fit().unwrap();
///
/// assert_eq!(test.groups(), &["ctrl", "treat"]);
/// assert!(test.qvalues().unwrap().iter().all(|&q| (0.0..=1.0).contains(&q)));
/// ```
#[derive(Debug, Clone)]
pub struct RepresentationTest<C, G> {
    clusters: Vec<C>,
    cluster_counts: Vec<u64>,
    groups: Vec<G>,
    group_counts: Vec<u64>,
    reference_labels: Vec<G>,
    method: Method,
    aggregation: Aggregation,
    distributions: Array2<f64>,
    reference: Array1<f64>,
    results: Option<FitMatrices>,
}

impl<C, G> RepresentationTest<C, G>
where
    C: Ord + Clone + fmt::Display,
    G: Ord + Clone + fmt::Display,
{
    /// Build a representation test from per-observation cluster and group labels.
    ///
    /// `clusters` and `groups` must have the same length; the i-th entries
    /// describe the same observation. `reference` selects the group labels
    /// whose count rows are aggregated into the reference distribution.
    ///
    /// # Arguments
    ///
    /// * `clusters` - Cluster label of every observation
    /// * `groups` - Group label of every observation
    /// * `reference` - Group labels forming the reference selection
    /// * `method` - Significance method applied to every group row
    /// * `aggregation` - How the reference rows are reduced into one vector
    ///
    /// # Returns
    ///
    /// The constructed test, or an error when the labels are inconsistent or
    /// the hypergeometric model is infeasible for the derived counts.
    pub fn new(
        clusters: &[C],
        groups: &[G],
        reference: &[G],
        method: Method,
        aggregation: Aggregation,
    ) -> Result<Self> {
        if clusters.len() != groups.len() {
            return Err(anyhow!(
                "provided inputs are different sizes: {} != {}",
                clusters.len(),
                groups.len()
            ));
        }
        if clusters.len() <= 1 {
            return Err(anyhow!(
                "provided inputs must contain more than one observation"
            ));
        }

        let (cluster_labels, cluster_counts) = utils::unique_counts(clusters);
        let (group_labels, group_counts) = utils::unique_counts(groups);
        if cluster_labels.len() <= 1 {
            return Err(anyhow!(
                "provided clusters must contain more than one distinct value"
            ));
        }
        if group_labels.len() <= 1 {
            return Err(anyhow!(
                "provided groups must contain more than one distinct value"
            ));
        }

        if reference.is_empty() {
            return Err(anyhow!("provided reference selection is empty"));
        }
        for label in reference {
            if group_labels.binary_search(label).is_err() {
                return Err(anyhow!(
                    "provided reference '{}' not present in the group labels",
                    label
                ));
            }
        }
        let reference_rows: Vec<usize> = group_labels
            .iter()
            .enumerate()
            .filter_map(|(row, label)| reference.contains(label).then_some(row))
            .collect();

        debug!(
            "building {} x {} distribution matrix from {} observations",
            group_labels.len(),
            cluster_labels.len(),
            clusters.len()
        );
        let distributions = build_distributions(clusters, groups, &cluster_labels, &group_labels);
        let reference_distribution =
            utils::aggregate_rows(&distributions, &reference_rows, aggregation);

        if method == Method::Hypergeometric {
            validate_feasibility(
                &distributions,
                &reference_distribution,
                &group_labels,
                &cluster_labels,
            )?;
        }

        Ok(RepresentationTest {
            clusters: cluster_labels,
            cluster_counts,
            groups: group_labels,
            group_counts,
            reference_labels: reference.to_vec(),
            method,
            aggregation,
            distributions,
            reference: reference_distribution,
            results: None,
        })
    }

    /// Test every group row against the reference distribution and derive the
    /// corrected result matrices.
    ///
    /// The p-values of all groups and clusters are pooled into a single
    /// Benjamini-Hochberg correction. Refitting without changing the test
    /// reproduces identical matrices.
    pub fn fit(&mut self) -> Result<()> {
        debug!(
            "fitting {} groups x {} clusters with the {} method",
            self.groups.len(),
            self.clusters.len(),
            self.method
        );

        let method = self.method;
        let reference = self.reference.view();
        let rows: Vec<(Array1<f64>, Array1<f64>)> = self
            .distributions
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|observed| -> Result<(Array1<f64>, Array1<f64>)> {
                let p_values = inference::significance_test(method, reference, observed)?;
                let change = effect::percent_change(reference, observed)?;
                Ok((p_values, change))
            })
            .collect::<Result<_>>()?;

        let mut p_values = Array2::zeros(self.distributions.raw_dim());
        let mut percent_change = Array2::zeros(self.distributions.raw_dim());
        for (row, (p, change)) in rows.into_iter().enumerate() {
            p_values.row_mut(row).assign(&p);
            percent_change.row_mut(row).assign(&change);
        }

        let q_values = correction::false_discovery_rate(&p_values)?;
        let neg_log_fdr = q_values.mapv(|q| -q.log10());
        let signed_neg_log_fdr = &percent_change.mapv(effect::sign) * &neg_log_fdr;

        debug!(
            "fitted {} tests, {} below 5% FDR",
            q_values.len(),
            q_values.iter().filter(|&&q| q < 0.05).count()
        );

        self.results = Some(FitMatrices {
            p_values,
            q_values,
            percent_change,
            neg_log_fdr,
            signed_neg_log_fdr,
        });
        Ok(())
    }

    fn fitted(&self) -> Result<&FitMatrices> {
        self.results
            .as_ref()
            .ok_or_else(|| anyhow!("no fitted results available; run fit() first"))
    }

    /// Raw p-value matrix (groups x clusters). Available after [`Self::fit`].
    pub fn pvalues(&self) -> Result<&Array2<f64>> {
        Ok(&self.fitted()?.p_values)
    }

    /// FDR-corrected q-value matrix (groups x clusters). Available after [`Self::fit`].
    pub fn qvalues(&self) -> Result<&Array2<f64>> {
        Ok(&self.fitted()?.q_values)
    }

    /// -log10 of the q-values. Available after [`Self::fit`].
    pub fn neg_log_fdr(&self) -> Result<&Array2<f64>> {
        Ok(&self.fitted()?.neg_log_fdr)
    }

    /// -log10 of the q-values, carrying the sign of the percent change.
    /// Available after [`Self::fit`].
    pub fn signed_neg_log_fdr(&self) -> Result<&Array2<f64>> {
        Ok(&self.fitted()?.signed_neg_log_fdr)
    }

    /// Percent change of every normalized group row against the normalized
    /// reference. Available after [`Self::fit`].
    pub fn percent_change(&self) -> Result<&Array2<f64>> {
        Ok(&self.fitted()?.percent_change)
    }

    /// Distinct group labels in sorted order; matrix rows follow this order.
    pub fn groups(&self) -> &[G] {
        &self.groups
    }

    /// Distinct cluster labels in sorted order; matrix columns follow this order.
    pub fn clusters(&self) -> &[C] {
        &self.clusters
    }

    /// Number of observations per group, parallel to [`Self::groups`].
    pub fn group_counts(&self) -> &[u64] {
        &self.group_counts
    }

    /// Number of observations per cluster, parallel to [`Self::clusters`].
    pub fn cluster_counts(&self) -> &[u64] {
        &self.cluster_counts
    }

    /// Group x cluster count matrix built at construction.
    pub fn distributions(&self) -> &Array2<f64> {
        &self.distributions
    }

    /// Aggregated reference distribution the groups are tested against.
    pub fn reference_distribution(&self) -> &Array1<f64> {
        &self.reference
    }

    /// Whether [`Self::fit`] has completed at least once.
    pub fn is_fitted(&self) -> bool {
        self.results.is_some()
    }
}

impl<C, G> fmt::Display for RepresentationTest<C, G>
where
    C: Ord + Clone + fmt::Display,
    G: Ord + Clone + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reference: Vec<String> = self
            .reference_labels
            .iter()
            .map(|label| label.to_string())
            .collect();
        writeln!(f, "RepresentationTest")?;
        writeln!(f, ">> num groups: {}", self.groups.len())?;
        writeln!(f, ">> num clusters: {}", self.clusters.len())?;
        writeln!(f, ">> method: {}", self.method)?;
        writeln!(f, ">> aggregation: {}", self.aggregation)?;
        writeln!(f, ">> reference: [{}]", reference.join(", "))?;
        write!(f, ">> fitted: {}", self.is_fitted())
    }
}

fn build_distributions<C, G>(
    clusters: &[C],
    groups: &[G],
    cluster_labels: &[C],
    group_labels: &[G],
) -> Array2<f64>
where
    C: Ord,
    G: Ord,
{
    let mut distributions = Array2::zeros((group_labels.len(), cluster_labels.len()));
    for (cluster, group) in clusters.iter().zip(groups.iter()) {
        // Both lookups hit, the catalogs were built from these same sequences
        if let (Ok(row), Ok(column)) = (
            group_labels.binary_search(group),
            cluster_labels.binary_search(cluster),
        ) {
            distributions[[row, column]] += 1.0;
        }
    }
    distributions
}

fn validate_feasibility<C, G>(
    distributions: &Array2<f64>,
    reference: &Array1<f64>,
    group_labels: &[G],
    cluster_labels: &[C],
) -> Result<()>
where
    C: fmt::Display,
    G: fmt::Display,
{
    for (row, group_row) in distributions.outer_iter().enumerate() {
        for (column, (&observed, &available)) in
            group_row.iter().zip(reference.iter()).enumerate()
        {
            if observed > available {
                return Err(anyhow!(
                    "cannot model group '{}' with the hypergeometric method: cluster '{}' has more observations ({} vs {}) than the reference distribution provides; enlarge the reference set or rerun with the fisher-exact method",
                    group_labels[row],
                    cluster_labels[column],
                    observed,
                    available
                ));
            }
        }
    }
    Ok(())
}
