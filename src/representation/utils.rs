use crate::testing::Aggregation;
use ndarray::{Array1, Array2};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Sorted distinct labels of a sequence together with their occurrence counts.
pub(crate) fn unique_counts<L>(labels: &[L]) -> (Vec<L>, Vec<u64>)
where
    L: Ord + Clone,
{
    let mut counts: BTreeMap<&L, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| (label.clone(), count))
        .unzip()
}

/// Column-wise reduction of the selected matrix rows into one reference vector.
pub(crate) fn aggregate_rows(
    distributions: &Array2<f64>,
    rows: &[usize],
    aggregation: Aggregation,
) -> Array1<f64> {
    let n_clusters = distributions.ncols();
    match aggregation {
        Aggregation::Sum => {
            let mut reference = Array1::zeros(n_clusters);
            for &row in rows {
                reference += &distributions.row(row);
            }
            reference
        }
        Aggregation::Mean => {
            let mut reference = Array1::zeros(n_clusters);
            for &row in rows {
                reference += &distributions.row(row);
            }
            reference /= rows.len() as f64;
            reference
        }
        Aggregation::Median => {
            let mut reference = Array1::zeros(n_clusters);
            for cluster in 0..n_clusters {
                let mut column: Vec<f64> = rows
                    .iter()
                    .map(|&row| distributions[[row, cluster]])
                    .collect();
                column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let mid = column.len() / 2;
                reference[cluster] = if column.len() % 2 == 1 {
                    column[mid]
                } else {
                    (column[mid - 1] + column[mid]) / 2.0
                };
            }
            reference
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_unique_counts_sorted_with_occurrences() {
        let labels = ["b", "a", "b", "c", "a", "b"];
        let (unique, counts) = unique_counts(&labels);
        assert_eq!(unique, vec!["a", "b", "c"]);
        assert_eq!(counts, vec![2, 3, 1]);
    }

    #[test]
    fn test_unique_counts_integer_labels() {
        let labels = [7u32, 3, 7, 7, 3];
        let (unique, counts) = unique_counts(&labels);
        assert_eq!(unique, vec![3, 7]);
        assert_eq!(counts, vec![2, 3]);
    }

    #[test]
    fn test_unique_counts_single_label() {
        let labels = ["x", "x", "x"];
        let (unique, counts) = unique_counts(&labels);
        assert_eq!(unique, vec!["x"]);
        assert_eq!(counts, vec![3]);
    }

    #[test]
    fn test_aggregate_rows_sum_and_mean() {
        let distributions = array![[3.0, 1.0], [1.0, 3.0], [4.0, 4.0]];

        let summed = aggregate_rows(&distributions, &[0, 1], Aggregation::Sum);
        assert_eq!(summed, array![4.0, 4.0]);

        let mean = aggregate_rows(&distributions, &[0, 1], Aggregation::Mean);
        assert_eq!(mean, array![2.0, 2.0]);
    }

    #[test]
    fn test_aggregate_rows_median() {
        let distributions = array![[3.0, 1.0], [1.0, 3.0], [4.0, 4.0]];

        // Odd number of rows picks the middle value per column
        let median = aggregate_rows(&distributions, &[0, 1, 2], Aggregation::Median);
        assert_eq!(median, array![3.0, 3.0]);

        // Even number of rows averages the two middle values
        let median = aggregate_rows(&distributions, &[0, 2], Aggregation::Median);
        assert_relative_eq!(median[0], 3.5, epsilon = 1e-12);
        assert_relative_eq!(median[1], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_aggregate_rows_single_row_is_identity() {
        let distributions = array![[3.0, 1.0], [1.0, 3.0]];
        for aggregation in [Aggregation::Sum, Aggregation::Mean, Aggregation::Median] {
            let reference = aggregate_rows(&distributions, &[1], aggregation);
            assert_eq!(reference, array![1.0, 3.0]);
        }
    }
}
