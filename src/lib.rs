//! # single-representation
//!
//! A specialized Rust library for differential representation testing of single-cell data, part of the single-rust ecosystem.
//!
//! This crate answers the question "is cluster X over- or underrepresented in cohort Y?"
//! Given per-observation cluster and group labels, it builds the group-by-cluster
//! contingency matrix, tests every group's cluster distribution against an aggregated
//! reference distribution, and derives FDR-corrected significance scores suitable for
//! ranking and plotting.
//!
//! ## Core Features
//!
//! - **Exact Significance Testing**: Hypergeometric and Fisher exact strategies, two-sided via the smaller one-sided tail
//! - **Multiple Testing Correction**: Benjamini-Hochberg FDR over the pooled group-by-cluster p-value matrix
//! - **Effect Size Calculations**: Normalized percent change against the reference distribution
//! - **Derived Metrics**: -log10(FDR) and effect-signed -log10(FDR) matrices for downstream visualization
//!
//! ## Quick Start
//!
//! Construct a [`representation::RepresentationTest`] from two parallel label slices,
//! call `fit()`, then read the result matrices through its accessors. Construction
//! validates the labels and configuration eagerly, so a successfully built instance
//! is always fittable.
//!
//! ## Module Organization
//!
//! - **[`testing`]**: Exact tests, multiple testing correction, and effect size helpers
//! - **[`representation`]**: The differential representation engine built on top of [`testing`]

pub mod testing;
pub mod representation;
