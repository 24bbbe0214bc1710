//! Optimal lossy compression of multidimensional datasets by rectangular
//! partitioning.
//!
//! A dataset over a product of finite dimensions is compressed by tiling the
//! product space with admissible rectangular blocks, trading the number of
//! blocks against the information lost by collapsing each block onto its
//! average density. For a caller-supplied weight `λ ≥ 0`, the objective
//! `size + λ·loss` is minimized exactly by dynamic programming over the
//! product of per-dimension subset hierarchies.
//!
//! Typical lifecycle: declare dimensions, elements, subsets and partitions;
//! [`MultiSet::build_multi_elements`] and load cell values;
//! [`MultiSet::build_multi_subsets`] (which runs the loss pass); then query
//! [`MultiSet::optimal_partition`] for as many values of λ as needed.

pub mod blocks;
pub mod error;
pub mod loss;
pub mod multiset;
pub mod optimize;
pub mod render;
pub mod set;

pub use blocks::{MultiPartition, MultiSubset};
pub use error::ModelError;
pub use loss::BlockStats;
pub use multiset::{MultiElement, MultiSet};
pub use optimize::OptimalPartition;
pub use set::{Element, Set, Subset, SubsetKind, SubsetPartition, SubsetSpec};
