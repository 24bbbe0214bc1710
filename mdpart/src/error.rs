use thiserror::Error;

/// Errors surfaced while declaring hierarchies or addressing the product space.
///
/// Construction and lookup failures abort the current operation and leave the
/// model as it was; the cost engine itself never fails once the graph is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The name is already taken within the named scope.
    #[error("name '{name}' already declared in {scope}")]
    DuplicateName { scope: String, name: String },

    /// No entity with this name exists in the named scope.
    #[error("unknown name '{name}' in {scope}")]
    UnknownName { scope: String, name: String },

    /// A dimension may have at most one top subset.
    #[error("set '{set}' already has top subset '{top}', cannot mark '{name}'")]
    MultipleTop {
        set: String,
        top: String,
        name: String,
    },

    /// A partition must decompose its subset into at least one child.
    #[error("empty partition on subset '{subset}' of set '{set}'")]
    EmptyPartition { set: String, subset: String },

    /// An internal subset was expanded before any partition was declared on it.
    #[error("no partition on internal subset '{subset}' of set '{set}'")]
    NoPartition { set: String, subset: String },

    /// Leaf subsets wrap a single element and cannot be decomposed further.
    #[error("leaf subset '{subset}' of set '{set}' cannot be partitioned")]
    LeafPartition { set: String, subset: String },

    /// A name tuple did not have one entry per dimension.
    #[error("expected {expected} names, got {got}")]
    DimensionArityMismatch { expected: usize, got: usize },

    /// The product graph needs a top subset in every dimension.
    #[error("set '{set}' has no top subset")]
    MissingTop { set: String },

    /// A query ran before the structure it needs was built.
    #[error("{what} not built yet")]
    NotBuilt { what: &'static str },

    /// Optional check: a partition's children do not exactly tile the subset.
    #[error("partition {partition} of subset '{subset}' in set '{set}' does not tile it")]
    InvalidPartition {
        set: String,
        subset: String,
        partition: usize,
    },
}
