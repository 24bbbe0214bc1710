use std::collections::HashMap;

use crate::error::ModelError;

/// An atomic value of one dimension.
#[derive(Clone, Debug)]
pub struct Element {
    pub(crate) name: String,
    pub(crate) id: usize,
}

impl Element {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }
}

/// What a subset is made of: a single element, or whatever its partitions
/// expand to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubsetKind {
    Leaf { element: usize },
    Internal,
}

/// Declaration form accepted by [`Set::add_subset`].
///
/// `Top` declares an internal subset that is also the dimension's root. The
/// two roles are orthogonal: the root of a one-element dimension is a leaf,
/// declared with `Leaf` and then [`Set::mark_top`].
#[derive(Clone, Copy, Debug)]
pub enum SubsetSpec<'a> {
    /// Singleton subset over one already declared element.
    Leaf { element: &'a str },
    /// Subset to be decomposed by partitions declared later.
    Internal,
    /// Internal subset marked as the dimension's root.
    Top,
}

/// One alternative decomposition of a subset into child subsets.
///
/// The first partition declared on a subset is its canonical one: it drives
/// leaf expansion and the bottom-up aggregation of cell statistics.
#[derive(Clone, Debug)]
pub struct SubsetPartition {
    pub(crate) children: Vec<usize>,
}

impl SubsetPartition {
    /// Child subset ids, in declaration order.
    #[must_use]
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// An admissible subset of a dimension's elements: a block edge along that
/// dimension.
#[derive(Clone, Debug)]
pub struct Subset {
    pub(crate) name: String,
    pub(crate) id: usize,
    pub(crate) kind: SubsetKind,
    pub(crate) top: bool,
    pub(crate) partitions: Vec<SubsetPartition>,
}

impl Subset {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub const fn is_top(&self) -> bool {
        self.top
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, SubsetKind::Leaf { .. })
    }

    /// The wrapped element id, for a leaf subset.
    #[must_use]
    pub const fn element(&self) -> Option<usize> {
        match self.kind {
            SubsetKind::Leaf { element } => Some(element),
            SubsetKind::Internal => None,
        }
    }

    /// Alternative decompositions, in declaration order (first = canonical).
    #[must_use]
    pub fn partitions(&self) -> &[SubsetPartition] {
        &self.partitions
    }
}

/// One dimension of the product space: its elements, in insertion order, and
/// the hierarchy of admissible subsets over them.
///
/// Ids are dense and assigned by insertion order; all iteration preserves it.
/// The subsets form a DAG rooted at the top subset with leaves wrapping single
/// elements; a subset may appear in several parent partitions.
#[derive(Clone, Debug)]
pub struct Set {
    pub(crate) name: String,
    pub(crate) dim: usize,
    pub(crate) elements: Vec<Element>,
    pub(crate) elements_by_name: HashMap<String, usize>,
    pub(crate) subsets: Vec<Subset>,
    pub(crate) subsets_by_name: HashMap<String, usize>,
    pub(crate) top_subset: Option<usize>,
}

impl Set {
    pub(crate) fn new(name: &str, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            elements: Vec::new(),
            elements_by_name: HashMap::new(),
            subsets: Vec::new(),
            subsets_by_name: HashMap::new(),
            top_subset: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of this dimension within its multiset.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Append an element with a fresh dense id.
    pub fn add_element(&mut self, name: &str) -> Result<usize, ModelError> {
        if self.elements_by_name.contains_key(name) {
            return Err(ModelError::DuplicateName {
                scope: format!("set '{}'", self.name),
                name: name.into(),
            });
        }
        let id = self.elements.len();
        self.elements.push(Element {
            name: name.into(),
            id,
        });
        self.elements_by_name.insert(name.into(), id);
        Ok(id)
    }

    /// Register a subset under a unique name.
    pub fn add_subset(&mut self, name: &str, spec: SubsetSpec<'_>) -> Result<usize, ModelError> {
        if self.subsets_by_name.contains_key(name) {
            return Err(ModelError::DuplicateName {
                scope: format!("subsets of set '{}'", self.name),
                name: name.into(),
            });
        }
        if matches!(spec, SubsetSpec::Top) {
            if let Some(top) = self.top_subset {
                return Err(ModelError::MultipleTop {
                    set: self.name.clone(),
                    top: self.subsets[top].name.clone(),
                    name: name.into(),
                });
            }
        }
        let kind = match spec {
            SubsetSpec::Leaf { element } => SubsetKind::Leaf {
                element: self.element_id(element)?,
            },
            SubsetSpec::Internal | SubsetSpec::Top => SubsetKind::Internal,
        };
        let id = self.subsets.len();
        self.subsets.push(Subset {
            name: name.into(),
            id,
            kind,
            top: false,
            partitions: Vec::new(),
        });
        self.subsets_by_name.insert(name.into(), id);
        if matches!(spec, SubsetSpec::Top) {
            self.subsets[id].top = true;
            self.top_subset = Some(id);
        }
        Ok(id)
    }

    /// Mark an existing subset as the dimension's root.
    pub fn mark_top(&mut self, name: &str) -> Result<(), ModelError> {
        let id = self.subset_id(name)?;
        if let Some(top) = self.top_subset {
            return Err(ModelError::MultipleTop {
                set: self.name.clone(),
                top: self.subsets[top].name.clone(),
                name: name.into(),
            });
        }
        self.subsets[id].top = true;
        self.top_subset = Some(id);
        Ok(())
    }

    /// Append an alternative decomposition to `parent`.
    ///
    /// Children only need to exist; whether their element sets actually tile
    /// the parent is not checked here (see [`Set::validate_partitions`]).
    pub fn add_partition(&mut self, parent: &str, children: &[&str]) -> Result<(), ModelError> {
        let parent_id = self.subset_id(parent)?;
        if children.is_empty() {
            return Err(ModelError::EmptyPartition {
                set: self.name.clone(),
                subset: parent.into(),
            });
        }
        if self.subsets[parent_id].is_leaf() {
            return Err(ModelError::LeafPartition {
                set: self.name.clone(),
                subset: parent.into(),
            });
        }
        let children = children
            .iter()
            .map(|child| self.subset_id(child))
            .collect::<Result<Vec<_>, _>>()?;
        self.subsets[parent_id]
            .partitions
            .push(SubsetPartition { children });
        Ok(())
    }

    pub fn element_id(&self, name: &str) -> Result<usize, ModelError> {
        self.elements_by_name.get(name).copied().ok_or_else(|| {
            ModelError::UnknownName {
                scope: format!("elements of set '{}'", self.name),
                name: name.into(),
            }
        })
    }

    #[must_use]
    pub fn element(&self, id: usize) -> &Element {
        &self.elements[id]
    }

    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn subset_id(&self, name: &str) -> Result<usize, ModelError> {
        self.subsets_by_name.get(name).copied().ok_or_else(|| {
            ModelError::UnknownName {
                scope: format!("subsets of set '{}'", self.name),
                name: name.into(),
            }
        })
    }

    #[must_use]
    pub fn subset(&self, id: usize) -> &Subset {
        &self.subsets[id]
    }

    #[must_use]
    pub fn subsets(&self) -> &[Subset] {
        &self.subsets
    }

    #[must_use]
    pub const fn top_subset(&self) -> Option<usize> {
        self.top_subset
    }

    /// Element ids covered by a subset, in canonical expansion order.
    ///
    /// A leaf expands to its single element; an internal subset expands its
    /// first declared partition recursively.
    pub fn leaf_elements(&self, subset: usize) -> Result<Vec<usize>, ModelError> {
        let mut out = Vec::new();
        self.collect_leaf_elements(subset, &mut out)?;
        Ok(out)
    }

    fn collect_leaf_elements(&self, subset: usize, out: &mut Vec<usize>) -> Result<(), ModelError> {
        match self.subsets[subset].kind {
            SubsetKind::Leaf { element } => {
                out.push(element);
                Ok(())
            }
            SubsetKind::Internal => {
                let canonical = self.subsets[subset].partitions.first().ok_or_else(|| {
                    ModelError::NoPartition {
                        set: self.name.clone(),
                        subset: self.subsets[subset].name.clone(),
                    }
                })?;
                for &child in &canonical.children {
                    self.collect_leaf_elements(child, out)?;
                }
                Ok(())
            }
        }
    }

    /// Optional checker: every declared partition must tile its subset
    /// (children pairwise disjoint, union equal to the subset's elements).
    pub fn validate_partitions(&self) -> Result<(), ModelError> {
        for subset in &self.subsets {
            if subset.partitions.is_empty() {
                continue;
            }
            let mut parent = self.leaf_elements(subset.id)?;
            parent.sort_unstable();
            for (p, partition) in subset.partitions.iter().enumerate() {
                let mut covered = Vec::new();
                for &child in &partition.children {
                    covered.extend(self.leaf_elements(child)?);
                }
                covered.sort_unstable();
                let disjoint = covered.windows(2).all(|pair| pair[0] != pair[1]);
                if !disjoint || covered != parent {
                    return Err(ModelError::InvalidPartition {
                        set: self.name.clone(),
                        subset: subset.name.clone(),
                        partition: p,
                    });
                }
            }
        }
        Ok(())
    }
}
