use std::collections::HashMap;

use tracing::debug;

use crate::blocks::MultiSubset;
use crate::error::ModelError;
use crate::set::Set;

/// A cell of the product space: one element per dimension and a scalar value.
#[derive(Clone, Debug)]
pub struct MultiElement {
    pub(crate) id: usize,
    pub(crate) elements: Vec<usize>,
    pub(crate) value: f64,
}

impl MultiElement {
    /// Dense id; encodes the element tuple with dimension 0 varying fastest.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Element id in each dimension, in dimension order.
    #[must_use]
    pub fn element_ids(&self) -> &[usize] {
        &self.elements
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }
}

/// The whole product space: its dimensions, the dense cell grid, and (once
/// built) the graph of admissible rectangular blocks.
///
/// All entities live in dense id-indexed vectors owned here; cross-references
/// are plain indices. Construction happens once, on the caller's thread.
#[derive(Clone, Debug)]
pub struct MultiSet {
    pub(crate) name: String,
    pub(crate) sets: Vec<Set>,
    pub(crate) sets_by_name: HashMap<String, usize>,
    pub(crate) multi_elements: Vec<MultiElement>,
    pub(crate) elements_built: bool,
    pub(crate) multi_subsets: Vec<MultiSubset>,
    pub(crate) top_multi_subset: Option<usize>,
}

impl MultiSet {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            sets: Vec::new(),
            sets_by_name: HashMap::new(),
            multi_elements: Vec::new(),
            elements_built: false,
            multi_subsets: Vec::new(),
            top_multi_subset: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a dimension; returns its index.
    pub fn add_set(&mut self, name: &str) -> Result<usize, ModelError> {
        if self.sets_by_name.contains_key(name) {
            return Err(ModelError::DuplicateName {
                scope: format!("multiset '{}'", self.name),
                name: name.into(),
            });
        }
        let dim = self.sets.len();
        self.sets.push(Set::new(name, dim));
        self.sets_by_name.insert(name.into(), dim);
        Ok(dim)
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn sets(&self) -> &[Set] {
        &self.sets
    }

    #[must_use]
    pub fn set(&self, dim: usize) -> &Set {
        &self.sets[dim]
    }

    pub fn set_mut(&mut self, dim: usize) -> &mut Set {
        &mut self.sets[dim]
    }

    pub fn set_by_name(&self, name: &str) -> Result<&Set, ModelError> {
        let dim = self.set_dim(name)?;
        Ok(&self.sets[dim])
    }

    pub fn set_by_name_mut(&mut self, name: &str) -> Result<&mut Set, ModelError> {
        let dim = self.set_dim(name)?;
        Ok(&mut self.sets[dim])
    }

    fn set_dim(&self, name: &str) -> Result<usize, ModelError> {
        self.sets_by_name.get(name).copied().ok_or_else(|| {
            ModelError::UnknownName {
                scope: format!("multiset '{}'", self.name),
                name: name.into(),
            }
        })
    }

    /// Allocate the dense cell grid by mixed-radix enumeration of the element
    /// tuples, dimension 0 varying fastest. Every value starts at 0; a rebuild
    /// discards previous values and invalidates the block graph.
    pub fn build_multi_elements(&mut self) {
        let size: usize = self.sets.iter().map(|set| set.elements().len()).product();
        let mut cells = Vec::with_capacity(size);
        for id in 0..size {
            let mut rest = id;
            let elements = self
                .sets
                .iter()
                .map(|set| {
                    let element = rest % set.elements().len();
                    rest /= set.elements().len();
                    element
                })
                .collect();
            cells.push(MultiElement {
                id,
                elements,
                value: 0.0,
            });
        }
        debug!(cells = size, "built multi-element grid");
        self.multi_elements = cells;
        self.elements_built = true;
        self.multi_subsets.clear();
        self.top_multi_subset = None;
    }

    /// Dense cell index of an element-id tuple.
    pub(crate) fn element_index_of(&self, ids: &[usize]) -> usize {
        let mut id = 0;
        for (set, &element) in self.sets.iter().zip(ids.iter()).rev() {
            id = id * set.elements().len() + element;
        }
        id
    }

    /// Dense cell index for a tuple of element names, one per dimension.
    pub fn element_index(&self, names: &[&str]) -> Result<usize, ModelError> {
        if names.len() != self.sets.len() {
            return Err(ModelError::DimensionArityMismatch {
                expected: self.sets.len(),
                got: names.len(),
            });
        }
        let mut id = 0;
        for (set, name) in self.sets.iter().zip(names.iter()).rev() {
            id = id * set.elements().len() + set.element_id(name)?;
        }
        Ok(id)
    }

    /// The cell addressed by a tuple of element names.
    pub fn multi_element(&self, names: &[&str]) -> Result<&MultiElement, ModelError> {
        if !self.elements_built {
            return Err(ModelError::NotBuilt {
                what: "multi-element grid",
            });
        }
        let id = self.element_index(names)?;
        Ok(&self.multi_elements[id])
    }

    /// Assign a cell's value by element names.
    pub fn set_multi_element(&mut self, names: &[&str], value: f64) -> Result<(), ModelError> {
        if !self.elements_built {
            return Err(ModelError::NotBuilt {
                what: "multi-element grid",
            });
        }
        let id = self.element_index(names)?;
        self.multi_elements[id].value = value;
        Ok(())
    }

    /// Assign a cell's value by dense id.
    pub fn set_value_at(&mut self, id: usize, value: f64) {
        self.multi_elements[id].value = value;
    }

    #[must_use]
    pub fn multi_elements(&self) -> &[MultiElement] {
        &self.multi_elements
    }
}
