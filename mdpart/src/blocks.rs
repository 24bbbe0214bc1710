use tracing::debug;

use crate::error::ModelError;
use crate::loss::BlockStats;
use crate::multiset::MultiSet;

/// An admissible rectangular block: one subset per dimension.
///
/// Blocks cache two kinds of state: aggregates over the cells they cover
/// (set once per data load, see [`BlockStats`]) and the dynamic-programming
/// state for the current λ (reset on every optimization).
#[derive(Clone, Debug)]
pub struct MultiSubset {
    pub(crate) id: usize,
    pub(crate) subsets: Vec<usize>,
    pub(crate) top: bool,
    pub(crate) bot: bool,
    pub(crate) multi_partitions: Vec<MultiPartition>,
    pub(crate) stats: Option<BlockStats>,
    pub(crate) cost: f64,
    pub(crate) chosen: Option<usize>,
}

impl MultiSubset {
    /// Dense id; encodes the subset tuple with dimension 0 varying fastest.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Subset id in each dimension, in dimension order.
    #[must_use]
    pub fn subset_ids(&self) -> &[usize] {
        &self.subsets
    }

    /// Whether every component is its dimension's top subset.
    #[must_use]
    pub const fn is_top(&self) -> bool {
        self.top
    }

    /// Whether every component is a leaf: a single-cell block.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.bot
    }

    /// Candidate tilings, ordered by dimension then by partition declaration.
    #[must_use]
    pub fn multi_partitions(&self) -> &[MultiPartition] {
        &self.multi_partitions
    }

    /// Cached aggregates; `None` until the loss pass has run.
    #[must_use]
    pub const fn stats(&self) -> Option<&BlockStats> {
        self.stats.as_ref()
    }

    /// Normalized information loss of keeping this block whole.
    #[must_use]
    pub fn loss(&self) -> f64 {
        self.stats.as_ref().map_or(f64::NAN, |stats| stats.loss)
    }

    #[must_use]
    pub fn sum_value(&self) -> f64 {
        self.stats.as_ref().map_or(f64::NAN, |stats| stats.sum_value)
    }

    #[must_use]
    pub fn sum_info(&self) -> f64 {
        self.stats.as_ref().map_or(f64::NAN, |stats| stats.sum_info)
    }

    /// Number of cells the block covers (0 before the loss pass).
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.stats.as_ref().map_or(0, |stats| stats.cell_count)
    }

    /// DP cost for the λ of the ongoing optimization; NaN when not computed.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Index of the candidate tiling the DP picked; `None` means the block is
    /// kept whole in the optimal partition.
    #[must_use]
    pub const fn chosen_partition(&self) -> Option<usize> {
        self.chosen
    }
}

/// A tiling of a block obtained by splitting exactly one dimension along one
/// of that dimension's declared partitions.
#[derive(Clone, Debug)]
pub struct MultiPartition {
    pub(crate) split_dim: usize,
    pub(crate) children: Vec<usize>,
}

impl MultiPartition {
    /// The dimension that was split.
    #[must_use]
    pub const fn split_dim(&self) -> usize {
        self.split_dim
    }

    /// Child block ids, in the split partition's declaration order.
    #[must_use]
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

impl MultiSet {
    /// Dense block index of a subset-id tuple.
    pub(crate) fn subset_index_of(&self, ids: &[usize]) -> usize {
        let mut id = 0;
        for (set, &subset) in self.sets.iter().zip(ids.iter()).rev() {
            id = id * set.subsets().len() + subset;
        }
        id
    }

    /// Dense block index for a tuple of subset names, one per dimension.
    pub fn multi_subset_index(&self, names: &[&str]) -> Result<usize, ModelError> {
        if names.len() != self.sets.len() {
            return Err(ModelError::DimensionArityMismatch {
                expected: self.sets.len(),
                got: names.len(),
            });
        }
        let mut id = 0;
        for (set, name) in self.sets.iter().zip(names.iter()).rev() {
            id = id * set.subsets().len() + set.subset_id(name)?;
        }
        Ok(id)
    }

    #[must_use]
    pub fn multi_subset(&self, id: usize) -> &MultiSubset {
        &self.multi_subsets[id]
    }

    #[must_use]
    pub fn multi_subsets(&self) -> &[MultiSubset] {
        &self.multi_subsets
    }

    /// The block whose every component is its dimension's top subset.
    pub fn top_multi_subset(&self) -> Result<usize, ModelError> {
        self.top_multi_subset.ok_or(ModelError::NotBuilt {
            what: "multi-subset graph",
        })
    }

    /// Materialize the block graph: one block per subset tuple, candidate
    /// tilings by the product rule, then the loss pass over the loaded cell
    /// values.
    ///
    /// The graph is a DAG rooted at the top block with the single-cell blocks
    /// as leaves. Rebuilding after a new data load recomputes every aggregate.
    pub fn build_multi_subsets(&mut self) -> Result<(), ModelError> {
        if !self.elements_built {
            return Err(ModelError::NotBuilt {
                what: "multi-element grid",
            });
        }
        for set in &self.sets {
            if set.top_subset().is_none() {
                return Err(ModelError::MissingTop {
                    set: set.name().into(),
                });
            }
        }

        let size: usize = self.sets.iter().map(|set| set.subsets().len()).product();
        let mut blocks = Vec::with_capacity(size);
        for id in 0..size {
            let mut rest = id;
            let subsets: Vec<usize> = self
                .sets
                .iter()
                .map(|set| {
                    let subset = rest % set.subsets().len();
                    rest /= set.subsets().len();
                    subset
                })
                .collect();
            let top = subsets
                .iter()
                .zip(&self.sets)
                .all(|(&subset, set)| set.top_subset() == Some(subset));
            let bot = subsets
                .iter()
                .zip(&self.sets)
                .all(|(&subset, set)| set.subset(subset).is_leaf());
            blocks.push(MultiSubset {
                id,
                subsets,
                top,
                bot,
                multi_partitions: Vec::new(),
                stats: None,
                cost: f64::NAN,
                chosen: None,
            });
        }

        // Product rule: replace one coordinate by each child of one of its
        // partitions, keeping the other dimensions fixed.
        for id in 0..size {
            let coords = blocks[id].subsets.clone();
            let mut candidates = Vec::new();
            for (d, set) in self.sets.iter().enumerate() {
                for partition in set.subset(coords[d]).partitions() {
                    let mut child_coords = coords.clone();
                    let children = partition
                        .children()
                        .iter()
                        .map(|&child| {
                            child_coords[d] = child;
                            self.subset_index_of(&child_coords)
                        })
                        .collect();
                    candidates.push(MultiPartition {
                        split_dim: d,
                        children,
                    });
                }
            }
            blocks[id].multi_partitions = candidates;
        }

        let top_coords: Vec<usize> = self
            .sets
            .iter()
            .map(|set| set.top_subset().expect("checked above"))
            .collect();
        self.top_multi_subset = Some(self.subset_index_of(&top_coords));
        self.multi_subsets = blocks;
        debug!(blocks = size, "built multi-subset graph");

        if let Err(err) = self.compute_losses() {
            self.multi_subsets.clear();
            self.top_multi_subset = None;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::SubsetSpec;
    use crate::testutil::abc_multiset;

    fn built_abc() -> MultiSet {
        let mut ms = abc_multiset();
        ms.build_multi_elements();
        ms.build_multi_subsets().unwrap();
        ms
    }

    #[test]
    fn one_block_per_subset_tuple() {
        let ms = built_abc();
        assert_eq!(ms.multi_subsets().len(), 7 * 6 * 3);
        for (i, block) in ms.multi_subsets().iter().enumerate() {
            assert_eq!(block.id(), i);
        }
    }

    #[test]
    fn block_addressing_matches_the_stride_formula() {
        let ms = built_abc();
        // id = s_A + 7·(s_B + 6·s_C); A12 = 4, B23 = 4, C1 = 0
        let id = ms.multi_subset_index(&["A12", "B23", "C1"]).unwrap();
        assert_eq!(id, 4 + 7 * (4 + 6 * 0));
        assert_eq!(ms.multi_subset(id).subset_ids(), &[4, 4, 0]);
    }

    #[test]
    fn top_block_is_the_product_of_dimension_tops() {
        let ms = built_abc();
        let top = ms.top_multi_subset().unwrap();
        assert!(ms.multi_subset(top).is_top());
        assert_eq!(
            top,
            ms.multi_subset_index(&["A1234", "B123", "C12"]).unwrap()
        );
        let bots = ms
            .multi_subsets()
            .iter()
            .filter(|block| block.is_bot())
            .count();
        assert_eq!(bots, 4 * 3 * 2);
    }

    #[test]
    fn candidate_count_sums_partitions_over_dimensions() {
        let ms = built_abc();
        // A1234 has 1 partition, B123 has 2, C12 has 1
        let top = ms.top_multi_subset().unwrap();
        assert_eq!(ms.multi_subset(top).multi_partitions().len(), 4);

        // A12 has 1, B23 has 1, C1 is a leaf
        let id = ms.multi_subset_index(&["A12", "B23", "C1"]).unwrap();
        assert_eq!(ms.multi_subset(id).multi_partitions().len(), 2);

        // single-cell blocks cannot be split
        for block in ms.multi_subsets() {
            if block.is_bot() {
                assert!(block.multi_partitions().is_empty());
            }
        }
    }

    #[test]
    fn candidates_replace_exactly_one_coordinate() {
        let ms = built_abc();
        let top = ms.top_multi_subset().unwrap();
        let split_a = &ms.multi_subset(top).multi_partitions()[0];
        assert_eq!(split_a.split_dim(), 0);
        assert_eq!(
            split_a.children(),
            &[
                ms.multi_subset_index(&["A12", "B123", "C12"]).unwrap(),
                ms.multi_subset_index(&["A34", "B123", "C12"]).unwrap(),
            ]
        );

        let split_b_alt = &ms.multi_subset(top).multi_partitions()[2];
        assert_eq!(split_b_alt.split_dim(), 1);
        assert_eq!(
            split_b_alt.children(),
            &[
                ms.multi_subset_index(&["A1234", "B12", "C12"]).unwrap(),
                ms.multi_subset_index(&["A1234", "B3", "C12"]).unwrap(),
            ]
        );
    }

    #[test]
    fn partitionless_internal_subset_fails_the_loss_pass() {
        let mut ms = MultiSet::new("M");
        let d = ms.add_set("X").unwrap();
        let set = ms.set_mut(d);
        set.add_element("x1").unwrap();
        set.add_subset("X1", SubsetSpec::Leaf { element: "x1" }).unwrap();
        set.add_subset("XT", SubsetSpec::Top).unwrap();
        ms.build_multi_elements();
        assert!(matches!(
            ms.build_multi_subsets().unwrap_err(),
            ModelError::NoPartition { .. }
        ));
        assert!(ms.top_multi_subset().is_err());
        assert!(ms.multi_subsets().is_empty());
    }

    #[test]
    fn building_blocks_requires_grid_and_tops() {
        let mut ms = abc_multiset();
        assert!(matches!(
            ms.build_multi_subsets().unwrap_err(),
            ModelError::NotBuilt { .. }
        ));

        let mut ms = MultiSet::new("M");
        let d = ms.add_set("X").unwrap();
        ms.set_mut(d).add_element("x1").unwrap();
        ms.build_multi_elements();
        assert!(matches!(
            ms.build_multi_subsets().unwrap_err(),
            ModelError::MissingTop { .. }
        ));
    }
}
