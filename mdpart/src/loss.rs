//! Information loss of collapsing a block's cells onto their average density,
//! following
//!
//! ```bibtex
//! @techreport{LamarchePerrin2018,
//!    author = {Robin Lamarche-Perrin},
//!    institution = {arXiv},
//!    number = {1807.06874},
//!    title = {An Information-theoretic Framework for the Lossy Compression of Link Streams},
//!    year = {2018},
//! }
//! ```
//!
//! For a block covering `n` cells with values `v_i` summing to `V`, the raw
//! loss is `V·log₂(n) + Σ v_i·log₂(v_i) − V·log₂(V)`: the Kullback-Leibler
//! divergence of the cell distribution from uniform, scaled by `V`. It is 0
//! exactly on blocks of uniform density, non-negative on non-negative values,
//! and additive refinements can only lower it. Once every block is aggregated,
//! losses are rescaled by the top block's total mass so that λ weighs a
//! dimensionless per-unit-mass quantity.

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::error::ModelError;
use crate::multiset::MultiSet;

/// Aggregates cached on every block once the grid values are loaded.
///
/// `sum_info` is the entropy-style sum `−Σ v·log₂(v)` over covered cells with
/// `v > 0`; zero-valued cells contribute 0 (the `x·log x → 0` limit).
#[derive(Clone, Copy, Debug, Serialize)]
pub struct BlockStats {
    pub sum_value: f64,
    pub sum_info: f64,
    pub cell_count: usize,
    pub loss: f64,
}

impl BlockStats {
    #[allow(clippy::cast_precision_loss)]
    fn from_sums(sum_value: f64, sum_info: f64, cell_count: usize) -> Self {
        let mut loss = sum_value.mul_add((cell_count as f64).log2(), -sum_info);
        if sum_value > 0.0 {
            loss -= sum_value * sum_value.log2();
        }
        Self {
            sum_value,
            sum_info,
            cell_count,
            loss,
        }
    }
}

impl MultiSet {
    /// Compute raw aggregates for every block, bottom-up and memoized, then
    /// rescale all losses by the top block's mass in a single pass.
    ///
    /// The recursion resolves each block through the canonical (first)
    /// candidate tiling, which already covers its cells exactly once; only
    /// blocks without candidates aggregate directly over the grid.
    pub(crate) fn compute_losses(&mut self) -> Result<(), ModelError> {
        for block in &mut self.multi_subsets {
            block.stats = None;
        }
        for id in 0..self.multi_subsets.len() {
            self.block_stats(id)?;
        }

        let top = self.top_multi_subset.expect("graph built before loss pass");
        let total = self.multi_subsets[top]
            .stats
            .expect("just computed")
            .sum_value;
        if total > 0.0 {
            for block in &mut self.multi_subsets {
                if let Some(stats) = block.stats.as_mut() {
                    stats.loss /= total;
                }
            }
        }
        debug!(
            total,
            top_loss = self.multi_subsets[top].loss(),
            "loss pass done"
        );
        Ok(())
    }

    fn block_stats(&mut self, id: usize) -> Result<BlockStats, ModelError> {
        if let Some(stats) = self.multi_subsets[id].stats {
            return Ok(stats);
        }
        let stats = if self.multi_subsets[id].multi_partitions.is_empty() {
            self.direct_stats(id)?
        } else {
            let children = self.multi_subsets[id].multi_partitions[0].children.clone();
            let mut sum_value = 0.0;
            let mut sum_info = 0.0;
            let mut cell_count = 0;
            for child in children {
                let child_stats = self.block_stats(child)?;
                sum_value += child_stats.sum_value;
                sum_info += child_stats.sum_info;
                cell_count += child_stats.cell_count;
            }
            BlockStats::from_sums(sum_value, sum_info, cell_count)
        };
        self.multi_subsets[id].stats = Some(stats);
        Ok(stats)
    }

    /// Aggregate a block directly over the cells it covers.
    fn direct_stats(&self, id: usize) -> Result<BlockStats, ModelError> {
        let per_dim = self.multi_subsets[id]
            .subsets
            .iter()
            .zip(self.sets())
            .map(|(&subset, set)| set.leaf_elements(subset))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sum_value = 0.0;
        let mut sum_info = 0.0;
        let mut cell_count = 0;
        for combo in per_dim
            .iter()
            .map(|ids| ids.iter().copied())
            .multi_cartesian_product()
        {
            let value = self.multi_elements()[self.element_index_of(&combo)].value;
            sum_value += value;
            if value > 0.0 {
                sum_info -= value * value.log2();
            }
            cell_count += 1;
        }
        Ok(BlockStats::from_sums(sum_value, sum_info, cell_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::abc_multiset;

    fn built_with(values: &[(&[&str; 3], f64)]) -> MultiSet {
        let mut ms = abc_multiset();
        ms.build_multi_elements();
        for (names, value) in values {
            ms.set_multi_element(*names, *value).unwrap();
        }
        ms.build_multi_subsets().unwrap();
        ms
    }

    #[test]
    fn uniform_data_has_zero_loss_everywhere() {
        let mut ms = abc_multiset();
        ms.build_multi_elements();
        for id in 0..ms.multi_elements().len() {
            ms.set_value_at(id, 1.0);
        }
        ms.build_multi_subsets().unwrap();
        for block in ms.multi_subsets() {
            assert::close(block.loss(), 0.0, 1e-9);
        }
    }

    #[test]
    fn uniform_non_unit_density_is_also_lossless() {
        let mut ms = abc_multiset();
        ms.build_multi_elements();
        for id in 0..ms.multi_elements().len() {
            ms.set_value_at(id, 2.5);
        }
        ms.build_multi_subsets().unwrap();
        let top = ms.top_multi_subset().unwrap();
        assert::close(ms.multi_subset(top).loss(), 0.0, 1e-9);
    }

    #[test]
    fn all_zero_data_keeps_raw_zero_losses() {
        let ms = built_with(&[]);
        for block in ms.multi_subsets() {
            assert::close(block.loss(), 0.0, 1e-12);
            assert::close(block.sum_value(), 0.0, 1e-12);
        }
    }

    #[test]
    fn single_loaded_cell_aggregates() {
        let ms = built_with(&[(&["a3", "b2", "c1"], 2.0)]);
        let top = ms.top_multi_subset().unwrap();
        let stats = ms.multi_subset(top).stats().unwrap();
        assert_eq!(stats.cell_count, 24);
        assert::close(stats.sum_value, 2.0, 1e-12);
        // −2·log₂(2)
        assert::close(stats.sum_info, -2.0, 1e-12);
        // raw loss 2·log₂(24) + 2·log₂(2) − 2·log₂(2), normalized by mass 2
        assert::close(ms.multi_subset(top).loss(), 24f64.log2(), 1e-9);

        // the loaded cell alone is lossless
        let leaf = ms.multi_subset_index(&["A3", "B2", "C1"]).unwrap();
        assert_eq!(ms.multi_subset(leaf).cell_count(), 1);
        assert::close(ms.multi_subset(leaf).loss(), 0.0, 1e-12);

        // untouched blocks have zero mass and zero loss
        let zero = ms.multi_subset_index(&["A12", "B123", "C12"]).unwrap();
        assert::close(ms.multi_subset(zero).sum_value(), 0.0, 1e-12);
        assert::close(ms.multi_subset(zero).loss(), 0.0, 1e-12);
    }

    #[test]
    fn aggregates_are_additive_over_canonical_children() {
        let ms = built_with(&[
            (&["a1", "b1", "c1"], 0.5),
            (&["a2", "b3", "c2"], 1.5),
            (&["a4", "b2", "c1"], 3.0),
        ]);
        for block in ms.multi_subsets() {
            let Some(candidate) = block.multi_partitions().first() else {
                continue;
            };
            let sum: f64 = candidate
                .children()
                .iter()
                .map(|&child| ms.multi_subset(child).sum_value())
                .sum();
            assert::close(block.sum_value(), sum, 1e-9);
            let cells: usize = candidate
                .children()
                .iter()
                .map(|&child| ms.multi_subset(child).cell_count())
                .sum();
            assert_eq!(block.cell_count(), cells);
        }
    }

    #[test]
    fn refinement_never_increases_loss() {
        let ms = built_with(&[
            (&["a1", "b1", "c1"], 0.5),
            (&["a2", "b3", "c2"], 1.5),
            (&["a4", "b2", "c1"], 3.0),
        ]);
        for block in ms.multi_subsets() {
            assert!(block.loss() >= -1e-12);
            for candidate in block.multi_partitions() {
                for &child in candidate.children() {
                    assert!(ms.multi_subset(child).loss() <= block.loss() + 1e-9);
                }
            }
        }
    }

    #[test]
    fn losses_rescale_by_top_mass() {
        let ms = built_with(&[(&["a1", "b1", "c1"], 1.0), (&["a2", "b1", "c1"], 1.0)]);
        let top = ms.top_multi_subset().unwrap();
        // raw top loss = 2·log₂(24) − 2·log₂(2) = 2·log₂(12); mass = 2
        assert::close(ms.multi_subset(top).loss(), 12f64.log2(), 1e-9);
    }

    #[test]
    fn nan_values_propagate_without_panicking() {
        let ms = built_with(&[(&["a1", "b1", "c1"], f64::NAN)]);
        let top = ms.top_multi_subset().unwrap();
        assert!(ms.multi_subset(top).sum_value().is_nan());
        assert!(ms.multi_subset(top).loss().is_nan());
    }
}
