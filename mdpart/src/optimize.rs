use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use crate::error::ModelError;
use crate::multiset::MultiSet;

/// Flat optimal tiling of the top block for one value of λ.
///
/// `blocks` holds dense block ids in reconstruction order; `size`, `loss` and
/// `cost` aggregate over them, with `cost == size + λ·loss` up to rounding.
#[derive(Clone, Debug, Serialize)]
pub struct OptimalPartition {
    pub lambda: f64,
    pub blocks: Vec<usize>,
    pub size: usize,
    pub loss: f64,
    pub cost: f64,
}

impl MultiSet {
    /// Minimize `size + λ·loss` over all admissible tilings of the top block.
    ///
    /// Every block's DP state is reset first, so λ sweeps are independent;
    /// the loss cache is untouched and shared across calls. Tie-breaking is
    /// strict: keeping a block whole beats any tiling of equal cost, and
    /// earlier candidates beat later ones.
    pub fn optimal_partition(&mut self, lambda: f64) -> Result<OptimalPartition, ModelError> {
        let top = self.top_multi_subset()?;
        for block in &mut self.multi_subsets {
            block.cost = f64::NAN;
            block.chosen = None;
        }
        self.compute_cost(top, lambda);

        let mut blocks = Vec::new();
        let mut queue = VecDeque::from([top]);
        while let Some(id) = queue.pop_front() {
            match self.multi_subsets[id].chosen {
                None => blocks.push(id),
                Some(candidate) => {
                    queue.extend(
                        self.multi_subsets[id].multi_partitions[candidate]
                            .children
                            .iter()
                            .copied(),
                    );
                }
            }
        }

        let size = blocks.len();
        let loss: f64 = blocks
            .iter()
            .map(|&block| self.multi_subsets[block].loss())
            .sum();
        let cost: f64 = blocks
            .iter()
            .map(|&block| self.multi_subsets[block].cost)
            .sum();
        debug!(lambda, size, loss, cost, "optimal partition reconstructed");
        Ok(OptimalPartition {
            lambda,
            blocks,
            size,
            loss,
            cost,
        })
    }

    fn compute_cost(&mut self, id: usize, lambda: f64) -> f64 {
        let cached = self.multi_subsets[id].cost;
        if !cached.is_nan() {
            return cached;
        }

        // cost of keeping the block as one piece of the solution
        let mut best = lambda.mul_add(self.multi_subsets[id].loss(), 1.0);
        let mut chosen = None;
        for candidate in 0..self.multi_subsets[id].multi_partitions.len() {
            let mut tiled = 0.0;
            for i in 0..self.multi_subsets[id].multi_partitions[candidate]
                .children
                .len()
            {
                let child = self.multi_subsets[id].multi_partitions[candidate].children[i];
                tiled += self.compute_cost(child, lambda);
            }
            if tiled < best {
                best = tiled;
                chosen = Some(candidate);
            }
        }

        self.multi_subsets[id].cost = best;
        self.multi_subsets[id].chosen = chosen;
        best
    }
}
