//! Human-readable listings of the hierarchy and the product space.
//!
//! The exact text is presentation only; the structural data it exposes
//! (declaration order, expanded elements, partition lists) is the contract.

use std::fmt;

use itertools::Itertools;

use crate::multiset::MultiSet;
use crate::set::{Element, Set};

impl Set {
    /// One-line listing of a subset: its expanded elements, then each of its
    /// declared partitions.
    #[must_use]
    pub fn describe_subset(&self, id: usize) -> String {
        let subset = self.subset(id);
        let elements = match self.leaf_elements(id) {
            Ok(ids) => ids.iter().map(|&e| self.element(e).name()).join(", "),
            Err(_) => String::from("?"),
        };
        let mut out = format!("{} = {{{elements}}}", subset.name());
        for partition in subset.partitions() {
            let children = partition
                .children()
                .iter()
                .map(|&child| self.subset(child).name())
                .join(", ");
            out.push_str(&format!(" {{{children}}}"));
        }
        out
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {{{}}}",
            self.name(),
            self.elements().iter().map(Element::name).join(", ")
        )?;
        for subset in self.subsets() {
            write!(f, "\n\t{}", self.describe_subset(subset.id()))?;
        }
        Ok(())
    }
}

impl MultiSet {
    /// Block label such as `(A12, B123, C12)`.
    #[must_use]
    pub fn block_label(&self, id: usize) -> String {
        format!(
            "({})",
            self.multi_subset(id)
                .subset_ids()
                .iter()
                .zip(self.sets())
                .map(|(&subset, set)| set.subset(subset).name())
                .join(", ")
        )
    }

    /// Cell label such as `(a3, b2, c1)`.
    #[must_use]
    pub fn cell_label(&self, id: usize) -> String {
        format!(
            "({})",
            self.multi_elements()[id]
                .element_ids()
                .iter()
                .zip(self.sets())
                .map(|(&element, set)| set.element(element).name())
                .join(", ")
        )
    }

    /// Listing of every dimension's hierarchy; `rec` additionally lists every
    /// cell of the grid with its value.
    #[must_use]
    pub fn render(&self, rec: bool) -> String {
        let mut out = String::new();
        for set in self.sets() {
            out.push_str(&set.to_string());
            out.push('\n');
        }
        out.push_str(&format!(
            "{} = {} cells, {} blocks\n",
            self.name(),
            self.multi_elements().len(),
            self.multi_subsets().len()
        ));
        if rec {
            for cell in self.multi_elements() {
                out.push_str(&format!(
                    "\t{} = {}\n",
                    self.cell_label(cell.id()),
                    cell.value()
                ));
            }
        }
        out
    }
}

impl fmt::Display for MultiSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}
