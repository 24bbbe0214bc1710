//! Whitespace-tokenized hierarchy files, one per dimension.
//!
//! Blank lines are ignored. A one-token line declares an element. A line
//! `S x1 x2 …` declares subset `S`: a leaf over `x1` when `x1` is an element
//! name and nothing follows, otherwise a new partition of `S` over previously
//! declared subsets. The last subset to appear becomes the dimension's top.
//! Duplicate element declarations and unknown subset references are logged
//! and skipped, so a partially broken file still loads.

use mdpart::{ModelError, Set, SubsetSpec};
use tracing::warn;

pub fn load_hierarchy(set: &mut Set, text: &str) -> Result<(), ModelError> {
    let mut last_subset: Option<String> = None;

    for (number, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let line = number + 1;
        match tokens.as_slice() {
            [] => {}
            [element] => {
                if let Err(err) = set.add_element(element) {
                    warn!(line, %err, "skipping element declaration");
                }
            }
            [name, rest @ ..] => {
                let leaf_form = rest.len() == 1 && set.element_id(rest[0]).is_ok();
                if leaf_form {
                    match set.add_subset(name, SubsetSpec::Leaf { element: rest[0] }) {
                        Ok(_) => last_subset = Some((*name).to_owned()),
                        Err(err) => warn!(line, %err, "skipping leaf subset declaration"),
                    }
                    continue;
                }

                if let Some(unknown) = rest.iter().find(|child| set.subset_id(child).is_err()) {
                    warn!(line, child = *unknown, "skipping partition with unknown subset");
                    continue;
                }
                if set.subset_id(name).is_err() {
                    set.add_subset(name, SubsetSpec::Internal)?;
                }
                match set.add_partition(name, rest) {
                    Ok(()) => last_subset = Some((*name).to_owned()),
                    Err(err) => warn!(line, %err, "skipping partition declaration"),
                }
            }
        }
    }

    if let Some(last) = last_subset {
        set.mark_top(&last)?;
    }
    Ok(())
}
