//! Cell value files: `name_0 … name_{d-1} value`, one cell per line.
//!
//! Cells never mentioned keep their default value 0. Malformed lines and
//! unknown names are logged and skipped.

use mdpart::MultiSet;
use tracing::warn;

pub fn load_values(ms: &mut MultiSet, text: &str) {
    for (number, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let line = number + 1;
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != ms.dim() + 1 {
            warn!(line, "expected {} names and a value", ms.dim());
            continue;
        }
        let (names, value) = tokens.split_at(ms.dim());
        let Ok(value) = value[0].parse::<f64>() else {
            warn!(line, token = value[0], "not a numeric value");
            continue;
        };
        if let Err(err) = ms.set_multi_element(names, value) {
            warn!(line, %err, "skipping value assignment");
        }
    }
}

#[cfg(test)]
mod tests {
    use mdpart::MultiSet;

    use super::*;

    fn two_by_two() -> MultiSet {
        let mut ms = MultiSet::new("M");
        for (name, elements) in [("X", ["x1", "x2"]), ("Y", ["y1", "y2"])] {
            let dim = ms.add_set(name).unwrap();
            for element in elements {
                ms.set_mut(dim).add_element(element).unwrap();
            }
        }
        ms.build_multi_elements();
        ms
    }

    #[test]
    fn assigns_addressed_cells_and_skips_broken_lines() {
        let mut ms = two_by_two();
        load_values(
            &mut ms,
            "x1 y1 0.5\nx2 y2 2\nx9 y1 1\nx1 y2\nx2 y1 oops\n",
        );
        assert::close(ms.multi_element(&["x1", "y1"]).unwrap().value(), 0.5, 1e-12);
        assert::close(ms.multi_element(&["x2", "y2"]).unwrap().value(), 2.0, 1e-12);
        assert::close(ms.multi_element(&["x2", "y1"]).unwrap().value(), 0.0, 1e-12);
        assert::close(ms.multi_element(&["x1", "y2"]).unwrap().value(), 0.0, 1e-12);
    }
}
