//! Per-class comparison of two time slices and its CSV export.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::counts::ClassCount;
use crate::error::Result;
use crate::grid::ClassCode;
use crate::registry::ClassRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub class_id: ClassCode,
    pub class_name: String,
    pub count_at_t0: u64,
    pub count_at_t1: u64,
    /// `count_at_t1 − count_at_t0`.
    pub change: i64,
}

/// One row per registry class present in either slice, legend order.
/// A class absent from one slice counts as zero there.
pub fn compare_counts(t0: &ClassCount, t1: &ClassCount, registry: &ClassRegistry) -> Vec<ComparisonRow> {
    registry
        .classes()
        .iter()
        .filter(|c| t0.classes.contains_key(&c.code) || t1.classes.contains_key(&c.code))
        .map(|c| {
            let (a, b) = (t0.get(c.code), t1.get(c.code));
            ComparisonRow {
                class_id: c.code,
                class_name: c.name.clone(),
                count_at_t0: a,
                count_at_t1: b,
                change: b as i64 - a as i64,
            }
        })
        .collect()
}

/// Write rows with the header `class_id,class_name,count_at_t0,count_at_t1,change`.
pub fn write_comparison_csv<W: Write>(rows: &[ComparisonRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    if rows.is_empty() {
        wtr.write_record(["class_id", "class_name", "count_at_t0", "count_at_t1", "change"])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::count_classes;
    use crate::grid::LabelGrid;

    #[test]
    fn outer_join_in_legend_order() {
        let r = ClassRegistry::coastal();
        let g0 = LabelGrid::from_rows(&[[3, 3, 0], [3, -1, 0]], -1).unwrap();
        let g1 = LabelGrid::from_rows(&[[2, 3, 0], [2, 5, 0]], -1).unwrap();
        let rows = compare_counts(&count_classes(&g0, &r), &count_classes(&g1, &r), &r);

        let ids: Vec<_> = rows.iter().map(|row| row.class_id).collect();
        assert_eq!(ids, vec![0, 2, 3, 5]);
        let forest = &rows[2];
        assert_eq!((forest.count_at_t0, forest.count_at_t1, forest.change), (3, 1, -2));
        let ghost = &rows[1];
        assert_eq!((ghost.count_at_t0, ghost.count_at_t1, ghost.change), (0, 2, 2));
    }

    #[test]
    fn csv_has_expected_columns() {
        let rows = vec![ComparisonRow {
            class_id: 2,
            class_name: "Ghost Forest".into(),
            count_at_t0: 10,
            count_at_t1: 25,
            change: 15,
        }];
        let mut buf = Vec::new();
        write_comparison_csv(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "class_id,class_name,count_at_t0,count_at_t1,change\n2,Ghost Forest,10,25,15\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let mut buf = Vec::new();
        write_comparison_csv(&[], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "class_id,class_name,count_at_t0,count_at_t1,change\n"
        );
    }
}
