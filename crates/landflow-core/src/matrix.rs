//! Cross-tabulated transition table (rows = earlier class, columns = later class).

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::grid::ClassCode;
use crate::registry::ClassRegistry;
use crate::transition::TransitionSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabel {
    pub code: ClassCode,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionMatrix {
    pub rows: Vec<AxisLabel>,
    pub columns: Vec<AxisLabel>,
    /// `cells[i][j]` = pixels moving from `rows[i]` to `columns[j]`.
    pub cells: Vec<Vec<u64>>,
}

/// Registry classes in legend order, then any other observed codes ascending,
/// labelled by their number.
fn axis(registry: &ClassRegistry, observed: impl Iterator<Item = ClassCode>) -> Vec<AxisLabel> {
    let mut labels: Vec<AxisLabel> = registry
        .classes()
        .iter()
        .map(|c| AxisLabel { code: c.code, label: c.name.clone() })
        .collect();
    let mut extra: Vec<ClassCode> = observed.filter(|c| !registry.contains(*c)).collect();
    extra.sort_unstable();
    extra.dedup();
    labels.extend(extra.into_iter().map(|code| AxisLabel { code, label: code.to_string() }));
    labels
}

impl TransitionMatrix {
    pub fn from_transitions(set: &TransitionSet, registry: &ClassRegistry) -> Self {
        let rows = axis(registry, set.edges().map(|e| e.from_class));
        let columns = axis(registry, set.edges().map(|e| e.to_class));
        let cells = rows
            .iter()
            .map(|r| columns.iter().map(|c| set.get(r.code, c.code)).collect())
            .collect();
        Self { rows, columns, cells }
    }

    pub fn get(&self, from: ClassCode, to: ClassCode) -> u64 {
        let i = self.rows.iter().position(|r| r.code == from);
        let j = self.columns.iter().position(|c| c.code == to);
        match (i, j) {
            (Some(i), Some(j)) => self.cells[i][j],
            _ => 0,
        }
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.cells.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<u64> {
        (0..self.columns.len())
            .map(|j| self.cells.iter().map(|row| row[j]).sum())
            .collect()
    }

    /// Write the table as CSV: a header of column labels, then one line per row class.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["class".to_string()];
        header.extend(self.columns.iter().map(|c| c.label.clone()));
        wtr.write_record(&header)?;
        for (row, cells) in self.rows.iter().zip(&self.cells) {
            let mut record = vec![row.label.clone()];
            record.extend(cells.iter().map(u64::to_string));
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::TransitionEdge;

    fn edge(from_class: ClassCode, to_class: ClassCode, count: u64) -> TransitionEdge {
        TransitionEdge { from_class, to_class, count }
    }

    #[test]
    fn registry_axes_then_unknown_codes() {
        let set = TransitionSet::from_edges([edge(0, 3, 5), edge(7, 0, 2), edge(1, 1, 4)]);
        let m = TransitionMatrix::from_transitions(&set, &ClassRegistry::coastal());
        let rows: Vec<_> = m.rows.iter().map(|r| r.code).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4, 5, 7]);
        assert_eq!(m.rows[6].label, "7");
        assert_eq!(m.columns.len(), 6);
        assert_eq!(m.get(0, 3), 5);
        assert_eq!(m.get(7, 0), 2);
        assert_eq!(m.get(2, 2), 0);
    }

    #[test]
    fn totals_match_transition_totals() {
        let set = TransitionSet::from_edges([edge(0, 0, 3), edge(0, 5, 2), edge(5, 0, 1)]);
        let m = TransitionMatrix::from_transitions(&set, &ClassRegistry::coastal());
        assert_eq!(m.row_totals()[0], 5);
        assert_eq!(m.row_totals()[5], 1);
        assert_eq!(m.column_totals()[0], 4);
        assert_eq!(m.row_totals().iter().sum::<u64>(), set.total());
    }

    #[test]
    fn csv_layout() {
        let set = TransitionSet::from_edges([edge(0, 1, 2)]);
        let m = TransitionMatrix::from_transitions(&set, &ClassRegistry::coastal());
        let mut buf = Vec::new();
        m.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("class,Marsh,Shrub,Ghost Forest,Forest,Cultivated Land,Water")
        );
        assert_eq!(lines.next(), Some("Marsh,0,2,0,0,0,0"));
        assert_eq!(text.lines().count(), 7);
    }
}
