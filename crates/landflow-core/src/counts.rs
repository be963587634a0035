//! Per-class pixel counts for a single time slice.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::grid::{ClassCode, LabelGrid};
use crate::registry::ClassRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassTally {
    pub code: ClassCode,
    pub name: String,
    pub count: u64,
}

/// Occurrences of each registered class within one grid.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassCount {
    /// Present classes keyed by code. Sentinel and unregistered codes are absent.
    pub classes: BTreeMap<ClassCode, ClassTally>,
    /// Cells equal to the grid's sentinel.
    pub nodata_cells: u64,
    /// Cells holding a code the registry does not know.
    pub unknown_cells: u64,
}

impl ClassCount {
    pub fn get(&self, code: ClassCode) -> u64 {
        self.classes.get(&code).map_or(0, |t| t.count)
    }

    /// Sum of all counted (registered, non-sentinel) cells.
    pub fn total(&self) -> u64 {
        self.classes.values().map(|t| t.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Share of each present class in percent of [`total`](Self::total),
    /// in registry legend order. Empty when nothing was counted.
    pub fn shares(&self, registry: &ClassRegistry) -> Vec<ClassShare> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        registry
            .classes()
            .iter()
            .filter_map(|info| {
                let tally = self.classes.get(&info.code)?;
                Some(ClassShare {
                    code: info.code,
                    name: info.name.clone(),
                    color: info.color.to_hex(),
                    count: tally.count,
                    percentage: 100.0 * tally.count as f64 / total as f64,
                })
            })
            .collect()
    }
}

/// One pie-chart slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassShare {
    pub code: ClassCode,
    pub name: String,
    pub color: String,
    pub count: u64,
    pub percentage: f64,
}

/// Count registered classes in `grid`.
///
/// Codes missing from the registry are dropped (and tallied in
/// `unknown_cells`), never reported as errors.
pub fn count_classes(grid: &LabelGrid, registry: &ClassRegistry) -> ClassCount {
    let mut raw: BTreeMap<ClassCode, u64> = BTreeMap::new();
    let mut nodata_cells = 0u64;
    for &v in &grid.data {
        if grid.is_nodata(v) {
            nodata_cells += 1;
        } else {
            *raw.entry(v).or_default() += 1;
        }
    }

    let mut out = ClassCount { nodata_cells, ..ClassCount::default() };
    for (code, count) in raw {
        match registry.get(code) {
            Some(info) => {
                out.classes.insert(code, ClassTally { code, name: info.name.clone(), count });
            }
            None => out.unknown_cells += count,
        }
    }

    if out.unknown_cells > 0 {
        tracing::debug!(unknown = out.unknown_cells, "dropped cells with unregistered class codes");
    }
    out
}
