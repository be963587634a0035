//! Class-to-class transition counts between two time-aligned grids.
//!
//! Cells are paired by position (both grids flattened row-major), any pair
//! touching the sentinel is masked out, and the remaining `(from, to)`
//! pairs are grouped on the pair itself. Class codes of any magnitude stay
//! distinct because the key is never packed into a single number.

use std::collections::BTreeMap;

use serde::ser::{Serialize, Serializer};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::grid::{ClassCode, LabelGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from_class: ClassCode,
    pub to_class: ClassCode,
    pub count: u64,
}

/// All transitions between two grids. Iterates in lexicographic
/// `(from, to)` order; never holds a zero count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionSet {
    counts: BTreeMap<(ClassCode, ClassCode), u64>,
}

impl TransitionSet {
    /// Build from explicit edges, merging duplicates and dropping zeros.
    pub fn from_edges<I: IntoIterator<Item = TransitionEdge>>(edges: I) -> Self {
        let mut counts = BTreeMap::new();
        for e in edges {
            if e.count > 0 {
                *counts.entry((e.from_class, e.to_class)).or_insert(0) += e.count;
            }
        }
        Self { counts }
    }

    pub fn get(&self, from: ClassCode, to: ClassCode) -> u64 {
        self.counts.get(&(from, to)).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = TransitionEdge> + '_ {
        self.counts.iter().map(|(&(from_class, to_class), &count)| TransitionEdge {
            from_class,
            to_class,
            count,
        })
    }

    /// Total number of paired (non-masked) cells.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Outgoing totals per source class.
    pub fn from_totals(&self) -> BTreeMap<ClassCode, u64> {
        let mut out = BTreeMap::new();
        for (&(from, _), &n) in &self.counts {
            *out.entry(from).or_insert(0) += n;
        }
        out
    }

    /// Incoming totals per target class.
    pub fn to_totals(&self) -> BTreeMap<ClassCode, u64> {
        let mut out = BTreeMap::new();
        for (&(_, to), &n) in &self.counts {
            *out.entry(to).or_insert(0) += n;
        }
        out
    }

    /// Every code seen on either side, ascending.
    pub fn codes(&self) -> Vec<ClassCode> {
        let mut codes: Vec<ClassCode> = self.counts.keys().flat_map(|&(f, t)| [f, t]).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

impl Serialize for TransitionSet {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(self.edges())
    }
}

impl<'de> Deserialize<'de> for TransitionSet {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let edges = Vec::<TransitionEdge>::deserialize(d)?;
        Ok(Self::from_edges(edges))
    }
}

fn ensure_same_shape(a: &LabelGrid, b: &LabelGrid) -> Result<()> {
    a.validate()?;
    b.validate()?;
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch { from: a.shape(), to: b.shape() });
    }
    Ok(())
}

/// Count `(from, to)` class pairs between two grids of identical shape.
///
/// Fails with [`Error::ShapeMismatch`] before any counting when the shapes
/// differ. Positions where either grid holds `sentinel` are skipped.
pub fn compute_transitions(
    grid_from: &LabelGrid,
    grid_to: &LabelGrid,
    sentinel: ClassCode,
) -> Result<TransitionSet> {
    ensure_same_shape(grid_from, grid_to)?;
    Ok(count_pairs(grid_from, grid_to, sentinel, None))
}

fn count_pairs(
    grid_from: &LabelGrid,
    grid_to: &LabelGrid,
    sentinel: ClassCode,
    masked: Option<&[bool]>,
) -> TransitionSet {
    let mut counts = BTreeMap::new();
    for (i, (&a, &b)) in grid_from.data.iter().zip(&grid_to.data).enumerate() {
        if a == sentinel || b == sentinel || masked.is_some_and(|m| m[i]) {
            continue;
        }
        *counts.entry((a, b)).or_insert(0u64) += 1;
    }

    let set = TransitionSet { counts };
    tracing::debug!(
        edges = set.len(),
        paired_cells = set.total(),
        cells = grid_from.len(),
        "computed transitions"
    );
    set
}

/// Transitions between each consecutive pair of `grids`.
///
/// Every shape is checked before anything is counted, so a mismatch
/// anywhere in the chain yields no output at all. A cell holding `sentinel`
/// in any grid is dropped from every step, which keeps the incoming and
/// outgoing totals of each intermediate class equal.
pub fn compute_transition_chain(grids: &[&LabelGrid], sentinel: ClassCode) -> Result<Vec<TransitionSet>> {
    if grids.len() < 2 {
        return Err(Error::InsufficientSlices(grids.len()));
    }
    for pair in grids.windows(2) {
        ensure_same_shape(pair[0], pair[1])?;
    }
    let masked: Vec<bool> = (0..grids[0].len())
        .map(|i| grids.iter().any(|g| g.data[i] == sentinel))
        .collect();
    Ok(grids
        .windows(2)
        .map(|pair| count_pairs(pair[0], pair[1], sentinel, Some(&masked)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::count_classes;
    use crate::registry::ClassRegistry;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn random_grid(rng: &mut StdRng, w: usize, h: usize) -> LabelGrid {
        let data = (0..w * h).map(|_| rng.gen_range(-1..6)).collect();
        LabelGrid::from_vec(data, w, h, -1).unwrap()
    }

    #[test]
    fn worked_example() {
        let a = LabelGrid::from_rows(&[[0, 1], [1, -1]], -1).unwrap();
        let b = LabelGrid::from_rows(&[[0, 0], [1, 1]], -1).unwrap();
        let t = compute_transitions(&a, &b, -1).unwrap();
        let edges: Vec<_> = t.edges().map(|e| (e.from_class, e.to_class, e.count)).collect();
        assert_eq!(edges, vec![(0, 0, 1), (1, 0, 1), (1, 1, 1)]);
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn shape_mismatch_fails_without_output() {
        let a = LabelGrid::new(4, 4, -1, 0);
        let b = LabelGrid::new(5, 4, -1, 0);
        match compute_transitions(&a, &b, -1) {
            Err(Error::ShapeMismatch { from, to }) => {
                assert_eq!(from, (4, 4));
                assert_eq!(to, (4, 5));
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn same_cell_count_different_shape_still_mismatch() {
        let a = LabelGrid::new(2, 6, -1, 0);
        let b = LabelGrid::new(3, 4, -1, 0);
        assert!(matches!(compute_transitions(&a, &b, -1), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn all_sentinel_source_gives_no_edges() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = LabelGrid::new(6, 5, -1, -1);
        let b = random_grid(&mut rng, 6, 5);
        let t = compute_transitions(&a, &b, -1).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.total(), 0);
    }

    #[test]
    fn two_digit_codes_stay_distinct() {
        // from*10+to would fold (12, 3) and (1, 23) onto the same key.
        let a = LabelGrid::from_rows(&[[12, 1]], -1).unwrap();
        let b = LabelGrid::from_rows(&[[3, 23]], -1).unwrap();
        let t = compute_transitions(&a, &b, -1).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(12, 3), 1);
        assert_eq!(t.get(1, 23), 1);
    }

    #[test]
    fn total_equals_unmasked_cells() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let a = random_grid(&mut rng, 17, 11);
            let b = random_grid(&mut rng, 17, 11);
            let t = compute_transitions(&a, &b, -1).unwrap();
            let unmasked = a.data.iter().zip(&b.data).filter(|&(&x, &y)| x != -1 && y != -1).count();
            assert_eq!(t.total(), unmasked as u64);
            assert!(t.edges().all(|e| e.count > 0));
        }
    }

    #[test]
    fn from_totals_match_class_counts_under_mask() {
        let mut rng = StdRng::seed_from_u64(3);
        let registry = ClassRegistry::coastal();
        let a = random_grid(&mut rng, 20, 20);
        let b = random_grid(&mut rng, 20, 20);
        let t = compute_transitions(&a, &b, -1).unwrap();

        // Restrict A to cells that B does not mask.
        let mut masked_a = a.clone();
        for (v, &vb) in masked_a.data.iter_mut().zip(&b.data) {
            if vb == -1 {
                *v = -1;
            }
        }
        let counts = count_classes(&masked_a, &registry);
        let from_totals = t.from_totals();
        for code in registry.codes() {
            assert_eq!(from_totals.get(&code).copied().unwrap_or(0), counts.get(code), "class {code}");
        }
    }

    #[test]
    fn invariant_under_shared_permutation() {
        let mut rng = StdRng::seed_from_u64(99);
        let a = random_grid(&mut rng, 13, 9);
        let b = random_grid(&mut rng, 13, 9);
        let base = compute_transitions(&a, &b, -1).unwrap();

        let mut perm: Vec<usize> = (0..a.len()).collect();
        perm.shuffle(&mut rng);
        let pa = LabelGrid::from_vec(perm.iter().map(|&i| a.data[i]).collect(), 13, 9, -1).unwrap();
        let pb = LabelGrid::from_vec(perm.iter().map(|&i| b.data[i]).collect(), 13, 9, -1).unwrap();
        assert_eq!(compute_transitions(&pa, &pb, -1).unwrap(), base);
    }

    #[test]
    fn serializes_as_ordered_edge_list() {
        let t = TransitionSet::from_edges([
            TransitionEdge { from_class: 2, to_class: 0, count: 4 },
            TransitionEdge { from_class: 0, to_class: 5, count: 1 },
            TransitionEdge { from_class: 0, to_class: 1, count: 0 },
        ]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(
            json,
            r#"[{"from_class":0,"to_class":5,"count":1},{"from_class":2,"to_class":0,"count":4}]"#
        );
        let back: TransitionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn chain_checks_every_shape_first() {
        let a = LabelGrid::new(3, 3, -1, 0);
        let b = LabelGrid::new(3, 3, -1, 1);
        let c = LabelGrid::new(4, 3, -1, 2);
        assert!(matches!(
            compute_transition_chain(&[&a, &b, &c], -1),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(compute_transition_chain(&[&a], -1), Err(Error::InsufficientSlices(1))));

        let steps = compute_transition_chain(&[&a, &b, &a], -1).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].get(0, 1), 9);
        assert_eq!(steps[1].get(1, 0), 9);
    }

    #[test]
    fn chain_masks_cells_missing_from_any_slice() {
        let a = LabelGrid::from_rows(&[[0, 0]], -1).unwrap();
        let b = LabelGrid::from_rows(&[[1, 1]], -1).unwrap();
        let c = LabelGrid::from_rows(&[[2, -1]], -1).unwrap();
        let steps = compute_transition_chain(&[&a, &b, &c], -1).unwrap();
        assert_eq!(steps[0].get(0, 1), 1);
        assert_eq!(steps[1].get(1, 2), 1);
        assert_eq!(steps[0].to_totals(), steps[1].from_totals());
    }

    #[test]
    fn to_totals_match_class_counts_under_mask() {
        let mut rng = StdRng::seed_from_u64(5);
        let registry = ClassRegistry::coastal();
        let a = random_grid(&mut rng, 20, 20);
        let b = random_grid(&mut rng, 20, 20);
        let t = compute_transitions(&a, &b, -1).unwrap();

        // Restrict B to cells that A does not mask.
        let mut masked_b = b.clone();
        for (v, &va) in masked_b.data.iter_mut().zip(&a.data) {
            if va == -1 {
                *v = -1;
            }
        }
        let counts = count_classes(&masked_b, &registry);
        let to_totals = t.to_totals();
        for code in registry.codes() {
            assert_eq!(to_totals.get(&code).copied().unwrap_or(0), counts.get(code), "class {code}");
        }
    }
}
