//! Sankey-ready flow graph built from transition counts.
//!
//! Each stage (time slice) owns its own pool of nodes, one per registry
//! class in legend order: node index = `stage * n_classes + position`.
//! A two-slice graph therefore has its "to" nodes offset by the number of
//! classes, even when both slices share the same alphabet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::LINK_ALPHA;
use crate::error::{Error, Result};
use crate::grid::ClassCode;
use crate::registry::ClassRegistry;
use crate::transition::TransitionSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    /// 0 = earliest slice.
    pub stage: usize,
    pub class_id: ClassCode,
    pub class_name: String,
    /// Pixels of this class on its side of the flow.
    pub total: u64,
    /// `100 × total / side total`, unrounded.
    pub percentage: f64,
    /// Percentage rounded to one decimal, e.g. `"42.5%"`. Labels of one
    /// stage add up to exactly `100.0%`.
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLink {
    /// Index into [`FlowGraph::nodes`].
    pub source: usize,
    pub target: usize,
    pub from_class: ClassCode,
    pub to_class: ClassCode,
    pub value: u64,
    /// Source class color at [`LINK_ALPHA`].
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    /// Number of stages (time slices). Zero for an empty graph.
    pub stages: usize,
}

impl FlowGraph {
    /// No valid paired cells: renderers should show a "no data" state.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Nodes of one stage, in legend order.
    pub fn stage_nodes(&self, stage: usize) -> &[FlowNode] {
        if self.stages == 0 || stage >= self.stages {
            return &[];
        }
        let per_stage = self.nodes.len() / self.stages;
        &self.nodes[stage * per_stage..(stage + 1) * per_stage]
    }

    /// "From" side of a two-slice graph.
    pub fn from_side(&self) -> &[FlowNode] {
        self.stage_nodes(0)
    }

    /// "To" side: the last stage.
    pub fn to_side(&self) -> &[FlowNode] {
        self.stage_nodes(self.stages.saturating_sub(1))
    }

    pub fn node_labels(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.label.as_str()).collect()
    }

    pub fn node_colors(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.color.as_str()).collect()
    }

    pub fn link_sources(&self) -> Vec<usize> {
        self.links.iter().map(|l| l.source).collect()
    }

    pub fn link_targets(&self) -> Vec<usize> {
        self.links.iter().map(|l| l.target).collect()
    }

    pub fn link_values(&self) -> Vec<u64> {
        self.links.iter().map(|l| l.value).collect()
    }

    pub fn link_colors(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.color.as_str()).collect()
    }
}

/// Round shares of `totals` to tenths of a percent so that the rounded
/// values add up to exactly 100.0 (largest remainder; ties go to the
/// earlier entry). All zeros when the side is empty.
pub fn percent_tenths(totals: &[u64]) -> Vec<u64> {
    let side: u128 = totals.iter().map(|&t| t as u128).sum();
    if side == 0 {
        return vec![0; totals.len()];
    }
    let mut tenths: Vec<u64> = Vec::with_capacity(totals.len());
    let mut remainders: Vec<(u128, usize)> = Vec::with_capacity(totals.len());
    for (i, &t) in totals.iter().enumerate() {
        let scaled = 1000 * t as u128;
        tenths.push((scaled / side) as u64);
        remainders.push((scaled % side, i));
    }
    let assigned: u64 = tenths.iter().sum();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter().take((1000 - assigned) as usize) {
        tenths[i] += 1;
    }
    tenths
}

/// `"42.5%"` from 425 tenths.
pub fn percent_label(tenths: u64) -> String {
    format!("{}.{}%", tenths / 10, tenths % 10)
}

fn stage_nodes(stage: usize, totals: &BTreeMap<ClassCode, u64>, registry: &ClassRegistry) -> Vec<FlowNode> {
    let class_totals: Vec<u64> = registry
        .codes()
        .map(|code| totals.get(&code).copied().unwrap_or(0))
        .collect();
    let side_total: u64 = class_totals.iter().sum();
    let tenths = percent_tenths(&class_totals);

    registry
        .classes()
        .iter()
        .zip(class_totals.into_iter().zip(tenths))
        .map(|(info, (total, tenths))| {
            let percentage = if side_total == 0 {
                0.0
            } else {
                100.0 * total as f64 / side_total as f64
            };
            FlowNode {
                stage,
                class_id: info.code,
                class_name: info.name.clone(),
                total,
                percentage,
                label: percent_label(tenths),
                color: info.color.to_css(),
            }
        })
        .collect()
}

/// Build a two-slice flow graph.
///
/// Fails with [`Error::UnknownClass`] when an edge references a code the
/// registry cannot name or color. An empty edge set gives an empty graph.
pub fn to_flow_graph(edges: &TransitionSet, registry: &ClassRegistry) -> Result<FlowGraph> {
    to_flow_chain(std::slice::from_ref(edges), registry)
}

/// Build a flow graph over consecutive transition steps.
///
/// Stage 0 node totals are the outgoing totals of the first step; stage
/// `k ≥ 1` totals are the incoming totals of step `k − 1`.
pub fn to_flow_chain(steps: &[TransitionSet], registry: &ClassRegistry) -> Result<FlowGraph> {
    for step in steps {
        for code in step.codes() {
            registry.resolve(code)?;
        }
    }

    if steps.iter().all(TransitionSet::is_empty) {
        tracing::debug!("no paired cells, flow graph is empty");
        return Ok(FlowGraph::default());
    }

    let n_classes = registry.len();
    let stages = steps.len() + 1;
    let mut nodes = Vec::with_capacity(stages * n_classes);
    nodes.extend(stage_nodes(0, &steps[0].from_totals(), registry));
    for (k, step) in steps.iter().enumerate() {
        nodes.extend(stage_nodes(k + 1, &step.to_totals(), registry));
    }

    let mut links = Vec::new();
    for (k, step) in steps.iter().enumerate() {
        for e in step.edges() {
            let from = registry.resolve(e.from_class)?;
            let src_pos = registry.position(e.from_class).ok_or(Error::UnknownClass(e.from_class))?;
            let dst_pos = registry.position(e.to_class).ok_or(Error::UnknownClass(e.to_class))?;
            links.push(FlowLink {
                source: k * n_classes + src_pos,
                target: (k + 1) * n_classes + dst_pos,
                from_class: e.from_class,
                to_class: e.to_class,
                value: e.count,
                color: from.color.with_alpha(LINK_ALPHA).to_css(),
            });
        }
    }

    Ok(FlowGraph { nodes, links, stages })
}
