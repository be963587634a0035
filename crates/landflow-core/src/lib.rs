//! Landcover change aggregation.
//!
//! Turns time-aligned categorical rasters into per-class counts, class
//! transition counts, a cross-tabulated transition matrix and a
//! Sankey-ready flow graph. Everything here is a pure function of
//! in-memory grids; loading and rendering belong to the caller.

pub mod color;
pub mod compare;
pub mod counts;
pub mod error;
pub mod flow;
pub mod grid;
pub mod matrix;
pub mod registry;
pub mod transition;

pub use color::Rgba;
pub use compare::{compare_counts, write_comparison_csv, ComparisonRow};
pub use counts::{count_classes, ClassCount, ClassShare, ClassTally};
pub use error::{Error, Result};
pub use flow::{to_flow_chain, to_flow_graph, FlowGraph, FlowLink, FlowNode};
pub use grid::{ClassCode, LabelGrid};
pub use matrix::TransitionMatrix;
pub use registry::{ClassInfo, ClassRegistry};
pub use transition::{compute_transition_chain, compute_transitions, TransitionEdge, TransitionSet};
