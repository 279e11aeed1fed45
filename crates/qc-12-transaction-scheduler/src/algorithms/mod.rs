//! Algorithms module for Transaction Scheduling
//!
//! Contains:
//! - Conflict detector
//! - Dependency graph builder
//! - Kahn's topological sort

pub mod conflict_detector;
pub mod dependency_builder;
pub mod kahns;

pub use conflict_detector::detect_conflicts;
pub use dependency_builder::build_dependency_graph;
pub use kahns::kahns_topological_sort;
