//! Dependency graph construction and plan validation.
//!
//! This module provides:
//! - The stateless [`DependencyGraphBuilder`] (topological order, critical
//!   path, parallel groups)
//! - Ingestion-time validation and normalization of plans

mod builder;
mod validation;

pub use builder::{
    build_dependency_graph, DependencyGraph, DependencyGraphBuilder, GraphEdge, GraphNode,
};
pub use validation::{validate_plan, validate_plan_id};
