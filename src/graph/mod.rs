//! ERD (Entity-Relationship Diagram) layout and markup generation.
//!
//! This module provides:
//! - The relationship graph with per-table degrees
//! - The layout heuristic choosing edge colors and directions
//! - Markup emitters for PlantUML, DBML and Graphviz DOT

pub mod format;
pub mod layout;
pub mod relations;

pub use format::{emit, scale_for, to_dbml, to_dot, to_plantuml, EmitOptions, Engine, EngineSelection};
pub use layout::{
    Direction, DirectionMode, EdgeLayout, LayoutConfig, LayoutEngine, LayoutPlan, LayoutSession,
};
pub use relations::RelationshipGraph;
