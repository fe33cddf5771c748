//! Edge color and direction heuristic.
//!
//! Every diagram build creates a fresh [`LayoutSession`] that owns two pieces
//! of mutable state:
//! - the color assignment, keyed by (table, key column) endpoint
//! - the construction stage, a per-table counter advanced each time an edge
//!   touching the table is laid out
//!
//! Colors make edges that share a key column look alike. Directions keep a
//! highly connected ("hub") table from collecting all of its edges on one
//! side: once a hub has consumed half of its degree, its remaining edges are
//! drawn right-to-left.

use crate::error::ErdError;
use crate::graph::relations::RelationshipGraph;
use crate::schema::{Endpoint, Relationship};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default edge palette, in assignment order
pub const DEFAULT_PALETTE: [&str; 12] = [
    "#f51505", "#877951", "#0057f7", "#21a105", "#eb8b05", "#d005eb", "#b80263", "#0091a1",
    "#00a173", "#7815cf", "#afb500", "#cf6967",
];

/// Degree above which a table counts as a hub
pub const DEFAULT_HUB_THRESHOLD: usize = 4;

/// Which way an edge is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Declaring table on the left, referenced table on the right
    LeftToRight,
    /// Referenced table on the left, declaring table on the right
    RightToLeft,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LeftToRight => write!(f, "left-to-right"),
            Direction::RightToLeft => write!(f, "right-to-left"),
        }
    }
}

/// How edge directions are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectionMode {
    /// Split hub edges by construction stage
    #[default]
    Heuristic,
    /// Draw every edge left-to-right
    LeftToRight,
}

impl FromStr for DirectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "heuristic" | "auto" | "default" => Ok(DirectionMode::Heuristic),
            "left-to-right" | "ltr" | "lr" => Ok(DirectionMode::LeftToRight),
            _ => Err(format!(
                "Unknown direction mode: {}. Valid options: heuristic, left-to-right",
                s
            )),
        }
    }
}

impl fmt::Display for DirectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionMode::Heuristic => write!(f, "heuristic"),
            DirectionMode::LeftToRight => write!(f, "left-to-right"),
        }
    }
}

/// Layout tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// A table whose degree exceeds this is a hub
    pub hub_threshold: usize,
    /// The other end of a hub-driven split must not exceed this degree
    /// (defaults to `hub_threshold`)
    pub secondary_threshold: Option<usize>,
    /// Edge colors in assignment order
    pub palette: Vec<String>,
    pub direction: DirectionMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            hub_threshold: DEFAULT_HUB_THRESHOLD,
            secondary_threshold: None,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            direction: DirectionMode::Heuristic,
        }
    }
}

impl LayoutConfig {
    pub fn secondary_threshold(&self) -> usize {
        self.secondary_threshold.unwrap_or(self.hub_threshold)
    }

    pub fn validate(&self) -> Result<(), ErdError> {
        if self.palette.is_empty() {
            return Err(ErdError::Configuration(
                "layout palette must contain at least one color".to_string(),
            ));
        }
        if self.palette.iter().any(|c| c.trim().is_empty()) {
            return Err(ErdError::Configuration(
                "layout palette contains an empty color".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rendering-ready description of one relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLayout {
    pub relationship: Relationship,
    pub color: String,
    pub direction: Direction,
}

impl EdgeLayout {
    /// (table, key) drawn on the left
    pub fn left(&self) -> (&str, &str) {
        let r = &self.relationship;
        match self.direction {
            Direction::LeftToRight => (r.source_table.as_str(), r.source_key.as_str()),
            Direction::RightToLeft => (r.target_table.as_str(), r.target_key.as_str()),
        }
    }

    /// (table, key) drawn on the right
    pub fn right(&self) -> (&str, &str) {
        let r = &self.relationship;
        match self.direction {
            Direction::LeftToRight => (r.target_table.as_str(), r.target_key.as_str()),
            Direction::RightToLeft => (r.source_table.as_str(), r.source_key.as_str()),
        }
    }
}

/// Ordered edge descriptors for one diagram build; one entry per logical relationship
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPlan {
    pub edges: Vec<EdgeLayout>,
}

impl LayoutPlan {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.edges.iter().filter(|e| e.direction == direction).count()
    }
}

/// Per-build layout state. Create one per diagram and drop it afterwards.
#[derive(Debug)]
pub struct LayoutSession<'a> {
    graph: &'a RelationshipGraph,
    config: &'a LayoutConfig,
    stages: AHashMap<String, usize>,
    colors: AHashMap<Endpoint, String>,
    pool: Vec<String>,
}

impl<'a> LayoutSession<'a> {
    pub fn new(graph: &'a RelationshipGraph, config: &'a LayoutConfig) -> Self {
        Self {
            graph,
            config,
            stages: AHashMap::new(),
            colors: AHashMap::new(),
            pool: config.palette.clone(),
        }
    }

    /// Assign a color to both endpoints of every relationship.
    ///
    /// Endpoints that already carry a color pass it on to the other end. When
    /// both ends are already colored nothing changes, so two colors can meet
    /// at one table. The last palette color is never removed from the pool and
    /// is reused once the others are spent.
    pub fn link_color_selection(&mut self) {
        let graph = self.graph;
        for rel in graph.relationships() {
            let from: Endpoint = (rel.source_table.clone(), rel.source_key.clone());
            let to: Endpoint = (rel.target_table.clone(), rel.target_key.clone());

            match (self.colors.get(&from).cloned(), self.colors.get(&to).cloned()) {
                (None, None) => {
                    let Some(color) = self.next_color() else {
                        continue;
                    };
                    self.colors.insert(from, color.clone());
                    self.colors.insert(to, color);
                }
                (Some(color), None) => {
                    self.colors.insert(to, color);
                }
                (None, Some(color)) => {
                    self.colors.insert(from, color);
                }
                (Some(_), Some(_)) => {}
            }
        }
    }

    fn next_color(&mut self) -> Option<String> {
        let color = self.pool.first()?.clone();
        if self.pool.len() > 1 {
            self.pool.remove(0);
        }
        Some(color)
    }

    /// Color assigned to an endpoint
    pub fn color_of(&self, table: &str, key: &str) -> Option<&str> {
        self.colors
            .get(&(table.to_string(), key.to_string()))
            .map(String::as_str)
    }

    /// Current construction stage of a table
    pub fn stage(&self, table: &str) -> Option<usize> {
        self.stages.get(table).copied()
    }

    /// Decide the direction of the edge between `table_from` and `table_to`.
    ///
    /// Advances the construction stage of both tables, so asking twice about
    /// the same relationship can give a different answer. Call once per
    /// relationship and keep the result.
    pub fn block_allocation(
        &mut self,
        table_from: &str,
        table_to: &str,
    ) -> Result<Direction, ErdError> {
        let degree_from = self.degree(table_from)?;
        let degree_to = self.degree(table_to)?;

        self.advance_stages(table_from, table_to);

        let hub = self.config.hub_threshold;
        let secondary = self.config.secondary_threshold();

        let direction = if degree_from > hub && degree_to <= secondary {
            Self::split(self.stage(table_from).unwrap_or(0), degree_from)
        } else if degree_to > hub {
            Self::split(self.stage(table_to).unwrap_or(0), degree_to)
        } else {
            Direction::LeftToRight
        };

        Ok(direction)
    }

    fn degree(&self, table: &str) -> Result<usize, ErdError> {
        self.graph.degree(table).ok_or_else(|| {
            ErdError::Precondition(format!("table '{}' is not part of the relationship graph", table))
        })
    }

    fn advance_stages(&mut self, table_from: &str, table_to: &str) {
        if table_from == table_to {
            *self.stages.entry(table_from.to_string()).or_insert(0) += 1;
            return;
        }

        match (
            self.stages.contains_key(table_from),
            self.stages.contains_key(table_to),
        ) {
            (false, false) => {
                self.stages.insert(table_from.to_string(), 1);
                self.stages.insert(table_to.to_string(), 1);
            }
            (false, true) => {
                self.stages.insert(table_from.to_string(), 1);
                *self.stages.entry(table_to.to_string()).or_insert(0) += 1;
            }
            (true, false) => {
                self.stages.insert(table_to.to_string(), 1);
                *self.stages.entry(table_from.to_string()).or_insert(0) += 1;
            }
            (true, true) => {
                *self.stages.entry(table_from.to_string()).or_insert(0) += 1;
                *self.stages.entry(table_to.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Right-to-left once the hub has advanced past half of its degree
    fn split(stage: usize, degree: usize) -> Direction {
        if stage > degree / 2 {
            Direction::RightToLeft
        } else {
            Direction::LeftToRight
        }
    }
}

/// Produces layout plans from relationship graphs
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Result<Self, ErdError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out every relationship of the graph once, in table-then-list order.
    ///
    /// A relationship whose mirror (or exact duplicate) was already laid out
    /// is skipped, so each logical edge appears exactly once in the plan.
    pub fn plan(&self, graph: &RelationshipGraph) -> Result<LayoutPlan, ErdError> {
        // Both endpoints must be schema tables, whatever the direction mode
        for rel in graph.relationships() {
            for table in [&rel.source_table, &rel.target_table] {
                if graph.degree(table).is_none() {
                    return Err(ErdError::Precondition(format!(
                        "relationship {} references table '{}' which is not in the schema",
                        rel, table
                    )));
                }
            }
        }

        let mut session = LayoutSession::new(graph, &self.config);
        session.link_color_selection();

        let mut seen = AHashSet::new();
        let mut edges = Vec::new();

        for rel in graph.relationships() {
            if !seen.insert(rel.key()) {
                continue;
            }

            let direction = match self.config.direction {
                DirectionMode::Heuristic => {
                    session.block_allocation(&rel.source_table, &rel.target_table)?
                }
                DirectionMode::LeftToRight => Direction::LeftToRight,
            };

            let color = session
                .color_of(&rel.source_table, &rel.source_key)
                .ok_or_else(|| ErdError::Precondition(format!("no color assigned to {}", rel)))?
                .to_string();

            edges.push(EdgeLayout {
                relationship: rel.clone(),
                color,
                direction,
            });
        }

        Ok(LayoutPlan { edges })
    }
}
