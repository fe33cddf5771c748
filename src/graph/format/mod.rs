//! Markup emitters for the supported diagram engines.

mod dbml;
mod dot;
mod plantuml;

pub use dbml::to_dbml;
pub use dot::to_dot;
pub use plantuml::to_plantuml;

use crate::graph::layout::LayoutPlan;
use crate::schema::SchemaModel;
use std::fmt;
use std::str::FromStr;

/// Diagram engine a markup is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Engine {
    /// PlantUML class diagram
    #[default]
    PlantUml,
    /// DBML, rendered with dbml-renderer
    Dbml,
    /// Graphviz DOT
    Dot,
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plantuml" | "puml" | "uml" => Ok(Engine::PlantUml),
            "dbml" => Ok(Engine::Dbml),
            "dot" | "graphviz" => Ok(Engine::Dot),
            _ => Err(format!(
                "Unknown engine: {}. Valid options: plantuml, dbml, dot",
                s
            )),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::PlantUml => write!(f, "plantuml"),
            Engine::Dbml => write!(f, "dbml"),
            Engine::Dot => write!(f, "dot"),
        }
    }
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::PlantUml, Engine::Dbml, Engine::Dot];

    /// Get file extension of the markup for this engine
    pub fn extension(&self) -> &'static str {
        match self {
            Engine::PlantUml => "puml",
            Engine::Dbml => "dbml",
            Engine::Dot => "dot",
        }
    }
}

/// One engine, or every engine in turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSelection {
    One(Engine),
    All,
}

impl Default for EngineSelection {
    fn default() -> Self {
        EngineSelection::One(Engine::default())
    }
}

impl FromStr for EngineSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(EngineSelection::All);
        }
        s.parse::<Engine>()
            .map(EngineSelection::One)
            .map_err(|_| format!("Unknown engine: {}. Valid options: plantuml, dbml, dot, all", s))
    }
}

impl fmt::Display for EngineSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineSelection::One(engine) => write!(f, "{}", engine),
            EngineSelection::All => write!(f, "all"),
        }
    }
}

impl EngineSelection {
    pub fn engines(&self) -> Vec<Engine> {
        match self {
            EngineSelection::One(engine) => vec![*engine],
            EngineSelection::All => Engine::ALL.to_vec(),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, EngineSelection::All)
    }
}

/// Scale hint from the number of tables: small diagrams are drawn larger
pub fn scale_for(table_count: usize) -> u32 {
    match table_count {
        0..=10 => 3,
        11..=20 => 2,
        _ => 1,
    }
}

/// Emitter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub scale: u32,
}

impl EmitOptions {
    pub fn for_schema(schema: &SchemaModel) -> Self {
        Self {
            scale: scale_for(schema.len()),
        }
    }
}

/// Generate markup for the given engine
pub fn emit(engine: Engine, schema: &SchemaModel, plan: &LayoutPlan, options: &EmitOptions) -> String {
    match engine {
        Engine::PlantUml => to_plantuml(schema, plan, options),
        Engine::Dbml => to_dbml(schema, plan, options),
        Engine::Dot => to_dot(schema, plan, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_hint_bands() {
        assert_eq!(scale_for(1), 3);
        assert_eq!(scale_for(10), 3);
        assert_eq!(scale_for(11), 2);
        assert_eq!(scale_for(20), 2);
        assert_eq!(scale_for(21), 1);
    }

    #[test]
    fn test_engine_selection_parse() {
        assert_eq!("all".parse::<EngineSelection>().unwrap().engines().len(), 3);
        assert_eq!(
            "graphviz".parse::<EngineSelection>().unwrap(),
            EngineSelection::One(Engine::Dot)
        );
        assert!("svg".parse::<EngineSelection>().is_err());
    }

    #[test]
    fn test_engine_roundtrip_names() {
        for engine in Engine::ALL {
            assert_eq!(engine.to_string().parse::<Engine>().unwrap(), engine);
        }
    }
}
