//! PlantUML class-diagram output.

use crate::graph::format::EmitOptions;
use crate::graph::layout::LayoutPlan;
use crate::schema::{SchemaModel, Table};

/// Generate PlantUML markup: one class per table, one colored link per edge
pub fn to_plantuml(schema: &SchemaModel, plan: &LayoutPlan, options: &EmitOptions) -> String {
    let mut output = String::new();

    output.push_str("@startuml\n");
    output.push_str(&format!("scale {}\n", options.scale));
    output.push_str("!define ClassFontName \"Arial\"\n\n");
    output.push_str("left to right direction\n\n");

    for table in schema.tables() {
        output.push_str(&class_block(schema, table));
    }

    if !plan.is_empty() {
        output.push('\n');
    }

    for edge in &plan.edges {
        let (left_table, left_key) = edge.left();
        let (right_table, right_key) = edge.right();
        output.push_str(&format!(
            "{}::{} --[{},bold] {}::{}\n",
            escape_name(left_table),
            escape_name(left_key),
            edge.color,
            escape_name(right_table),
            escape_name(right_key)
        ));
    }

    output.push_str("\n@enduml\n");
    output
}

fn class_block(schema: &SchemaModel, table: &Table) -> String {
    let rows: Vec<String> = table
        .columns
        .iter()
        .map(|col| {
            if schema.is_key_column(&table.name, &col.name) {
                format!("**{}** : {}", col.name, col.col_type)
            } else {
                format!("{} : {}", col.name, col.col_type)
            }
        })
        .collect();

    let mut block = format!(
        "class {} << (T, transparent) >> {{\n",
        escape_name(&table.name)
    );
    if !rows.is_empty() {
        block.push_str(&rows.join("\n..\n"));
        block.push('\n');
    }
    block.push_str("}\n");
    block
}

/// Quote class and member names PlantUML would not accept bare
fn escape_name(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_') {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('"', "'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::layout::{Direction, EdgeLayout};
    use crate::schema::{Column, Relationship};

    fn schema() -> SchemaModel {
        let mut schema = SchemaModel::new("shop");
        let mut users = Table::new("users");
        users.columns.push(Column::new("id", "integer"));
        users.columns.push(Column::new("email", "text"));
        users.set_primary_key(&["id"]);
        schema.add_table(users);

        let mut orders = Table::new("orders");
        orders.columns.push(Column::new("id", "integer"));
        orders.columns.push(Column::new("user_id", "integer"));
        schema.add_table(orders);
        schema.add_relationship(Relationship::new("orders", "user_id", "users", "id"));
        schema
    }

    fn plan(direction: Direction) -> LayoutPlan {
        LayoutPlan {
            edges: vec![EdgeLayout {
                relationship: Relationship::new("orders", "user_id", "users", "id"),
                color: "#f51505".to_string(),
                direction,
            }],
        }
    }

    #[test]
    fn test_header_and_scale() {
        let out = to_plantuml(&schema(), &LayoutPlan::default(), &EmitOptions { scale: 2 });
        assert!(out.starts_with("@startuml\nscale 2\n"));
        assert!(out.contains("left to right direction"));
        assert!(out.trim_end().ends_with("@enduml"));
    }

    #[test]
    fn test_class_block_marks_keys() {
        let out = to_plantuml(&schema(), &plan(Direction::LeftToRight), &EmitOptions { scale: 3 });
        assert!(out.contains("class users << (T, transparent) >> {\n**id** : integer\n..\nemail : text\n}"));
        assert!(out.contains("**user_id** : integer"));
    }

    #[test]
    fn test_edge_direction() {
        let ltr = to_plantuml(&schema(), &plan(Direction::LeftToRight), &EmitOptions { scale: 3 });
        assert!(ltr.contains("orders::user_id --[#f51505,bold] users::id\n"));

        let rtl = to_plantuml(&schema(), &plan(Direction::RightToLeft), &EmitOptions { scale: 3 });
        assert!(rtl.contains("users::id --[#f51505,bold] orders::user_id\n"));
    }

    #[test]
    fn test_edge_quotes_unusual_key_names() {
        let mut schema = SchemaModel::new("odd");
        let mut a = Table::new("a");
        a.columns.push(Column::new("my col", "integer"));
        schema.add_table(a);
        schema.add_table(Table::new("b"));
        let plan = LayoutPlan {
            edges: vec![EdgeLayout {
                relationship: Relationship::new("a", "my col", "b", "id"),
                color: "#f51505".to_string(),
                direction: Direction::LeftToRight,
            }],
        };

        let out = to_plantuml(&schema, &plan, &EmitOptions { scale: 3 });
        assert!(out.contains("a::\"my col\" --[#f51505,bold] b::id\n"));
    }

    #[test]
    fn test_escape_name() {
        assert_eq!(escape_name("users"), "users");
        assert_eq!(escape_name("order items"), "\"order items\"");
    }
}
