//! DBML output for dbml-renderer.
//!
//! DBML has no edge color syntax, so only the direction of each edge survives:
//! it is expressed by operand order and the `>` / `<` operator.

use crate::graph::format::EmitOptions;
use crate::graph::layout::{Direction, LayoutPlan};
use crate::schema::{Column, SchemaModel};

/// Generate DBML markup
pub fn to_dbml(schema: &SchemaModel, plan: &LayoutPlan, _options: &EmitOptions) -> String {
    let mut output = String::new();

    for table in schema.tables() {
        output.push_str(&format!("Table {} {{\n", quote_ident(&table.name)));
        for col in &table.columns {
            output.push_str(&format!(
                "  {} {}{}\n",
                quote_ident(&col.name),
                column_type(&col.col_type),
                settings(col)
            ));
        }
        output.push_str("}\n\n");
    }

    for edge in &plan.edges {
        let rel = &edge.relationship;
        let line = match edge.direction {
            Direction::LeftToRight => format!(
                "Ref: {}.{} > {}.{}\n",
                quote_ident(&rel.source_table),
                quote_ident(&rel.source_key),
                quote_ident(&rel.target_table),
                quote_ident(&rel.target_key)
            ),
            Direction::RightToLeft => format!(
                "Ref: {}.{} < {}.{}\n",
                quote_ident(&rel.target_table),
                quote_ident(&rel.target_key),
                quote_ident(&rel.source_table),
                quote_ident(&rel.source_key)
            ),
        };
        output.push_str(&line);
    }

    output
}

/// DBML types are single tokens
fn column_type(col_type: &str) -> String {
    let trimmed = col_type.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    trimmed.split_whitespace().collect::<Vec<_>>().join("_")
}

fn settings(col: &Column) -> String {
    let mut parts = Vec::new();
    if col.is_primary_key {
        parts.push("pk".to_string());
    }
    if col.is_foreign_key {
        parts.push("note: 'FK'".to_string());
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

fn quote_ident(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_') {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::layout::EdgeLayout;
    use crate::schema::{Relationship, Table};

    fn schema() -> SchemaModel {
        let mut schema = SchemaModel::new("shop");
        let mut users = Table::new("users");
        users.columns.push(Column::new("id", "integer"));
        users.columns.push(Column::new("name", "character varying"));
        users.set_primary_key(&["id"]);
        schema.add_table(users);

        let mut orders = Table::new("orders");
        orders.columns.push(Column::new("id", "integer"));
        orders.columns.push(Column::new("user_id", "integer"));
        orders.set_primary_key(&["id"]);
        schema.add_table(orders);
        schema.add_relationship(Relationship::new("orders", "user_id", "users", "id"));
        schema
    }

    fn edge(direction: Direction) -> LayoutPlan {
        LayoutPlan {
            edges: vec![EdgeLayout {
                relationship: Relationship::new("orders", "user_id", "users", "id"),
                color: "#f51505".to_string(),
                direction,
            }],
        }
    }

    #[test]
    fn test_table_block() {
        let out = to_dbml(&schema(), &LayoutPlan::default(), &EmitOptions { scale: 3 });
        assert!(out.contains("Table users {\n  id integer [pk]\n  name character_varying\n}\n"));
        assert!(out.contains("  user_id integer [note: 'FK']\n"));
    }

    #[test]
    fn test_ref_direction() {
        let ltr = to_dbml(&schema(), &edge(Direction::LeftToRight), &EmitOptions { scale: 3 });
        assert!(ltr.contains("Ref: orders.user_id > users.id\n"));

        let rtl = to_dbml(&schema(), &edge(Direction::RightToLeft), &EmitOptions { scale: 3 });
        assert!(rtl.contains("Ref: users.id < orders.user_id\n"));
    }

    #[test]
    fn test_missing_type_renders_unknown() {
        assert_eq!(column_type(""), "unknown");
        assert_eq!(column_type("timestamp without time zone"), "timestamp_without_time_zone");
    }
}
