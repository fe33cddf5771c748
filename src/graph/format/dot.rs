//! Graphviz DOT format output for ERD diagrams.

use crate::graph::format::EmitOptions;
use crate::graph::layout::LayoutPlan;
use crate::schema::{SchemaModel, Table};

/// Base resolution multiplied by the scale hint
const BASE_DPI: u32 = 96;

/// Generate DOT format output with ERD-style tables showing all columns
pub fn to_dot(schema: &SchemaModel, plan: &LayoutPlan, options: &EmitOptions) -> String {
    let mut output = String::new();

    // Header
    output.push_str("digraph ERD {\n");
    output.push_str(&format!(
        "  graph [pad=\"0.5\", nodesep=\"1\", ranksep=\"1.5\", dpi={}];\n",
        BASE_DPI * options.scale
    ));
    output.push_str("  rankdir=LR;\n");
    output.push_str("  node [shape=none, margin=0];\n");
    output.push_str("  edge [arrowtail=none];\n\n");

    for table in schema.tables() {
        let label = generate_table_label(schema, table);
        output.push_str(&format!(
            "  {} [label=<{}>];\n",
            escape_dot_id(&table.name),
            label
        ));
    }

    if !plan.is_empty() {
        output.push('\n');
    }

    for edge in &plan.edges {
        let (left_table, left_key) = edge.left();
        let (right_table, right_key) = edge.right();
        output.push_str(&format!(
            "  {}:{} -> {}:{} [dir=none, color=\"{}\", penwidth=2];\n",
            escape_dot_id(left_table),
            escape_dot_id(left_key),
            escape_dot_id(right_table),
            escape_dot_id(right_key),
            edge.color
        ));
    }

    output.push_str("}\n");
    output
}

/// Generate HTML-like table label for DOT
fn generate_table_label(schema: &SchemaModel, table: &Table) -> String {
    let mut html = String::new();

    html.push_str("<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\" CELLPADDING=\"4\">");

    html.push_str(&format!(
        "<TR><TD BGCOLOR=\"lightblue\" COLSPAN=\"3\"><B>{}</B></TD></TR>",
        escape_html(&table.name)
    ));

    for col in &table.columns {
        let key_marker = if col.is_primary_key {
            "PK"
        } else if col.is_foreign_key {
            "FK"
        } else {
            ""
        };

        let name = if col.is_primary_key {
            format!("<B>{}</B>", escape_html(&col.name))
        } else if schema.is_key_column(&table.name, &col.name) {
            format!("<I>{}</I>", escape_html(&col.name))
        } else {
            escape_html(&col.name)
        };

        html.push_str("<TR>");
        html.push_str(&format!(
            "<TD ALIGN=\"LEFT\" PORT=\"{}\">{}</TD>",
            escape_html(&col.name),
            name
        ));
        html.push_str(&format!(
            "<TD ALIGN=\"LEFT\"><FONT COLOR=\"#666666\">{}</FONT></TD>",
            escape_html(&col.col_type)
        ));
        html.push_str(&format!("<TD ALIGN=\"CENTER\">{}</TD>", key_marker));
        html.push_str("</TR>");
    }

    html.push_str("</TABLE>");
    html
}

/// Escape a string for use in DOT HTML labels
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape a string for use as a DOT node ID
fn escape_dot_id(s: &str) -> String {
    let starts_with_digit = s.chars().next().is_some_and(|c| c.is_ascii_digit());
    if !s.is_empty() && !starts_with_digit && s.chars().all(|c| c.is_alphanumeric() || c == '_') {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
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
        users.columns.push(Column::new("email", "varchar(255)"));
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

    fn plan(direction: Direction) -> LayoutPlan {
        LayoutPlan {
            edges: vec![EdgeLayout {
                relationship: Relationship::new("orders", "user_id", "users", "id"),
                color: "#0057f7".to_string(),
                direction,
            }],
        }
    }

    #[test]
    fn test_dot_header() {
        let dot = to_dot(&schema(), &plan(Direction::LeftToRight), &EmitOptions { scale: 2 });
        assert!(dot.starts_with("digraph ERD {"));
        assert!(dot.contains("rankdir=LR"));
        assert!(dot.contains("dpi=192"));
    }

    #[test]
    fn test_dot_tables() {
        let dot = to_dot(&schema(), &plan(Direction::LeftToRight), &EmitOptions { scale: 3 });
        assert!(dot.contains("users [label=<"));
        assert!(dot.contains("orders [label=<"));
        assert!(dot.contains("PORT=\"id\"><B>id</B>"));
        assert!(dot.contains("PORT=\"user_id\">user_id"));
    }

    #[test]
    fn test_dot_edge_direction() {
        let dot = to_dot(&schema(), &plan(Direction::LeftToRight), &EmitOptions { scale: 3 });
        assert!(dot.contains("orders:user_id -> users:id [dir=none, color=\"#0057f7\""));

        let dot = to_dot(&schema(), &plan(Direction::RightToLeft), &EmitOptions { scale: 3 });
        assert!(dot.contains("users:id -> orders:user_id [dir=none, color=\"#0057f7\""));
    }

    #[test]
    fn test_digit_leading_table_is_quoted() {
        let mut schema = SchemaModel::new("reports");
        let mut sales = Table::new("2024_sales");
        sales.columns.push(Column::new("region_id", "integer"));
        schema.add_table(sales);
        schema.add_table(Table::new("regions"));
        let plan = LayoutPlan {
            edges: vec![EdgeLayout {
                relationship: Relationship::new("2024_sales", "region_id", "regions", "id"),
                color: "#f51505".to_string(),
                direction: Direction::LeftToRight,
            }],
        };

        let out = to_dot(&schema, &plan, &EmitOptions { scale: 1 });
        assert!(out.contains("  \"2024_sales\" [label=<"));
        assert!(out.contains("  \"2024_sales\":region_id -> regions:id [dir=none"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<test>"), "&lt;test&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
    }

    #[test]
    fn test_escape_dot_id() {
        assert_eq!(escape_dot_id("users"), "users");
        assert_eq!(escape_dot_id("user-table"), "\"user-table\"");
        assert_eq!(escape_dot_id("has\"quote"), "\"has\\\"quote\"");
        assert_eq!(escape_dot_id("2024_sales"), "\"2024_sales\"");
        assert_eq!(escape_dot_id("sales_2024"), "sales_2024");
    }
}
