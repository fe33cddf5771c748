//! Relationship view over a schema: per-table relationship lists and degrees.

use crate::schema::{Relationship, SchemaModel};
use ahash::AHashMap;

/// Relationships grouped by the table that declares them, plus table degrees.
///
/// Tables are visited in schema order; a relationship whose source table is
/// not part of the schema is grouped after them in first-seen order. Only
/// schema tables have a degree, so such a relationship is rejected at layout
/// time.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    /// Table name -> relationships declared by that table, in declaration order
    outgoing: Vec<(String, Vec<Relationship>)>,
    /// Table name -> number of relationships it takes part in
    degree: AHashMap<String, usize>,
}

impl RelationshipGraph {
    /// Build the graph for all relationships of a schema
    pub fn from_schema(schema: &SchemaModel) -> Self {
        Self::from_relationships(schema.table_names(), schema.relationships().iter().cloned())
    }

    /// Build the graph from a table list and raw foreign-key tuples
    pub fn from_relationships<'a>(
        tables: impl IntoIterator<Item = &'a str>,
        relationships: impl IntoIterator<Item = Relationship>,
    ) -> Self {
        let mut outgoing: Vec<(String, Vec<Relationship>)> = Vec::new();
        let mut position: AHashMap<String, usize> = AHashMap::new();
        let mut degree: AHashMap<String, usize> = AHashMap::new();

        for table in tables {
            if !position.contains_key(table) {
                position.insert(table.to_string(), outgoing.len());
                outgoing.push((table.to_string(), Vec::new()));
                degree.insert(table.to_string(), 0);
            }
        }

        for rel in relationships {
            let pos = match position.get(&rel.source_table) {
                Some(&pos) => pos,
                None => {
                    position.insert(rel.source_table.clone(), outgoing.len());
                    outgoing.push((rel.source_table.clone(), Vec::new()));
                    outgoing.len() - 1
                }
            };

            let list = &mut outgoing[pos].1;
            if list.contains(&rel) {
                continue;
            }

            // One for the declaring side, one for the referenced side
            for table in [&rel.source_table, &rel.target_table] {
                if let Some(d) = degree.get_mut(table.as_str()) {
                    *d += 1;
                }
            }
            list.push(rel);
        }

        Self { outgoing, degree }
    }

    /// Degree of a table, `None` if the table is not part of the schema
    pub fn degree(&self, table: &str) -> Option<usize> {
        self.degree.get(table).copied()
    }

    /// The full degree map
    pub fn degrees(&self) -> &AHashMap<String, usize> {
        &self.degree
    }

    /// Relationships declared by a table
    pub fn relationships_of(&self, table: &str) -> &[Relationship] {
        self.outgoing
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rels)| rels.as_slice())
            .unwrap_or(&[])
    }

    /// All relationships in table-then-list order
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.outgoing.iter().flat_map(|(_, rels)| rels.iter())
    }

    /// Tables in graph order with their declared relationships
    pub fn tables(&self) -> impl Iterator<Item = (&str, &[Relationship])> {
        self.outgoing
            .iter()
            .map(|(name, rels)| (name.as_str(), rels.as_slice()))
    }

    /// Get the number of relationships
    pub fn edge_count(&self) -> usize {
        self.outgoing.iter().map(|(_, rels)| rels.len()).sum()
    }

    /// Tables whose degree exceeds the threshold, most connected first
    pub fn hubs(&self, threshold: usize) -> Vec<(&str, usize)> {
        let mut hubs: Vec<_> = self
            .degree
            .iter()
            .filter(|(_, &d)| d > threshold)
            .map(|(name, &d)| (name.as_str(), d))
            .collect();
        hubs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        hubs
    }
}
