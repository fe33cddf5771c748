use super::SchemaModel;
use crate::error::ErdError;

/// One-shot source of a schema.
///
/// A provider is invoked once per run and hands back an immutable
/// `SchemaModel`; the layout core never talks to the database itself.
pub trait SchemaProvider {
    /// Human-readable description of the source, used in messages
    fn describe(&self) -> String;

    /// Produce the schema
    fn load(&self) -> Result<SchemaModel, ErdError>;

    /// Produce the schema, failing with `EmptySchema` when it has no tables
    fn load_non_empty(&self) -> Result<SchemaModel, ErdError> {
        let schema = self.load()?;
        if schema.is_empty() {
            return Err(ErdError::EmptySchema(self.describe()));
        }
        Ok(schema)
    }
}
