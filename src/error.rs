//! Error taxonomy for schema loading, layout and rendering.

use std::path::PathBuf;

/// Errors surfaced by the diagram pipeline.
///
/// Configuration and empty-schema errors stop the pipeline before any layout
/// work. Renderer and artifact errors are reported per engine. Precondition
/// violations are programmer errors and must be propagated, never swallowed.
#[derive(Debug, thiserror::Error)]
pub enum ErdError {
    /// Missing or invalid connection parameters, nonexistent schema, bad config
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The schema contains no tables
    #[error("no tables found in {0}")]
    EmptySchema(String),

    /// The external renderer could not be started, timed out or exited non-zero
    #[error("renderer '{engine}' failed: {reason}")]
    RendererUnavailable { engine: String, reason: String },

    /// The rendered image could not be moved to the requested destination
    #[error("could not move {} to {}: {reason}", from.display(), to.display())]
    ArtifactMove {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    /// A relationship references a table the layout engine does not know
    #[error("layout precondition violated: {0}")]
    Precondition(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ErdError {
    pub(crate) fn renderer(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        ErdError::RendererUnavailable {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error only affects a single engine's rendering
    pub fn is_render_failure(&self) -> bool {
        matches!(
            self,
            ErdError::RendererUnavailable { .. } | ErdError::ArtifactMove { .. } | ErdError::Io(_)
        )
    }
}
