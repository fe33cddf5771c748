//! Rendering markup into images through external diagram engines.
//!
//! The `RendererPort` trait is the seam to the outside world: one
//! implementation per engine, each wrapping a subprocess. `RenderAdapter`
//! owns the artifact lifecycle around a port call: temporary markup file,
//! output directory, final image name, optional move to a destination and
//! cleanup.

mod dbml;
mod graphviz;
mod plantuml;
mod process;

pub use dbml::{rasterize_svg, DbmlRenderer};
pub use graphviz::GraphvizRenderer;
pub use plantuml::PlantUmlRenderer;

use crate::error::ErdError;
use crate::graph::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory rendered images are written to
pub const DEFAULT_OUTPUT_DIR: &str = "diagram_folder";

/// Default renderer timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Renderer binaries and artifact locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub java: String,
    pub plantuml_jar: PathBuf,
    pub dot: String,
    pub dbml_renderer: String,
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            plantuml_jar: PathBuf::from("./plantuml.jar"),
            dot: "dot".to_string(),
            dbml_renderer: "dbml-renderer".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Capability to turn a markup file into a PNG image
pub trait RendererPort {
    /// Engine this port renders
    fn engine(&self) -> Engine;

    /// Render `markup_path` into `output_dir`, returning the produced image path
    fn render(&self, markup_path: &Path, output_dir: &Path) -> Result<PathBuf, ErdError>;
}

/// Image file name: `<db_name>_<YYYY-MM-DD>`, suffixed with the engine when
/// several engines render the same schema
pub fn image_name(db_name: &str, date: NaiveDate, engine: Option<Engine>) -> String {
    let base = format!("{}_{}", db_name, date.format("%Y-%m-%d"));
    match engine {
        Some(engine) => format!("{}_{}", base, engine),
        None => base,
    }
}

/// What a successful render left behind
#[derive(Debug)]
pub struct RenderOutcome {
    /// Where the image ended up
    pub image: PathBuf,
    /// Markup kept next to the image, with `keep_markup`
    pub markup: Option<PathBuf>,
    /// Set when the image could not be moved to the destination; it then
    /// stays in the output directory
    pub move_error: Option<ErdError>,
}

/// Drives one render: temporary artifact, port call, relocation, cleanup
pub struct RenderAdapter {
    ports: Vec<Box<dyn RendererPort>>,
    output_dir: PathBuf,
    work_dir: PathBuf,
    keep_markup: bool,
}

impl RenderAdapter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            ports: Vec::new(),
            output_dir: output_dir.into(),
            work_dir: PathBuf::from("."),
            keep_markup: false,
        }
    }

    /// Adapter with the subprocess ports for every engine
    pub fn from_config(config: &RenderConfig, scale: u32) -> Self {
        Self::new(&config.output_dir)
            .with_port(Box::new(PlantUmlRenderer::new(
                &config.java,
                &config.plantuml_jar,
                config.timeout(),
            )))
            .with_port(Box::new(DbmlRenderer::new(
                &config.dbml_renderer,
                scale as f32,
                config.timeout(),
            )))
            .with_port(Box::new(GraphvizRenderer::new(&config.dot, config.timeout())))
    }

    /// Register a port, replacing any port for the same engine
    pub fn with_port(mut self, port: Box<dyn RendererPort>) -> Self {
        self.ports.retain(|p| p.engine() != port.engine());
        self.ports.push(port);
        self
    }

    /// Directory temporary markup files are created in
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn keep_markup(mut self, keep: bool) -> Self {
        self.keep_markup = keep;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render `markup` with `engine` into `<output_dir>/<image_name>.png`,
    /// then move the image to `destination` if one is given.
    ///
    /// Renderer failures are returned as errors. A failed move is not: the
    /// image stays in the output directory and the failure is reported in
    /// the outcome.
    pub fn run(
        &self,
        markup: &str,
        engine: Engine,
        image_name: &str,
        destination: Option<&Path>,
    ) -> Result<RenderOutcome, ErdError> {
        let port = self
            .ports
            .iter()
            .find(|p| p.engine() == engine)
            .ok_or_else(|| ErdError::renderer(engine.to_string(), "no renderer configured"))?;

        fs::create_dir_all(&self.output_dir)?;

        // Removed on drop, whatever happens below
        let mut artifact = tempfile::Builder::new()
            .prefix(&format!("{}-", image_name))
            .suffix(&format!(".{}", engine.extension()))
            .tempfile_in(&self.work_dir)?;
        artifact.write_all(markup.as_bytes())?;
        artifact.flush()?;

        let produced = port
            .render(artifact.path(), &self.output_dir)
            .map_err(|e| match e {
                ErdError::RendererUnavailable { .. } => e,
                other => ErdError::renderer(engine.to_string(), other.to_string()),
            })?;

        let image = self.output_dir.join(format!("{}.png", image_name));
        if produced != image {
            fs::rename(&produced, &image).map_err(|e| {
                ErdError::renderer(
                    engine.to_string(),
                    format!("renderer output {} not usable: {}", produced.display(), e),
                )
            })?;
        }

        let markup_path = if self.keep_markup {
            let kept = self
                .output_dir
                .join(format!("{}.{}", image_name, engine.extension()));
            fs::write(&kept, markup)?;
            Some(kept)
        } else {
            None
        };

        let mut outcome = RenderOutcome {
            image,
            markup: markup_path,
            move_error: None,
        };

        if let Some(destination) = destination {
            match move_artifact(&outcome.image, destination) {
                Ok(moved) => outcome.image = moved,
                Err(e) => outcome.move_error = Some(e),
            }
        }

        Ok(outcome)
    }
}

/// Move a file to `destination`, or into it when it is a directory.
/// An existing target is never overwritten.
pub fn move_artifact(from: &Path, destination: &Path) -> Result<PathBuf, ErdError> {
    let target = if destination.is_dir() {
        match from.file_name() {
            Some(name) => destination.join(name),
            None => destination.to_path_buf(),
        }
    } else {
        destination.to_path_buf()
    };

    let move_error = |reason: String| ErdError::ArtifactMove {
        from: from.to_path_buf(),
        to: target.clone(),
        reason,
    };

    if target.exists() {
        return Err(move_error("target already exists".to_string()));
    }

    if fs::rename(from, &target).is_err() {
        // Cross-device moves need a copy
        fs::copy(from, &target).map_err(|e| move_error(e.to_string()))?;
        fs::remove_file(from).map_err(|e| move_error(e.to_string()))?;
    }

    Ok(target)
}
