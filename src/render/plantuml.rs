//! PlantUML renderer: `java -jar plantuml.jar <file> -o <dir> -tpng`.

use super::process::run_command;
use super::RendererPort;
use crate::error::ErdError;
use crate::graph::Engine;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PlantUmlRenderer {
    java: String,
    jar: PathBuf,
    timeout: Duration,
}

impl PlantUmlRenderer {
    pub fn new(java: impl Into<String>, jar: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
            timeout,
        }
    }
}

impl RendererPort for PlantUmlRenderer {
    fn engine(&self) -> Engine {
        Engine::PlantUml
    }

    fn render(&self, markup_path: &Path, output_dir: &Path) -> Result<PathBuf, ErdError> {
        if !self.jar.exists() {
            return Err(ErdError::renderer(
                "plantuml",
                format!("PlantUML jar not found at {}", self.jar.display()),
            ));
        }

        // PlantUML resolves -o relative to the input file
        let output_dir = output_dir.canonicalize()?;

        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(&self.jar)
            .arg(markup_path)
            .arg("-o")
            .arg(&output_dir)
            .arg("-tpng");
        run_command("plantuml", cmd, self.timeout)?;

        produced_image("plantuml", markup_path, &output_dir)
    }
}

/// `<output_dir>/<markup stem>.png`, which must exist after a successful run
pub(crate) fn produced_image(
    engine: &str,
    markup_path: &Path,
    output_dir: &Path,
) -> Result<PathBuf, ErdError> {
    let stem = markup_path
        .file_stem()
        .ok_or_else(|| ErdError::renderer(engine, "markup file has no name"))?;
    let mut name = stem.to_os_string();
    name.push(".png");
    let image = output_dir.join(name);

    if image.exists() {
        Ok(image)
    } else {
        Err(ErdError::renderer(
            engine,
            format!("renderer finished but {} was not produced", image.display()),
        ))
    }
}
