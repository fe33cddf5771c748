//! Graphviz renderer: `dot -Tpng <file> -o <dir>/<stem>.png`.

use super::plantuml::produced_image;
use super::process::run_command;
use super::RendererPort;
use crate::error::ErdError;
use crate::graph::Engine;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GraphvizRenderer {
    dot: String,
    timeout: Duration,
}

impl GraphvizRenderer {
    pub fn new(dot: impl Into<String>, timeout: Duration) -> Self {
        Self {
            dot: dot.into(),
            timeout,
        }
    }
}

impl RendererPort for GraphvizRenderer {
    fn engine(&self) -> Engine {
        Engine::Dot
    }

    fn render(&self, markup_path: &Path, output_dir: &Path) -> Result<PathBuf, ErdError> {
        let stem = markup_path
            .file_stem()
            .ok_or_else(|| ErdError::renderer("dot", "markup file has no name"))?;
        let mut name = stem.to_os_string();
        name.push(".png");

        let mut cmd = Command::new(&self.dot);
        cmd.arg("-Tpng")
            .arg(markup_path)
            .arg("-o")
            .arg(output_dir.join(name));
        run_command("dot", cmd, self.timeout)?;

        produced_image("dot", markup_path, output_dir)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Stand-in for `dot` that copies its input to the `-o` target
    fn fake_dot(dir: &Path) -> PathBuf {
        let script = dir.join("fake-dot");
        fs::write(&script, "#!/bin/sh\ncp \"$2\" \"$4\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[test]
    fn test_render_with_fake_dot() {
        let tmp = TempDir::new().unwrap();
        let markup = tmp.path().join("shop-x1.dot");
        fs::write(&markup, "digraph ERD {}").unwrap();

        let renderer = GraphvizRenderer::new(fake_dot(tmp.path()).to_string_lossy(), Duration::from_secs(5));
        let image = renderer.render(&markup, tmp.path()).unwrap();
        assert_eq!(image, tmp.path().join("shop-x1.png"));
    }

    #[test]
    fn test_missing_dot_binary() {
        let tmp = TempDir::new().unwrap();
        let markup = tmp.path().join("a.dot");
        fs::write(&markup, "digraph ERD {}").unwrap();

        let renderer = GraphvizRenderer::new("erd-builder-missing-dot", Duration::from_secs(5));
        let err = renderer.render(&markup, tmp.path()).unwrap_err();
        assert!(matches!(err, ErdError::RendererUnavailable { .. }));
    }
}
