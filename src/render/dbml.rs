//! DBML renderer.
//!
//! `dbml-renderer` only produces SVG, so the SVG is rasterized in-process to
//! a PNG on a white background at the diagram's scale hint.

use super::process::run_command;
use super::RendererPort;
use crate::error::ErdError;
use crate::graph::Engine;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DbmlRenderer {
    program: String,
    scale: f32,
    timeout: Duration,
}

impl DbmlRenderer {
    pub fn new(program: impl Into<String>, scale: f32, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            scale,
            timeout,
        }
    }
}

impl RendererPort for DbmlRenderer {
    fn engine(&self) -> Engine {
        Engine::Dbml
    }

    fn render(&self, markup_path: &Path, output_dir: &Path) -> Result<PathBuf, ErdError> {
        let stem = markup_path
            .file_stem()
            .ok_or_else(|| ErdError::renderer("dbml", "markup file has no name"))?;
        let mut svg_name = stem.to_os_string();
        svg_name.push(".svg");
        let mut png_name = stem.to_os_string();
        png_name.push(".png");
        let svg_path = output_dir.join(svg_name);
        let png_path = output_dir.join(png_name);

        let mut cmd = Command::new(&self.program);
        cmd.arg("-i").arg(markup_path).arg("-o").arg(&svg_path);
        run_command("dbml", cmd, self.timeout)?;

        let svg = fs::read_to_string(&svg_path).map_err(|e| {
            ErdError::renderer(
                "dbml",
                format!("renderer finished but {} is unreadable: {}", svg_path.display(), e),
            )
        });
        let result = svg.and_then(|svg| rasterize_svg(&svg, self.scale, &png_path));
        let _ = fs::remove_file(&svg_path);
        result?;

        Ok(png_path)
    }
}

/// Rasterize an SVG document to a PNG file on a white background
pub fn rasterize_svg(svg: &str, scale: f32, output: &Path) -> Result<(), ErdError> {
    if scale.is_nan() || scale <= 0.0 {
        return Err(ErdError::renderer("dbml", "scale must be greater than zero"));
    }

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| ErdError::renderer("dbml", format!("failed to parse SVG: {}", e)))?;

    let size = tree.size().to_int_size();
    let width = ((size.width() as f32) * scale).ceil() as u32;
    let height = ((size.height() as f32) * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width.max(1), height.max(1)).ok_or_else(|| {
        ErdError::renderer(
            "dbml",
            format!("failed to allocate {}x{} surface", width, height),
        )
    })?;
    pixmap.fill(Color::WHITE);

    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .save_png(output)
        .map_err(|e| ErdError::renderer("dbml", format!("failed to write PNG: {}", e)))
}
