//! Render command: schema -> layout plan -> markup -> image.

use super::SourceArgs;
use crate::config::Config;
use crate::graph::{
    emit, Direction, EmitOptions, EngineSelection, LayoutEngine, LayoutPlan, RelationshipGraph,
};
use crate::render::{image_name, RenderAdapter};
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Run the render command
#[allow(clippy::too_many_arguments)]
pub fn run(
    source: SourceArgs,
    engine: String,
    direction: Option<String>,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    hub_threshold: Option<usize>,
    emit_only: bool,
    keep_markup: bool,
    progress: bool,
    verbose: bool,
) -> Result<()> {
    let config = Config::resolve(source.config.as_deref())?;

    let selection: EngineSelection = engine.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let mut layout_config = config.layout.clone();
    if let Some(ref d) = direction {
        layout_config.direction = d.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(threshold) = hub_threshold {
        layout_config.hub_threshold = threshold;
    }
    let layout = LayoutEngine::new(layout_config)?;

    let schema = source.load(&config)?;
    let graph = RelationshipGraph::from_schema(&schema);

    eprintln!(
        "Schema '{}': {} tables, {} relationships",
        schema.name,
        schema.len(),
        graph.edge_count()
    );

    let plan = layout.plan(&graph)?;

    if verbose {
        print_layout(&graph, &plan, layout.config().hub_threshold);
    }

    let options = EmitOptions::for_schema(&schema);

    if emit_only {
        for engine in selection.engines() {
            println!("{}", emit(engine, &schema, &plan, &options));
        }
        return Ok(());
    }

    let mut render_config = config.render.clone();
    if let Some(dir) = output_dir {
        render_config.output_dir = dir;
    }
    let adapter = RenderAdapter::from_config(&render_config, options.scale).keep_markup(keep_markup);

    let db_name = if schema.name.is_empty() {
        "schema"
    } else {
        schema.name.as_str()
    };
    let today = chrono::Local::now().date_naive();

    let engines = selection.engines();
    let mut failed = 0;

    for engine in &engines {
        let engine = *engine;
        let markup = emit(engine, &schema, &plan, &options);
        let name = image_name(db_name, today, selection.is_all().then_some(engine));

        let start = Instant::now();
        let spinner = if progress {
            Some(spinner(format!("Rendering with {}...", engine))?)
        } else {
            None
        };

        let result = adapter.run(&markup, engine, &name, output.as_deref());

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match result {
            Ok(outcome) => {
                if let Some(err) = outcome.move_error {
                    eprintln!("{}", err);
                }
                eprintln!(
                    "Rendered {} diagram in {:.2}s: {}",
                    engine,
                    start.elapsed().as_secs_f64(),
                    outcome.image.display()
                );
                if let Some(markup) = outcome.markup {
                    eprintln!("Markup kept at: {}", markup.display());
                }
            }
            Err(e) if e.is_render_failure() => {
                eprintln!("{}", e);
                failed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if failed == engines.len() {
        bail!("no diagram could be rendered");
    }

    Ok(())
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}

/// Degree table and per-edge decisions, on stderr
fn print_layout(graph: &RelationshipGraph, plan: &LayoutPlan, hub_threshold: usize) {
    let mut degrees: Vec<(&str, usize)> = graph
        .degrees()
        .iter()
        .map(|(name, &d)| (name.as_str(), d))
        .collect();
    degrees.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let width = degrees.iter().map(|(n, _)| n.len()).max().unwrap_or(0);

    eprintln!("\nTable degrees:");
    for (name, degree) in &degrees {
        let marker = if *degree > hub_threshold { "  (hub)" } else { "" };
        eprintln!("  {:width$}  {}{}", name, degree, marker, width = width);
    }

    eprintln!("\nEdges:");
    for edge in &plan.edges {
        let arrow = match edge.direction {
            Direction::LeftToRight => "->",
            Direction::RightToLeft => "<-",
        };
        let rel = &edge.relationship;
        eprintln!(
            "  {}.{} {} {}.{}  {}  {}",
            rel.source_table,
            rel.source_key,
            arrow,
            rel.target_table,
            rel.target_key,
            edge.color,
            edge.direction
        );
    }
    eprintln!(
        "\n{} edges: {} left-to-right, {} right-to-left\n",
        plan.len(),
        plan.count(Direction::LeftToRight),
        plan.count(Direction::RightToLeft)
    );
}
