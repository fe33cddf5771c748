mod render;
mod snapshot;
mod source;

pub use source::SourceArgs;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "erd-builder")]
#[command(version)]
#[command(about = "Render entity-relationship diagrams from a database schema", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the diagram markup and render it to a PNG image
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// Diagram engine: plantuml, dbml, dot, or all
        #[arg(short, long, default_value = "plantuml")]
        engine: String,

        /// Edge direction mode: heuristic or left-to-right
        #[arg(long)]
        direction: Option<String>,

        /// Move the rendered image to this file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory images are rendered into (default: diagram_folder)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Degree above which a table is treated as a hub
        #[arg(long)]
        hub_threshold: Option<usize>,

        /// Print the markup to stdout instead of running a renderer
        #[arg(long)]
        emit_only: bool,

        /// Keep the markup file next to the rendered image
        #[arg(long)]
        keep_markup: bool,

        /// Show a spinner while the renderer runs
        #[arg(short, long)]
        progress: bool,

        /// Print table degrees and every edge layout decision
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write the introspected schema as a JSON or YAML snapshot
    Snapshot {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file; .yaml/.yml writes YAML, anything else JSON (default: stdout JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Render {
            source,
            engine,
            direction,
            output,
            output_dir,
            hub_threshold,
            emit_only,
            keep_markup,
            progress,
            verbose,
        } => render::run(
            source,
            engine,
            direction,
            output,
            output_dir,
            hub_threshold,
            emit_only,
            keep_markup,
            progress,
            verbose,
        ),
        Commands::Snapshot { source, output } => snapshot::run(source, output),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "erd-builder",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
