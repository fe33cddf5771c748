use super::SourceArgs;
use crate::config::Config;
use crate::schema::Snapshot;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(source: SourceArgs, output: Option<PathBuf>) -> Result<()> {
    let config = Config::resolve(source.config.as_deref())?;
    let schema = source.load(&config)?;
    let snapshot = Snapshot::from_model(&schema);

    match output {
        Some(path) => {
            snapshot.save(&path)?;
            eprintln!(
                "Snapshot of {} tables written to: {}",
                schema.len(),
                path.display()
            );
        }
        None => println!("{}", snapshot.to_json()?),
    }

    Ok(())
}
