use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use quietsave_core::{AutoSave, AutoSaveConfig, Scope, save_fn};

use crate::state::{Document, DocumentStore};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Write document snapshots to this file
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Quiet period in milliseconds before a changed document is saved
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    pub delay_ms: u64,

    /// Start with auto-save disabled
    #[arg(long)]
    pub disabled: bool,
}

pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub async fn run() -> Result<()> {
    init_logging();
    run_with_args(Args::parse()).await
}

async fn run_with_args(args: Args) -> Result<()> {
    let store = Arc::new(DocumentStore::new(args.out.clone()));
    let mut doc = store.load()?;

    let scope = Scope::new();
    let save = {
        let store = store.clone();
        save_fn(move |doc: Document, _token| {
            let store = store.clone();
            async move {
                store.save(&doc)?;
                Ok(())
            }
        })
    };
    let config = AutoSaveConfig::new()
        .with_delay(Duration::from_millis(args.delay_ms))
        .with_enabled(!args.disabled);
    let autosave = AutoSave::spawn(scope.clone(), config, save);

    // Seed the comparison baseline with the document as it exists on disk;
    // only subsequent edits are persisted.
    autosave.observe(doc.clone());
    autosave.flush().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        doc.lines.push(line);
        autosave.observe(doc.clone());
    }

    // EOF: push any still-buffered edit through before tearing down.
    autosave.flush().await;
    scope.dispose();

    println!("{} line(s) in {}", doc.lines.len(), args.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("quietsave").chain(args.iter().cloned()))
    }

    #[test]
    fn parses_output_path() {
        let args = parse(&["--out", "/tmp/doc.json"]);
        assert_eq!(args.out, PathBuf::from("/tmp/doc.json"));
    }

    #[test]
    fn default_delay_is_two_seconds() {
        let args = parse(&["--out", "doc.json"]);
        assert_eq!(args.delay_ms, 2000);
        assert!(!args.disabled);
    }

    #[test]
    fn parses_delay_and_disabled() {
        let args = parse(&["--out", "doc.json", "--delay-ms", "250", "--disabled"]);
        assert_eq!(args.delay_ms, 250);
        assert!(args.disabled);
    }
}
