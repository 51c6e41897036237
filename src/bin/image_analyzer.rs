// image-analyzer - print image metadata records as JSON

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use image_analyzer::{AnalyzerConfig, BackendKind, ImageAnalyzer};

#[derive(Parser)]
#[command(name = "image-analyzer", version, about = "Image metadata extraction via ImageMagick identify")]
struct Args {
    /// Image files to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path of the ImageMagick `identify` executable
    #[arg(long)]
    identify_binary: Option<PathBuf>,

    /// Backend to try, in priority order (repeatable)
    #[arg(long = "backend")]
    backends: Vec<BackendKind>,

    /// Only report the MIME type
    #[arg(long)]
    type_only: bool,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = AnalyzerConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(binary) = args.identify_binary.clone() {
        config.identify_binary = Some(binary);
    }
    if !args.backends.is_empty() {
        config.backends = args.backends.clone();
    }

    let analyzer = ImageAnalyzer::from_config(&config)
        .context("Failed to set up analyzer")?;
    debug!("Backends: {:?}", analyzer.backends());

    let mut failures = 0usize;
    for path in &args.files {
        let output = if args.type_only {
            analyzer
                .analyze_type(path)
                .map(|mime| json!({ "file": path, "mime": mime }))
        } else {
            analyzer
                .analyze(path)
                .and_then(|record| Ok(serde_json::to_value(record)?))
                .map(|record| json!({ "file": path, "record": record }))
        };

        let document = match output {
            Ok(document) => document,
            Err(e) => {
                error!("{}", e);
                failures += 1;
                json!({ "file": path, "error": e.to_string(), "kind": format!("{:?}", e.kind()) })
            }
        };

        let text = if args.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        }
        .context("Failed to serialize output")?;
        println!("{}", text);
    }

    let snapshot = analyzer.metrics().snapshot();
    info!(
        "Analyzed {} file(s): {} ok, {} failed, avg {}ms",
        args.files.len(),
        args.files.len() - failures,
        failures,
        snapshot.avg_latency_ms
    );

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
