//! Evaluate a running malscan server against labeled sample directories.

use clap::Parser;
use malscan::{
    config::ScannerConfig,
    harness::{
        discover_corpus, progress_line, render_summary, write_records, AggregateMetrics, Harness,
        HttpPredictClient,
    },
    logging::StructuredLogger,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "malscan-eval", version, about = "Batch-evaluate the malscan predict endpoint")]
struct Args {
    /// Config file (defaults to MALSCAN_CONFIG_PATH or malscan.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Predict endpoint URL
    #[arg(long, env = "MALSCAN_ENDPOINT")]
    endpoint: Option<String>,
    /// Maximum submissions in flight
    #[arg(long)]
    workers: Option<usize>,
    /// Per-file timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    malware_dir: Option<PathBuf>,
    #[arg(long)]
    benign_dir: Option<PathBuf>,
    /// Write every record as ndjson to this file
    #[arg(long)]
    records: Option<PathBuf>,
    /// Write the metrics summary as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut ScannerConfig) {
        let h = &mut config.harness;
        if let Some(ref e) = self.endpoint {
            h.endpoint = e.clone();
        }
        if let Some(w) = self.workers {
            h.workers = w;
        }
        if let Some(t) = self.timeout_secs {
            h.timeout_secs = t;
        }
        if let Some(ref d) = self.malware_dir {
            h.malware_dir = d.clone();
        }
        if let Some(ref d) = self.benign_dir {
            h.benign_dir = d.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(ScannerConfig::default_path);
    let mut config = ScannerConfig::load(&config_path)?;
    config.apply_env()?;
    args.apply(&mut config);
    config.validate()?;

    StructuredLogger::init(config.log.json, &config.log.level);

    let h = &config.harness;
    let samples = discover_corpus(&h.malware_dir, &h.benign_dir);
    info!(
        endpoint = %h.endpoint,
        workers = h.workers,
        samples = samples.len(),
        "evaluation starting"
    );
    if samples.is_empty() {
        println!(
            "No samples found in {} or {}",
            h.malware_dir.display(),
            h.benign_dir.display()
        );
    }

    let timeout = Duration::from_secs(h.timeout_secs);
    let client = Arc::new(HttpPredictClient::new(h.endpoint.clone(), timeout)?);
    let harness = Harness::new(client, h.workers, timeout);

    let started = Instant::now();
    let records = harness
        .run(samples, |done, total, record| {
            println!("{}", progress_line(done, total, record))
        })
        .await;
    let elapsed = started.elapsed();

    let metrics = AggregateMetrics::from_records(&records);
    println!();
    println!("{}", render_summary(&metrics));
    println!("Elapsed: {:.1}s", elapsed.as_secs_f64());

    if let Some(ref path) = args.records {
        write_records(path, &records)?;
        info!(path = %path.display(), count = records.len(), "records written");
    }
    if let Some(ref path) = args.json {
        std::fs::write(path, serde_json::to_vec_pretty(&metrics)?)?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}
