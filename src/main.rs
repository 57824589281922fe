use anyhow::Result;
use clap::Parser;
use tracing::info;

use matchday_audience::config::Config;
use matchday_audience::pipeline::{AnalysisOptions, analyze, load_inputs};
use matchday_audience::{export, persist};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    info!(
        subject = %config.subject_team,
        today = %config.reference_date(),
        output = %config.output_dir.display(),
        "starting matchday audience run"
    );

    let inputs = load_inputs(&config)?;
    let output = analyze(&inputs, AnalysisOptions::from_config(&config));

    let snapshot = persist::write_snapshot(&config.output_dir, &output.records)?;
    info!(
        records = snapshot.records,
        digest = %snapshot.digest,
        path = %snapshot.path.display(),
        "canonical snapshot written"
    );

    let written = export::write_reports(&config.output_dir, &output, Some(&snapshot.digest))?;
    if let Some(path) = &config.workbook {
        export::write_workbook(path, &output)?;
        info!(path = %path.display(), "workbook written");
    }

    info!(
        total = output.summary.total,
        included = output.summary.included,
        excluded = output.summary.excluded_null_listeners,
        future = output.predictions.future.len(),
        status = ?output.predictions.status,
        files = written.len(),
        "run complete"
    );
    Ok(())
}
