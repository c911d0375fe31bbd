use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use data_sweeper::config::Cli;
use data_sweeper::config::Command;
use data_sweeper::config::ConvertArgs;
use data_sweeper::server;
use data_sweeper::session::process_file;
use data_sweeper::session::FileOptions;
use data_sweeper::session::Settings;
use data_sweeper::session::UploadedFile;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("data_sweeper=info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime
                .block_on(server::serve(args.server_config()))
                .with_context(|| format!("Failed to serve on {}", args.bind))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Convert(args) => convert(&args),
    }
}

/// Converts every file matched by the patterns; the exit code reports whether any failed.
fn convert(args: &ConvertArgs) -> Result<ExitCode> {
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory {}", args.output_dir.display()))?;

    let options = args.file_options();
    let settings = Settings::default();
    let mut converted = 0usize;
    let mut failed = 0usize;

    for pattern in &args.patterns {
        let paths = glob::glob(pattern).with_context(|| format!("Invalid pattern '{pattern}'"))?;
        let mut matched = false;
        for entry in paths {
            matched = true;
            let path = match entry {
                Ok(path) => path,
                Err(error) => {
                    tracing::warn!(error = %error, "unreadable path");
                    failed += 1;
                    continue;
                }
            };
            match convert_file(&path, args, &options, &settings) {
                Ok(output) => {
                    tracing::info!(file = %path.display(), output = %output.display(), "converted");
                    converted += 1;
                }
                Err(error) => {
                    tracing::error!(file = %path.display(), "{error:#}");
                    failed += 1;
                }
            }
        }
        if !matched {
            tracing::warn!(pattern = %pattern, "pattern matched no files");
            failed += 1;
        }
    }

    tracing::info!(converted, failed, "conversion finished");
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn convert_file(
    path: &Path,
    args: &ConvertArgs,
    options: &FileOptions,
    settings: &Settings,
) -> Result<PathBuf> {
    let content = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let report = process_file(&UploadedFile::new(name, content), options, settings)?;
    let artifact = report.artifact.context("No artifact produced")?;
    let output = args.output_dir.join(&artifact.file_name);
    std::fs::write(&output, &artifact.content)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output)
}
