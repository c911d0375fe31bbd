//! Command-line configuration.
//!
//! ```text
//! data-sweeper serve [--bind ADDR] [--max-upload-mb N] [--preview-rows N]
//! data-sweeper convert <PATTERN>... --to csv|xlsx [--output-dir DIR]
//!                      [--remove-duplicates] [--fill-missing] [--columns a,b]
//! ```
use crate::cleaning::CleaningRequest;
use crate::format::TargetFormat;
use crate::server::ServerConfig;
use crate::server::DEFAULT_MAX_UPLOAD_MB;
use crate::session::FileOptions;
use crate::session::Settings;
use crate::session::DEFAULT_PREVIEW_ROWS;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address of the HTTP server
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

#[derive(Parser, Debug)]
#[command(name = "data-sweeper")]
#[command(about = "Upload, clean, chart and convert CSV and Excel files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the upload page and JSON API
    Serve(ServeArgs),

    /// Convert files matching glob patterns
    Convert(ConvertArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Maximum upload size in megabytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,

    /// Rows shown in each preview
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub preview_rows: usize,
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            max_upload_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
            settings: Settings {
                preview_rows: self.preview_rows,
            },
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ConvertArgs {
    /// Input files or glob patterns (`data/*.xlsx`)
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// Output format
    #[arg(long, value_enum)]
    pub to: TargetFormat,

    /// Directory receiving the converted files
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Remove duplicate rows before converting
    #[arg(long)]
    pub remove_duplicates: bool,

    /// Fill missing numeric cells with the column mean
    #[arg(long)]
    pub fill_missing: bool,

    /// Columns to keep, in order (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,
}

impl ConvertArgs {
    /// Options applied to every converted file.
    pub fn file_options(&self) -> FileOptions {
        let cleaning = CleaningRequest {
            remove_duplicates: self.remove_duplicates,
            fill_missing_numeric: self.fill_missing,
        };
        FileOptions {
            clean: cleaning.remove_duplicates || cleaning.fill_missing_numeric,
            cleaning,
            columns: self.columns.clone(),
            visualize: false,
            convert: Some(self.to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["data-sweeper", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let config = args.server_config();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.max_upload_bytes, 200 * 1024 * 1024);
        assert_eq!(config.settings.preview_rows, 5);
    }

    #[test]
    fn convert_options() {
        let cli = Cli::try_parse_from([
            "data-sweeper", "convert", "a.csv", "data/*.xlsx",
            "--to", "excel", "--fill-missing", "--columns", "x,y",
        ]).unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.patterns, vec!["a.csv", "data/*.xlsx"]);
        let options = args.file_options();
        assert!(options.clean);
        assert!(!options.cleaning.remove_duplicates);
        assert!(options.cleaning.fill_missing_numeric);
        assert_eq!(options.columns, Some(vec!["x".to_owned(), "y".to_owned()]));
        assert_eq!(options.convert, Some(TargetFormat::Spreadsheet));
    }

    #[test]
    fn convert_needs_patterns_and_target() {
        assert!(Cli::try_parse_from(["data-sweeper", "convert", "--to", "csv"]).is_err());
        assert!(Cli::try_parse_from(["data-sweeper", "convert", "a.csv"]).is_err());
    }
}
