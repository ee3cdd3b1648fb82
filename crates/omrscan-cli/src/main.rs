// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// omrscan — grade a photographed answer sheet from the command line.
//
// Validates the upload the same way a web front-end would, runs the grading
// pipeline and prints the result as JSON. Logs go to stderr (RUST_LOG,
// default `info`) so stdout stays machine-readable.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use omrscan_core::error::OmrError;
use omrscan_core::human_errors::{ErrorClass, humanize_error};
use omrscan_core::{DEFAULT_MIN_PIXEL_THRESHOLD, ProcessingResult, ProcessorConfig, ScanRequest};
use omrscan_service::{validate_filename, validate_image};
use tracing::{info, instrument};

#[derive(Debug, Parser)]
#[command(name = "omrscan")]
#[command(about = "Grade a photographed multiple-choice answer sheet")]
#[command(version)]
struct Cli {
    /// Path to the sheet photo (JPEG, PNG or BMP).
    image: PathBuf,

    /// Number of questions on the sheet.
    #[arg(long, short = 'q')]
    questions: u32,

    /// Number of options per question (at most 26).
    #[arg(long, short = 'o')]
    options: u32,

    /// A bubble counts as marked above this many dark pixels.
    #[arg(long, default_value_t = DEFAULT_MIN_PIXEL_THRESHOLD)]
    min_pixels: u32,

    /// Log every detection trial.
    #[arg(long)]
    debug: bool,

    /// Largest accepted image in MiB.
    #[arg(long, default_value_t = 10)]
    max_size_mb: u64,

    /// JSON file with pipeline settings; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the result JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            eprintln!("  ({err})");
            ExitCode::from(exit_code(human.class))
        }
    }
}

/// Process exit status for each error class.
fn exit_code(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::Internal => 1,
        ErrorClass::ClientInput => 2,
        ErrorClass::Unprocessable => 3,
        ErrorClass::Throttled => 4,
    }
}

/// Validate, grade and emit the result.
#[instrument(skip_all, fields(image = %cli.image.display()))]
fn run(cli: &Cli) -> Result<ProcessingResult, OmrError> {
    let filename = cli
        .image
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| OmrError::Validation(format!("not a file path: {}", cli.image.display())))?;
    validate_filename(filename)?;

    let bytes = std::fs::read(&cli.image)?;
    let kind = validate_image(&bytes, cli.max_size_mb)?;
    info!(filename, ?kind, size = bytes.len(), "Grading sheet");

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProcessorConfig::default(),
    };
    let request = ScanRequest::new(cli.questions, cli.options)
        .with_min_pixel_threshold(cli.min_pixels)
        .with_debug(cli.debug);

    let result = omrscan_vision::process_with(&config, &bytes, &request)?;

    let json = serde_json::to_string_pretty(&result)?;
    match &cli.out {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(result)
}

fn load_config(path: &Path) -> Result<ProcessorConfig, OmrError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omrscan_core::Answer;
    use omrscan_vision::SyntheticSheet;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("omrscan").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn arguments_parse_with_defaults() {
        let cli = cli(&["sheet.jpg", "--questions", "20", "-o", "5"]);
        assert_eq!(cli.image, PathBuf::from("sheet.jpg"));
        assert_eq!((cli.questions, cli.options), (20, 5));
        assert_eq!(cli.min_pixels, 500);
        assert_eq!(cli.max_size_mb, 10);
        assert!(!cli.debug);
        assert!(cli.out.is_none());
    }

    #[test]
    fn questions_are_required() {
        assert!(Cli::try_parse_from(["omrscan", "sheet.jpg", "-o", "4"]).is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.png");
        let cli = cli(&[path.to_str().unwrap(), "-q", "5", "-o", "4"]);
        match run(&cli) {
            Err(OmrError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn disallowed_extension_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.gif");
        let cli = cli(&[path.to_str().unwrap(), "-q", "5", "-o", "4"]);
        let err = run(&cli).unwrap_err();
        assert!(matches!(err, OmrError::Validation(_)));
        assert_eq!(exit_code(humanize_error(&err).class), 2);
    }

    #[test]
    fn grades_a_sheet_and_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("sheet.png");
        let out = dir.path().join("result.json");
        let config_path = dir.path().join("config.json");

        let sheet = SyntheticSheet::new(3, 4)
            .with_size(620, 620)
            .with_key(&[Some(3), None, Some(1)]);
        std::fs::write(&image, sheet.to_png().unwrap()).unwrap();
        std::fs::write(&config_path, r#"{ "min_dimension": 600 }"#).unwrap();

        let cli = cli(&[
            image.to_str().unwrap(),
            "-q",
            "3",
            "-o",
            "4",
            "--min-pixels",
            "200",
            "--config",
            config_path.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ]);
        let result = run(&cli).unwrap();
        assert_eq!(result.responses, sheet.expected_responses());

        let written: ProcessingResult =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written.responses[&1], Answer::Marked('D'));
        assert_eq!(written.responses[&2], Answer::NoResponse);
    }

    #[test]
    fn malformed_config_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(&path), Err(OmrError::Serialization(_))));
    }
}
