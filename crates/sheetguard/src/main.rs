use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use sheetguard_engine::{ScanConfig, ScanOptions};
use sheetguard_workbook::{IoError, ScanArtifacts, load_config, scan_workbook};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SHEETGUARD_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "sheetguard",
    version,
    about = "Static risk scan of spreadsheet formulas"
)]
struct Cli {
    /// Workbook to scan (.xlsx, .xlsm, .xlsb, .xls, .ods, or a SheetGuard .json workbook).
    workbook: PathBuf,

    /// Base directory; reports go to <DIR>/output/<stem>/<timestamp>/.
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    out_dir: PathBuf,

    /// How many high-impact cells to list.
    #[arg(long = "top", default_value_t = 10)]
    top: usize,

    /// Stop after the trial formula limit (`app.trial.formula_limit`).
    #[arg(long)]
    trial: bool,

    /// YAML or JSON config file; unreadable files fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<ScanArtifacts> {
    let tree = load_config(cli.config.as_deref());
    let config = ScanConfig::from_tree(&tree);
    let options = ScanOptions {
        top_n: cli.top,
        trial: cli.trial,
    };
    tracing::debug!(workbook = %cli.workbook.display(), top = cli.top, trial = cli.trial, "starting scan");
    scan_workbook(&cli.workbook, &cli.out_dir, &options, &config)
        .with_context(|| format!("scanning {}", cli.workbook.display()))
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<IoError>() {
        Some(IoError::InvalidWorkbook { .. }) => 3,
        Some(IoError::NotFound { .. }) => 4,
        _ => 1,
    }
}

fn main() -> ExitCode {
    // clap exits with status 2 on a missing workbook argument
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(artifacts) => {
            let scan = &artifacts.report.scan;
            println!("Workbook risk: {} ({})", scan.workbook_risk, scan.reason);
            if scan.trial_info.truncated {
                println!(
                    "Trial limit reached after {} formulas; results are partial.",
                    scan.trial_info.formulas_scanned
                );
            }
            if !scan.errors.is_empty() {
                println!("{} scan issue(s) recorded in the report.", scan.errors.len());
            }
            println!("JSON report: {}", artifacts.json_path.display());
            println!("HTML report: {}", artifacts.html_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "sheetguard",
            "model.xlsx",
            "-o",
            "out",
            "--top",
            "5",
            "--trial",
            "--config",
            "sg.yaml",
        ])
        .unwrap();
        assert_eq!(cli.workbook, PathBuf::from("model.xlsx"));
        assert_eq!(cli.out_dir, PathBuf::from("out"));
        assert_eq!(cli.top, 5);
        assert!(cli.trial);
        assert_eq!(cli.config, Some(PathBuf::from("sg.yaml")));

        let defaults = Cli::try_parse_from(["sheetguard", "model.xlsx"]).unwrap();
        assert_eq!(defaults.top, 10);
        assert!(!defaults.trial);
    }

    #[test]
    fn missing_workbook_is_a_usage_error() {
        let err = Cli::try_parse_from(["sheetguard"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn fatal_inputs_map_to_distinct_codes() {
        let not_found = anyhow::Error::new(IoError::NotFound {
            path: PathBuf::from("x.xlsx"),
        })
        .context("scanning x.xlsx");
        assert_eq!(exit_code_for(&not_found), 4);

        let invalid = anyhow::Error::new(IoError::InvalidWorkbook {
            path: PathBuf::from("x.txt"),
            message: "unsupported".into(),
        });
        assert_eq!(exit_code_for(&invalid), 3);

        assert_eq!(exit_code_for(&anyhow::anyhow!("disk full")), 1);
    }
}
