use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind};
use log::debug;

use crate::{
    config::{DEFAULT_LOG_LEVEL, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TTL_SECS, Settings},
    error::CliError,
    output,
    service::DatasetService,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputArg {
    Table,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "datalens")]
#[command(about = "Summarize CSV/JSON datasets: numeric field stats and automatic grouping")]
#[command(version)]
struct CliArgs {
    #[arg(
        long = "ttl-secs",
        env = "DATALENS_TTL_SECS",
        default_value_t = DEFAULT_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    ttl_secs: u64,

    #[arg(
        long = "max-upload-bytes",
        env = "DATALENS_MAX_UPLOAD_BYTES",
        default_value_t = DEFAULT_MAX_UPLOAD_BYTES,
        global = true
    )]
    max_upload_bytes: usize,

    #[arg(
        long = "log-level",
        env = "DATALENS_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        global = true
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct InputArgs {
    #[arg(value_name = "file")]
    file: PathBuf,

    /// Overrides format detection, e.g. `text/csv` or `application/json`.
    #[arg(long = "mime")]
    mime: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Numeric stats per field and rows grouped by the detected category field.
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        #[arg(
            short = 'o',
            long = "output",
            default_value = "table",
            value_enum,
            ignore_case = true
        )]
        output: OutputArg,
    },
    /// Sum of one numeric field for each detected group.
    GroupSum {
        #[command(flatten)]
        input: InputArgs,

        #[arg(value_name = "field")]
        field: String,

        #[arg(
            short = 'o',
            long = "output",
            default_value = "table",
            value_enum,
            ignore_case = true
        )]
        output: OutputArg,
    },
    /// Re-emit the parsed rows as CSV or JSON.
    Export {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short = 'f', long = "format")]
        format: Option<String>,
    },
}

pub fn run() -> Result<(), CliError> {
    let Some(args) = parse_cli_args()? else {
        return Ok(());
    };

    let settings = settings_from_args(&args);
    settings.init_logging();

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::RuntimeInit)?;
    runtime.block_on(execute(args.command, &settings))
}

fn parse_cli_args() -> Result<Option<CliArgs>, CliError> {
    match CliArgs::try_parse() {
        Ok(args) => Ok(Some(args)),
        Err(error) => {
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                print!("{error}");
                return Ok(None);
            }
            Err(CliError::InvalidArgs(error.to_string()))
        }
    }
}

fn settings_from_args(args: &CliArgs) -> Settings {
    Settings {
        ttl: Duration::from_secs(args.ttl_secs),
        max_upload_bytes: args.max_upload_bytes,
        log_level: args.log_level.clone(),
    }
}

async fn execute(
    command: Command,
    settings: &Settings,
) -> Result<(), CliError> {
    let service = DatasetService::from_settings(settings);

    match command {
        Command::Summarize { input, output } => {
            let id = upload(&service, &input).await?;
            let report = service.status(&id).await?;
            output::print_status(&report, map_output_format(output))?;
        }
        Command::GroupSum {
            input,
            field,
            output,
        } => {
            let id = upload(&service, &input).await?;
            let sums = service.group_sums(&id, &field).await?;
            output::print_group_sums(&field, &sums, map_output_format(output))?;
        }
        Command::Export { input, format } => {
            let id = upload(&service, &input).await?;
            let payload = service.export(&id, format.as_deref()).await?;
            debug!(
                "exporting {} as {} ({})",
                input.file.display(),
                payload.filename,
                payload.content_type
            );
            println!("{}", payload.body);
        }
    }

    Ok(())
}

async fn upload(
    service: &DatasetService,
    input: &InputArgs,
) -> Result<String, CliError> {
    let bytes = std::fs::read(&input.file).map_err(|source| CliError::ReadInput {
        path: input.file.display().to_string(),
        source,
    })?;

    let receipt = service
        .upload(&file_name(&input.file), input.mime.as_deref(), &bytes)
        .await?;
    Ok(receipt.id)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn map_output_format(format: OutputArg) -> output::OutputFormat {
    match format {
        OutputArg::Table => output::OutputFormat::Table,
        OutputArg::Json => output::OutputFormat::Json,
        OutputArg::Yaml => output::OutputFormat::Yaml,
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use clap::Parser;

    use super::{CliArgs, Command, OutputArg, file_name, settings_from_args};

    #[test]
    fn parses_summarize_with_output_flag() {
        let args = CliArgs::parse_from(["datalens", "summarize", "-o", "json", "sales.csv"]);

        match args.command {
            Command::Summarize { input, output } => {
                assert_eq!(input.file, Path::new("sales.csv"));
                assert!(input.mime.is_none());
                assert!(matches!(output, OutputArg::Json));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_output_enum_case_insensitive() {
        let args = CliArgs::parse_from(["datalens", "summarize", "--output", "YAML", "data.json"]);
        assert!(matches!(
            args.command,
            Command::Summarize {
                output: OutputArg::Yaml,
                ..
            }
        ));
    }

    #[test]
    fn parses_group_sum_positionals_and_mime() {
        let args = CliArgs::parse_from([
            "datalens",
            "group-sum",
            "upload.bin",
            "sales",
            "--mime",
            "text/csv",
        ]);

        match args.command {
            Command::GroupSum { input, field, .. } => {
                assert_eq!(input.file, Path::new("upload.bin"));
                assert_eq!(input.mime.as_deref(), Some("text/csv"));
                assert_eq!(field, "sales");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_settings_flow_into_settings() {
        let args = CliArgs::parse_from([
            "datalens",
            "export",
            "--ttl-secs",
            "60",
            "--max-upload-bytes",
            "1024",
            "--log-level",
            "debug",
            "data.csv",
            "--format",
            "csv",
        ]);

        let settings = settings_from_args(&args);
        assert_eq!(settings.ttl, Duration::from_secs(60));
        assert_eq!(settings.max_upload_bytes, 1024);
        assert_eq!(settings.log_level, "debug");
        assert!(matches!(
            args.command,
            Command::Export { format: Some(ref format), .. } if format == "csv"
        ));
    }

    #[test]
    fn rejects_zero_ttl() {
        let result = CliArgs::try_parse_from(["datalens", "--ttl-secs", "0", "summarize", "a.csv"]);
        let error = result.expect_err("zero ttl must be rejected");
        assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn file_name_drops_directories() {
        assert_eq!(file_name(Path::new("/tmp/uploads/sales.csv")), "sales.csv");
    }
}
