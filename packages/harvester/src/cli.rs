//! Command-line interface for the harvester.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{validate_date, HarvestConfig};
use crate::error::{HarvesterError, Result};
use crate::harvest::{
    FileStateStore, HarvestController, JsonLinesSink, MemoryStateStore, StateStore,
};
use crate::http::HttpTransport;
use crate::normalize::{DriverParams, LidoNormalizer};
use crate::types::{FieldMap, HarvestWindow};

/// Heritage Harvester - Harvest and normalize museum metadata over OAI-PMH.
#[derive(Parser)]
#[command(name = "heritage-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest a source and write normalized records as JSON lines.
    Harvest {
        /// Sources file (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Source id from the sources file
        #[arg(short, long)]
        source: String,

        /// Start of the window (default: last harvest date)
        #[arg(long)]
        from: Option<String>,

        /// End of the window (default: now)
        #[arg(long)]
        until: Option<String>,

        /// JSON file keeping the last harvest date between runs
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize a single LIDO record file and print the field map.
    Normalize {
        /// LIDO XML file
        file: PathBuf,

        /// Sources file providing driver parameters
        #[arg(short, long, requires = "source")]
        config: Option<PathBuf>,

        /// Source id used for record ids and driver parameters
        #[arg(short, long)]
        source: Option<String>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest {
            config,
            source,
            from,
            until,
            state,
            output,
        } => harvest_command(&HarvestArgs {
            config: &config,
            source: &source,
            from: from.as_deref(),
            until: until.as_deref(),
            state: state.as_deref(),
            output: output.as_deref(),
        }),
        Commands::Normalize {
            file,
            config,
            source,
        } => normalize_command(&file, config.as_deref(), source.as_deref()),
    }
}

struct HarvestArgs<'a> {
    config: &'a Path,
    source: &'a str,
    from: Option<&'a str>,
    until: Option<&'a str>,
    state: Option<&'a Path>,
    output: Option<&'a Path>,
}

/// Execute the harvest command.
fn harvest_command(args: &HarvestArgs<'_>) -> Result<()> {
    // Validate inputs before making HTTP requests
    for date in [args.from, args.until].into_iter().flatten() {
        validate_date(date)?;
    }
    let config = HarvestConfig::load(args.config)?;
    let source = config.source(args.source)?.clone();

    let state: Arc<dyn StateStore + Send + Sync> = match args.state {
        Some(path) => Arc::new(FileStateStore::new(path)),
        None => Arc::new(MemoryStateStore::new()),
    };
    let writer: Box<dyn Write> = match args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut window = HarvestWindow::new();
    if let Some(from) = args.from {
        window = window.with_from(from);
    }
    if let Some(until) = args.until {
        window = window.with_until(until);
    }

    eprintln!(
        "{} {} from {}",
        style("Harvesting").bold(),
        style(&source.id).cyan(),
        style(&source.url).green()
    );

    let normalizer = LidoNormalizer::lido(source.driver_params.clone());
    let mut sink = JsonLinesSink::new(writer, source.id.clone(), normalizer);
    let transport = HttpTransport::new(config.harvesting.http_timeout())?;
    let controller = HarvestController::new(source, config.harvesting.clone(), transport, state)?;

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Fetching records...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let summary = match controller.harvest(&window, &mut sink) {
        Ok(summary) => summary,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();
    sink.finish()?;

    eprintln!("  Updated: {}", style(summary.changed).green());
    eprintln!("  Unchanged: {}", summary.unchanged);
    eprintln!("  Deleted: {}", summary.deleted);
    if summary.rejected > 0 {
        eprintln!("  Rejected: {}", style(summary.rejected).yellow().bold());
    }
    if let Some(last) = &summary.last_harvested {
        eprintln!("{} {}", style("Last harvested:").green().bold(), last);
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct NormalizedOutput<'a> {
    fields: &'a FieldMap,
    warnings: Vec<&'a str>,
}

/// Execute the normalize command.
fn normalize_command(file: &Path, config: Option<&Path>, source: Option<&str>) -> Result<()> {
    let source_id = source.unwrap_or("local");
    let params = match config {
        Some(path) => HarvestConfig::load(path)?
            .source(source_id)?
            .driver_params
            .clone(),
        None => DriverParams::default(),
    };

    let xml = std::fs::read_to_string(file).map_err(|e| {
        HarvesterError::Io(io::Error::new(
            e.kind(),
            format!("Cannot read {}: {e}", file.display()),
        ))
    })?;

    let normalizer = LidoNormalizer::lido(params);
    let (fields, warnings) = normalizer.normalize_xml(&xml, source_id)?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(
        &mut stdout,
        &NormalizedOutput {
            fields: &fields,
            warnings: warnings.iter().collect(),
        },
    )?;
    writeln!(stdout)?;

    for warning in warnings.iter() {
        eprintln!("{} {}", style("Warning:").yellow().bold(), warning);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_harvest() {
        let cli = Cli::parse_from([
            "heritage-harvester",
            "harvest",
            "--config",
            "sources.yaml",
            "--source",
            "museum",
            "--from",
            "2024-01-01",
        ]);

        let Commands::Harvest {
            config,
            source,
            from,
            until,
            state,
            output,
        } = cli.command
        else {
            panic!("expected harvest command");
        };
        assert_eq!(config, PathBuf::from("sources.yaml"));
        assert_eq!(source, "museum");
        assert_eq!(from, Some("2024-01-01".to_string()));
        assert!(until.is_none());
        assert!(state.is_none());
        assert!(output.is_none());
    }

    #[test]
    fn test_cli_parse_normalize() {
        let cli = Cli::parse_from(["heritage-harvester", "normalize", "record.xml"]);

        let Commands::Normalize {
            file,
            config,
            source,
        } = cli.command
        else {
            panic!("expected normalize command");
        };
        assert_eq!(file, PathBuf::from("record.xml"));
        assert!(config.is_none());
        assert!(source.is_none());
    }

    #[test]
    fn test_cli_normalize_config_requires_source() {
        let result = Cli::try_parse_from([
            "heritage-harvester",
            "normalize",
            "record.xml",
            "--config",
            "sources.yaml",
        ]);
        assert!(result.is_err());
    }
}
