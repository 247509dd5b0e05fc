use crate::output::{json, text};
use crate::{DiffArgs, OutputFormat};
use anyhow::{Context, Result};
use excel_checker::{
    DiffConfig, DiffReport, DiffSink, DiffSummary, JsonLinesSink, TextComparison, Workbook,
    diff_sheets_by_name, diff_workbooks, diff_workbooks_streaming, load_workbook,
    parse_column_ref,
};
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// A command line the user has to fix.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(String);

fn usage(message: impl Into<String>) -> anyhow::Error {
    UsageError(message.into()).into()
}

pub fn run(args: &DiffArgs) -> Result<ExitCode> {
    let verbosity = if args.quiet {
        Verbosity::Quiet
    } else if args.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    let config = build_config(args)?;
    debug!(?config, "resolved diff configuration");

    let old = load_workbook(args.old.as_str())
        .with_context(|| format!("Failed to load old workbook: {}", args.old))?;
    let new = load_workbook(args.new.as_str())
        .with_context(|| format!("Failed to load new workbook: {}", args.new))?;

    if let (Some(old_sheet), Some(new_sheet)) = (&args.sheet, &args.against_sheet) {
        let report = diff_sheets_by_name(&old, old_sheet, &new, new_sheet, &config)?;
        return render_report(&report, args.format, verbosity);
    }

    if args.format == OutputFormat::Jsonl {
        return run_streaming(&old, &new, &config);
    }

    let report = diff_workbooks(&old, &new, &config)?;
    render_report(&report, args.format, verbosity)
}

fn render_report(report: &DiffReport, format: OutputFormat, verbosity: Verbosity) -> Result<ExitCode> {
    print_warnings_to_stderr(report);

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Text => text::write_text_report(&mut handle, report, verbosity)?,
        OutputFormat::Json => json::write_json_report(&mut handle, report)?,
        OutputFormat::Jsonl => {
            let mut sink = JsonLinesSink::new(BufWriter::new(&mut handle));
            sink.begin()?;
            for record in &report.records {
                sink.emit(record.clone())?;
            }
            sink.write_summary(&DiffSummary {
                record_count: report.records.len(),
                sheets_compared: usize::from(report.failures.is_empty()),
                failures: report.failures.clone(),
                warnings: report.warnings.clone(),
            })?;
        }
    }

    Ok(exit_code(report.has_differences(), report.is_partial()))
}

fn run_streaming(old: &Workbook, new: &Workbook, config: &DiffConfig) -> Result<ExitCode> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = BufWriter::new(handle);
    let summary = {
        let mut sink = JsonLinesSink::new(&mut writer);
        let summary = diff_workbooks_streaming(old, new, config, &mut sink)
            .context("Streaming diff failed")?;
        sink.write_summary(&summary)?;
        summary
    };
    writer.flush()?;

    for failure in &summary.failures {
        eprintln!("Warning: sheet '{}' not compared: {}", failure.sheet, failure.message);
    }
    for warning in &summary.warnings {
        eprintln!("Warning: {}", warning);
    }

    Ok(exit_code(summary.record_count > 0, summary.is_partial()))
}

fn exit_code(has_differences: bool, partial: bool) -> ExitCode {
    if has_differences || partial {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    }
}

fn print_warnings_to_stderr(report: &DiffReport) {
    for failure in &report.failures {
        eprintln!("Warning: sheet '{}' not compared: {}", failure.sheet, failure.message);
    }
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
}

fn base_config(args: &DiffArgs) -> Result<DiffConfig> {
    if args.fast && args.precise {
        return Err(usage("Cannot use both --fast and --precise flags together"));
    }

    if let Some(path) = &args.config {
        if args.fast || args.precise {
            return Err(usage("--config cannot be combined with --fast or --precise"));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| usage(format!("Failed to read config file {path}: {e}")))?;
        return serde_json::from_str(&raw)
            .map_err(|e| usage(format!("Invalid config file {path}: {e}")));
    }

    Ok(if args.fast {
        DiffConfig::fastest()
    } else if args.precise {
        DiffConfig::most_precise()
    } else {
        DiffConfig::default()
    })
}

pub fn parse_key_columns(raw: &str) -> Result<Vec<u32>> {
    let keys = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_column_ref(part).map_err(|e| usage(format!("Invalid --keys entry: {e}"))))
        .collect::<Result<Vec<u32>>>()?;
    if keys.is_empty() {
        return Err(usage("--keys needs at least one column"));
    }
    Ok(keys)
}

/// The configuration file (or preset), then individual flags on top.
fn build_config(args: &DiffArgs) -> Result<DiffConfig> {
    let mut config = base_config(args)?;

    if let Some(raw) = &args.keys {
        config.key_columns = Some(parse_key_columns(raw)?);
    }
    if let Some(threshold) = args.similarity {
        config.similarity_threshold = threshold;
    }
    if let Some(limit) = args.max_align_cells {
        config.max_align_cells = limit;
    }
    if let Some(on_limit) = args.on_limit {
        config.on_limit_exceeded = on_limit.into();
    }
    config.skip_sheets.extend(args.skip_sheets.iter().cloned());
    config.skip_cell_patterns.extend(args.skip_cells.iter().cloned());
    if args.normalize_text {
        config.text_comparison = TextComparison::Normalized;
    }

    config.validate()?;
    Ok(config)
}
