use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use textguard::{
    adapter_for, differ, DocumentFormat, EditSet, IssueKind, ValidationReport,
};

#[derive(Parser)]
#[command(name = "textguard")]
#[command(about = "Structure-preserving text extraction and reinjection", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract editable text into a flat modifications payload
    Extract {
        /// Document format/profile
        #[arg(short, long, value_enum)]
        format: DocumentFormat,

        /// Input document
        input: PathBuf,

        /// Write the payload here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge an edited payload back into a skeleton document
    Inject {
        /// Document format/profile
        #[arg(short, long, value_enum)]
        format: DocumentFormat,

        /// The original (clean) document
        skeleton: PathBuf,

        /// Edited payload from `extract`
        modifications: PathBuf,

        /// Write the reconstructed document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile a payload against a skeleton and report the diff
    Validate {
        /// Document format/profile
        #[arg(short, long, value_enum)]
        format: DocumentFormat,

        /// The original (clean) document
        skeleton: PathBuf,

        /// Edited payload from `extract`
        modifications: PathBuf,

        /// Emit the raw report as JSON
        #[arg(long)]
        json: bool,

        /// Show unified diffs for changed positions
        #[arg(long)]
        diff: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            format,
            input,
            output,
        } => cmd_extract(format, &input, output.as_deref()),

        Commands::Inject {
            format,
            skeleton,
            modifications,
            output,
        } => cmd_inject(format, &skeleton, &modifications, output.as_deref()),

        Commands::Validate {
            format,
            skeleton,
            modifications,
            json,
            diff,
        } => cmd_validate(format, &skeleton, &modifications, json, diff),
    }
}

fn cmd_extract(format: DocumentFormat, input: &Path, output: Option<&Path>) -> Result<()> {
    let source = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;

    let adapter = adapter_for(format);
    let items = adapter
        .extract(&source)
        .with_context(|| format!("extraction failed for {}", input.display()))?;

    let mut payload = serde_json::to_vec_pretty(&items)?;
    payload.push(b'\n');
    write_output(output, &payload)?;

    if output.is_some() {
        eprintln!(
            "{}",
            format!("Extracted {} text positions from {}", items.len(), input.display()).green()
        );
    }
    Ok(())
}

fn cmd_inject(
    format: DocumentFormat,
    skeleton: &Path,
    modifications: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let skeleton_bytes =
        fs::read(skeleton).with_context(|| format!("failed to read {}", skeleton.display()))?;
    let payload = fs::read(modifications)
        .with_context(|| format!("failed to read {}", modifications.display()))?;

    let records = differ::parse_modifications(&payload)
        .with_context(|| format!("invalid modifications payload {}", modifications.display()))?;
    let edits = EditSet::from_records(&records);

    let adapter = adapter_for(format);
    let reconstructed = adapter
        .inject(&skeleton_bytes, &edits)
        .with_context(|| format!("injection failed for {}", skeleton.display()))?;

    write_output(output, &reconstructed)?;

    if output.is_some() {
        eprintln!(
            "{}",
            format!("Applied {} edits to {}", edits.len(), skeleton.display()).green()
        );
    }
    Ok(())
}

fn cmd_validate(
    format: DocumentFormat,
    skeleton: &Path,
    modifications: &Path,
    json: bool,
    diff: bool,
) -> Result<()> {
    let skeleton_bytes =
        fs::read(skeleton).with_context(|| format!("failed to read {}", skeleton.display()))?;
    let payload = fs::read(modifications)
        .with_context(|| format!("failed to read {}", modifications.display()))?;

    let adapter = adapter_for(format);
    let report = adapter.validate(&skeleton_bytes, &payload);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_report(&report, diff);
    }

    if !report.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}

fn display_report(report: &ValidationReport, show_diff: bool) {
    let status = if report.is_valid() {
        "VALID".green().bold()
    } else {
        "ERROR".red().bold()
    };
    println!("Status: {status}");

    let stats = &report.diff_stats;
    println!("  total items:            {}", stats.total_items);
    println!("  modifications provided: {}", stats.modifications_provided);
    println!("  modified:               {}", stats.modified_items);
    println!("  unchanged:              {}", stats.unchanged_items);
    println!("  missing modifications:  {}", stats.missing_modifications);
    println!("  unknown ids:            {}", stats.unknown_ids);

    if !report.changes.is_empty() {
        println!("\n{}", "Changes:".bold());
        for change in &report.changes {
            println!("  {} {} ({})", "~".yellow(), change.id, change.context.dimmed());
            if show_diff {
                display_diff(&change.original_text, &change.new_text);
            }
        }
    }

    if !report.errors.is_empty() {
        println!("\n{}", "Errors:".bold());
        for issue in &report.errors {
            let kind = issue_label(issue.kind).red();
            match (&issue.id, &issue.message) {
                (Some(id), _) => println!("  {} {kind}: {id}", "-".red()),
                (None, Some(message)) => println!("  {} {kind}: {message}", "-".red()),
                (None, None) => println!("  {} {kind}", "-".red()),
            }
        }
    }
}

fn issue_label(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::InvalidXml => "invalid_xml",
        IssueKind::InvalidJson => "invalid_json",
        IssueKind::MissingId => "missing_id",
        IssueKind::UnknownId => "unknown_id",
        IssueKind::MissingModification => "missing_modification",
        IssueKind::Unknown => "unknown",
    }
}

/// Unified diff of one changed position.
fn display_diff(original: &str, modified: &str) {
    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("    -{}", change).red(),
            ChangeTag::Insert => format!("    +{}", change).green(),
            ChangeTag::Equal => format!("     {}", change).normal(),
        };
        print!("{}", line);
        if !change.value().ends_with('\n') {
            println!();
        }
    }
}

fn write_output(output: Option<&Path>, content: &[u8]) -> Result<()> {
    match output {
        Some(path) => atomic_write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            std::io::stdout().write_all(content)?;
            Ok(())
        }
    }
}

/// Atomic file write: tempfile in the destination directory + persist, so a
/// failed run never leaves a half-written document behind.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
