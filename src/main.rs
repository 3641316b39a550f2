//! # mailsift CLI
//!
//! Command-line interface for the mailsift library. Machine-readable output
//! goes to stdout; progress lines and logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use mailsift::analysis::{EntityExtractor, MessageAnalyzer, PatternAccumulator};
use mailsift::cli::{Args, Command};
use mailsift::format::{OutputFormat, write_table};
use mailsift::ingest::{
    BatchEntry, Catalogue, IngestOutcome, IngestionPipeline, Template, find_csv_files,
};
use mailsift::output::{to_json, to_jsonl, write_json};
use mailsift::{MailsiftError, MessageContent, Result};

fn main() {
    let args = <Args as ClapParser>::parse();
    init_tracing(args.log_level());

    if let Err(e) = run(args) {
        eprintln!("❌ Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Analyze {
            files,
            output,
            jsonl,
        } => analyze(&files, output.as_deref(), jsonl),
        Command::Patterns { dir } => patterns(&dir),
        Command::Entities {
            text,
            show_patterns,
        } => entities(&text, show_patterns),
        Command::Ingest {
            input,
            config,
            template,
            output,
            format,
            report,
        } => ingest(&input, &config, template.as_deref(), output, format, report.as_deref()),
        Command::Batch {
            inputs,
            config,
            format,
            report,
        } => batch(&inputs, &config, format, report.as_deref()),
        Command::Route { paths, config } => route(&paths, &config),
        Command::Templates { config } => templates(&config),
    }
}

// =========================================================================
// Message commands
// =========================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageFile {
    Many(Vec<MessageContent>),
    One(Box<MessageContent>),
}

fn read_messages(path: &Path) -> Result<Vec<MessageContent>> {
    let text = fs::read_to_string(path)?;
    Ok(match serde_json::from_str(&text)? {
        MessageFile::Many(list) => list,
        MessageFile::One(message) => vec![*message],
    })
}

fn analyze(files: &[PathBuf], output: Option<&Path>, jsonl: bool) -> Result<()> {
    let start = Instant::now();
    let analyzer = MessageAnalyzer::new();
    let mut analyses = Vec::new();
    let mut failed = 0usize;

    eprintln!("📬 mailsift v{}", env!("CARGO_PKG_VERSION"));
    for file in files {
        let messages = match read_messages(file) {
            Ok(messages) => messages,
            Err(e) => {
                eprintln!("⚠️  {}: {e}", file.display());
                failed += 1;
                continue;
            }
        };
        for (i, message) in messages.iter().enumerate() {
            match analyzer.analyze(message) {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => {
                    eprintln!("⚠️  {} [{i}]: {e}", file.display());
                    failed += 1;
                }
            }
        }
    }

    let rendered = if jsonl {
        to_jsonl(&analyses)?
    } else {
        to_json(&analyses)? + "\n"
    };
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            eprintln!("💾 Output saved to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    eprintln!(
        "✅ Analyzed {} messages ({} failed) in {:.2}s",
        analyses.len(),
        failed,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn patterns(dir: &Path) -> Result<()> {
    let analyzer = MessageAnalyzer::new();
    let mut acc = PatternAccumulator::new();

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
        .collect();
    files.sort();

    for file in &files {
        let messages = match read_messages(file) {
            Ok(messages) => messages,
            Err(e) => {
                eprintln!("⚠️  {}: {e}", file.display());
                continue;
            }
        };
        for message in &messages {
            match analyzer.analyze(message) {
                Ok(analysis) => acc.add(&analysis, message.sender()),
                Err(e) => eprintln!("⚠️  {}: {e}", file.display()),
            }
        }
    }

    eprintln!("📊 {} messages from {} files", acc.len(), files.len());
    println!("{}", to_json(&acc.finish())?);
    Ok(())
}

fn entities(text: &str, show_patterns: bool) -> Result<()> {
    let extractor = EntityExtractor::new();
    println!("{}", to_json(&extractor.extract(text))?);

    if show_patterns {
        eprintln!("🔎 Patterns:");
        for (kind, source) in extractor.patterns().sources() {
            eprintln!("   {kind:<7} {source}");
        }
    }
    Ok(())
}

// =========================================================================
// Tabular commands
// =========================================================================

fn ingest(
    input: &Path,
    config: &Path,
    template: Option<&str>,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    report_path: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let pipeline = IngestionPipeline::new(Catalogue::from_dir(config)?.into());

    println!("📬 mailsift v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:    {}", input.display());

    let outcome = match template {
        Some(id) => pipeline.ingest_file_as(input, id)?,
        None => pipeline.ingest_file(input)?,
    };
    let chosen = pipeline.catalogue().template(outcome.report.template_id())?;
    println!("📋 Template: {} ({})", chosen.name(), chosen.id());

    let format = match (&format, &output) {
        (Some(f), _) => *f,
        (None, Some(path)) => OutputFormat::from_path(&path.to_string_lossy()).unwrap_or_default(),
        (None, None) => OutputFormat::default(),
    };
    let output_path = output.unwrap_or_else(|| default_output_path(input, &outcome, chosen, format));

    println!("💾 Output:   {}", output_path.display());
    println!("📄 Format:   {format}");
    save_table(&outcome, &output_path, format)?;

    if let Some(path) = report_path {
        write_json(&outcome.report, &path.to_string_lossy())?;
        println!("📝 Report:   {}", path.display());
    }

    println!();
    print!("{}", outcome.report);
    println!();
    println!(
        "✅ Done! {} rows mapped in {:.2}s",
        outcome.table.row_count(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// `<output folder>/<stem><suffix>.<ext>`, the folder coming from the route
/// or `output/<template>` when the template was chosen explicitly.
fn default_output_path(
    input: &Path,
    outcome: &IngestOutcome,
    template: &Template,
    format: OutputFormat,
) -> PathBuf {
    let folder = outcome
        .matched
        .as_ref()
        .map_or_else(|| format!("output/{}", template.id()), |m| m.output_folder.clone());
    let stem = input.file_stem().map_or_else(|| "output".into(), |s| s.to_string_lossy());
    PathBuf::from(folder).join(format!("{stem}{}.{}", template.output_suffix(), format.extension()))
}

fn save_table(outcome: &IngestOutcome, path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_table(&outcome.table, &path.to_string_lossy(), format)
}

fn batch(
    inputs: &[PathBuf],
    config: &Path,
    format: Option<OutputFormat>,
    report_path: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let pipeline = IngestionPipeline::new(Catalogue::from_dir(config)?.into());
    let format = format.unwrap_or_default();

    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(find_csv_files(input)?);
        } else {
            files.push(input.clone());
        }
    }

    println!("📬 mailsift v{}", env!("CARGO_PKG_VERSION"));
    println!("📂 {} files", files.len());

    let summary = pipeline.ingest_batch(&files, |outcome| {
        let input = Path::new(outcome.report.file().unwrap_or_default());
        let template = pipeline.catalogue().template(outcome.report.template_id())?;
        let output_path = default_output_path(input, outcome, template, format);
        save_table(outcome, &output_path, format)?;
        println!(
            "✅ {} → {} ({} rows)",
            input.display(),
            output_path.display(),
            outcome.table.row_count()
        );
        Ok(())
    })?;

    for entry in summary.entries() {
        match entry {
            BatchEntry::Unrouted { file, reason } => println!("⚠️  {file}: {reason}"),
            BatchEntry::Failed { file, error } => println!("⚠️  {file}: {error}"),
            BatchEntry::Ingested { .. } => {}
        }
    }

    if let Some(path) = report_path {
        write_json(&summary, &path.to_string_lossy())?;
        println!("📝 Report:   {}", path.display());
    }

    println!(
        "✅ Done! {} ingested, {} unrouted, {} failed in {:.2}s",
        summary.ingested(),
        summary.unrouted(),
        summary.failed(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn route(paths: &[String], config: &Path) -> Result<()> {
    let catalogue = Catalogue::from_dir(config)?;
    let mut unresolved = 0usize;

    for path in paths {
        match catalogue.resolve(path) {
            Ok(found) => println!(
                "✅ {path} → {} ({:?}) → {}",
                found.template_id, found.source, found.output_folder
            ),
            Err(e @ MailsiftError::TemplateNotFound { .. }) => {
                println!("⚠️  {path} → {e}");
                unresolved += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if unresolved > 0 {
        eprintln!("{unresolved} of {} paths have no template", paths.len());
    }
    Ok(())
}

fn templates(config: &Path) -> Result<()> {
    let catalogue = Catalogue::from_dir(config)?;

    println!("✅ Configuration valid: {} templates", catalogue.template_count());
    for template in catalogue.templates() {
        println!(
            "📋 {:<16} {:<28} {:>3} columns, {} required",
            template.id(),
            template.name(),
            template.columns().len(),
            template.required_columns().len()
        );
    }
    Ok(())
}
