use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use payslip_cli::{package_output, stage_input};
use payslip_core::{
    DocumentOutcome, ExtractionConfig, ExtractionRequest, PayslipProcessor, RunSummary, YearRange,
};

#[derive(Parser)]
#[command(name = "payslip-extract")]
#[command(about = "Extract one employee's payslips from a multi-year payroll archive")]
struct Args {
    /// Payroll archive: a .zip upload or an already-extracted directory
    #[arg(short, long, required_unless_present = "show_config")]
    input: Option<PathBuf>,

    /// Employee name, matched case-sensitively against page text
    #[arg(short, long, required_unless_present = "show_config")]
    name: Option<String>,

    /// First year of employment (inclusive)
    #[arg(short, long, required_unless_present = "show_config")]
    admission: Option<i32>,

    /// Last year of employment (inclusive)
    #[arg(short, long, required_unless_present = "show_config")]
    dismissal: Option<i32>,

    /// Output directory (default: output/<name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Result bundle path (default: <name>.zip)
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Worker pool size (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log per-stage timings
    #[arg(long)]
    profile: bool,

    /// Keep the output directory after the bundle is written
    #[arg(long)]
    keep_output: bool,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    show_config: bool,
}

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "extraction failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let args = Args::parse();

    let mut config = ExtractionConfig::load_with_fallback(args.config.as_deref());
    if let Some(workers) = args.workers {
        config.max_workers = Some(workers);
    }

    if args.show_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    println!("🧾 Payslip Extractor");
    match &args.config {
        Some(path) => println!("📋 Loaded config from: {path}"),
        None => println!("📋 Using default config"),
    }

    let input = args.input.ok_or_else(|| anyhow!("--input is required"))?;
    let name = args
        .name
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| anyhow!("--name is required"))?
        .to_string();
    if name.is_empty() {
        bail!("employee name must not be empty");
    }
    let years = YearRange::new(
        args.admission.ok_or_else(|| anyhow!("--admission is required"))?,
        args.dismissal.ok_or_else(|| anyhow!("--dismissal is required"))?,
    );
    if years.is_empty() {
        warn!(
            admission = years.admission,
            dismissal = years.dismissal,
            "admission is after dismissal, nothing will be selected"
        );
    }

    let output_dir = args.output.unwrap_or_else(|| default_output_dir(&name));
    let archive_path = args.archive.unwrap_or_else(|| default_archive_path(&name));
    let output_existed = output_dir.exists();
    if output_existed && !is_empty_dir(&output_dir) {
        warn!(
            dir = %output_dir.display(),
            "output directory is not empty; PDFs already in it will be removed"
        );
    }

    // Dropped at the end of `run`, removing any extracted upload
    let staged = stage_input(&input, &config.year_parent_dir)?;
    if staged.is_extracted() {
        println!(
            "📂 Archive root (extracted from {}): {}",
            input.display(),
            staged.root().display()
        );
    } else {
        println!("📂 Archive root: {}", staged.root().display());
    }
    println!(
        "👤 {name} ({}-{}), {} workers",
        years.admission,
        years.dismissal,
        config.worker_count()
    );

    let processor = PayslipProcessor::new(config)?;
    let request = ExtractionRequest {
        archive_root: staged.root().to_path_buf(),
        employee_name: name.clone(),
        years,
        output_dir: output_dir.clone(),
    };
    let summary = processor
        .process_with_profiling(&request, args.profile)
        .with_context(|| format!("failed to extract payslips for {name}"))?;

    print_summary(&summary);

    if let Some(report_path) = &args.report {
        write_report(&summary, report_path)?;
        println!("📝 Report: {}", report_path.display());
    }

    let bundled = package_output(&output_dir, &archive_path)?;
    println!("📦 Bundle: {} ({bundled} files)", archive_path.display());

    // Only clean up a directory this run created
    if !args.keep_output && !output_existed {
        if let Err(e) = fs::remove_dir_all(&output_dir) {
            warn!(dir = %output_dir.display(), error = %e, "failed to remove output directory");
        }
    }

    Ok(())
}

fn default_output_dir(name: &str) -> PathBuf {
    Path::new("output").join(name)
}

fn default_archive_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{name}.zip"))
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

fn print_summary(summary: &RunSummary) {
    println!("✅ Extraction finished");
    println!("📊 Run {}:", summary.run_id);
    println!("   - Year folders: {}", summary.selected_folders.len());
    println!("   - Documents scanned: {}", summary.documents.len());
    println!("   - Documents with matches: {}", summary.matched_documents());
    println!(
        "   - Reconciled: {} deleted, {} renamed",
        summary.reconciliation.deleted.len(),
        summary.reconciliation.renamed.len()
    );
    println!("   - Output files: {}", summary.output_files.len());

    for report in &summary.documents {
        if let DocumentOutcome::Skipped { reason } = &report.outcome {
            println!("⚠️  Skipped {}: {reason}", report.source.path.display());
        }
    }
    for name in &summary.reconciliation.collisions {
        println!("⚠️  Name collision on {name}");
    }
    for failure in &summary.reconciliation.failures {
        println!("⚠️  {}: {}", failure.file, failure.error);
    }
}

fn write_report(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to serialize run summary")?;
    fs::write(path, json).with_context(|| format!("failed to write report: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_follow_name() {
        assert_eq!(
            default_output_dir("John Doe"),
            Path::new("output").join("John Doe")
        );
        assert_eq!(default_archive_path("John Doe"), PathBuf::from("John Doe.zip"));
    }

    #[test]
    fn test_show_config_needs_no_run_arguments() {
        let args = Args::try_parse_from(["payslip-extract", "--show-config"]).unwrap();
        assert!(args.show_config);
        assert!(args.input.is_none());
    }

    #[test]
    fn test_run_arguments_required() {
        assert!(Args::try_parse_from(["payslip-extract", "--name", "John Doe"]).is_err());

        let args = Args::try_parse_from([
            "payslip-extract",
            "--input",
            "uploaded.zip",
            "--name",
            "John Doe",
            "--admission",
            "2019",
            "--dismissal",
            "2021",
            "--workers",
            "2",
        ])
        .unwrap();
        assert_eq!(args.admission, Some(2019));
        assert_eq!(args.workers, Some(2));
        assert!(!args.keep_output);
    }

    #[test]
    fn test_is_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_empty_dir(dir.path()));
        fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        assert!(!is_empty_dir(dir.path()));
    }
}
