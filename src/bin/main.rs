use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use template_reconcile::{FileMode, FileToDelete};
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Name of the repository checkout to reconcile
    #[arg(short, long)]
    repository: String,

    /// Directory containing repository checkouts, one per repository name
    #[arg(short, long)]
    checkouts_root: PathBuf,

    /// Root of the upstream pipeline template tree
    #[arg(short, long)]
    upstream_root: PathBuf,

    /// Also print the permission mode of every upstream template file
    #[arg(short, long)]
    modes: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log level
    #[arg(global = true, short, long, default_value = "error")]
    log: LevelFilter,
}

#[derive(Serialize)]
struct FileModeEntry {
    path: String,
    mode: FileMode,
}

#[derive(Serialize)]
struct Report {
    files_to_delete: Vec<FileToDelete>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_modes: Option<Vec<FileModeEntry>>,
}

fn print_text_report(report: &Report) {
    println!("\n🧹 Files to delete: {}", report.files_to_delete.len());
    for file in &report.files_to_delete {
        println!("  - {}", file.file_path);
    }

    if let Some(modes) = &report.file_modes {
        println!("\n🔐 Template file modes:");
        for entry in modes {
            let marker = match entry.mode {
                FileMode::Executable => "x",
                FileMode::Normal => "-",
            };
            println!("  {marker} {}", entry.path);
        }
    }
}

#[tokio::main]
async fn main() -> template_reconcile::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive(cli.log.into());

    fmt()
        .with_env_filter(env_filter)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .pretty()
        .init();

    let reconciler = template_reconcile::new(&cli.checkouts_root, &cli.upstream_root)?;

    debug!(repository = %cli.repository, "Computing files to delete");
    let mut files_to_delete = reconciler.get_files_to_delete(&cli.repository)?;
    files_to_delete.sort_by(|a, b| a.file_path.cmp(&b.file_path));

    let file_modes = if cli.modes {
        let modes = reconciler
            .upstream_file_modes()?
            .into_iter()
            .map(|(path, mode)| FileModeEntry { path, mode })
            .collect();
        Some(modes)
    } else {
        None
    };

    let report = Report {
        files_to_delete,
        file_modes,
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text_report(&report),
    }

    Ok(())
}
