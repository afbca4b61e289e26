mod catalog;
mod container;
mod duplicates;
mod ingest;
mod meta;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::HumanBytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog::{Catalog, EntryId};

#[derive(Parser)]
#[command(
    name = "fluxcat",
    version,
    about = "Catalog flux-image floppy archives and mark exact duplicates by content hash"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode one A2R-style container and print its INFO/META records
    Inspect {
        container: PathBuf,

        /// Emit the decoded records as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Walk a muster directory and build or update a catalog file
    Ingest {
        muster_dir: PathBuf,
        catalog: PathBuf,

        /// Hash worker thread count override. Default: logical CPU count.
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Scan a catalog for exact-duplicate entries and optionally mark them
    Duplicates {
        catalog: PathBuf,

        /// Mark found pairs without asking for confirmation.
        #[arg(long, default_value_t = false)]
        auto_mark: bool,

        /// Report what would change without writing anything.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Clear all existing duplicate marks before scanning.
        #[arg(long, default_value_t = false)]
        clear: bool,

        /// Only check duplicates for one entry identifier.
        #[arg(long)]
        identifier: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Inspect { container, json } => inspect(&container, json),
        Commands::Ingest {
            muster_dir,
            catalog,
            workers,
        } => run_ingest(&muster_dir, &catalog, workers),
        Commands::Duplicates {
            catalog,
            auto_mark,
            dry_run,
            clear,
            identifier,
        } => run_duplicates(&catalog, auto_mark, dry_run, clear, identifier.as_deref()),
    }
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let data = container::read_container_file(path)
        .with_context(|| format!("decode {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    match &data.info {
        Some(info) => {
            println!("INFO:");
            println!("  version:           {}", info.info_version);
            println!("  creator:           {}", info.creator);
            println!(
                "  drive_type:        {} ({})",
                info.drive_type,
                info.drive_type_label().unwrap_or("unknown geometry")
            );
            println!("  write_protected:   {}", info.write_protected);
            println!("  synchronized:      {}", info.synchronized);
            println!("  hard_sector_count: {}", info.hard_sector_count);
        }
        None => println!("INFO: absent"),
    }

    match &data.meta {
        Some(meta) => {
            println!("META:");
            print_meta_field("title", &meta.title);
            print_meta_field("subtitle", &meta.subtitle);
            print_meta_field("publisher", &meta.publisher);
            print_meta_field("developer", &meta.developer);
            print_meta_field("copyright", &meta.copyright);
            print_meta_field("version", &meta.version);
            if let Some(language) = &meta.language {
                println!(
                    "  language:          {} (code: {})",
                    language,
                    meta.language_code().unwrap_or("-")
                );
            }
            print_meta_field("requires_platform", &meta.requires_platform);
            print_meta_field("requires_machine", &meta.requires_machine);
            print_meta_field("requires_ram", &meta.requires_ram);
            print_meta_field("notes", &meta.notes);
            print_meta_field("side", &meta.side);
            print_meta_field("side_name", &meta.side_name);
            print_meta_field("contributor", &meta.contributor);
            print_meta_field("image_date", &meta.image_date);
        }
        None => println!("META: absent"),
    }

    Ok(())
}

fn print_meta_field(name: &str, value: &Option<String>) {
    if let Some(value) = value {
        println!("  {:<18} {}", format!("{name}:"), value);
    }
}

fn run_ingest(muster_dir: &Path, catalog_path: &Path, workers: Option<usize>) -> Result<()> {
    let mut catalog = if catalog_path.exists() {
        Catalog::load(catalog_path)?
    } else {
        Catalog::default()
    };

    let summary = ingest::ingest_muster_dir(muster_dir, &mut catalog, workers)?;
    catalog.save(catalog_path)?;

    println!(
        "Ingest summary: muster={} entries={} files_hashed={} bytes={} photos={} flux_decoded={} warnings={} duration={} rate={}/s",
        summary.muster_dir.display(),
        summary.entries,
        summary.files_hashed,
        HumanBytes(summary.bytes_hashed),
        summary.photos,
        summary.flux_decoded,
        summary.warnings.len(),
        fmt_duration(summary.elapsed),
        HumanBytes(summary.avg_bytes_per_sec as u64),
    );
    for warning in &summary.warnings {
        println!("  warning: {warning}");
    }

    Ok(())
}

fn run_duplicates(
    catalog_path: &Path,
    auto_mark: bool,
    dry_run: bool,
    clear: bool,
    identifier: Option<&str>,
) -> Result<()> {
    let mut catalog = Catalog::load(catalog_path)?;

    if dry_run {
        println!("DRY RUN MODE - no changes will be made");
    }

    let focus = identifier
        .map(|identifier| {
            catalog
                .find_by_identifier(identifier)
                .with_context(|| format!("entry with identifier \"{identifier}\" not found"))
        })
        .transpose()?;

    if clear {
        if dry_run {
            let count = match focus {
                Some(id) => catalog.duplicates.duplicates_of(id).len(),
                None => catalog.duplicates.len(),
            };
            println!("Would clear {count} duplicate mark(s)");
        } else if let Some(id) = focus {
            let removed = catalog.duplicates.clear_entry(id);
            println!("Cleared {removed} duplicate mark(s) for {}", identifier.unwrap_or_default());
        } else {
            catalog.duplicates.clear_all();
            println!("Cleared existing duplicate marks");
        }
    }

    let pairs = match focus {
        Some(id) => {
            println!("Checking duplicates for: {}", identifier.unwrap_or_default());
            let already = catalog.duplicates.duplicates_of(id);
            if !already.is_empty() {
                println!("Already marked against {} entries", already.len());
            }
            duplicates::scan_entries(&catalog, std::iter::once(id))
        }
        None => {
            let scanned = catalog
                .ids()
                .filter(|&id| catalog.entry(id).is_some_and(|e| e.has_archives()))
                .count();
            println!("Scanning {scanned} entries with archives...");
            duplicates::scan(&catalog)
        }
    };

    if pairs.is_empty() {
        println!("No duplicates found!");
        if !dry_run && clear {
            catalog.save(catalog_path)?;
        }
        return Ok(());
    }

    println!("\nFound {} duplicate pair(s):", pairs.len());
    for (i, &(a, b)) in pairs.iter().enumerate() {
        print_pair(&catalog, i + 1, a, b);
    }

    if dry_run {
        println!("\nWould mark {} duplicate pair(s)", pairs.len());
        return Ok(());
    }

    if !auto_mark && !confirm_marking()? {
        // A clear already changed the catalog even if no marks are added.
        if clear {
            catalog.save(catalog_path)?;
        }
        println!("\nNo duplicates were marked. Use --auto-mark to mark automatically.");
        return Ok(());
    }

    let mut marked = 0usize;
    for &(a, b) in &pairs {
        if duplicates::mark_as_duplicate(&mut catalog, a, b) {
            marked += 1;
        }
    }
    catalog.save(catalog_path)?;
    println!("\nMarked {marked} duplicate pair(s)");

    Ok(())
}

fn print_pair(catalog: &Catalog, index: usize, a: EntryId, b: EntryId) {
    let (Some(first), Some(second)) = (catalog.entry(a), catalog.entry(b)) else {
        return;
    };
    println!("{index}. {} <-> {}", first.identifier, second.identifier);
    println!("   \"{}\" <-> \"{}\"", first.title, second.title);
    println!(
        "   {} matching file hash(es)",
        duplicates::content_hashes(catalog, a).len()
    );
}

fn confirm_marking() -> Result<bool> {
    print!("\nMark these as duplicates? [y/N]: ");
    std::io::stdout().flush()?;
    let mut response = String::new();
    std::io::stdin().read_line(&mut response)?;
    let response = response.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
