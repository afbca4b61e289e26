use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::catalog::{Archive, Catalog, FileRecord, FluxRecord};
use crate::container;
use crate::util;

#[derive(Debug, Clone)]
struct HashJob {
    entry_idx: usize,
    rel_name: String,
    abs_path: PathBuf,
    suffix: Option<String>,
    size_bytes: u64,
}

#[derive(Debug)]
struct HashResult {
    job: HashJob,
    md5: Option<String>,
    warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub muster_dir: PathBuf,
    pub entries: usize,
    pub files_hashed: usize,
    pub bytes_hashed: u64,
    pub photos: usize,
    pub flux_decoded: usize,
    pub elapsed: Duration,
    pub avg_bytes_per_sec: f64,
    pub warnings: Vec<String>,
}

/// Walk the muster directory and fold every immediate subfolder into the
/// catalog as one entry: its files become a directory-backed archive with
/// md5 hashes, image files become photos, and .a2r flux files additionally
/// get their container records decoded. Decode and read failures are
/// recorded as warnings against the file; ingestion never stops for them.
pub fn ingest_muster_dir(
    muster_dir: &Path,
    catalog: &mut Catalog,
    workers_override: Option<usize>,
) -> Result<IngestSummary> {
    if !muster_dir.is_dir() {
        bail!("muster dir must be a directory: {}", muster_dir.display());
    }
    let started = Instant::now();

    let folders = list_entry_folders(muster_dir)?;
    let (jobs, mut warnings) = plan_hash_jobs(&folders)?;

    let bar = ProgressBar::new(jobs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} files | {msg}",
        )
        .expect("valid progress template"),
    );

    let workers = workers_override
        .unwrap_or_else(num_cpus::get)
        .max(1)
        .min(jobs.len().max(1));

    let results = run_hash_pool(jobs, workers, &bar)?;
    bar.finish_with_message("hashing complete");

    let mut files_hashed = 0usize;
    let mut bytes_hashed = 0u64;
    let mut photos = 0usize;
    let mut flux_decoded = 0usize;

    // Group results back under their folders, in stable name order.
    let mut per_entry: Vec<Vec<HashResult>> = (0..folders.len()).map(|_| Vec::new()).collect();
    for result in results {
        if let Some(w) = &result.warning {
            warnings.push(w.clone());
        }
        per_entry[result.job.entry_idx].push(result);
    }

    for (folder, mut results) in folders.iter().zip(per_entry) {
        results.sort_by(|a, b| a.job.rel_name.cmp(&b.job.rel_name));

        let title = util::folder_basename(folder);
        let identifier = util::sanitize_identifier(&title);
        let id = catalog.get_or_create(&identifier, &title);
        let archive_path = folder.to_string_lossy().to_string();

        let mut archive = Archive {
            path: archive_path.clone(),
            files: Vec::new(),
        };
        let mut entry_photos = Vec::new();
        let mut entry_flux = Vec::new();

        for result in results {
            let job = &result.job;
            let is_image = job
                .suffix
                .as_deref()
                .is_some_and(util::is_image_suffix);

            if is_image {
                entry_photos.push(job.abs_path.to_string_lossy().to_string());
                photos += 1;
                continue;
            }

            if result.md5.is_some() {
                files_hashed += 1;
                bytes_hashed += job.size_bytes;
            }
            archive.files.push(FileRecord {
                name: job.rel_name.clone(),
                suffix: job.suffix.clone(),
                size_bytes: job.size_bytes,
                md5: result.md5,
            });

            if job.suffix.as_deref() == Some(util::FLUX_SUFFIX) {
                match container::read_container_file(&job.abs_path) {
                    Ok(data) => {
                        entry_flux.push(FluxRecord::new(job.rel_name.clone(), data));
                        flux_decoded += 1;
                    }
                    Err(err) => {
                        warnings.push(format!("{}: {err}", job.abs_path.display()));
                    }
                }
            }
        }

        let entry = catalog.entry_mut(id).expect("entry just created");
        entry.folder = Some(archive_path.clone());

        // Re-ingesting the same folder refreshes its archive in place.
        match entry.archives.iter_mut().find(|a| a.path == archive_path) {
            Some(existing) => *existing = archive,
            None => entry.archives.push(archive),
        }
        entry.photos = entry_photos;
        entry.flux = entry_flux;
    }

    let elapsed = started.elapsed();
    let avg_bytes_per_sec = bytes_hashed as f64 / elapsed.as_secs_f64().max(1e-6);

    Ok(IngestSummary {
        muster_dir: muster_dir.to_path_buf(),
        entries: folders.len(),
        files_hashed,
        bytes_hashed,
        photos,
        flux_decoded,
        elapsed,
        avg_bytes_per_sec,
        warnings,
    })
}

fn list_entry_folders(muster_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = vec![];
    for entry in std::fs::read_dir(muster_dir)
        .with_context(|| format!("read {}", muster_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if util::folder_basename(&path).starts_with('.') {
            continue;
        }
        folders.push(path);
    }
    folders.sort();
    Ok(folders)
}

fn plan_hash_jobs(folders: &[PathBuf]) -> Result<(Vec<HashJob>, Vec<String>)> {
    let mut jobs = vec![];
    let mut warnings = vec![];

    for (entry_idx, folder) in folders.iter().enumerate() {
        // Prune hidden names at walk time so nothing under e.g. .git/ is hashed.
        let walker = WalkDir::new(folder).into_iter().filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        });
        for walked in walker {
            let walked = match walked {
                Ok(w) => w,
                Err(err) => {
                    warnings.push(format!("walk {}: {err}", folder.display()));
                    continue;
                }
            };
            let path = walked.path();
            if !path.is_file() {
                continue;
            }

            let rel_name = path
                .strip_prefix(folder)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let size_bytes = walked.metadata().map(|m| m.len()).unwrap_or(0);

            jobs.push(HashJob {
                entry_idx,
                rel_name,
                abs_path: path.to_path_buf(),
                suffix: util::suffix_of(path),
                size_bytes,
            });
        }
    }

    Ok((jobs, warnings))
}

fn run_hash_pool(jobs: Vec<HashJob>, workers: usize, bar: &ProgressBar) -> Result<Vec<HashResult>> {
    let total = jobs.len();
    let (job_tx, job_rx) = bounded::<HashJob>(workers * 2);
    let (result_tx, result_rx) = bounded::<HashResult>(workers * 2);

    let handles = (0..workers)
        .map(|_| {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            std::thread::spawn(move || {
                for job in job_rx.iter() {
                    let result = match util::md5_file(&job.abs_path) {
                        Ok(digest) => HashResult {
                            job,
                            md5: Some(digest),
                            warning: None,
                        },
                        Err(err) => {
                            let warning = format!("{}: {err:#}", job.abs_path.display());
                            HashResult {
                                job,
                                md5: None,
                                warning: Some(warning),
                            }
                        }
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            })
        })
        .collect::<Vec<_>>();
    drop(job_rx);
    drop(result_tx);

    let feeder = std::thread::spawn(move || {
        for job in jobs {
            if job_tx.send(job).is_err() {
                break;
            }
        }
    });

    let mut results = Vec::with_capacity(total);
    for result in result_rx.iter() {
        bar.inc(1);
        results.push(result);
    }

    feeder.join().map_err(|_| anyhow::anyhow!("hash feeder thread panicked"))?;
    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("hash worker thread panicked"))?;
    }

    Ok(results)
}
