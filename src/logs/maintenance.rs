// Disk reclamation: size pruning, gzip archiving and archive expiry
//
// Only files inside the backup and archive directories are ever deleted or
// compressed; active sink targets are left alone.

use super::guard::{report_failure, run_guarded, INTERNAL_TARGET};
use crate::config::PathProfile;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Thresholds for the maintenance pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenancePolicy {
    #[serde(default = "default_max_total_size_mb")]
    pub max_total_size_mb: u64,

    #[serde(default = "default_archive_after_days")]
    pub archive_after_days: u64,

    #[serde(default = "default_expire_after_days")]
    pub expire_after_days: u64,
}

fn default_max_total_size_mb() -> u64 {
    100
}

fn default_archive_after_days() -> u64 {
    7
}

fn default_expire_after_days() -> u64 {
    30
}

impl Default for MaintenancePolicy {
    fn default() -> Self {
        Self {
            max_total_size_mb: default_max_total_size_mb(),
            archive_after_days: default_archive_after_days(),
            expire_after_days: default_expire_after_days(),
        }
    }
}

/// What one full maintenance pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub archived: usize,
    pub expired: usize,
    pub pruned: bool,
}

struct FileInfo {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Regular files directly inside `dir`, oldest first
fn list_files(dir: &Path) -> Vec<FileInfo> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let Some(entries) = run_guarded("read_dir", dir, || fs::read_dir(dir)) else {
        return Vec::new();
    };

    let mut files: Vec<FileInfo> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some(FileInfo {
                path: e.path(),
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            })
        })
        .collect();
    files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    files
}

fn cutoff(days: u64) -> SystemTime {
    SystemTime::now()
        .checked_sub(Duration::from_secs(days.saturating_mul(SECS_PER_DAY)))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Delete backups, oldest first, until active + backup files fit the budget
///
/// Returns whether anything was deleted.
pub fn prune_by_size(profile: &PathProfile, max_total_size_mb: u64) -> bool {
    let budget = max_total_size_mb.saturating_mul(1024 * 1024);

    let active_size: u64 = profile
        .active_files()
        .iter()
        .filter_map(|p| fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();
    let backups: Vec<FileInfo> = list_files(&profile.backup_dir)
        .into_iter()
        .filter(|f| !profile.is_active(&f.path))
        .collect();
    let mut total = active_size + backups.iter().map(|f| f.size).sum::<u64>();

    let mut deleted = false;
    for backup in backups {
        if total <= budget {
            break;
        }
        if run_guarded("prune", &backup.path, || fs::remove_file(&backup.path)).is_some() {
            total = total.saturating_sub(backup.size);
            deleted = true;
        }
    }

    if deleted {
        tracing::info!(
            target: INTERNAL_TARGET,
            total_bytes = total,
            budget_bytes = budget,
            "pruned log backups"
        );
    }
    deleted
}

/// Gzip backups older than `older_than_days` into the archive directory
///
/// Returns the number of files archived.
pub fn archive_old(profile: &PathProfile, older_than_days: u64) -> usize {
    let cutoff = cutoff(older_than_days);
    let mut archived = 0;

    for file in list_files(&profile.backup_dir) {
        if file.modified > cutoff || profile.is_active(&file.path) {
            continue;
        }
        let Some(name) = file.path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".gz") {
            continue;
        }

        let target = unique_archive_path(&profile.archive_dir, name);
        match compress(&file.path, &target) {
            Ok(()) => {
                if run_guarded("remove_archived", &file.path, || fs::remove_file(&file.path)).is_some() {
                    archived += 1;
                }
            }
            Err(e) => {
                report_failure("compress", &file.path, &e);
                // Never leave a partial archive behind
                if target.exists() && e.kind() != io::ErrorKind::AlreadyExists {
                    run_guarded("remove_partial", &target, || fs::remove_file(&target));
                }
            }
        }
    }

    if archived > 0 {
        tracing::info!(target: INTERNAL_TARGET, archived, "archived old log backups");
    }
    archived
}

/// Delete archive entries older than `max_days`
///
/// Returns the number of files deleted.
pub fn expire_archives(profile: &PathProfile, max_days: u64) -> usize {
    let cutoff = cutoff(max_days);
    let mut deleted = 0;

    for file in list_files(&profile.archive_dir) {
        if file.modified > cutoff || profile.is_active(&file.path) {
            continue;
        }
        if run_guarded("expire", &file.path, || fs::remove_file(&file.path)).is_some() {
            deleted += 1;
        }
    }

    if deleted > 0 {
        tracing::info!(target: INTERNAL_TARGET, deleted, "expired log archives");
    }
    deleted
}

/// Archive, expire, then prune
pub fn run_all(profile: &PathProfile, policy: &MaintenancePolicy) -> MaintenanceReport {
    let archived = archive_old(profile, policy.archive_after_days);
    let expired = expire_archives(profile, policy.expire_after_days);
    let pruned = prune_by_size(profile, policy.max_total_size_mb);
    MaintenanceReport {
        archived,
        expired,
        pruned,
    }
}

/// Run `run_all` every `every`, on the blocking pool
///
/// Passes never overlap: the next tick waits for the previous pass.
pub fn spawn_scheduler(
    profile: PathProfile,
    policy: MaintenancePolicy,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let profile = profile.clone();
            let policy = policy.clone();
            match tokio::task::spawn_blocking(move || run_all(&profile, &policy)).await {
                Ok(report) => tracing::debug!(
                    target: INTERNAL_TARGET,
                    archived = report.archived,
                    expired = report.expired,
                    pruned = report.pruned,
                    "maintenance pass finished"
                ),
                Err(e) => tracing::warn!(
                    target: INTERNAL_TARGET,
                    error = %e,
                    "maintenance pass panicked"
                ),
            }
        }
    })
}

/// `<archive>/<name>.gz`, or `<name>.N.gz` if an earlier archive holds that name
fn unique_archive_path(archive_dir: &Path, name: &str) -> PathBuf {
    let first = archive_dir.join(format!("{}.gz", name));
    if !first.exists() {
        return first;
    }
    let mut n = 1;
    loop {
        let candidate = archive_dir.join(format!("{}.{}.gz", name, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn compress(source: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut reader = BufReader::new(File::open(source)?);
    let output = OpenOptions::new().write(true).create_new(true).open(target)?;
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()
}
