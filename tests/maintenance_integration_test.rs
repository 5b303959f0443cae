// Integration tests for pruning, archiving and expiry over a real layout

use chanlog::config::PathProfile;
use chanlog::logs::{
    archive_old, expire_archives, prune_by_size, run_all, spawn_scheduler, MaintenancePolicy,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn layout() -> (TempDir, PathProfile) {
    let temp_dir = TempDir::new().unwrap();
    let profile = PathProfile::under(temp_dir.path());
    fs::create_dir_all(&profile.backup_dir).unwrap();
    fs::create_dir_all(&profile.archive_dir).unwrap();
    (temp_dir, profile)
}

fn make_file(path: &Path, kib: usize) {
    fs::write(path, vec![b'z'; kib * 1024]).unwrap();
    std::thread::sleep(Duration::from_millis(20));
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn backup(profile: &PathProfile, name: &str) -> PathBuf {
    profile.backup_dir.join(name)
}

#[test]
fn test_prune_spares_active_files_and_keeps_newest() {
    let (_temp_dir, profile) = layout();
    make_file(&profile.file_for("scheduler"), 600);
    make_file(&profile.error_file, 100);
    make_file(&backup(&profile, "scheduler.log.2026-01-01"), 300);
    make_file(&backup(&profile, "scheduler.log.2026-01-02"), 300);
    make_file(&backup(&profile, "scheduler.log.2026-01-03"), 300);

    // 1.6 MiB total against 1 MiB: the two oldest backups go
    assert!(prune_by_size(&profile, 1));

    assert_eq!(names(&profile.backup_dir), vec!["scheduler.log.2026-01-03"]);
    assert!(profile.file_for("scheduler").exists());
    assert!(profile.error_file.exists());
}

#[test]
fn test_prune_cannot_go_below_active_size() {
    let (_temp_dir, profile) = layout();
    make_file(&profile.main_file, 2048);
    make_file(&backup(&profile, "app.log.2026-01-01"), 10);

    assert!(prune_by_size(&profile, 1));
    assert!(names(&profile.backup_dir).is_empty());
    assert_eq!(fs::metadata(&profile.main_file).unwrap().len(), 2048 * 1024);
}

#[test]
fn test_archive_and_expire_round_trip() {
    let (_temp_dir, profile) = layout();
    make_file(&backup(&profile, "email.log.2026-01-01"), 4);
    make_file(&backup(&profile, "email.log.2026-01-02"), 4);

    assert_eq!(archive_old(&profile, 30), 0);
    assert_eq!(archive_old(&profile, 0), 2);
    assert!(names(&profile.backup_dir).is_empty());
    assert_eq!(
        names(&profile.archive_dir),
        vec!["email.log.2026-01-01.gz", "email.log.2026-01-02.gz"]
    );

    // Compressed output is much smaller than the input
    for name in names(&profile.archive_dir) {
        let size = fs::metadata(profile.archive_dir.join(name)).unwrap().len();
        assert!(size < 4 * 1024);
    }

    assert_eq!(expire_archives(&profile, 30), 0);
    assert_eq!(expire_archives(&profile, 0), 2);
    assert!(names(&profile.archive_dir).is_empty());
}

#[test]
fn test_run_all_with_defaults_touches_nothing_recent() {
    let (_temp_dir, profile) = layout();
    make_file(&backup(&profile, "ui.log.2026-01-01"), 4);

    let report = run_all(&profile, &MaintenancePolicy::default());
    assert_eq!(report.archived, 0);
    assert_eq!(report.expired, 0);
    assert!(!report.pruned);
    assert_eq!(names(&profile.backup_dir), vec!["ui.log.2026-01-01"]);
}

#[tokio::test]
async fn test_scheduler_prunes_in_background() {
    let (_temp_dir, profile) = layout();
    make_file(&backup(&profile, "ai.log.2026-01-01"), 1100);

    let policy = MaintenancePolicy {
        max_total_size_mb: 1,
        ..MaintenancePolicy::default()
    };
    let handle = spawn_scheduler(profile.clone(), policy, Duration::from_millis(50));

    let target = backup(&profile, "ai.log.2026-01-01");
    for _ in 0..40 {
        if !target.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    handle.abort();

    assert!(!target.exists());
}
