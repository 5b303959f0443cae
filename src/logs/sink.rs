use super::clock::{system_clock, Clock};
use super::event::{Level, LogEvent};
use super::guard::{self, report_failure, run_guarded, INTERNAL_TARGET};
use super::relocate::{native, Relocator};
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Files smaller than this are never rotated (5 KiB)
pub const MIN_ROTATION_BYTES: u64 = 5 * 1024;

/// Files younger than this are never rotated (1 hour)
pub const MIN_ROTATION_AGE_SECS: i64 = 3600;

/// Default number of backups kept per log file
pub const DEFAULT_BACKUP_COUNT: usize = 7;

/// Unit of the time-based rotation interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    /// Roll over at local midnight, every `interval` days
    Midnight,
}

/// When a sink rotates and how many backups it keeps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationPolicy {
    #[serde(default = "default_when")]
    pub when: RotationUnit,

    #[serde(default = "default_interval")]
    pub interval: u32,

    /// Optional size ceiling in bytes
    #[serde(default)]
    pub max_bytes: Option<u64>,

    #[serde(default = "default_backup_count")]
    pub backup_count: usize,

    /// Turned off by CHANLOG_DISABLE_ROTATION, never read from a file
    #[serde(skip, default = "default_enabled")]
    pub enabled: bool,
}

fn default_when() -> RotationUnit {
    RotationUnit::Midnight
}

fn default_interval() -> u32 {
    1
}

fn default_backup_count() -> usize {
    DEFAULT_BACKUP_COUNT
}

fn default_enabled() -> bool {
    true
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            when: default_when(),
            interval: default_interval(),
            max_bytes: None,
            backup_count: default_backup_count(),
            enabled: default_enabled(),
        }
    }
}

impl RotationPolicy {
    /// First rollover instant for a file started at `started`
    pub fn next_rollover(&self, started: DateTime<Local>) -> DateTime<Local> {
        let n = i64::from(self.interval.max(1));
        match self.when {
            RotationUnit::Seconds => started + Duration::seconds(n),
            RotationUnit::Minutes => started + Duration::minutes(n),
            RotationUnit::Hours => started + Duration::hours(n),
            RotationUnit::Days => started + Duration::days(n),
            RotationUnit::Midnight => {
                let date = started.date_naive() + Duration::days(n);
                Local
                    .from_local_datetime(&date.and_time(NaiveTime::MIN))
                    .earliest()
                    .unwrap_or_else(|| started + Duration::days(n))
            }
        }
    }
}

/// Why a rotation was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationTrigger {
    TimeBoundary,
    SizeCeiling,
    Manual,
}

/// How a rotation attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    RotatedAndArchived,
    SkippedTooSmall,
    SkippedTooYoung,
    RotatedViaCopyFallback,
    FailedAndRestored,
    /// Nothing was relocated; writing continues to the untouched file
    Abandoned,
}

impl RotationOutcome {
    /// Whether the active file now starts fresh
    pub fn rotated(&self) -> bool {
        matches!(
            self,
            RotationOutcome::RotatedAndArchived | RotationOutcome::RotatedViaCopyFallback
        )
    }
}

/// Record of a single rotation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationEvent {
    pub trigger: RotationTrigger,
    pub outcome: RotationOutcome,
    /// Backup file written by this attempt, if any
    pub backup: Option<PathBuf>,
}

#[derive(Default)]
struct SinkState {
    file: Option<File>,
    size: u64,
    started: Option<DateTime<Local>>,
    next_rollover: Option<DateTime<Local>>,
    last_rotation: Option<RotationEvent>,
}

/// A log file that rotates by time and size into a backup directory
///
/// Writes and rotation share one mutex, so concurrent writers wait out a
/// rotation instead of writing into a half-rotated file.
pub struct RotatingSink {
    path: PathBuf,
    backup_dir: PathBuf,
    archive_dir: Option<PathBuf>,
    policy: RotationPolicy,
    level: Level,
    relocator: Arc<dyn Relocator>,
    clock: Arc<dyn Clock>,
    state: Mutex<SinkState>,
}

impl RotatingSink {
    /// Create a sink; the file is opened on first write
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
            archive_dir: None,
            policy,
            level: Level::Debug,
            relocator: native(),
            clock: system_clock(),
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Only accept events at or above `level`
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Also avoid backup names whose compressed form is already archived here
    pub fn with_archive_dir(mut self, archive_dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(archive_dir.into());
        self
    }

    pub fn with_relocator(mut self, relocator: Arc<dyn Relocator>) -> Self {
        self.relocator = relocator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Outcome of the most recent rotation attempt
    pub fn last_rotation(&self) -> Option<RotationEvent> {
        self.lock().last_rotation.clone()
    }

    /// Append an event, rotating afterwards if the policy says so
    pub fn write(&self, event: &LogEvent) {
        if event.level < self.level {
            return;
        }

        let mut line = event.format_line();
        line.push('\n');

        let mut state = self.lock();
        if state.file.is_none() {
            self.open(&mut state);
        }

        let written = match state.file.as_mut() {
            Some(file) => run_guarded("write", &self.path, || {
                file.write_all(line.as_bytes())?;
                file.flush()
            }),
            None => None,
        };

        match written {
            Some(()) => state.size += line.len() as u64,
            // Drop the handle so the next write reopens the path
            None => state.file = None,
        }

        let now = self.clock.now();
        if let Some(trigger) = self.rotation_trigger(&state, now) {
            self.rotate_locked(&mut state, trigger, now);
        }
    }

    /// Whether the next write would rotate the file
    pub fn should_rotate(&self) -> bool {
        let state = self.lock();
        self.rotation_trigger(&state, self.clock.now()).is_some()
    }

    /// Run the rotation protocol now, still subject to the size/age guard
    pub fn rotate(&self) -> RotationEvent {
        let mut state = self.lock();
        if state.file.is_none() && state.started.is_none() {
            self.open(&mut state);
        }
        let now = self.clock.now();
        self.rotate_locked(&mut state, RotationTrigger::Manual, now)
    }

    /// Flush buffered bytes to disk
    pub fn flush(&self) {
        let mut state = self.lock();
        if let Some(file) = state.file.as_mut() {
            run_guarded("flush", &self.path, || file.flush());
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, state: &mut SinkState) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                guard::ensure_dir(parent);
            }
        }

        let opened = run_guarded("open", &self.path, || {
            OpenOptions::new().create(true).append(true).open(&self.path)
        });
        let Some(file) = opened else {
            return;
        };

        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        state.size = size;

        if state.started.is_none() {
            let now = self.clock.now();
            let started = if size == 0 {
                now
            } else {
                file_birth(&file).map(|t| t.min(now)).unwrap_or(now)
            };
            state.started = Some(started);
            state.next_rollover = Some(self.policy.next_rollover(started));
        }

        state.file = Some(file);
    }

    /// Guard applied before any rotation: too small or too young files stay put
    fn rotation_guard(&self, size: u64, started: DateTime<Local>, now: DateTime<Local>) -> Option<RotationOutcome> {
        if size < MIN_ROTATION_BYTES {
            return Some(RotationOutcome::SkippedTooSmall);
        }
        if now.signed_duration_since(started) < Duration::seconds(MIN_ROTATION_AGE_SECS) {
            return Some(RotationOutcome::SkippedTooYoung);
        }
        None
    }

    fn rotation_trigger(&self, state: &SinkState, now: DateTime<Local>) -> Option<RotationTrigger> {
        if !self.policy.enabled {
            return None;
        }
        let started = state.started?;
        if self.rotation_guard(state.size, started, now).is_some() {
            return None;
        }

        if state.next_rollover.is_some_and(|at| now >= at) {
            return Some(RotationTrigger::TimeBoundary);
        }
        match self.policy.max_bytes {
            Some(max) if state.size >= max => Some(RotationTrigger::SizeCeiling),
            _ => None,
        }
    }

    fn rotate_locked(
        &self,
        state: &mut SinkState,
        trigger: RotationTrigger,
        now: DateTime<Local>,
    ) -> RotationEvent {
        // Close the active handle before touching the file
        state.file = None;

        let started = state.started.unwrap_or(now);
        let (outcome, backup) = self.relocate(started, now);

        if outcome.rotated() {
            state.started = None;
            state.next_rollover = None;
        }
        self.open(state);

        if outcome.rotated() {
            self.enforce_retention();
        }

        tracing::debug!(
            target: INTERNAL_TARGET,
            path = %self.path.display(),
            ?trigger,
            ?outcome,
            "log rotation attempt finished"
        );

        let event = RotationEvent {
            trigger,
            outcome,
            backup,
        };
        state.last_rotation = Some(event.clone());
        event
    }

    /// Steps 2-4 of the rotation protocol; the handle is already closed
    fn relocate(&self, started: DateTime<Local>, now: DateTime<Local>) -> (RotationOutcome, Option<PathBuf>) {
        let Some(base_name) = self.base_name() else {
            report_failure("rotate", &self.path, &"log path has no file name");
            return (RotationOutcome::Abandoned, None);
        };

        // Re-check against the file on disk
        let size_on_disk = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if let Some(skipped) = self.rotation_guard(size_on_disk, started, now) {
            return (skipped, None);
        }

        guard::ensure_dir(&self.backup_dir);
        let rotated_name = format!("{}.{}", base_name, started.format("%Y-%m-%d"));
        let target = self.unique_backup_path(&rotated_name);
        let staged = match (self.path.parent(), target.file_name()) {
            (Some(parent), Some(name)) => parent.join(name),
            _ => return (RotationOutcome::Abandoned, None),
        };

        match self.relocator.rename(&self.path, &staged) {
            Ok(()) => match self.relocator.rename(&staged, &target) {
                Ok(()) => (RotationOutcome::RotatedAndArchived, Some(target)),
                Err(e) => {
                    report_failure("move_to_backup", &target, &e);
                    // Best effort: if this also fails the active file starts empty
                    run_guarded("restore", &self.path, || {
                        self.relocator.rename(&staged, &self.path)
                    });
                    (RotationOutcome::FailedAndRestored, None)
                }
            },
            Err(e) if self.relocator.is_locked(&e) => self.copy_fallback(&target),
            Err(e) => {
                report_failure("rename", &self.path, &e);
                (RotationOutcome::Abandoned, None)
            }
        }
    }

    /// Copy the locked file into the backup directory, then truncate it in place
    fn copy_fallback(&self, target: &Path) -> (RotationOutcome, Option<PathBuf>) {
        let copied = run_guarded("copy", target, || self.relocator.copy(&self.path, target));
        let verified = copied.is_some()
            && fs::metadata(target).map(|m| m.len() > 0).unwrap_or(false);

        if !verified {
            if target.exists() {
                run_guarded("remove", target, || fs::remove_file(target));
            }
            return (RotationOutcome::Abandoned, None);
        }

        match run_guarded("truncate", &self.path, || self.relocator.truncate(&self.path)) {
            Some(()) => (RotationOutcome::RotatedViaCopyFallback, Some(target.to_path_buf())),
            None => {
                // The original still holds everything; drop the duplicate
                run_guarded("remove", target, || fs::remove_file(target));
                (RotationOutcome::Abandoned, None)
            }
        }
    }

    /// `<basename>.<date>`, or `<basename>.<date>.N` if that is taken in the
    /// backup directory, next to the active file, or (as `.gz`) in the archive
    fn unique_backup_path(&self, rotated_name: &str) -> PathBuf {
        let parent = self.path.parent().unwrap_or_else(|| Path::new(""));
        let archived = |name: &str| {
            self.archive_dir
                .as_ref()
                .is_some_and(|dir| dir.join(format!("{}.gz", name)).exists())
        };
        let taken = |name: &str| {
            self.backup_dir.join(name).exists() || parent.join(name).exists() || archived(name)
        };

        if !taken(rotated_name) {
            return self.backup_dir.join(rotated_name);
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}.{}", rotated_name, n);
            if !taken(&candidate) {
                return self.backup_dir.join(candidate);
            }
            n += 1;
        }
    }

    fn base_name(&self) -> Option<String> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
    }

    /// Delete the oldest backups of this file beyond the retention count
    fn enforce_retention(&self) {
        let Some(base_name) = self.base_name() else {
            return;
        };
        let prefix = format!("{}.", base_name);

        let Some(entries) = run_guarded("read_dir", &self.backup_dir, || fs::read_dir(&self.backup_dir)) else {
            return;
        };

        let mut backups: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with(&prefix) && !n.ends_with(".gz"))
                    .unwrap_or(false)
            })
            .filter_map(|e| {
                let modified = e.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, e.path()))
            })
            .collect();

        if backups.len() <= self.policy.backup_count {
            return;
        }

        backups.sort();
        let surplus = backups.len() - self.policy.backup_count;
        for (_, path) in backups.into_iter().take(surplus) {
            if path == self.path {
                continue;
            }
            run_guarded("remove_backup", &path, || fs::remove_file(&path));
        }
    }
}

/// Creation time of a file, falling back to its modification time
fn file_birth(file: &File) -> Option<DateTime<Local>> {
    let meta = file.metadata().ok()?;
    let time = meta.created().or_else(|_| meta.modified()).ok()?;
    Some(DateTime::<Local>::from(time))
}
