//! Backup and restore of the output directory around a generation run.
//!
//! The manager snapshots the output directory before anything is written and
//! tracks every scratch directory the run creates. On failure [`RollbackManager::rollback`]
//! puts the filesystem back the way it found it, as far as it can; it reports
//! what it could not undo instead of failing.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Mutex, PoisonError};

use stackforge_utils::error::GenerationError;
use stackforge_utils::paths::{copy_dir_all, dir_has_entries, ensure_dir_all, remove_dir_if_exists};
use stackforge_utils::types::RollbackSummary;

/// State of the output directory before the run touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorState {
    Absent,
    Empty,
    Populated,
}

#[derive(Debug)]
pub struct RollbackManager {
    output_dir: Utf8PathBuf,
    backup_root: Utf8PathBuf,
    prior: PriorState,
    backup_path: Option<Utf8PathBuf>,
    temp_dirs: Mutex<Vec<Utf8PathBuf>>,
}

impl RollbackManager {
    #[must_use]
    pub fn new(output_dir: impl Into<Utf8PathBuf>, backup_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            backup_root: backup_root.into(),
            prior: PriorState::Absent,
            backup_path: None,
            temp_dirs: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    #[must_use]
    pub fn backup_path(&self) -> Option<&Utf8Path> {
        self.backup_path.as_deref()
    }

    #[must_use]
    pub const fn prior_state(&self) -> PriorState {
        self.prior
    }

    /// Record the output directory's state and, when `backup` is set and it
    /// has content, copy it to `<backup_root>/<dir name>-<timestamp>`.
    ///
    /// A failed copy is an error: the run must not start without the backup
    /// it was asked to take.
    pub fn snapshot(&mut self, timestamp: &str, backup: bool) -> Result<(), GenerationError> {
        self.prior = if !self.output_dir.is_dir() {
            PriorState::Absent
        } else if dir_has_entries(&self.output_dir) {
            PriorState::Populated
        } else {
            PriorState::Empty
        };

        if !backup || self.prior != PriorState::Populated {
            return Ok(());
        }

        let name = self.output_dir.file_name().unwrap_or("output");
        let target = self.backup_root.join(format!("{name}-{timestamp}"));
        let copied = copy_dir_all(&self.output_dir, &target).map_err(|e| {
            let _ = remove_dir_if_exists(&target);
            GenerationError::rollback(format!("could not back up {}", self.output_dir))
                .with_cause(format!("{e:#}"))
                .with_suggestion("Check free disk space and permissions on the backup directory")
                .with_suggestion("Pass --no-backup to generate without a backup")
        })?;

        tracing::info!(
            output = %self.output_dir,
            backup = %target,
            files = copied,
            "Backed up existing output directory"
        );
        self.backup_path = Some(target);
        Ok(())
    }

    /// Track a scratch directory for removal on rollback and cleanup.
    pub fn register_temp_dir(&self, dir: impl Into<Utf8PathBuf>) {
        self.temp_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dir.into());
    }

    #[must_use]
    pub fn temp_dirs(&self) -> Vec<Utf8PathBuf> {
        self.temp_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Undo the run. Never fails; incomplete steps become warnings.
    pub fn rollback(&self) -> RollbackSummary {
        let mut summary = RollbackSummary::default();

        for dir in self.take_temp_dirs() {
            match remove_dir_if_exists(&dir) {
                Ok(true) => summary.removed_temp_dirs.push(dir),
                Ok(false) => {}
                Err(e) => summary
                    .warnings
                    .push(format!("could not remove staging directory {dir}: {e}")),
            }
        }

        match (self.prior, &self.backup_path) {
            (PriorState::Populated, Some(backup)) => match self.restore_from(backup) {
                Ok(()) => summary.restored_backup = Some(backup.clone()),
                Err(e) => summary.warnings.push(format!(
                    "could not restore {} from {backup}: {e:#}; the backup was kept",
                    self.output_dir
                )),
            },
            (PriorState::Populated, None) => summary.warnings.push(format!(
                "{} had content before the run and no backup was taken; generated files may remain",
                self.output_dir
            )),
            (PriorState::Absent, _) => {
                if let Err(e) = remove_dir_if_exists(&self.output_dir) {
                    summary
                        .warnings
                        .push(format!("could not remove {}: {e}", self.output_dir));
                }
            }
            (PriorState::Empty, _) => {
                if let Err(e) = self.empty_output_dir() {
                    summary
                        .warnings
                        .push(format!("could not empty {}: {e:#}", self.output_dir));
                }
            }
        }

        summary.succeeded = summary.warnings.is_empty();
        stackforge_utils::logging::log_rollback_report(&summary);
        summary
    }

    /// Finish a successful run: drop scratch dirs and, unless asked to keep
    /// it, the backup. Returns warnings for anything left behind.
    pub fn cleanup(&self, keep_backup: bool) -> Vec<String> {
        let mut warnings = Vec::new();
        for dir in self.take_temp_dirs() {
            if let Err(e) = remove_dir_if_exists(&dir) {
                warnings.push(format!("could not remove staging directory {dir}: {e}"));
            }
        }
        if !keep_backup
            && let Some(backup) = &self.backup_path
            && let Err(e) = remove_dir_if_exists(backup)
        {
            warnings.push(format!("could not remove backup {backup}: {e}"));
        }
        warnings
    }

    /// Stop tracking scratch dirs without removing them; returns what was
    /// tracked.
    pub fn release_temp_dirs(&self) -> Vec<Utf8PathBuf> {
        std::mem::take(&mut *self.temp_dirs.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn take_temp_dirs(&self) -> Vec<Utf8PathBuf> {
        // deepest first so nested scratch dirs go before their parents
        let mut dirs = std::mem::take(&mut *self.temp_dirs.lock().unwrap_or_else(PoisonError::into_inner));
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        dirs
    }

    fn restore_from(&self, backup: &Utf8Path) -> anyhow::Result<()> {
        remove_dir_if_exists(&self.output_dir)
            .with_context(|| format!("Failed to clear {}", self.output_dir))?;
        copy_dir_all(backup, &self.output_dir)?;
        Ok(())
    }

    fn empty_output_dir(&self) -> anyhow::Result<()> {
        if !self.output_dir.is_dir() {
            return ensure_dir_all(&self.output_dir)
                .with_context(|| format!("Failed to recreate {}", self.output_dir));
        }
        for entry in self
            .output_dir
            .read_dir_utf8()
            .with_context(|| format!("Failed to read {}", self.output_dir))?
        {
            let entry = entry.with_context(|| format!("Failed to read {}", self.output_dir))?;
            remove_dir_if_exists(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path()))?;
        }
        Ok(())
    }
}
