use serde::{Deserialize, Serialize};
use sheetstream_client::SheetDirectory;
use sheetstream_core::{SheetError, SheetIdentity, TabularMatrix};

use crate::error::{ReplaceFailure, ResumePoint};
use crate::step::ReplaceStep;

/// Outcome of a finished replace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceReport {
    pub target: SheetIdentity,
    /// The backup copy, already deleted
    pub backup: SheetIdentity,
    pub completed: Vec<ReplaceStep>,
}

/// Replaces a sheet's values behind a backup copy.
///
/// The target keeps its id and name. The backup is a copy of the target in
/// the same container and only disappears once the new rows are written and
/// the target is resized. Nothing is rolled back automatically; a failure
/// describes what is left so the caller can [`resume`](Self::resume) or
/// [`discard_backup`](Self::discard_backup).
#[derive(Debug, Clone)]
pub struct SafeReplace {
    directory: SheetDirectory,
}

/// Progress of one run
#[derive(Debug)]
struct Run {
    container: String,
    target_name: String,
    target: Option<SheetIdentity>,
    backup: Option<SheetIdentity>,
    completed: Vec<ReplaceStep>,
}

impl Run {
    fn target(&self) -> Result<SheetIdentity, SheetError> {
        self.target.clone().ok_or_else(|| {
            SheetError::InvalidArgument(format!("target '{}' was never resolved", self.target_name))
        })
    }

    fn backup(&self) -> Result<SheetIdentity, SheetError> {
        self.backup.clone().ok_or_else(|| {
            SheetError::InvalidArgument(format!("no backup recorded for '{}'", self.target_name))
        })
    }

    fn fail(self, step: ReplaceStep, source: SheetError) -> ReplaceFailure {
        ReplaceFailure {
            step,
            container: self.container,
            target_name: self.target_name,
            target: self.target,
            backup: self.backup,
            completed: self.completed,
            source,
        }
    }
}

impl SafeReplace {
    pub fn new(directory: SheetDirectory) -> Self {
        Self { directory }
    }

    /// Replace every value of sheet `name` in `container` with `matrix`
    #[tracing::instrument(skip(self, matrix), fields(rows = matrix.len()))]
    pub fn replace(
        &self,
        container: &str,
        name: &str,
        matrix: &TabularMatrix,
    ) -> Result<ReplaceReport, ReplaceFailure> {
        let run = Run {
            container: container.to_string(),
            target_name: name.to_string(),
            target: None,
            backup: None,
            completed: Vec::new(),
        };
        self.run_from(run, ReplaceStep::ResolveTarget, matrix)
    }

    /// Continue an unfinished replace from its resume point.
    ///
    /// Before the target was touched this is a fresh replace. Afterwards the
    /// recorded target and backup are reused.
    pub fn resume(
        &self,
        point: &ResumePoint,
        matrix: &TabularMatrix,
    ) -> Result<ReplaceReport, ReplaceFailure> {
        if !point.step.target_touched() {
            return self.replace(&point.container, &point.target_name, matrix);
        }

        tracing::info!(
            container = %point.container,
            name = %point.target_name,
            step = %point.step,
            "resuming replace"
        );
        let run = Run {
            container: point.container.clone(),
            target_name: point.target_name.clone(),
            target: point.target.clone(),
            backup: point.backup.clone(),
            completed: ReplaceStep::ALL
                .into_iter()
                .filter(|step| *step < point.step)
                .collect(),
        };
        self.run_from(run, point.step, matrix)
    }

    /// Delete the backup an unfinished replace left behind.
    ///
    /// Refused while the target may still be missing rows, since the backup
    /// then holds the only complete copy of the old values.
    pub fn discard_backup(&self, point: &ResumePoint) -> Result<SheetIdentity, SheetError> {
        let backup = point.backup.clone().ok_or_else(|| {
            SheetError::InvalidArgument(format!("no backup recorded for '{}'", point.target_name))
        })?;
        if point.step < ReplaceStep::ResizeTarget {
            return Err(SheetError::InvalidArgument(format!(
                "backup '{}' still holds the only copy of '{}' (stopped at step {})",
                backup.name, point.target_name, point.step
            )));
        }

        self.directory.delete_sheet(&backup.container, backup.sheet_id)?;
        tracing::info!(backup = %backup, "discarded backup");
        Ok(backup)
    }

    fn run_from(
        &self,
        mut run: Run,
        start: ReplaceStep,
        matrix: &TabularMatrix,
    ) -> Result<ReplaceReport, ReplaceFailure> {
        for step in start.remaining() {
            if let Err(source) = self.execute(step, &mut run, matrix) {
                let failure = run.fail(step, source);
                if failure.target_mutated() {
                    tracing::warn!(
                        container = %failure.container,
                        name = %failure.target_name,
                        step = %step,
                        backup = ?failure.backup.as_ref().map(|b| b.sheet_id),
                        error = %failure.source,
                        "replace stopped after changing the target"
                    );
                } else {
                    tracing::debug!(step = %step, error = %failure.source, "replace stopped");
                }
                return Err(failure);
            }
            tracing::debug!(step = %step, "replace step done");
            run.completed.push(step);
        }

        match (run.target.take(), run.backup.take()) {
            (Some(target), Some(backup)) => {
                tracing::info!(target = %target, "replace completed");
                Ok(ReplaceReport {
                    target,
                    backup,
                    completed: run.completed,
                })
            }
            (target, backup) => {
                run.target = target;
                run.backup = backup;
                let source = SheetError::InvalidArgument(
                    "replace finished without a target and backup".to_string(),
                );
                Err(run.fail(ReplaceStep::DeleteBackup, source))
            }
        }
    }

    fn execute(
        &self,
        step: ReplaceStep,
        run: &mut Run,
        matrix: &TabularMatrix,
    ) -> Result<(), SheetError> {
        match step {
            ReplaceStep::ResolveTarget => {
                let id = self.directory.sheet_id(&run.container, &run.target_name)?;
                run.target = Some(SheetIdentity::new(&run.container, id, &run.target_name));
            }
            ReplaceStep::DuplicateTarget => {
                let target = run.target()?;
                let backup = self.directory.duplicate_sheet(
                    &target.container,
                    target.sheet_id,
                    &target.container,
                )?;
                run.backup = Some(backup);
            }
            ReplaceStep::ClearTarget => {
                let target = run.target()?;
                self.directory.clear_values(&target.container, &target.name)?;
            }
            ReplaceStep::AppendData => {
                let target = run.target()?;
                self.directory
                    .append_values(&target.container, &target.name, matrix)?;
            }
            ReplaceStep::ResizeTarget => {
                let target = run.target()?;
                self.directory
                    .resize_dimensions_to_fit(&target.container, target.sheet_id)?;
            }
            ReplaceStep::DeleteBackup => {
                let backup = run.backup()?;
                self.directory.delete_sheet(&backup.container, backup.sheet_id)?;
            }
        }
        Ok(())
    }
}
