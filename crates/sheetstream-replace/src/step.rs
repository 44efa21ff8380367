use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a safe replace, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceStep {
    /// Look up the target sheet's id by name
    ResolveTarget,
    /// Copy the target into the same container as a backup
    DuplicateTarget,
    /// Remove every value from the target
    ClearTarget,
    /// Append the new rows to the target
    AppendData,
    /// Fit the target's rows and columns to their content
    ResizeTarget,
    /// Delete the backup copy
    DeleteBackup,
}

impl ReplaceStep {
    pub const ALL: [ReplaceStep; 6] = [
        ReplaceStep::ResolveTarget,
        ReplaceStep::DuplicateTarget,
        ReplaceStep::ClearTarget,
        ReplaceStep::AppendData,
        ReplaceStep::ResizeTarget,
        ReplaceStep::DeleteBackup,
    ];

    /// 1-based position in the sequence
    pub fn ordinal(self) -> usize {
        self as usize + 1
    }

    pub fn description(self) -> &'static str {
        match self {
            ReplaceStep::ResolveTarget => "resolve target sheet",
            ReplaceStep::DuplicateTarget => "duplicate target as backup",
            ReplaceStep::ClearTarget => "clear target values",
            ReplaceStep::AppendData => "append new rows",
            ReplaceStep::ResizeTarget => "resize target to fit",
            ReplaceStep::DeleteBackup => "delete backup",
        }
    }

    /// Whether a failure at this step may have left the target changed
    pub fn target_touched(self) -> bool {
        self >= ReplaceStep::ClearTarget
    }

    /// Step to continue from after a failure at this step.
    ///
    /// A failed append may have written part of the rows, so it restarts
    /// from the clear.
    pub fn resume_step(self) -> ReplaceStep {
        match self {
            ReplaceStep::AppendData => ReplaceStep::ClearTarget,
            step => step,
        }
    }

    /// Steps from this one to the end
    pub fn remaining(self) -> impl Iterator<Item = ReplaceStep> {
        Self::ALL.into_iter().filter(move |step| *step >= self)
    }
}

impl fmt::Display for ReplaceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ordinal(), self.description())
    }
}
