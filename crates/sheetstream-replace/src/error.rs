use serde::{Deserialize, Serialize};
use sheetstream_core::{SheetError, SheetIdentity};
use thiserror::Error;

use crate::step::ReplaceStep;

/// A safe replace that stopped before finishing
#[derive(Debug, Error)]
#[error("replacing '{target_name}' in {container} failed at step {step}")]
pub struct ReplaceFailure {
    pub step: ReplaceStep,
    pub container: String,
    pub target_name: String,
    /// Set once the target was resolved
    pub target: Option<SheetIdentity>,
    /// Set once the backup copy exists
    pub backup: Option<SheetIdentity>,
    pub completed: Vec<ReplaceStep>,
    #[source]
    pub source: SheetError,
}

impl ReplaceFailure {
    /// Whether the target may no longer hold its original values
    pub fn target_mutated(&self) -> bool {
        self.step.target_touched()
    }

    /// Backup copy left behind by this failure
    pub fn orphaned_backup(&self) -> Option<&SheetIdentity> {
        self.backup.as_ref()
    }

    /// Where a later [`SafeReplace::resume`](crate::SafeReplace::resume)
    /// has to continue
    pub fn resume_point(&self) -> ResumePoint {
        ResumePoint {
            step: self.step.resume_step(),
            container: self.container.clone(),
            target_name: self.target_name.clone(),
            target: self.target.clone(),
            backup: self.backup.clone(),
        }
    }
}

/// Serializable record of an unfinished replace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub step: ReplaceStep,
    pub container: String,
    pub target_name: String,
    pub target: Option<SheetIdentity>,
    pub backup: Option<SheetIdentity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetstream_core::SheetId;
    use std::error::Error as _;

    fn failure(step: ReplaceStep) -> ReplaceFailure {
        ReplaceFailure {
            step,
            container: "doc".to_string(),
            target_name: "Data".to_string(),
            target: Some(SheetIdentity::new("doc", SheetId(5), "Data")),
            backup: Some(SheetIdentity::new("doc", SheetId(9), "Copy of Data")),
            completed: Vec::new(),
            source: SheetError::transport("connection reset"),
        }
    }

    #[test]
    fn test_append_failure_resumes_at_clear() {
        let point = failure(ReplaceStep::AppendData).resume_point();
        assert_eq!(point.step, ReplaceStep::ClearTarget);
        assert_eq!(point.backup.unwrap().sheet_id, SheetId(9));
    }

    #[test]
    fn test_source_is_chained() {
        let failure = failure(ReplaceStep::ClearTarget);
        assert!(failure.target_mutated());
        assert_eq!(
            failure.to_string(),
            "replacing 'Data' in doc failed at step 3 (clear target values)"
        );
        let source = failure.source().unwrap();
        assert!(source.to_string().contains("connection reset"));
    }

    #[test]
    fn test_resume_point_serde_round_trip() {
        let point = failure(ReplaceStep::DeleteBackup).resume_point();
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("\"step\":\"delete_backup\""));
        let back: ResumePoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
    }
}
