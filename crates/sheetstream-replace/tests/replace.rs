use pretty_assertions::assert_eq;
use sheetstream_client::SheetDirectory;
use sheetstream_core::{SheetError, SheetId, TabularMatrix};
use sheetstream_replace::{ReplaceStep, ResumePoint, SafeReplace};
use sheetstream_testkit::{init_tracing, FakeSheets, RequestKind};
use std::sync::Arc;

fn old_rows() -> TabularMatrix {
    TabularMatrix::from_rows([vec!["id", "name"], vec!["1", "old"]])
}

fn new_rows() -> TabularMatrix {
    TabularMatrix::from_rows([vec!["id", "name"], vec!["1", "new"], vec!["2", "newer"]])
}

fn setup() -> (FakeSheets, SafeReplace, SheetId) {
    init_tracing();
    let fake = FakeSheets::new();
    fake.add_spreadsheet("doc");
    let id = fake.add_sheet("doc", "Data", old_rows());
    let directory = SheetDirectory::new(Arc::new(fake.clone()), fake.api_config());
    (fake, SafeReplace::new(directory), id)
}

#[test]
fn test_replace_success() {
    let (fake, replace, id) = setup();

    let report = replace.replace("doc", "Data", &new_rows()).unwrap();

    assert_eq!(report.target.sheet_id, id);
    assert_eq!(report.target.name, "Data");
    assert_eq!(report.backup.name, "Copy of Data");
    assert_eq!(report.completed, ReplaceStep::ALL.to_vec());
    assert_eq!(fake.values("doc", "Data").unwrap(), new_rows());
    assert_eq!(fake.sheet_id("doc", "Data"), Some(id));
    assert_eq!(fake.titles("doc"), vec!["Sheet1".to_string(), "Data".to_string()]);
}

#[test]
fn test_replace_request_order() {
    let (fake, replace, _) = setup();
    replace.replace("doc", "Data", &new_rows()).unwrap();

    let kinds: Vec<RequestKind> = fake.requests().into_iter().filter_map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RequestKind::GetSpreadsheet,
            RequestKind::CopyTo,
            RequestKind::ClearValues,
            RequestKind::AppendValues,
            RequestKind::AutoResizeRows,
            RequestKind::AutoResizeColumns,
            RequestKind::DeleteSheet,
        ]
    );
}

#[test]
fn test_missing_target_has_no_side_effects() {
    let (fake, replace, _) = setup();

    let failure = replace.replace("doc", "Nope", &new_rows()).unwrap_err();

    assert_eq!(failure.step, ReplaceStep::ResolveTarget);
    assert!(!failure.target_mutated());
    assert!(failure.orphaned_backup().is_none());
    assert!(failure.completed.is_empty());
    assert!(matches!(failure.source, SheetError::NotFound { .. }));
    assert_eq!(fake.requests().len(), 1);
}

#[test]
fn test_failed_duplicate_leaves_target_untouched() {
    let (fake, replace, _) = setup();
    fake.fail_next(RequestKind::CopyTo, 500);

    let failure = replace.replace("doc", "Data", &new_rows()).unwrap_err();

    assert_eq!(failure.step, ReplaceStep::DuplicateTarget);
    assert!(!failure.target_mutated());
    assert_eq!(failure.source.status_code(), Some(500));
    assert_eq!(fake.values("doc", "Data").unwrap(), old_rows());
    assert_eq!(fake.titles("doc").len(), 2);

    // Nothing was changed, so resuming is a fresh replace
    replace.resume(&failure.resume_point(), &new_rows()).unwrap();
    assert_eq!(fake.values("doc", "Data").unwrap(), new_rows());
}

#[test]
fn test_failed_append_keeps_backup_and_resumes() {
    let (fake, replace, id) = setup();
    fake.fail_next(RequestKind::AppendValues, 500);

    let failure = replace.replace("doc", "Data", &new_rows()).unwrap_err();

    assert_eq!(failure.step, ReplaceStep::AppendData);
    assert!(failure.target_mutated());
    assert_eq!(
        failure.completed,
        vec![
            ReplaceStep::ResolveTarget,
            ReplaceStep::DuplicateTarget,
            ReplaceStep::ClearTarget,
        ]
    );
    let backup = failure.orphaned_backup().unwrap().clone();
    assert_eq!(fake.values("doc", &backup.name).unwrap(), old_rows());
    assert!(fake.values("doc", "Data").unwrap().is_empty());

    let point = failure.resume_point();
    assert_eq!(point.step, ReplaceStep::ClearTarget);

    let report = replace.resume(&point, &new_rows()).unwrap();
    assert_eq!(report.target.sheet_id, id);
    assert_eq!(report.backup, backup);
    assert_eq!(report.completed, ReplaceStep::ALL.to_vec());
    assert_eq!(fake.values("doc", "Data").unwrap(), new_rows());
    assert_eq!(fake.sheet_id("doc", &backup.name), None);
    assert_eq!(fake.count(RequestKind::CopyTo), 1);
}

#[test]
fn test_resume_point_survives_serialization() {
    let (fake, replace, _) = setup();
    fake.fail_next(RequestKind::ClearValues, 503);

    let failure = replace.replace("doc", "Data", &new_rows()).unwrap_err();
    let saved = serde_json::to_string(&failure.resume_point()).unwrap();

    let point: ResumePoint = serde_json::from_str(&saved).unwrap();
    assert_eq!(point.step, ReplaceStep::ClearTarget);
    replace.resume(&point, &new_rows()).unwrap();

    assert_eq!(fake.values("doc", "Data").unwrap(), new_rows());
    assert_eq!(fake.titles("doc"), vec!["Sheet1".to_string(), "Data".to_string()]);
}

#[test]
fn test_failed_resize_leaves_backup_for_discard() {
    let (fake, replace, _) = setup();
    fake.fail_next(RequestKind::AutoResizeColumns, 500);

    let failure = replace.replace("doc", "Data", &new_rows()).unwrap_err();

    assert_eq!(failure.step, ReplaceStep::ResizeTarget);
    assert!(failure.target_mutated());
    assert_eq!(fake.values("doc", "Data").unwrap(), new_rows());

    let discarded = replace.discard_backup(&failure.resume_point()).unwrap();
    assert_eq!(fake.sheet_id("doc", &discarded.name), None);
}

#[test]
fn test_failed_backup_delete_leaves_orphan() {
    let (fake, replace, _) = setup();
    fake.fail_next(RequestKind::DeleteSheet, 500);

    let failure = replace.replace("doc", "Data", &new_rows()).unwrap_err();

    assert_eq!(failure.step, ReplaceStep::DeleteBackup);
    assert_eq!(failure.completed.len(), 5);
    let orphan = failure.orphaned_backup().unwrap().clone();
    assert_eq!(fake.values("doc", &orphan.name).unwrap(), old_rows());
    assert_eq!(fake.values("doc", "Data").unwrap(), new_rows());

    let point = failure.resume_point();
    assert_eq!(point.step, ReplaceStep::DeleteBackup);
    assert_eq!(replace.discard_backup(&point).unwrap(), orphan);
    assert_eq!(fake.sheet_id("doc", &orphan.name), None);
}

#[test]
fn test_discard_refused_while_backup_is_only_copy() {
    let (fake, replace, _) = setup();
    fake.fail_next(RequestKind::AppendValues, 500);

    let failure = replace.replace("doc", "Data", &new_rows()).unwrap_err();
    let backup = failure.orphaned_backup().unwrap().clone();

    let err = replace.discard_backup(&failure.resume_point()).unwrap_err();
    assert!(matches!(err, SheetError::InvalidArgument(_)));
    assert_eq!(fake.values("doc", &backup.name).unwrap(), old_rows());
}
