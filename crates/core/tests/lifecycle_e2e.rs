mod common;

use std::fs;
use std::path::Path;

use chrono::Local;
use common::{archive_names, manager, write_png};
use fincatalog_core::archive::ArchiveOutcome;
use fincatalog_core::catalog::legacy::write_legacy;
use fincatalog_core::catalog::{Catalog, RecordStore};
use fincatalog_core::confirm::AutoConfirm;
use fincatalog_core::domain::*;
use fincatalog_core::error::Error;
use fincatalog_core::format::{classify, CatalogFormat};
use fincatalog_core::layout;

fn survey_catalog(root: &Path) -> (fincatalog_core::CatalogManager, Catalog) {
    let mgr = manager(root);
    let mut catalog = mgr.create("area1", "area1_survey").unwrap();
    let folder = catalog.folder().to_path_buf();
    write_png(&folder.join("shared.png"), Some("shared_orig.jpg"));
    fs::write(folder.join("shared_orig.jpg"), b"jpeg bytes").unwrap();
    write_png(&folder.join("other.png"), None);

    catalog
        .add(&FinRecord::new("EC-1", "Upper", "shared.png"))
        .unwrap();
    catalog
        .add(&FinRecord::new("EC-2", "Lower", "SHARED.PNG"))
        .unwrap();
    catalog
        .add(&FinRecord::new("EC-3", "NONE", "other.png"))
        .unwrap();
    (mgr, catalog)
}

// ── Backup ──────────────────────────────────────────────────────

#[test]
fn test_backup_scenario_names_and_dedups() {
    let tmp = tempfile::tempdir().unwrap();
    let mgr = manager(tmp.path());
    let mut catalog = mgr.create("area1", "area1_survey").unwrap();
    assert_eq!(
        catalog.filename(),
        tmp.path().join("area1/surveyAreas/area1/catalog/area1_survey.db")
    );
    let folder = catalog.folder().to_path_buf();
    write_png(&folder.join("a.png"), None);
    write_png(&folder.join("b.png"), None);

    catalog.add(&FinRecord::new("A", "NONE", "a.png")).unwrap();
    catalog.add(&FinRecord::new("B", "NONE", "A.PNG")).unwrap();
    catalog.add(&FinRecord::new("C", "NONE", "b.png")).unwrap();

    let report = mgr.backup(&mut catalog).unwrap();
    assert_eq!(report.files, 3);
    assert_eq!(report.outcome, ArchiveOutcome::Complete);

    let expected_suffix = format!(
        "area1_survey{}.zip",
        Local::now().date_naive().format("_%b_%d_%Y")
    );
    let name = report.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with(&expected_suffix), "{name}");
    assert_eq!(report.path.parent().unwrap(), tmp.path().join("area1/backups"));

    // Catalog stays usable after the archiver ran.
    assert_eq!(catalog.size().unwrap(), 3);
    assert!(!tmp.path().join("tmp/filesToArchive.txt").exists());
}

#[test]
fn test_backup_includes_originals_from_metadata() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, mut catalog) = survey_catalog(tmp.path());

    let report = mgr.backup(&mut catalog).unwrap();
    assert_eq!(report.files, 4);
    let mut names = archive_names(&report.path);
    names.sort();
    assert_eq!(
        names,
        vec![
            "area1_survey.db",
            "filesToArchive.txt",
            "other.png",
            "shared.png",
            "shared_orig.jpg"
        ]
    );
}

#[test]
fn test_second_backup_same_day_gets_suffix() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, mut catalog) = survey_catalog(tmp.path());

    let first = mgr.backup(&mut catalog).unwrap();
    let second = mgr.backup(&mut catalog).unwrap();
    let third = mgr.backup(&mut catalog).unwrap();

    let stem = first.path.file_stem().unwrap().to_string_lossy().into_owned();
    assert_eq!(second.path, first.path.with_file_name(format!("{stem}[2].zip")));
    assert_eq!(third.path, first.path.with_file_name(format!("{stem}[3].zip")));
    assert!(first.path.is_file());
}

#[test]
fn test_backup_with_missing_image_is_partial() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, mut catalog) = survey_catalog(tmp.path());
    catalog
        .add(&FinRecord::new("EC-4", "NONE", "vanished.png"))
        .unwrap();

    let report = mgr.backup(&mut catalog).unwrap();
    assert_eq!(report.outcome, ArchiveOutcome::Partial);
    assert!(report.path.is_file());
}

// ── Restore ─────────────────────────────────────────────────────

#[test]
fn test_restore_repairs_damaged_area() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, mut catalog) = survey_catalog(tmp.path());
    let catalog_path = catalog.filename().to_path_buf();
    let folder = catalog.folder().to_path_buf();
    let report = mgr.backup(&mut catalog).unwrap();
    drop(catalog);

    // Damage: catalog file gone, an image edited locally, a folder removed.
    fs::remove_file(&catalog_path).unwrap();
    fs::write(folder.join("other.png"), b"local edit").unwrap();
    let sightings = layout::survey_area_path(&mgr.settings().data_root, "area1").join("sightings");
    fs::remove_dir(&sightings).unwrap();

    let outcome = mgr.restore(&report.path, "area1").unwrap();
    assert_eq!(outcome, ArchiveOutcome::Complete);

    assert_eq!(classify(&catalog_path), CatalogFormat::Openable);
    assert!(sightings.is_dir());
    // Existing images are kept, not overwritten.
    assert_eq!(fs::read(folder.join("other.png")).unwrap(), b"local edit");
    assert!(!folder.join("filesToArchive.txt").exists());

    let restored = mgr.open_existing(&catalog_path, None).unwrap();
    let codes: Vec<String> = mgr
        .fins(&restored)
        .unwrap()
        .into_iter()
        .map(|f| f.id_code)
        .collect();
    assert_eq!(codes, vec!["EC-1", "EC-2", "EC-3"]);
}

#[test]
fn test_restore_replaces_newer_catalog_file() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, mut catalog) = survey_catalog(tmp.path());
    let catalog_path = catalog.filename().to_path_buf();
    let report = mgr.backup(&mut catalog).unwrap();

    catalog
        .add(&FinRecord::new("EC-9", "NONE", "other.png"))
        .unwrap();
    assert_eq!(catalog.size().unwrap(), 4);
    drop(catalog);

    mgr.restore(&report.path, "area1").unwrap();
    let restored = mgr.open_existing(&catalog_path, None).unwrap();
    assert_eq!(restored.size().unwrap(), 3);
}

#[test]
fn test_restore_corrupt_archive_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let mgr = manager(tmp.path());
    let archive = tmp.path().join("junk.zip");
    fs::write(&archive, b"not an archive").unwrap();

    let err = mgr.restore(&archive, "area1").unwrap_err();
    assert!(matches!(err, Error::ArchiveToolFailure { code: Some(2) }));
}

// ── Export / import ─────────────────────────────────────────────

#[test]
fn test_export_forces_zip_and_respects_decline() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, mut catalog) = survey_catalog(tmp.path());
    let out = tmp.path().join("out");
    fs::create_dir_all(&out).unwrap();

    let report = mgr
        .export(&mut catalog, &out.join("snapshot"), &AutoConfirm(false))
        .unwrap();
    assert_eq!(report.path, out.join("snapshot.zip"));
    let original = fs::read(&report.path).unwrap();

    let err = mgr
        .export(&mut catalog, &out.join("snapshot.zip"), &AutoConfirm(false))
        .unwrap_err();
    assert!(matches!(err, Error::UserDeclinedOverwrite(_)));
    assert_eq!(fs::read(&report.path).unwrap(), original);

    catalog
        .add(&FinRecord::new("EC-5", "NONE", "other.png"))
        .unwrap();
    let replaced = mgr
        .export(&mut catalog, &out.join("snapshot.zip"), &AutoConfirm(true))
        .unwrap();
    assert_eq!(replaced.path, report.path);
    assert!(!out.join("snapshot[2].zip").exists());
}

#[test]
fn test_import_creates_new_survey_area() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, mut catalog) = survey_catalog(tmp.path());
    let report = mgr
        .export(&mut catalog, &tmp.path().join("gulf_export.zip"), &AutoConfirm(true))
        .unwrap();

    let area = fincatalog_core::naming::survey_area_from_backup(&report.path).unwrap();
    assert_eq!(area, "gulf");
    let outcome = mgr.import(&report.path, &area).unwrap();
    assert_eq!(outcome, ArchiveOutcome::Complete);

    let root = &mgr.settings().data_root;
    assert!(layout::survey_area_exists(root, "gulf"));
    assert_eq!(mgr.catalogs("gulf").unwrap(), vec!["area1_survey.db"]);
    assert_eq!(mgr.survey_areas().unwrap(), vec!["area1", "gulf"]);

    let folder = layout::catalog_folder(root, "gulf");
    assert!(folder.join("shared.png").is_file());
    assert!(folder.join("shared_orig.jpg").is_file());

    let imported = mgr
        .open_existing(&folder.join("area1_survey.db"), None)
        .unwrap();
    assert_eq!(imported.size().unwrap(), 3);
}

// ── Legacy conversion ───────────────────────────────────────────

#[test]
fn test_open_legacy_catalog_converts_and_keeps_old_file() {
    let tmp = tempfile::tempdir().unwrap();
    let mgr = manager(tmp.path());
    mgr.init();
    layout::reconcile_survey_area(&mgr.settings().data_root, "area1", true);
    let path = mgr.catalog_path("area1", "legacy");
    write_legacy(
        &path,
        &CatalogScheme::default(),
        &[
            Some(FinRecord::new("L-1", "Entire", "l1.png")),
            None,
            Some(FinRecord::new("L-2", "Tip-Missing", "l2.png")),
        ],
    )
    .unwrap();

    let mut events = 0;
    let mut cb = |_p: fincatalog_core::lifecycle::CopyProgress| events += 1;
    let catalog = mgr.open(&path, false, Some(&mut cb)).unwrap();

    assert_eq!(catalog.kind(), CatalogKind::Current);
    assert_eq!(catalog.size_absolute().unwrap(), 2);
    assert_eq!(events, 5);
    assert_eq!(
        classify(&path.with_file_name("legacy.olddb")),
        CatalogFormat::Convertible
    );
    // The moved-aside file no longer looks like a catalog.
    assert_eq!(mgr.catalogs("area1").unwrap(), vec!["legacy.db"]);
}

#[test]
fn test_duplicate_then_backup_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let (mgr, catalog) = survey_catalog(tmp.path());
    let copy_path = catalog.folder().join("copy.db");

    let mut copy = mgr.duplicate(&catalog, &copy_path, None).unwrap();
    assert_eq!(mgr.fins(&copy).unwrap(), mgr.fins(&catalog).unwrap());

    let report = mgr.backup(&mut copy).unwrap();
    assert_eq!(report.files, 4);
    assert!(report
        .path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("area1_copy_"));
}
