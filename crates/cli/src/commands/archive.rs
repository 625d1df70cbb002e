use std::path::Path;

use anyhow::{anyhow, Result};
use fincatalog_core::archive::ArchiveOutcome;
use fincatalog_core::confirm::ConfirmOverwrite;
use fincatalog_core::lifecycle::ArchiveReport;
use fincatalog_core::naming;
use fincatalog_core::CatalogManager;

use super::open_catalog;

fn print_report(action: &str, report: &ArchiveReport) {
    println!(
        "{action} written: {} ({} files)",
        report.path.display(),
        report.files
    );
    if report.outcome == ArchiveOutcome::Partial {
        println!("Some files could not be read and were left out.");
    }
}

fn area_for(archive: &Path, area: Option<&str>) -> Result<String> {
    match area {
        Some(area) => Ok(area.to_string()),
        None => naming::survey_area_from_backup(archive).ok_or_else(|| {
            anyhow!(
                "cannot tell the survey area from {}; pass --area",
                archive.display()
            )
        }),
    }
}

pub fn backup(mgr: &CatalogManager, path: &Path) -> Result<()> {
    let mut catalog = open_catalog(mgr, path)?;
    let report = mgr.backup(&mut catalog)?;
    print_report("Backup", &report);
    Ok(())
}

pub fn export(
    mgr: &CatalogManager,
    path: &Path,
    dest: &Path,
    confirm: &dyn ConfirmOverwrite,
) -> Result<()> {
    let mut catalog = open_catalog(mgr, path)?;
    let report = mgr.export(&mut catalog, dest, confirm)?;
    print_report("Export", &report);
    Ok(())
}

pub fn restore(mgr: &CatalogManager, archive: &Path, area: Option<&str>) -> Result<()> {
    let area = area_for(archive, area)?;
    let outcome = mgr.restore(archive, &area)?;
    println!("Restored into survey area {area} ({}).", outcome.as_str());
    Ok(())
}

pub fn import(mgr: &CatalogManager, archive: &Path, area: Option<&str>) -> Result<()> {
    let area = area_for(archive, area)?;
    let outcome = mgr.import(archive, &area)?;
    println!("Imported into survey area {area} ({}).", outcome.as_str());
    for name in mgr.catalogs(&area)? {
        println!("  {}", mgr.catalog_path(&area, &name).display());
    }
    Ok(())
}
