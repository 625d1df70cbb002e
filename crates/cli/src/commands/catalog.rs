use std::path::Path;

use anyhow::Result;
use fincatalog_core::catalog::RecordStore;
use fincatalog_core::CatalogManager;

use super::{on_copy, open_catalog, progress_bar};

pub fn create(mgr: &CatalogManager, area: &str, name: &str) -> Result<()> {
    let catalog = mgr.create(area, name)?;
    println!("Created catalog: {}", catalog.filename().display());
    println!("Scheme: {}", catalog.scheme().name);
    Ok(())
}

pub fn info(mgr: &CatalogManager, path: &Path) -> Result<()> {
    let catalog = open_catalog(mgr, path)?;
    let scheme = catalog.scheme();

    println!("Catalog:    {}", catalog.filename().display());
    println!("Format:     {}", catalog.kind().as_str());
    println!("Scheme:     {}", scheme.name);
    println!("Categories: {}", scheme.categories.join(", "));
    println!("Fins:       {}", catalog.size()?);

    let fins = mgr.fins(&catalog)?;
    if !fins.is_empty() {
        println!();
        println!("{:<16} {:<16} {:<14} IMAGE", "ID", "NAME", "DAMAGE");
        for fin in fins {
            println!(
                "{:<16} {:<16} {:<14} {}",
                fin.id_code,
                fin.name,
                fin.damage_category,
                fin.image_filename.display()
            );
        }
    }
    Ok(())
}

pub fn convert(mgr: &CatalogManager, path: &Path) -> Result<()> {
    let pb = progress_bar()?;
    let catalog = mgr.convert(path, Some(&mut |p| on_copy(&pb, p)))?;
    println!(
        "Converted {} ({} fins).",
        catalog.filename().display(),
        catalog.size()?
    );
    Ok(())
}

pub fn duplicate(mgr: &CatalogManager, source: &Path, target: &Path) -> Result<()> {
    let source = open_catalog(mgr, source)?;
    let pb = progress_bar()?;
    let copy = mgr.duplicate(&source, target, Some(&mut |p| on_copy(&pb, p)))?;
    println!(
        "Duplicated into {} ({} fins).",
        copy.filename().display(),
        copy.size()?
    );
    Ok(())
}
