use anyhow::{bail, Result};
use fincatalog_core::CatalogManager;

pub fn init(mgr: &CatalogManager) -> Result<()> {
    let root = &mgr.settings().data_root;
    if !mgr.init() {
        bail!("could not create data root at {}", root.display());
    }
    println!("Data root ready: {}", root.display());
    Ok(())
}

pub fn areas(mgr: &CatalogManager) -> Result<()> {
    let areas = mgr.survey_areas()?;
    if areas.is_empty() {
        println!("No survey areas. Use `fincat create <area> <name>` to start one.");
        return Ok(());
    }
    for area in areas {
        println!("{area}");
    }
    Ok(())
}

pub fn catalogs(mgr: &CatalogManager, area: &str) -> Result<()> {
    let names = mgr.catalogs(area)?;
    if names.is_empty() {
        println!("No catalogs in survey area {area}.");
        return Ok(());
    }
    for name in names {
        println!("{}", mgr.catalog_path(area, &name).display());
    }
    Ok(())
}
