use std::path::Path;

use anyhow::Result;
use fincatalog_core::catalog::RecordStore;
use fincatalog_core::confirm::ConfirmOverwrite;
use fincatalog_core::CatalogManager;

use super::open_catalog;

pub fn export(
    mgr: &CatalogManager,
    catalog: &Path,
    id_code: &str,
    dest: &Path,
    confirm: &dyn ConfirmOverwrite,
) -> Result<()> {
    let catalog = open_catalog(mgr, catalog)?;
    let report = mgr.export_fin(&catalog, id_code, dest, confirm)?;
    println!("Fin {id_code} packaged: {}", report.path.display());
    Ok(())
}

pub fn import(mgr: &CatalogManager, archive: &Path, catalog: &Path) -> Result<()> {
    let mut catalog = open_catalog(mgr, catalog)?;
    let fin = mgr.import_fin(archive, &mut catalog)?;
    println!(
        "Fin {} added to {} (image {}).",
        fin.id_code,
        catalog.filename().display(),
        fin.image_filename.display()
    );
    Ok(())
}

pub fn show(mgr: &CatalogManager, archive: &Path) -> Result<()> {
    let fin = mgr.read_fin(archive)?;
    println!("ID:       {}", fin.id_code);
    println!("Name:     {}", fin.name);
    println!("Damage:   {}", fin.damage_category);
    println!("Image:    {}", fin.image_filename.display());
    if let Some(original) = fin.original_image() {
        println!("Original: {}", original.display());
    }
    println!("Mods:     {}", fin.image_mods.len());
    Ok(())
}
