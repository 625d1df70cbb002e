//! Single-fin packages (`.finz`): a zip holding `database.db` with exactly one
//! record plus the images that record references.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveOutcome, Archiver};
use crate::catalog::{Catalog, RecordStore, SqliteCatalog};
use crate::confirm::{self, ConfirmOverwrite};
use crate::domain::*;
use crate::error::{Error, Result};
use crate::format::{self, CatalogFormat};
use crate::manifest::{self, ArchiveManifest};
use crate::naming;

pub const FINZ_EXTENSION: &str = "finz";
pub const FINZ_DATABASE: &str = "database.db";
pub const FINZ_SCHEME_NAME: &str = "FinzSimple";
pub const MODIFIED_IMAGE_SUFFIX: &str = "_wDarwinMods";

/// Result of writing a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinzReport {
    pub path: PathBuf,
    pub outcome: ArchiveOutcome,
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn file_name(path: &Path) -> Option<PathBuf> {
    path.file_name().map(PathBuf::from)
}

/// Scheme for a package: `NONE` plus the fin's own category.
fn package_scheme(fin: &FinRecord) -> CatalogScheme {
    let mut categories = vec![DEFAULT_CATEGORY.to_string()];
    if !fin.damage_category.is_empty() && !fin.damage_category.eq_ignore_ascii_case(DEFAULT_CATEGORY)
    {
        categories.push(fin.damage_category.clone());
    }
    CatalogScheme::new(FINZ_SCHEME_NAME, categories)
}

/// Fresh scratch folder; a leftover from an earlier run is cleared first.
fn make_scratch(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

fn remove_scratch(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        warn!(path = %path.display(), error = %e, "could not remove scratch folder");
    }
}

/// Package one fin into `dest` (`.finz` appended when missing).
///
/// Relative image references resolve against `image_base`. Nothing is written
/// and nobody is asked anything unless the modified image exists.
pub fn export_fin(
    fin: &FinRecord,
    image_base: &Path,
    dest: &Path,
    temp_dir: &Path,
    confirm: &dyn ConfirmOverwrite,
    archiver: &dyn Archiver,
) -> Result<FinzReport> {
    let dest = naming::ensure_extension(dest, FINZ_EXTENSION);

    let image = resolve(image_base, &fin.image_filename);
    if !fin.has_image() || !image.is_file() {
        return Err(Error::MissingModifiedImage(image));
    }

    confirm::prepare_target(&dest, "Selected fin file already exists!", confirm)?;

    let dest_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let scratch = temp_dir.join(format!("{}_packing", dest_name.replace('.', "")));
    make_scratch(&scratch)?;

    let result = write_package(fin, &image, image_base, &dest, &scratch, temp_dir, archiver);
    remove_scratch(&scratch);

    let outcome = result?;
    info!(id_code = %fin.id_code, path = %dest.display(), "exported fin");
    Ok(FinzReport { path: dest, outcome })
}

fn write_package(
    fin: &FinRecord,
    image: &Path,
    image_base: &Path,
    dest: &Path,
    scratch: &Path,
    temp_dir: &Path,
    archiver: &dyn Archiver,
) -> Result<ArchiveOutcome> {
    let mut packaged = fin.clone();
    packaged.fin_filename = None;
    packaged.original_image_filename = None;

    if let Some(original) = manifest::original_image_for(fin, image, image_base) {
        match file_name(&original) {
            Some(name) if original.is_file() => {
                fs::copy(&original, scratch.join(&name))?;
                packaged.original_image_filename = Some(name);
            }
            _ => debug!(original = %original.display(), "original image not found, skipped"),
        }
    }

    let dest_stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = image
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    let modified_name = PathBuf::from(format!("{dest_stem}{MODIFIED_IMAGE_SUFFIX}.{ext}"));
    fs::copy(image, scratch.join(&modified_name))?;
    packaged.image_filename = modified_name;

    let mut db: Catalog =
        SqliteCatalog::create(&scratch.join(FINZ_DATABASE), &package_scheme(fin))?.into();
    db.add(&packaged)?;

    let manifest = ArchiveManifest::build(&db)?;
    archive::create_archive(&mut db, &manifest, dest, temp_dir, archiver)
}

/// Unpack `archive` into a fresh scratch folder, run `f` over the package's
/// single record, then remove the folder.
fn with_package<T>(
    archive: &Path,
    temp_dir: &Path,
    archiver: &dyn Archiver,
    f: impl FnOnce(&Path, FinRecord) -> Result<T>,
) -> Result<T> {
    if !archive.is_file() {
        return Err(Error::Unreadable(archive.to_path_buf()));
    }
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let scratch = temp_dir.join(format!("{}_unpacked", name.replace('.', "")));
    make_scratch(&scratch)?;

    let result = (|| -> Result<T> {
        archive::extract_all(archive, &scratch, archiver)?;
        let db_path = scratch.join(FINZ_DATABASE);
        if format::classify(&db_path) != CatalogFormat::Openable {
            return Err(Error::FormatUnrecognized(archive.to_path_buf()));
        }
        let fin = {
            let db = SqliteCatalog::open(&db_path)?;
            db.get_item(0)?
        };
        let mut fin = fin.ok_or_else(|| Error::EmptyPackage(archive.to_path_buf()))?;
        fin.fin_filename = Some(archive.to_path_buf());
        f(&scratch, fin)
    })();

    remove_scratch(&scratch);
    result
}

/// Read the record held by a package without importing it.
pub fn read_fin(archive: &Path, temp_dir: &Path, archiver: &dyn Archiver) -> Result<FinRecord> {
    with_package(archive, temp_dir, archiver, |_, fin| Ok(fin))
}

/// Add the fin held by a package to `target`, copying its images into the
/// catalog folder under names that do not clash with existing files.
pub fn import_fin(
    archive: &Path,
    target: &mut Catalog,
    temp_dir: &Path,
    archiver: &dyn Archiver,
) -> Result<FinRecord> {
    target.ensure_loaded()?;
    let folder = target.folder().to_path_buf();

    let fin = with_package(archive, temp_dir, archiver, |scratch, mut fin| {
        let image = file_name(&fin.image_filename)
            .map(|n| scratch.join(n))
            .filter(|p| p.is_file())
            .ok_or_else(|| Error::MissingModifiedImage(fin.image_filename.clone()))?;

        let original = fin
            .original_image()
            .and_then(file_name)
            .map(|n| scratch.join(n))
            .filter(|p| p.is_file());

        fs::create_dir_all(&folder)?;
        fin.original_image_filename = match original {
            Some(src) => Some(copy_unique(&src, &folder)?),
            None => None,
        };
        fin.image_filename = copy_unique(&image, &folder)?;

        target.add(&fin)?;
        Ok(fin)
    })?;

    info!(
        id_code = %fin.id_code,
        catalog = %target.filename().display(),
        "imported fin"
    );
    Ok(fin)
}

/// Copy `src` into `folder`, renaming on collision. Returns the new file name.
fn copy_unique(src: &Path, folder: &Path) -> Result<PathBuf> {
    let name = src.file_name().unwrap_or_default();
    let dest = naming::resolve_collision(&folder.join(name));
    fs::copy(src, &dest)?;
    debug!(from = %src.display(), to = %dest.display(), "copied image");
    Ok(file_name(&dest).unwrap_or_default())
}
