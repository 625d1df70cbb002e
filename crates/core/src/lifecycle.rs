use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveOutcome, Archiver};
use crate::catalog::{Catalog, LegacyCatalog, RecordStore, SqliteCatalog};
use crate::config::Settings;
use crate::confirm::{self, ConfirmOverwrite};
use crate::domain::*;
use crate::error::{Error, Result};
use crate::format::{self, CatalogFormat};
use crate::layout;
use crate::manifest::ArchiveManifest;
use crate::naming;

/// Progress of a record copy between catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyProgress {
    /// Copy started; `total` counts absolute slots, holes included.
    Start { total: usize },
    Copied { index: usize, id_code: String },
    Hole { index: usize },
    Complete { copied: usize, holes: usize },
}

/// Result of writing a catalog archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub outcome: ArchiveOutcome,
    /// Entries in the manifest, catalog file included.
    pub files: usize,
}

/// Copy every present record of `source` into `target`, in absolute order.
/// Holes are skipped. Returns how many records were copied.
pub fn copy_fins(
    source: &Catalog,
    target: &mut Catalog,
    mut progress: Option<&mut dyn FnMut(CopyProgress)>,
) -> Result<usize> {
    let records = source.records_absolute()?;
    if let Some(ref mut cb) = progress {
        cb(CopyProgress::Start {
            total: records.len(),
        });
    }

    let mut copied = 0;
    let mut holes = 0;
    for (index, record) in records.into_iter().enumerate() {
        match record {
            Some(fin) => {
                target.add(&fin)?;
                copied += 1;
                if let Some(ref mut cb) = progress {
                    cb(CopyProgress::Copied {
                        index,
                        id_code: fin.id_code,
                    });
                }
            }
            None => {
                holes += 1;
                if let Some(ref mut cb) = progress {
                    cb(CopyProgress::Hole { index });
                }
            }
        }
    }

    if let Some(ref mut cb) = progress {
        cb(CopyProgress::Complete { copied, holes });
    }
    debug!(
        from = %source.filename().display(),
        to = %target.filename().display(),
        copied,
        holes,
        "copied fins"
    );
    Ok(copied)
}

/// Open whatever is at `path`.
///
/// A missing path becomes a new catalog with the default scheme when
/// `create_if_missing` is set, otherwise an invalid catalog tagged
/// `FileNotFound`. Legacy files are converted in place. A current-format file
/// that cannot be opened yields an invalid catalog tagged `ErrorOpening`.
pub fn open(
    path: &Path,
    create_if_missing: bool,
    settings: &Settings,
    progress: Option<&mut dyn FnMut(CopyProgress)>,
) -> Result<Catalog> {
    if create_if_missing && !path.exists() {
        return Ok(SqliteCatalog::create(path, &settings.default_scheme)?.into());
    }

    match format::classify(path) {
        CatalogFormat::Openable => Ok(open_current(path)),
        CatalogFormat::Convertible => convert(path, progress),
        CatalogFormat::Unreadable => {
            debug!(path = %path.display(), "no usable catalog at path");
            Ok(Catalog::invalid(path, CatalogStatus::FileNotFound))
        }
    }
}

/// Open a catalog that must already exist, converting legacy files.
///
/// A missing path is an error. A file that is neither format is reported as
/// an invalid catalog tagged `InvalidFormat` and left alone.
pub fn open_existing(
    path: &Path,
    progress: Option<&mut dyn FnMut(CopyProgress)>,
) -> Result<Catalog> {
    if !path.is_file() {
        return Err(Error::Unreadable(path.to_path_buf()));
    }
    match format::classify(path) {
        CatalogFormat::Openable => Ok(open_current(path)),
        CatalogFormat::Convertible => convert(path, progress),
        CatalogFormat::Unreadable => {
            warn!(path = %path.display(), "not a recognized catalog format");
            Ok(Catalog::invalid(path, CatalogStatus::InvalidFormat))
        }
    }
}

fn open_current(path: &Path) -> Catalog {
    match SqliteCatalog::open(path) {
        Ok(catalog) => catalog.into(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not open catalog");
            Catalog::invalid(path, CatalogStatus::ErrorOpening)
        }
    }
}

/// Create `<data_root>/surveyAreas/<area>/catalog/<name>.db` along with the
/// area's full folder layout.
pub fn create_catalog(settings: &Settings, area: &str, name: &str) -> Result<Catalog> {
    let file = naming::ensure_extension(Path::new(name), "db");
    let path = layout::catalog_folder(&settings.data_root, area).join(file);
    if path.exists() {
        return Err(Error::CatalogExists(path));
    }

    layout::ensure_data_root(&settings.data_root, true);
    if !layout::reconcile_survey_area(&settings.data_root, area, true) {
        warn!(area, "survey area layout is incomplete");
    }
    let catalog = SqliteCatalog::create(&path, &settings.default_scheme)?;
    info!(area, path = %path.display(), "created survey area catalog");
    Ok(catalog.into())
}

/// Convert a legacy catalog in place.
///
/// The legacy file is moved aside to its `.old` name and a current-format
/// catalog with the same scheme takes its path. The move is undone when any
/// later step fails.
pub fn convert(
    source: &Path,
    progress: Option<&mut dyn FnMut(CopyProgress)>,
) -> Result<Catalog> {
    let renamed = naming::legacy_rename_target(source);
    if renamed.exists() {
        return Err(Error::LegacyBackupExists(renamed));
    }

    fs::rename(source, &renamed)?;
    info!(from = %source.display(), to = %renamed.display(), "moved legacy catalog aside");

    let revert = |reason: &Error| {
        warn!(path = %source.display(), error = %reason, "conversion failed, restoring legacy catalog");
        if source.exists() {
            if let Err(e) = fs::remove_file(source) {
                warn!(path = %source.display(), error = %e, "could not remove partial catalog");
            }
        }
        if let Err(e) = fs::rename(&renamed, source) {
            warn!(path = %renamed.display(), error = %e, "could not restore legacy catalog");
        }
    };

    let legacy: Catalog = match LegacyCatalog::open(&renamed) {
        Ok(legacy) => legacy.into(),
        Err(e) => {
            revert(&e);
            return Err(e);
        }
    };
    let mut target: Catalog = match SqliteCatalog::create(source, legacy.scheme()) {
        Ok(target) => target.into(),
        Err(e) => {
            revert(&e);
            return Err(e);
        }
    };

    let copied = match copy_fins(&legacy, &mut target, progress) {
        Ok(copied) => copied,
        Err(e) => {
            drop(target);
            revert(&e);
            return Err(e);
        }
    };
    info!(path = %source.display(), copied, "converted legacy catalog");
    Ok(target)
}

/// Copy a catalog into a new current-format catalog at `target_path` with the
/// same scheme.
pub fn duplicate(
    source: &Catalog,
    target_path: &Path,
    progress: Option<&mut dyn FnMut(CopyProgress)>,
) -> Result<Catalog> {
    source.ensure_loaded()?;
    let mut target: Catalog = SqliteCatalog::create(target_path, source.scheme())?.into();
    let copied = copy_fins(source, &mut target, progress)?;
    info!(
        from = %source.filename().display(),
        to = %target_path.display(),
        copied,
        "duplicated catalog"
    );
    Ok(target)
}

/// First record whose id code matches.
pub fn find_fin(catalog: &Catalog, id_code: &str) -> Result<Option<FinRecord>> {
    Ok(catalog
        .records_absolute()?
        .into_iter()
        .flatten()
        .find(|fin| fin.id_code == id_code))
}

fn write_archive(
    catalog: &mut Catalog,
    dest: PathBuf,
    settings: &Settings,
    archiver: &dyn Archiver,
) -> Result<ArchiveReport> {
    let manifest = ArchiveManifest::build(catalog)?;
    let outcome =
        archive::create_archive(catalog, &manifest, &dest, &settings.temp_dir, archiver)?;
    Ok(ArchiveReport {
        path: dest,
        outcome,
        files: manifest.len(),
    })
}

/// Archive a catalog into `<data_root>/backups` under a dated, collision-free
/// name.
pub fn backup(
    catalog: &mut Catalog,
    settings: &Settings,
    archiver: &dyn Archiver,
) -> Result<ArchiveReport> {
    catalog.ensure_loaded()?;
    fs::create_dir_all(layout::backups_folder(&settings.data_root))?;
    let dest = naming::resolve_backup_path(catalog.filename(), &settings.data_root)?;
    info!(catalog = %catalog.filename().display(), "backing up catalog");
    write_archive(catalog, dest, settings, archiver)
}

/// Archive a catalog to a chosen `.zip` path. An existing file there is only
/// replaced when `confirm` agrees.
pub fn export(
    catalog: &mut Catalog,
    dest: &Path,
    settings: &Settings,
    confirm: &dyn ConfirmOverwrite,
    archiver: &dyn Archiver,
) -> Result<ArchiveReport> {
    catalog.ensure_loaded()?;
    let dest = naming::ensure_extension(dest, "zip");
    confirm::prepare_target(&dest, "Selected EXPORT file already exists!", confirm)?;
    info!(catalog = %catalog.filename().display(), "exporting catalog");
    write_archive(catalog, dest, settings, archiver)
}

/// Put a backup back into an existing survey area. Missing folders are
/// restored; nothing present is removed. Catalog files in the archive replace
/// the ones on disk, images only fill gaps.
pub fn restore(
    archive: &Path,
    area: &str,
    settings: &Settings,
    archiver: &dyn Archiver,
) -> Result<ArchiveOutcome> {
    extract_into_area(archive, area, false, settings, archiver)
}

/// Unpack an exported catalog into a survey area, creating the area's full
/// layout first.
pub fn import(
    archive: &Path,
    area: &str,
    settings: &Settings,
    archiver: &dyn Archiver,
) -> Result<ArchiveOutcome> {
    extract_into_area(archive, area, true, settings, archiver)
}

fn extract_into_area(
    archive: &Path,
    area: &str,
    force_layout: bool,
    settings: &Settings,
    archiver: &dyn Archiver,
) -> Result<ArchiveOutcome> {
    if !archive.is_file() {
        return Err(Error::Unreadable(archive.to_path_buf()));
    }

    layout::ensure_data_root(&settings.data_root, true);
    if !layout::reconcile_survey_area(&settings.data_root, area, force_layout) {
        warn!(area, "survey area layout is incomplete");
    }
    let folder = layout::catalog_folder(&settings.data_root, area);
    fs::create_dir_all(&folder)?;
    archive::extract_catalog_files(archive, &folder, archiver)
}
