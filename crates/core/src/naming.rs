use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use crate::error::{Error, Result};
use crate::layout;

/// Backup archive name for a catalog:
/// `<area>_<catalogStem>_<Mon>_<DD>_<YYYY>.zip`.
///
/// The area is the name of the folder two levels above the catalog file
/// (`<area>/catalog/<file>.db`).
pub fn backup_file_name(catalog_path: &Path, date: NaiveDate) -> Result<String> {
    let invalid = || Error::InvalidCatalogPath(catalog_path.to_path_buf());

    let stem = catalog_path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;
    let area = catalog_path
        .parent()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy())
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;

    Ok(format!("{area}_{stem}{}.zip", date.format("_%b_%d_%Y")))
}

/// Where a backup of `catalog_path` made today goes: inside
/// `<data_root>/backups`, never on top of an existing archive.
pub fn resolve_backup_path(catalog_path: &Path, data_root: &Path) -> Result<PathBuf> {
    let name = backup_file_name(catalog_path, Local::now().date_naive())?;
    Ok(resolve_collision(&layout::backups_folder(data_root).join(name)))
}

/// Return `candidate` when nothing exists there, otherwise the first free
/// `<stem>[n].<ext>` with n counting up from 2.
pub fn resolve_collision(candidate: &Path) -> PathBuf {
    if !candidate.exists() {
        return candidate.to_path_buf();
    }

    let dir = candidate.parent().unwrap_or_else(|| Path::new(""));
    let stem = candidate
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    let ext = candidate
        .extension()
        .map(|e| e.to_string_lossy());

    let mut n = 2u32;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem}[{n}].{ext}"),
            None => format!("{stem}[{n}]"),
        };
        let target = dir.join(name);
        if !target.exists() {
            return target;
        }
        n += 1;
    }
}

/// Name a legacy catalog is moved to before conversion: `catalog.db` becomes
/// `catalog.olddb`, and a name without extension gets `.old` appended. The
/// result no longer carries the `.db` extension, so it is not listed or
/// restored as a catalog.
pub fn legacy_rename_target(path: &Path) -> PathBuf {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let renamed = match file_name.rfind('.').filter(|&pos| pos > 0) {
        Some(pos) => format!("{}.old{}", &file_name[..pos], &file_name[pos + 1..]),
        None => format!("{file_name}.old"),
    };
    path.with_file_name(renamed)
}

/// Append `.<ext>` unless the name already ends with it (ignoring case).
pub fn ensure_extension(path: &Path, ext: &str) -> PathBuf {
    let has_ext = path
        .extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext));
    if has_ext {
        return path.to_path_buf();
    }
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Survey area a backup archive was taken from: the text of its file name
/// before the first `_`. Names without an underscore yield their stem.
pub fn survey_area_from_backup(archive: &Path) -> Option<String> {
    let name = archive.file_name()?.to_string_lossy();
    let area = match name.split_once('_') {
        Some((area, _)) => area.to_string(),
        None => archive.file_stem()?.to_string_lossy().into_owned(),
    };
    (!area.is_empty()).then_some(area)
}
