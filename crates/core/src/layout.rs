use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::Result;

pub const SURVEY_AREAS_DIR: &str = "surveyAreas";
pub const BACKUPS_DIR: &str = "backups";
pub const CATALOG_DIR: &str = "catalog";

/// Folders every survey area carries, in creation order.
pub const SURVEY_AREA_SUBDIRS: [&str; 5] = [
    CATALOG_DIR,
    "tracedFins",
    "matchQueues",
    "matchQResults",
    "sightings",
];

pub fn survey_areas_root(data_root: &Path) -> PathBuf {
    data_root.join(SURVEY_AREAS_DIR)
}

pub fn backups_folder(data_root: &Path) -> PathBuf {
    data_root.join(BACKUPS_DIR)
}

pub fn survey_area_path(data_root: &Path, area: &str) -> PathBuf {
    survey_areas_root(data_root).join(area)
}

pub fn catalog_folder(data_root: &Path, area: &str) -> PathBuf {
    survey_area_path(data_root, area).join(CATALOG_DIR)
}

pub fn catalog_path(data_root: &Path, area: &str, name: &str) -> PathBuf {
    catalog_folder(data_root, area).join(name)
}

/// Check the data root, its `surveyAreas` and `backups` folders, in that order.
/// With `create`, missing folders are made; without it the check stops at the
/// first missing one. Returns whether all three exist afterwards.
pub fn ensure_data_root(data_root: &Path, create: bool) -> bool {
    let required = [
        data_root.to_path_buf(),
        survey_areas_root(data_root),
        backups_folder(data_root),
    ];

    for dir in &required {
        if dir.is_dir() {
            continue;
        }
        if !create {
            return false;
        }
        match fs::create_dir_all(dir) {
            Ok(()) => info!(path = %dir.display(), "created folder"),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "could not create folder");
                return false;
            }
        }
    }
    true
}

/// Bring a survey area's folder tree up to the expected layout.
///
/// Only missing folders are created; nothing that exists is touched. With
/// `force_create_all` the whole tree is (re)asserted, otherwise each missing
/// piece from `surveyAreas` down is created and logged individually. Failures are logged and reported
/// through the return value, which tells whether the full layout exists.
pub fn reconcile_survey_area(data_root: &Path, area: &str, force_create_all: bool) -> bool {
    let area_path = survey_area_path(data_root, area);
    let mut complete = true;

    if force_create_all {
        for sub in SURVEY_AREA_SUBDIRS {
            let dir = area_path.join(sub);
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!(path = %dir.display(), error = %e, "could not create folder");
                complete = false;
            }
        }
        if complete {
            info!(area, path = %area_path.display(), "survey area layout created");
        }
        return complete;
    }

    let pieces = [survey_areas_root(data_root), area_path.clone()]
        .into_iter()
        .chain(SURVEY_AREA_SUBDIRS.iter().map(|sub| area_path.join(sub)));
    for dir in pieces {
        if dir.is_dir() {
            continue;
        }
        match fs::create_dir(&dir) {
            Ok(()) => info!(area, path = %dir.display(), "restored missing folder"),
            Err(e) => {
                warn!(area, path = %dir.display(), error = %e, "could not restore folder");
                complete = false;
            }
        }
    }
    complete
}

/// Whether the full survey-area layout is present.
pub fn survey_area_exists(data_root: &Path, area: &str) -> bool {
    let area_path = survey_area_path(data_root, area);
    SURVEY_AREA_SUBDIRS
        .iter()
        .all(|sub| area_path.join(sub).is_dir())
}

/// Names of the survey areas under the data root, sorted.
pub fn list_survey_areas(data_root: &Path) -> Result<Vec<String>> {
    let root = survey_areas_root(data_root);
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut areas = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            areas.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    areas.sort();
    Ok(areas)
}

/// File names of the catalogs (`*.db`) in a survey area's catalog folder, sorted.
pub fn list_catalogs(data_root: &Path, area: &str) -> Result<Vec<String>> {
    let folder = catalog_folder(data_root, area);
    if !folder.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(&folder).min_depth(1).max_depth(1) {
        let entry = entry?;
        let is_db = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("db"));
        if entry.file_type().is_file() && is_db {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
