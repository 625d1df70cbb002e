use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::{Catalog, RecordStore};
use crate::domain::FinRecord;
use crate::error::Result;
use crate::image_meta;

/// Name of the list file handed to the archiver.
pub const LIST_FILE_NAME: &str = "filesToArchive.txt";

/// Ordered, duplicate-free list of the files that travel with a catalog: the
/// catalog file first, then every image its records reference. Paths compare
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    entries: Vec<PathBuf>,
    seen: HashSet<String>,
}

fn key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

fn resolve(folder: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        folder.join(path)
    }
}

/// Last component of a declared filename, which may carry either separator.
fn file_component(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
}

/// Original image that travels with `fin`'s primary `image`.
///
/// The name declared in the PNG metadata wins and resolves against `folder`;
/// without one the record's stored original is used.
pub fn original_image_for(fin: &FinRecord, image: &Path, folder: &Path) -> Option<PathBuf> {
    let declared = match image_meta::read_original_image_name(image) {
        Ok(declared) => declared,
        Err(e) => {
            debug!(image = %image.display(), error = %e, "no readable image metadata");
            None
        }
    };
    match declared {
        Some(name) => Some(folder.join(file_component(&name))),
        None => fin.original_image().map(|p| resolve(folder, p)),
    }
}

impl ArchiveManifest {
    pub fn new(catalog_file: &Path) -> Self {
        let mut manifest = Self {
            entries: Vec::new(),
            seen: HashSet::new(),
        };
        manifest.insert(catalog_file.to_path_buf());
        manifest
    }

    /// Add a path unless an entry that differs only by case is present.
    /// Returns whether it was added.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if !self.seen.insert(key(&path)) {
            return false;
        }
        self.entries.push(path);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(&key(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn catalog_file(&self) -> &Path {
        &self.entries[0]
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.entries[1..]
    }

    /// Walk every record of an open catalog and collect its files.
    ///
    /// A primary image is visited once; on first sight its original is added
    /// as well, see [`original_image_for`].
    pub fn build(catalog: &Catalog) -> Result<Self> {
        catalog.ensure_loaded()?;
        let folder = catalog.folder();
        let mut manifest = Self::new(catalog.filename());

        for fin in catalog.records_absolute()?.into_iter().flatten() {
            if !fin.has_image() {
                continue;
            }

            let image = resolve(folder, &fin.image_filename);
            if !manifest.insert(image.clone()) {
                continue;
            }

            if let Some(original) = original_image_for(&fin, &image, folder) {
                manifest.insert(original);
            }
        }

        debug!(
            catalog = %catalog.filename().display(),
            files = manifest.len(),
            "built archive manifest"
        );
        Ok(manifest)
    }

    /// Write `<temp_dir>/filesToArchive.txt`: one quoted path per line, the list
    /// file itself first, then the manifest entries in order.
    pub fn write_list_file(&self, temp_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(temp_dir)?;
        let list_path = temp_dir.join(LIST_FILE_NAME);
        let mut out = fs::File::create(&list_path)?;
        writeln!(out, "\"{}\"", list_path.display())?;
        for entry in &self.entries {
            writeln!(out, "\"{}\"", entry.display())?;
        }
        out.flush()?;
        Ok(list_path)
    }
}
