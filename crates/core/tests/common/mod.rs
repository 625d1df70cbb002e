#![allow(dead_code)]

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use fincatalog_core::archive::{Archiver, ExtractRequest, OverwriteMode};
use fincatalog_core::config::Settings;
use fincatalog_core::error::Result;
use fincatalog_core::image_meta::ORIGINAL_IMAGE_KEYWORD;
use fincatalog_core::CatalogManager;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Entry {
    name: String,
    data: Vec<u8>,
}

/// Stand-in for 7-Zip: an "archive" is a JSON list of file names and bytes.
///
/// Entries are stored by file name only, missing list entries make the run
/// partial (exit 1), and extraction honours include/exclude patterns and the
/// overwrite mode the way the real tool does.
pub struct JsonArchiver;

fn matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => name.to_lowercase().ends_with(&suffix.to_lowercase()),
        None => name.eq_ignore_ascii_case(pattern),
    }
}

impl Archiver for JsonArchiver {
    fn create(&self, dest: &Path, list_file: &Path) -> Result<Option<i32>> {
        let list = fs::read_to_string(list_file)?;
        let mut entries = Vec::new();
        let mut skipped = false;
        for line in list.lines() {
            let path = Path::new(line.trim().trim_matches('"'));
            match fs::read(path) {
                Ok(data) => entries.push(Entry {
                    name: path.file_name().unwrap().to_string_lossy().into_owned(),
                    data,
                }),
                Err(_) => skipped = true,
            }
        }
        fs::write(dest, serde_json::to_vec(&entries)?)?;
        Ok(Some(if skipped { 1 } else { 0 }))
    }

    fn extract(&self, request: &ExtractRequest) -> Result<Option<i32>> {
        let Ok(bytes) = fs::read(&request.archive) else {
            return Ok(Some(2));
        };
        let Ok(entries) = serde_json::from_slice::<Vec<Entry>>(&bytes) else {
            return Ok(Some(2));
        };
        fs::create_dir_all(&request.dest_dir)?;
        for entry in entries {
            if request.exclude.iter().any(|p| matches(p, &entry.name)) {
                continue;
            }
            if !request.include.is_empty()
                && !request.include.iter().any(|p| matches(p, &entry.name))
            {
                continue;
            }
            let target = request.dest_dir.join(&entry.name);
            if target.exists() && request.mode == OverwriteMode::KeepExisting {
                continue;
            }
            fs::write(target, entry.data)?;
        }
        Ok(Some(0))
    }
}

/// Names stored in a fake archive.
pub fn archive_names(archive: &Path) -> Vec<String> {
    let entries: Vec<Entry> = serde_json::from_slice(&fs::read(archive).unwrap()).unwrap();
    entries.into_iter().map(|e| e.name).collect()
}

pub fn manager(root: &Path) -> CatalogManager {
    let settings = Settings::default()
        .with_data_root(root.join("area1"))
        .with_temp_dir(root.join("tmp"));
    CatalogManager::with_archiver(settings, Box::new(JsonArchiver))
}

/// Tiny grayscale PNG, optionally declaring the original image it came from.
pub fn write_png(path: &Path, original: Option<&str>) {
    let file = fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(BufWriter::new(file), 2, 2);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    if let Some(original) = original {
        encoder
            .add_text_chunk(ORIGINAL_IMAGE_KEYWORD.to_string(), original.to_string())
            .unwrap();
    }
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[0, 64, 128, 255]).unwrap();
}
