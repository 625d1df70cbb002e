use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Load status of a catalog. Callers check this instead of relying on errors
/// when a path could not be turned into a usable catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogStatus {
    Loaded,
    FileNotFound,
    InvalidFormat,
    ErrorOpening,
}

impl CatalogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogStatus::Loaded => "loaded",
            CatalogStatus::FileNotFound => "file not found",
            CatalogStatus::InvalidFormat => "invalid format",
            CatalogStatus::ErrorOpening => "error opening",
        }
    }
}

impl fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which on-disk representation backs a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Current,
    Legacy,
    Invalid,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Current => "current",
            CatalogKind::Legacy => "legacy",
            CatalogKind::Invalid => "invalid",
        }
    }
}

pub const DEFAULT_CATEGORY: &str = "NONE";
pub const DEFAULT_SCHEME_NAME: &str = "Eckerd College";

/// Damage-category taxonomy a catalog enforces when accepting records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogScheme {
    pub name: String,
    pub categories: Vec<String>,
}

impl CatalogScheme {
    pub fn new(name: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            name: name.into(),
            categories,
        }
    }

    /// Look up a category name, ignoring ASCII case. Returns the scheme's spelling.
    pub fn find_category(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    pub fn contains_category(&self, name: &str) -> bool {
        self.find_category(name).is_some()
    }
}

impl Default for CatalogScheme {
    fn default() -> Self {
        let categories = [
            DEFAULT_CATEGORY,
            "Upper",
            "Middle",
            "Lower",
            "Upper-Middle",
            "Upper-Lower",
            "Middle-Lower",
            "Entire",
            "Leading Edge",
            "Tip-Nick",
            "Tip-Missing",
            "Extensive",
            "Multiple",
            "Unknown",
        ];
        Self::new(
            DEFAULT_SCHEME_NAME,
            categories.iter().map(|c| c.to_string()).collect(),
        )
    }
}

/// One recorded image modification, replayed on the original to produce the
/// modified image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageMod {
    Flip,
    Contrast { min: i64, max: i64 },
    Brighten { amount: i64 },
    Crop { x_min: i64, y_min: i64, x_max: i64, y_max: i64 },
    Undo,
    Redo,
    Contrast2 { min: i64, max: i64 },
    Rotate90Cw,
    Rotate90Ccw,
}

impl ImageMod {
    /// Stable operation code used in the SQLite store.
    pub fn code(&self) -> i64 {
        match self {
            ImageMod::Flip => 1,
            ImageMod::Contrast { .. } => 2,
            ImageMod::Brighten { .. } => 3,
            ImageMod::Crop { .. } => 4,
            ImageMod::Undo => 5,
            ImageMod::Redo => 6,
            ImageMod::Contrast2 { .. } => 7,
            ImageMod::Rotate90Cw => 8,
            ImageMod::Rotate90Ccw => 9,
        }
    }

    pub fn values(&self) -> [i64; 4] {
        match *self {
            ImageMod::Contrast { min, max } | ImageMod::Contrast2 { min, max } => [min, max, 0, 0],
            ImageMod::Brighten { amount } => [amount, 0, 0, 0],
            ImageMod::Crop {
                x_min,
                y_min,
                x_max,
                y_max,
            } => [x_min, y_min, x_max, y_max],
            _ => [0; 4],
        }
    }

    pub fn from_parts(code: i64, values: [i64; 4]) -> Option<Self> {
        let [v1, v2, v3, v4] = values;
        let m = match code {
            1 => ImageMod::Flip,
            2 => ImageMod::Contrast { min: v1, max: v2 },
            3 => ImageMod::Brighten { amount: v1 },
            4 => ImageMod::Crop {
                x_min: v1,
                y_min: v2,
                x_max: v3,
                y_max: v4,
            },
            5 => ImageMod::Undo,
            6 => ImageMod::Redo,
            7 => ImageMod::Contrast2 { min: v1, max: v2 },
            8 => ImageMod::Rotate90Cw,
            9 => ImageMod::Rotate90Ccw,
            _ => return None,
        };
        Some(m)
    }
}

/// One catalog entry: an identified individual and the image it was traced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinRecord {
    pub id_code: String,
    #[serde(default)]
    pub name: String,
    pub damage_category: String,
    /// Primary (modified) image. Relative paths resolve against the catalog folder.
    pub image_filename: PathBuf,
    #[serde(default)]
    pub original_image_filename: Option<PathBuf>,
    #[serde(default)]
    pub image_mods: Vec<ImageMod>,
    /// Trace file the record was loaded from, for single-file traces.
    #[serde(default)]
    pub fin_filename: Option<PathBuf>,
}

impl FinRecord {
    pub fn new(
        id_code: impl Into<String>,
        damage_category: impl Into<String>,
        image_filename: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id_code: id_code.into(),
            name: String::new(),
            damage_category: damage_category.into(),
            image_filename: image_filename.into(),
            original_image_filename: None,
            image_mods: Vec::new(),
            fin_filename: None,
        }
    }

    pub fn with_original(mut self, original: impl Into<PathBuf>) -> Self {
        self.original_image_filename = Some(original.into());
        self
    }

    pub fn has_image(&self) -> bool {
        !self.image_filename.as_os_str().is_empty()
    }

    /// The stored original image reference, ignoring empty values.
    pub fn original_image(&self) -> Option<&Path> {
        self.original_image_filename
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mod_parts_roundtrip_keeps_values() {
        let crop = ImageMod::Crop {
            x_min: 1,
            y_min: 2,
            x_max: 30,
            y_max: 40,
        };
        assert_eq!(ImageMod::from_parts(crop.code(), crop.values()), Some(crop));
        assert_eq!(ImageMod::from_parts(0, [0; 4]), None);
        assert_eq!(ImageMod::from_parts(42, [0; 4]), None);
    }

    #[test]
    fn test_scheme_category_lookup_ignores_case() {
        let scheme = CatalogScheme::default();
        assert_eq!(scheme.find_category("tip-nick"), Some("Tip-Nick"));
        assert!(scheme.contains_category("none"));
        assert!(!scheme.contains_category("Dorsal"));
    }

    #[test]
    fn test_original_image_ignores_empty_path() {
        let fin = FinRecord::new("A1", "NONE", "a.png").with_original("");
        assert!(fin.original_image().is_none());
        let fin = FinRecord::new("A1", "NONE", "a.png").with_original("orig.jpg");
        assert_eq!(fin.original_image(), Some(Path::new("orig.jpg")));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CatalogStatus::FileNotFound.to_string(), "file not found");
    }
}
