use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header every SQLite 3 database file starts with.
pub const SQLITE_SIGNATURE: &[u8; 16] = b"SQLite format 3\0";

/// First bytes of a legacy catalog file.
pub const LEGACY_SIGNATURE: &[u8] = b"DARWIN-OLDDB";

/// How a catalog path can be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// Missing, not a file, or neither signature matches.
    Unreadable,
    /// Legacy catalog that must be converted before use.
    Convertible,
    /// Current-format catalog.
    Openable,
}

/// Classify a path by its signature bytes. Reads at most 16 bytes and never
/// opens a database connection.
pub fn classify(path: &Path) -> CatalogFormat {
    let Some(header) = read_header(path) else {
        return CatalogFormat::Unreadable;
    };

    if header.as_slice() == SQLITE_SIGNATURE {
        CatalogFormat::Openable
    } else if header.starts_with(LEGACY_SIGNATURE) {
        CatalogFormat::Convertible
    } else {
        CatalogFormat::Unreadable
    }
}

fn read_header(path: &Path) -> Option<Vec<u8>> {
    if !path.is_file() {
        return None;
    }
    let file = File::open(path).ok()?;
    let mut header = Vec::with_capacity(SQLITE_SIGNATURE.len());
    file.take(SQLITE_SIGNATURE.len() as u64)
        .read_to_end(&mut header)
        .ok()?;
    Some(header)
}
