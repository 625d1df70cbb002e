use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::RecordStore;
use crate::domain::*;
use crate::error::{Error, Result};
use crate::format::LEGACY_SIGNATURE;

/// Marker line for a deleted record slot.
pub const HOLE: &str = "-";

/// Read-only catalog in the legacy line-oriented format. The whole file is
/// loaded on open; absolute indices keep deleted slots as holes.
pub struct LegacyCatalog {
    path: PathBuf,
    scheme: CatalogScheme,
    slots: Vec<Option<FinRecord>>,
    stream_open: bool,
}

impl LegacyCatalog {
    pub fn open(path: &Path) -> Result<Self> {
        let (scheme, slots) = read_slots(path)?;
        debug!(
            path = %path.display(),
            slots = slots.len(),
            "loaded legacy catalog"
        );
        Ok(Self {
            path: path.to_path_buf(),
            scheme,
            slots,
            stream_open: true,
        })
    }

    fn slots(&self) -> Result<&[Option<FinRecord>]> {
        if self.stream_open {
            Ok(&self.slots)
        } else {
            Err(Error::StreamClosed(self.path.clone()))
        }
    }
}

impl RecordStore for LegacyCatalog {
    fn status(&self) -> CatalogStatus {
        CatalogStatus::Loaded
    }

    fn filename(&self) -> &Path {
        &self.path
    }

    fn scheme(&self) -> &CatalogScheme {
        &self.scheme
    }

    fn size_absolute(&self) -> Result<usize> {
        Ok(self.slots()?.len())
    }

    fn get_item_absolute(&self, index: usize) -> Result<Option<FinRecord>> {
        Ok(self.slots()?.get(index).cloned().flatten())
    }

    fn records_absolute(&self) -> Result<Vec<Option<FinRecord>>> {
        Ok(self.slots()?.to_vec())
    }

    fn add(&mut self, _fin: &FinRecord) -> Result<()> {
        Err(Error::ReadOnlyCatalog(self.path.clone()))
    }

    fn close_stream(&mut self) -> Result<()> {
        self.stream_open = false;
        Ok(())
    }

    fn open_stream(&mut self) -> Result<()> {
        if !self.stream_open {
            let (scheme, slots) = read_slots(&self.path)?;
            self.scheme = scheme;
            self.slots = slots;
            self.stream_open = true;
        }
        Ok(())
    }
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> Error {
    Error::LegacyParse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

fn read_slots(path: &Path) -> Result<(CatalogScheme, Vec<Option<FinRecord>>)> {
    let file = fs::File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let signature = lines
        .next()
        .transpose()?
        .ok_or_else(|| parse_error(path, 1, "empty file"))?;
    if signature.trim_end().as_bytes() != LEGACY_SIGNATURE {
        return Err(parse_error(path, 1, "missing legacy signature"));
    }

    let scheme_line = lines
        .next()
        .transpose()?
        .ok_or_else(|| parse_error(path, 2, "missing catalog scheme"))?;
    let scheme: CatalogScheme = serde_json::from_str(&scheme_line)
        .map_err(|e| parse_error(path, 2, e.to_string()))?;

    let mut slots = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == HOLE {
            slots.push(None);
            continue;
        }
        let fin: FinRecord =
            serde_json::from_str(line).map_err(|e| parse_error(path, offset + 3, e.to_string()))?;
        slots.push(Some(fin));
    }

    Ok((scheme, slots))
}

/// Write a catalog in the legacy format. Only used to produce legacy files for
/// conversion tests and fixtures; the legacy store itself never writes.
pub fn write_legacy(
    path: &Path,
    scheme: &CatalogScheme,
    slots: &[Option<FinRecord>],
) -> Result<()> {
    let mut out = fs::File::create(path)?;
    out.write_all(LEGACY_SIGNATURE)?;
    writeln!(out)?;
    writeln!(out, "{}", serde_json::to_string(scheme)?)?;
    for slot in slots {
        match slot {
            Some(fin) => writeln!(out, "{}", serde_json::to_string(fin)?)?,
            None => writeln!(out, "{HOLE}")?,
        }
    }
    out.flush()?;
    Ok(())
}
