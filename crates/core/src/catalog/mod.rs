pub mod legacy;
pub mod schema;
pub mod sqlite;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::*;
use crate::error::{Error, Result};

pub use legacy::LegacyCatalog;
pub use sqlite::SqliteCatalog;

/// Capability set shared by every catalog representation.
///
/// Records are addressed two ways: by absolute index, which is stable and may
/// land on a deleted hole (`Ok(None)`), and by compacted index, which only
/// counts present records.
pub trait RecordStore {
    fn status(&self) -> CatalogStatus;
    fn filename(&self) -> &Path;
    fn scheme(&self) -> &CatalogScheme;

    fn size_absolute(&self) -> Result<usize>;
    fn get_item_absolute(&self, index: usize) -> Result<Option<FinRecord>>;
    fn add(&mut self, fin: &FinRecord) -> Result<()>;

    /// Every absolute slot in order, holes included.
    fn records_absolute(&self) -> Result<Vec<Option<FinRecord>>> {
        (0..self.size_absolute()?)
            .map(|i| self.get_item_absolute(i))
            .collect()
    }

    /// Release the backing file so an external tool can read it.
    fn close_stream(&mut self) -> Result<()>;
    fn open_stream(&mut self) -> Result<()>;

    fn size(&self) -> Result<usize> {
        let mut count = 0;
        for i in 0..self.size_absolute()? {
            if self.get_item_absolute(i)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn get_item(&self, index: usize) -> Result<Option<FinRecord>> {
        let mut seen = 0;
        for i in 0..self.size_absolute()? {
            if let Some(fin) = self.get_item_absolute(i)? {
                if seen == index {
                    return Ok(Some(fin));
                }
                seen += 1;
            }
        }
        Ok(None)
    }
}

/// Placeholder for a path that could not be turned into a usable catalog.
/// Record access fails with `CatalogNotLoaded`.
pub struct InvalidCatalog {
    path: PathBuf,
    status: CatalogStatus,
    scheme: CatalogScheme,
}

impl InvalidCatalog {
    pub fn new(path: &Path, status: CatalogStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            scheme: CatalogScheme::new("", Vec::new()),
        }
    }

    fn not_loaded(&self) -> Error {
        Error::CatalogNotLoaded {
            path: self.path.clone(),
            status: self.status,
        }
    }
}

impl RecordStore for InvalidCatalog {
    fn status(&self) -> CatalogStatus {
        self.status
    }

    fn filename(&self) -> &Path {
        &self.path
    }

    fn scheme(&self) -> &CatalogScheme {
        &self.scheme
    }

    fn size_absolute(&self) -> Result<usize> {
        Err(self.not_loaded())
    }

    fn get_item_absolute(&self, _index: usize) -> Result<Option<FinRecord>> {
        Err(self.not_loaded())
    }

    fn add(&mut self, _fin: &FinRecord) -> Result<()> {
        Err(self.not_loaded())
    }

    fn close_stream(&mut self) -> Result<()> {
        Ok(())
    }

    fn open_stream(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A catalog in whichever representation its file turned out to be.
pub enum Catalog {
    Current(SqliteCatalog),
    Legacy(LegacyCatalog),
    Invalid(InvalidCatalog),
}

impl Catalog {
    pub fn invalid(path: &Path, status: CatalogStatus) -> Self {
        Catalog::Invalid(InvalidCatalog::new(path, status))
    }

    pub fn kind(&self) -> CatalogKind {
        match self {
            Catalog::Current(_) => CatalogKind::Current,
            Catalog::Legacy(_) => CatalogKind::Legacy,
            Catalog::Invalid(_) => CatalogKind::Invalid,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == CatalogStatus::Loaded
    }

    /// Fail with `CatalogNotLoaded` unless records can be read.
    pub fn ensure_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(Error::CatalogNotLoaded {
                path: self.filename().to_path_buf(),
                status: self.status(),
            })
        }
    }

    /// Folder holding the catalog file; relative image references resolve here.
    pub fn folder(&self) -> &Path {
        self.filename().parent().unwrap_or_else(|| Path::new(""))
    }

    fn store(&self) -> &dyn RecordStore {
        match self {
            Catalog::Current(c) => c,
            Catalog::Legacy(c) => c,
            Catalog::Invalid(c) => c,
        }
    }

    fn store_mut(&mut self) -> &mut dyn RecordStore {
        match self {
            Catalog::Current(c) => c,
            Catalog::Legacy(c) => c,
            Catalog::Invalid(c) => c,
        }
    }
}

impl RecordStore for Catalog {
    fn status(&self) -> CatalogStatus {
        self.store().status()
    }

    fn filename(&self) -> &Path {
        self.store().filename()
    }

    fn scheme(&self) -> &CatalogScheme {
        self.store().scheme()
    }

    fn size_absolute(&self) -> Result<usize> {
        self.store().size_absolute()
    }

    fn get_item_absolute(&self, index: usize) -> Result<Option<FinRecord>> {
        self.store().get_item_absolute(index)
    }

    fn records_absolute(&self) -> Result<Vec<Option<FinRecord>>> {
        self.store().records_absolute()
    }

    fn add(&mut self, fin: &FinRecord) -> Result<()> {
        self.store_mut().add(fin)
    }

    fn close_stream(&mut self) -> Result<()> {
        self.store_mut().close_stream()
    }

    fn open_stream(&mut self) -> Result<()> {
        self.store_mut().open_stream()
    }

    fn size(&self) -> Result<usize> {
        self.store().size()
    }

    fn get_item(&self, index: usize) -> Result<Option<FinRecord>> {
        self.store().get_item(index)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("kind", &self.kind())
            .field("path", &self.filename())
            .field("status", &self.status())
            .finish()
    }
}

impl From<SqliteCatalog> for Catalog {
    fn from(c: SqliteCatalog) -> Self {
        Catalog::Current(c)
    }
}

impl From<LegacyCatalog> for Catalog {
    fn from(c: LegacyCatalog) -> Self {
        Catalog::Legacy(c)
    }
}
