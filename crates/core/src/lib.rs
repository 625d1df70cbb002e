pub mod archive;
pub mod catalog;
pub mod config;
pub mod confirm;
pub mod domain;
pub mod error;
pub mod finz;
pub mod format;
pub mod image_meta;
pub mod layout;
pub mod lifecycle;
pub mod manifest;
pub mod naming;

use std::path::Path;

use archive::{ArchiveOutcome, Archiver, SevenZip};
use catalog::{Catalog, RecordStore};
use config::Settings;
use confirm::ConfirmOverwrite;
use domain::FinRecord;
use error::{Error, Result};
use finz::FinzReport;
use lifecycle::{ArchiveReport, CopyProgress};

/// The main entry point for the catalog library: lifecycle operations bound
/// to one set of settings and one archiver.
pub struct CatalogManager {
    settings: Settings,
    archiver: Box<dyn Archiver>,
}

impl CatalogManager {
    /// Manager using the 7-Zip executable named in the settings.
    pub fn new(settings: Settings) -> Self {
        let archiver = Box::new(SevenZip::new(settings.archiver.clone()));
        Self { settings, archiver }
    }

    pub fn with_archiver(settings: Settings, archiver: Box<dyn Archiver>) -> Self {
        Self { settings, archiver }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Make sure the data root and its top-level folders exist.
    pub fn init(&self) -> bool {
        layout::ensure_data_root(&self.settings.data_root, true)
    }

    pub fn survey_areas(&self) -> Result<Vec<String>> {
        layout::list_survey_areas(&self.settings.data_root)
    }

    pub fn catalogs(&self, area: &str) -> Result<Vec<String>> {
        layout::list_catalogs(&self.settings.data_root, area)
    }

    /// Path of a catalog file inside a survey area.
    pub fn catalog_path(&self, area: &str, name: &str) -> std::path::PathBuf {
        layout::catalog_folder(&self.settings.data_root, area)
            .join(naming::ensure_extension(Path::new(name), "db"))
    }

    /// Open a catalog; see [`lifecycle::open`].
    pub fn open(
        &self,
        path: &Path,
        create_if_missing: bool,
        progress: Option<&mut dyn FnMut(CopyProgress)>,
    ) -> Result<Catalog> {
        lifecycle::open(path, create_if_missing, &self.settings, progress)
    }

    /// Open a catalog that must exist; see [`lifecycle::open_existing`].
    pub fn open_existing(
        &self,
        path: &Path,
        progress: Option<&mut dyn FnMut(CopyProgress)>,
    ) -> Result<Catalog> {
        lifecycle::open_existing(path, progress)
    }

    pub fn create(&self, area: &str, name: &str) -> Result<Catalog> {
        lifecycle::create_catalog(&self.settings, area, name)
    }

    pub fn convert(
        &self,
        path: &Path,
        progress: Option<&mut dyn FnMut(CopyProgress)>,
    ) -> Result<Catalog> {
        lifecycle::convert(path, progress)
    }

    pub fn duplicate(
        &self,
        source: &Catalog,
        target: &Path,
        progress: Option<&mut dyn FnMut(CopyProgress)>,
    ) -> Result<Catalog> {
        lifecycle::duplicate(source, target, progress)
    }

    pub fn backup(&self, catalog: &mut Catalog) -> Result<ArchiveReport> {
        lifecycle::backup(catalog, &self.settings, self.archiver.as_ref())
    }

    pub fn export(
        &self,
        catalog: &mut Catalog,
        dest: &Path,
        confirm: &dyn ConfirmOverwrite,
    ) -> Result<ArchiveReport> {
        lifecycle::export(catalog, dest, &self.settings, confirm, self.archiver.as_ref())
    }

    pub fn restore(&self, archive: &Path, area: &str) -> Result<ArchiveOutcome> {
        lifecycle::restore(archive, area, &self.settings, self.archiver.as_ref())
    }

    pub fn import(&self, archive: &Path, area: &str) -> Result<ArchiveOutcome> {
        lifecycle::import(archive, area, &self.settings, self.archiver.as_ref())
    }

    /// Package the record with `id_code` from `catalog` as a `.finz` file.
    pub fn export_fin(
        &self,
        catalog: &Catalog,
        id_code: &str,
        dest: &Path,
        confirm: &dyn ConfirmOverwrite,
    ) -> Result<FinzReport> {
        catalog.ensure_loaded()?;
        let fin = lifecycle::find_fin(catalog, id_code)?
            .ok_or_else(|| Error::FinNotFound(id_code.to_string()))?;
        finz::export_fin(
            &fin,
            catalog.folder(),
            dest,
            &self.settings.temp_dir,
            confirm,
            self.archiver.as_ref(),
        )
    }

    pub fn import_fin(&self, archive: &Path, target: &mut Catalog) -> Result<FinRecord> {
        finz::import_fin(
            archive,
            target,
            &self.settings.temp_dir,
            self.archiver.as_ref(),
        )
    }

    pub fn read_fin(&self, archive: &Path) -> Result<FinRecord> {
        finz::read_fin(archive, &self.settings.temp_dir, self.archiver.as_ref())
    }

    /// Records present in a catalog, in absolute order.
    pub fn fins(&self, catalog: &Catalog) -> Result<Vec<FinRecord>> {
        Ok(catalog.records_absolute()?.into_iter().flatten().collect())
    }
}
