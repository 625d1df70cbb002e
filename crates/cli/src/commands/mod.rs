pub mod archive;
pub mod catalog;
pub mod fin;
pub mod layout;

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Result};
use fincatalog_core::catalog::{Catalog, RecordStore};
use fincatalog_core::confirm::ConfirmOverwrite;
use fincatalog_core::lifecycle::CopyProgress;
use fincatalog_core::CatalogManager;
use indicatif::{ProgressBar, ProgressStyle};

/// Asks on the terminal before a file is replaced.
pub struct TerminalConfirm {
    pub assume_yes: bool,
}

impl ConfirmOverwrite for TerminalConfirm {
    fn confirm_overwrite(&self, title: &str, message: &str, target: &Path) -> bool {
        if self.assume_yes {
            return true;
        }
        eprintln!("{title}");
        eprintln!("{message}");
        eprintln!("  {}", target.display());
        eprint!("Replace it? [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

pub fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

/// Drive a progress bar from record-copy events.
pub fn on_copy(pb: &ProgressBar, progress: CopyProgress) {
    match progress {
        CopyProgress::Start { total } => {
            pb.set_length(total as u64);
            pb.set_position(0);
            pb.set_message("Copying fins...");
        }
        CopyProgress::Copied { id_code, .. } => {
            pb.inc(1);
            pb.set_message(id_code);
        }
        CopyProgress::Hole { .. } => {
            pb.inc(1);
        }
        CopyProgress::Complete { copied, holes } => {
            pb.finish_with_message(format!("{copied} copied, {holes} deleted slots skipped"));
        }
    }
}

/// Open an existing catalog, converting a legacy one with a progress bar.
pub fn open_catalog(mgr: &CatalogManager, path: &Path) -> Result<Catalog> {
    let pb = progress_bar()?;
    let catalog = mgr.open_existing(path, Some(&mut |p| on_copy(&pb, p)))?;
    if !catalog.is_loaded() {
        bail!(
            "cannot use catalog {}: {}",
            path.display(),
            catalog.status()
        );
    }
    Ok(catalog)
}
