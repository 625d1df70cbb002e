use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

pub const REPLACE_TITLE: &str = "REPLACE existing file?";

/// Asks whether an existing file may be replaced.
pub trait ConfirmOverwrite {
    fn confirm_overwrite(&self, title: &str, message: &str, target: &Path) -> bool;
}

impl<F> ConfirmOverwrite for F
where
    F: Fn(&str, &str, &Path) -> bool,
{
    fn confirm_overwrite(&self, title: &str, message: &str, target: &Path) -> bool {
        self(title, message, target)
    }
}

/// Fixed answer, for non-interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl ConfirmOverwrite for AutoConfirm {
    fn confirm_overwrite(&self, _title: &str, _message: &str, _target: &Path) -> bool {
        self.0
    }
}

/// Clear `target` for writing. When a file is there, the collaborator decides:
/// a refusal leaves it untouched and fails with `UserDeclinedOverwrite`, an
/// approval deletes it.
pub fn prepare_target(
    target: &Path,
    message: &str,
    confirm: &dyn ConfirmOverwrite,
) -> Result<()> {
    if !target.exists() {
        return Ok(());
    }
    if !confirm.confirm_overwrite(REPLACE_TITLE, message, target) {
        info!(path = %target.display(), "replacement declined");
        return Err(Error::UserDeclinedOverwrite(target.to_path_buf()));
    }
    fs::remove_file(target)?;
    info!(path = %target.display(), "removed existing file");
    Ok(())
}
