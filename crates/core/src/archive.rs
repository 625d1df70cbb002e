use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, RecordStore};
use crate::error::{Error, Result};
use crate::manifest::{ArchiveManifest, LIST_FILE_NAME};

/// How an archiver run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Complete,
    /// The tool skipped some files (locked or missing) but produced output.
    Partial,
}

impl ArchiveOutcome {
    pub fn combine(self, other: ArchiveOutcome) -> ArchiveOutcome {
        if self == ArchiveOutcome::Partial || other == ArchiveOutcome::Partial {
            ArchiveOutcome::Partial
        } else {
            ArchiveOutcome::Complete
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveOutcome::Complete => "complete",
            ArchiveOutcome::Partial => "partial",
        }
    }
}

/// What to do with files that already exist in the extraction folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    Overwrite,
    KeepExisting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub archive: PathBuf,
    pub dest_dir: PathBuf,
    /// Wildcard patterns to extract; empty means everything.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub mode: OverwriteMode,
}

/// External compression tool. Implementations return the tool's raw exit
/// code (`None` when it was killed by a signal); interpretation happens in
/// [`classify_exit`].
pub trait Archiver {
    fn create(&self, dest: &Path, list_file: &Path) -> Result<Option<i32>>;
    fn extract(&self, request: &ExtractRequest) -> Result<Option<i32>>;
}

/// Exit code 0 is a full success, 1 a tolerated partial one, anything else
/// a failure.
pub fn classify_exit(code: Option<i32>) -> Result<ArchiveOutcome> {
    match code {
        Some(0) => Ok(ArchiveOutcome::Complete),
        Some(1) => Ok(ArchiveOutcome::Partial),
        code => Err(Error::ArchiveToolFailure { code }),
    }
}

/// 7-Zip command-line adapter.
#[derive(Debug, Clone)]
pub struct SevenZip {
    program: PathBuf,
}

impl SevenZip {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `7z a -tzip <dest> @<list>`
    pub fn create_command(&self, dest: &Path, list_file: &Path) -> Command {
        let mut list_arg = OsString::from("@");
        list_arg.push(list_file);

        let mut cmd = Command::new(&self.program);
        cmd.arg("a").arg("-tzip").arg(dest).arg(list_arg);
        cmd
    }

    /// `7z x -aoa|-aos -o<dir> [-x!<pattern>...] <archive> [<pattern>...]`
    pub fn extract_command(&self, request: &ExtractRequest) -> Command {
        let mut out_arg = OsString::from("-o");
        out_arg.push(&request.dest_dir);

        let mut cmd = Command::new(&self.program);
        cmd.arg("x")
            .arg(match request.mode {
                OverwriteMode::Overwrite => "-aoa",
                OverwriteMode::KeepExisting => "-aos",
            })
            .arg(out_arg);
        for pattern in &request.exclude {
            cmd.arg(format!("-x!{pattern}"));
        }
        cmd.arg(&request.archive);
        cmd.args(&request.include);
        cmd
    }

    fn run(&self, mut cmd: Command) -> Result<Option<i32>> {
        debug!(command = ?cmd, "running archiver");
        let output = cmd.output().map_err(|source| Error::ArchiverUnavailable {
            program: self.program.clone(),
            source,
        })?;
        let code = output.status.code();
        if code != Some(0) {
            debug!(
                ?code,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "archiver reported problems"
            );
        }
        Ok(code)
    }
}

impl Archiver for SevenZip {
    fn create(&self, dest: &Path, list_file: &Path) -> Result<Option<i32>> {
        self.run(self.create_command(dest, list_file))
    }

    fn extract(&self, request: &ExtractRequest) -> Result<Option<i32>> {
        self.run(self.extract_command(request))
    }
}

fn log_outcome(outcome: ArchiveOutcome, what: &str, path: &Path) {
    match outcome {
        ArchiveOutcome::Complete => info!(path = %path.display(), "{what} complete"),
        ArchiveOutcome::Partial => warn!(
            path = %path.display(),
            "{what} finished with warnings, some files were skipped"
        ),
    }
}

/// Archive a catalog and the files in its manifest into `dest`.
///
/// The catalog's stream is closed while the tool runs and reopened afterwards
/// whatever the result; the list file is removed in every case.
pub fn create_archive(
    catalog: &mut Catalog,
    manifest: &ArchiveManifest,
    dest: &Path,
    temp_dir: &Path,
    archiver: &dyn Archiver,
) -> Result<ArchiveOutcome> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let list_file = manifest.write_list_file(temp_dir)?;
    info!(
        catalog = %catalog.filename().display(),
        archive = %dest.display(),
        files = manifest.len(),
        "creating archive"
    );

    let code = match catalog.close_stream() {
        Ok(()) => archiver.create(dest, &list_file),
        Err(e) => Err(e),
    };
    let reopened = catalog.open_stream();
    if let Err(e) = fs::remove_file(&list_file) {
        warn!(path = %list_file.display(), error = %e, "could not remove archive list file");
    }

    let outcome = classify_exit(code?)?;
    reopened?;
    log_outcome(outcome, "archive", dest);
    Ok(outcome)
}

/// Unpack a catalog archive into `dest_dir`: catalog files (`*.db`) replace
/// what is there, everything else only fills in missing files.
pub fn extract_catalog_files(
    archive: &Path,
    dest_dir: &Path,
    archiver: &dyn Archiver,
) -> Result<ArchiveOutcome> {
    info!(archive = %archive.display(), dest = %dest_dir.display(), "extracting archive");

    let catalogs = ExtractRequest {
        archive: archive.to_path_buf(),
        dest_dir: dest_dir.to_path_buf(),
        include: vec!["*.db".to_string()],
        exclude: Vec::new(),
        mode: OverwriteMode::Overwrite,
    };
    let first = classify_exit(archiver.extract(&catalogs)?)?;

    let images = ExtractRequest {
        include: Vec::new(),
        exclude: vec![LIST_FILE_NAME.to_string(), "*.db".to_string()],
        mode: OverwriteMode::KeepExisting,
        ..catalogs
    };
    let second = classify_exit(archiver.extract(&images)?)?;

    let outcome = first.combine(second);
    log_outcome(outcome, "extraction", archive);
    Ok(outcome)
}

/// Unpack everything from an archive into `dest_dir`, replacing existing files.
pub fn extract_all(
    archive: &Path,
    dest_dir: &Path,
    archiver: &dyn Archiver,
) -> Result<ArchiveOutcome> {
    let request = ExtractRequest {
        archive: archive.to_path_buf(),
        dest_dir: dest_dir.to_path_buf(),
        include: Vec::new(),
        exclude: vec![LIST_FILE_NAME.to_string()],
        mode: OverwriteMode::Overwrite,
    };
    let outcome = classify_exit(archiver.extract(&request)?)?;
    log_outcome(outcome, "extraction", archive);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalog;
    use crate::domain::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned exit codes and records what it was asked to do.
    struct ScriptedArchiver {
        codes: RefCell<VecDeque<Option<i32>>>,
        lists: RefCell<Vec<String>>,
        requests: RefCell<Vec<ExtractRequest>>,
    }

    impl ScriptedArchiver {
        fn new(codes: &[Option<i32>]) -> Self {
            Self {
                codes: RefCell::new(codes.iter().copied().collect()),
                lists: RefCell::new(Vec::new()),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn next_code(&self) -> Option<i32> {
            self.codes.borrow_mut().pop_front().unwrap_or(Some(0))
        }
    }

    impl Archiver for ScriptedArchiver {
        fn create(&self, _dest: &Path, list_file: &Path) -> Result<Option<i32>> {
            self.lists
                .borrow_mut()
                .push(fs::read_to_string(list_file).unwrap());
            Ok(self.next_code())
        }

        fn extract(&self, request: &ExtractRequest) -> Result<Option<i32>> {
            self.requests.borrow_mut().push(request.clone());
            Ok(self.next_code())
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn open_catalog() -> (Catalog, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog: Catalog =
            SqliteCatalog::create(&tmp.path().join("cat.db"), &CatalogScheme::default())
                .unwrap()
                .into();
        catalog.add(&FinRecord::new("A", "NONE", "a.png")).unwrap();
        (catalog, tmp)
    }

    // ── Exit codes ──────────────────────────────────────────────

    #[test]
    fn test_classify_exit() {
        assert_eq!(classify_exit(Some(0)).unwrap(), ArchiveOutcome::Complete);
        assert_eq!(classify_exit(Some(1)).unwrap(), ArchiveOutcome::Partial);
        assert!(matches!(
            classify_exit(Some(2)).unwrap_err(),
            Error::ArchiveToolFailure { code: Some(2) }
        ));
        assert!(matches!(
            classify_exit(None).unwrap_err(),
            Error::ArchiveToolFailure { code: None }
        ));
    }

    #[test]
    fn test_outcome_combine() {
        use ArchiveOutcome::*;
        assert_eq!(Complete.combine(Complete), Complete);
        assert_eq!(Complete.combine(Partial), Partial);
        assert_eq!(Partial.combine(Complete), Partial);
    }

    // ── 7-Zip commands ──────────────────────────────────────────

    #[test]
    fn test_seven_zip_create_command() {
        let cmd = SevenZip::new("7z").create_command(
            Path::new("/backups/a b.zip"),
            Path::new("/tmp/filesToArchive.txt"),
        );
        assert_eq!(cmd.get_program(), "7z");
        assert_eq!(
            args(&cmd),
            vec!["a", "-tzip", "/backups/a b.zip", "@/tmp/filesToArchive.txt"]
        );
    }

    #[test]
    fn test_seven_zip_extract_commands() {
        let zip = SevenZip::new("/opt/7z");
        let catalogs = ExtractRequest {
            archive: PathBuf::from("/b/x.zip"),
            dest_dir: PathBuf::from("/d/catalog"),
            include: vec!["*.db".into()],
            exclude: Vec::new(),
            mode: OverwriteMode::Overwrite,
        };
        assert_eq!(
            args(&zip.extract_command(&catalogs)),
            vec!["x", "-aoa", "-o/d/catalog", "/b/x.zip", "*.db"]
        );

        let images = ExtractRequest {
            include: Vec::new(),
            exclude: vec!["filesToArchive.txt".into(), "*.db".into()],
            mode: OverwriteMode::KeepExisting,
            ..catalogs
        };
        assert_eq!(
            args(&zip.extract_command(&images)),
            vec![
                "x",
                "-aos",
                "-o/d/catalog",
                "-x!filesToArchive.txt",
                "-x!*.db",
                "/b/x.zip"
            ]
        );
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let zip = SevenZip::new(tmp.path().join("no-such-7z"));
        let err = zip
            .create(&tmp.path().join("x.zip"), &tmp.path().join("l.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::ArchiverUnavailable { .. }));
    }

    // ── create_archive ──────────────────────────────────────────

    #[test]
    fn test_create_archive_writes_list_and_cleans_up() {
        let (mut catalog, tmp) = open_catalog();
        let manifest = ArchiveManifest::build(&catalog).unwrap();
        let temp_dir = tmp.path().join("scratch");
        let archiver = ScriptedArchiver::new(&[Some(0)]);

        let outcome = create_archive(
            &mut catalog,
            &manifest,
            &tmp.path().join("out/x.zip"),
            &temp_dir,
            &archiver,
        )
        .unwrap();

        assert_eq!(outcome, ArchiveOutcome::Complete);
        let lists = archiver.lists.borrow();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].lines().count(), 3);
        assert!(lists[0].contains("cat.db"));
        assert!(!temp_dir.join(LIST_FILE_NAME).exists());
        assert!(tmp.path().join("out").is_dir());
        // Stream is usable again.
        assert_eq!(catalog.size().unwrap(), 1);
    }

    #[test]
    fn test_create_archive_partial_is_success() {
        let (mut catalog, tmp) = open_catalog();
        let manifest = ArchiveManifest::build(&catalog).unwrap();
        let archiver = ScriptedArchiver::new(&[Some(1)]);
        let outcome = create_archive(
            &mut catalog,
            &manifest,
            &tmp.path().join("x.zip"),
            tmp.path(),
            &archiver,
        )
        .unwrap();
        assert_eq!(outcome, ArchiveOutcome::Partial);
    }

    #[test]
    fn test_create_archive_failure_still_reopens_and_cleans_up() {
        let (mut catalog, tmp) = open_catalog();
        let manifest = ArchiveManifest::build(&catalog).unwrap();
        let archiver = ScriptedArchiver::new(&[Some(2)]);

        let err = create_archive(
            &mut catalog,
            &manifest,
            &tmp.path().join("x.zip"),
            tmp.path(),
            &archiver,
        )
        .unwrap_err();

        assert!(matches!(err, Error::ArchiveToolFailure { code: Some(2) }));
        assert!(!tmp.path().join(LIST_FILE_NAME).exists());
        assert_eq!(catalog.size().unwrap(), 1);
    }

    // ── Extraction ──────────────────────────────────────────────

    #[test]
    fn test_extract_catalog_files_runs_two_passes() {
        let archiver = ScriptedArchiver::new(&[Some(0), Some(1)]);
        let outcome =
            extract_catalog_files(Path::new("/b/x.zip"), Path::new("/d"), &archiver).unwrap();
        assert_eq!(outcome, ArchiveOutcome::Partial);

        let requests = archiver.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].mode, OverwriteMode::Overwrite);
        assert_eq!(requests[0].include, vec!["*.db"]);
        assert_eq!(requests[1].mode, OverwriteMode::KeepExisting);
        assert_eq!(requests[1].exclude, vec![LIST_FILE_NAME, "*.db"]);
    }

    #[test]
    fn test_extract_stops_on_first_failure() {
        let archiver = ScriptedArchiver::new(&[Some(7)]);
        let err =
            extract_catalog_files(Path::new("/b/x.zip"), Path::new("/d"), &archiver).unwrap_err();
        assert!(matches!(err, Error::ArchiveToolFailure { code: Some(7) }));
        assert_eq!(archiver.requests.borrow().len(), 1);
    }
}
