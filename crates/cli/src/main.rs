mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fincatalog_core::config::Settings;
use fincatalog_core::CatalogManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// fincat: photo-ID catalog lifecycle and archive tool
#[derive(Parser)]
#[command(name = "fincat", version, about)]
struct Cli {
    /// Settings file (default: <config dir>/fincatalog/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data root holding surveyAreas/ and backups/
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Replace existing files without asking
    #[arg(short, long, global = true)]
    yes: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data root and its top-level folders
    Init,
    /// List survey areas
    Areas,
    /// List the catalogs of a survey area
    Catalogs {
        area: String,
    },
    /// Create a new catalog in a survey area
    Create {
        area: String,
        /// Catalog name (".db" is appended when missing)
        name: String,
    },
    /// Show a catalog's format, scheme and records
    Info {
        catalog: PathBuf,
    },
    /// Convert a legacy catalog in place
    Convert {
        catalog: PathBuf,
    },
    /// Copy a catalog into a new current-format catalog
    Duplicate {
        source: PathBuf,
        target: PathBuf,
    },
    /// Archive a catalog and its images into the backups folder
    Backup {
        catalog: PathBuf,
    },
    /// Restore a backup into an existing survey area
    Restore {
        archive: PathBuf,
        /// Survey area (default: taken from the archive name)
        #[arg(long)]
        area: Option<String>,
    },
    /// Archive a catalog and its images to a chosen file
    Export {
        catalog: PathBuf,
        dest: PathBuf,
    },
    /// Unpack an exported catalog into a (new) survey area
    Import {
        archive: PathBuf,
        /// Survey area (default: taken from the archive name)
        #[arg(long)]
        area: Option<String>,
    },
    /// Single-fin packages (.finz)
    Fin {
        #[command(subcommand)]
        action: FinAction,
    },
}

#[derive(Subcommand)]
enum FinAction {
    /// Package one fin from a catalog
    Export {
        catalog: PathBuf,
        /// Id code of the fin
        id_code: String,
        dest: PathBuf,
    },
    /// Add the fin from a package to a catalog
    Import {
        archive: PathBuf,
        catalog: PathBuf,
    },
    /// Show the fin held by a package
    Show {
        archive: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(root) = cli.data_root {
        settings.data_root = root;
    }
    tracing::debug!(
        data_root = %settings.data_root.display(),
        temp_dir = %settings.temp_dir.display(),
        archiver = %settings.archiver.display(),
        "settings loaded"
    );
    let mgr = CatalogManager::new(settings);
    let confirm = commands::TerminalConfirm {
        assume_yes: cli.yes,
    };

    match cli.command {
        Commands::Init => commands::layout::init(&mgr)?,
        Commands::Areas => commands::layout::areas(&mgr)?,
        Commands::Catalogs { area } => commands::layout::catalogs(&mgr, &area)?,
        Commands::Create { area, name } => commands::catalog::create(&mgr, &area, &name)?,
        Commands::Info { catalog } => commands::catalog::info(&mgr, &catalog)?,
        Commands::Convert { catalog } => commands::catalog::convert(&mgr, &catalog)?,
        Commands::Duplicate { source, target } => {
            commands::catalog::duplicate(&mgr, &source, &target)?
        }
        Commands::Backup { catalog } => commands::archive::backup(&mgr, &catalog)?,
        Commands::Restore { archive, area } => {
            commands::archive::restore(&mgr, &archive, area.as_deref())?
        }
        Commands::Export { catalog, dest } => {
            commands::archive::export(&mgr, &catalog, &dest, &confirm)?
        }
        Commands::Import { archive, area } => {
            commands::archive::import(&mgr, &archive, area.as_deref())?
        }
        Commands::Fin { action } => match action {
            FinAction::Export {
                catalog,
                id_code,
                dest,
            } => commands::fin::export(&mgr, &catalog, &id_code, &dest, &confirm)?,
            FinAction::Import { archive, catalog } => {
                commands::fin::import(&mgr, &archive, &catalog)?
            }
            FinAction::Show { archive } => commands::fin::show(&mgr, &archive)?,
        },
    }

    Ok(())
}
