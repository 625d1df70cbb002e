use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::CatalogScheme;
use crate::error::{Error, Result};

pub const SCHEMA_VERSION: u32 = 1;

const SCHEME_NAME_KEY: &str = "catalog_scheme_name";
const SCHEMA_VERSION_KEY: &str = "schema_version";

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS settings (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS damage_categories (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL,
            name     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_damage_categories_order ON damage_categories(order_id);

        CREATE TABLE IF NOT EXISTS individuals (
            id                    INTEGER PRIMARY KEY AUTOINCREMENT,
            id_code               TEXT NOT NULL,
            name                  TEXT NOT NULL DEFAULT '',
            fk_damage_category_id INTEGER NOT NULL REFERENCES damage_categories(id),
            fin_filename          TEXT
        );

        CREATE TABLE IF NOT EXISTS images (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            fk_individual_id        INTEGER NOT NULL REFERENCES individuals(id),
            image_filename          TEXT NOT NULL,
            original_image_filename TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_images_individual ON images(fk_individual_id);

        CREATE TABLE IF NOT EXISTS image_modifications (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            fk_image_id INTEGER NOT NULL REFERENCES images(id),
            order_id    INTEGER NOT NULL,
            operation   INTEGER NOT NULL,
            value1      INTEGER NOT NULL DEFAULT 0,
            value2      INTEGER NOT NULL DEFAULT 0,
            value3      INTEGER NOT NULL DEFAULT 0,
            value4      INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_image_modifications_image ON image_modifications(fk_image_id);
        ",
    )?;
    Ok(())
}

const CATALOG_TABLES: [&str; 5] = [
    "settings",
    "damage_categories",
    "individuals",
    "images",
    "image_modifications",
];

/// Whether the database holds a catalog: every catalog table plus a stored
/// scheme name. Only reads.
pub fn is_catalog(conn: &Connection) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    for table in CATALOG_TABLES {
        let count: i64 = stmt.query_row(params![table], |row| row.get(0))?;
        if count == 0 {
            return Ok(false);
        }
    }

    let scheme_name: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![SCHEME_NAME_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(scheme_name.is_some())
}

/// Record the schema version on fresh databases and refuse ones written by a
/// newer release.
pub fn migrate(conn: &Connection) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match stored.and_then(|v| v.parse::<u32>().ok()) {
        Some(db) if db > SCHEMA_VERSION => Err(Error::SchemaTooNew {
            db,
            code: SCHEMA_VERSION,
        }),
        Some(_) => Ok(()),
        None => {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![SCHEMA_VERSION_KEY, SCHEMA_VERSION.to_string()],
            )?;
            Ok(())
        }
    }
}

/// Write the scheme name and its categories, in order. Only called on a fresh
/// database.
pub fn store_scheme(conn: &Connection, scheme: &CatalogScheme) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        params![SCHEME_NAME_KEY, scheme.name],
    )?;
    for (order, name) in scheme.categories.iter().enumerate() {
        conn.execute(
            "INSERT INTO damage_categories (order_id, name) VALUES (?1, ?2)",
            params![order as i64, name],
        )?;
    }
    Ok(())
}

pub fn load_scheme(conn: &Connection) -> Result<CatalogScheme> {
    let name: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![SCHEME_NAME_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let mut stmt = conn.prepare("SELECT name FROM damage_categories ORDER BY order_id, id")?;
    let categories = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(CatalogScheme::new(name.unwrap_or_default(), categories))
}
