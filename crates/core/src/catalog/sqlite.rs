use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::{schema, RecordStore};
use crate::domain::*;
use crate::error::{Error, Result};

/// SQLite-backed catalog in the current on-disk format.
pub struct SqliteCatalog {
    path: PathBuf,
    conn: Option<Connection>,
    scheme: CatalogScheme,
}

fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

impl SqliteCatalog {
    /// Create a new catalog file seeded with `scheme`. Fails if the file exists.
    pub fn create(path: &Path, scheme: &CatalogScheme) -> Result<Self> {
        if path.exists() {
            return Err(Error::CatalogExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = connect(path)?;
        schema::initialize(&conn)?;
        schema::migrate(&conn)?;
        schema::store_scheme(&conn, scheme)?;
        info!(path = %path.display(), scheme = %scheme.name, "created catalog");

        Ok(Self {
            path: path.to_path_buf(),
            conn: Some(conn),
            scheme: scheme.clone(),
        })
    }

    /// Open an existing catalog; the scheme comes out of the database.
    ///
    /// A SQLite file without the catalog tables fails with
    /// `FormatUnrecognized` and is left as it was.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Unreadable(path.to_path_buf()));
        }
        let conn = connect(path)?;
        if !schema::is_catalog(&conn)? {
            return Err(Error::FormatUnrecognized(path.to_path_buf()));
        }
        schema::migrate(&conn)?;
        let scheme = schema::load_scheme(&conn)?;
        debug!(path = %path.display(), scheme = %scheme.name, "opened catalog");

        Ok(Self {
            path: path.to_path_buf(),
            conn: Some(conn),
            scheme,
        })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::StreamClosed(self.path.clone()))
    }

    pub fn is_stream_open(&self) -> bool {
        self.conn.is_some()
    }

    fn category_id(&self, label: &str) -> Result<i64> {
        let name = match self.scheme.find_category(label) {
            Some(name) => name,
            None => match self.scheme.find_category(DEFAULT_CATEGORY) {
                Some(fallback) => {
                    warn!(category = label, "unknown damage category, filing under {fallback}");
                    fallback
                }
                None => return Err(Error::UnknownCategory(label.to_string())),
            },
        };

        let id: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT id FROM damage_categories WHERE name = ?1 COLLATE NOCASE
                 ORDER BY order_id LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        id.ok_or_else(|| Error::UnknownCategory(label.to_string()))
    }

    fn load_mods(&self, image_id: i64) -> Result<Vec<ImageMod>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT fk_image_id, operation, value1, value2, value3, value4
             FROM image_modifications WHERE fk_image_id = ?1 ORDER BY order_id",
        )?;
        let rows = stmt
            .query_map(params![image_id], mod_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().filter_map(decode_mod).map(|(_, m)| m).collect())
    }

    /// Every image's modifications in one pass, keyed by image id.
    fn load_all_mods(&self) -> Result<HashMap<i64, Vec<ImageMod>>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT fk_image_id, operation, value1, value2, value3, value4
             FROM image_modifications ORDER BY fk_image_id, order_id",
        )?;
        let rows = stmt
            .query_map([], mod_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut mods: HashMap<i64, Vec<ImageMod>> = HashMap::new();
        for (image_id, m) in rows.into_iter().filter_map(decode_mod) {
            mods.entry(image_id).or_default().push(m);
        }
        Ok(mods)
    }
}

/// Records joined with their damage category and first image, in insertion
/// order.
const RECORDS_QUERY: &str = "SELECT i.id_code, i.name, d.name, i.fin_filename,
        img.id, img.image_filename, img.original_image_filename
 FROM individuals i
 JOIN damage_categories d ON d.id = i.fk_damage_category_id
 LEFT JOIN images img ON img.id =
     (SELECT MIN(id) FROM images WHERE fk_individual_id = i.id)
 ORDER BY i.id";

/// A record without its modifications, plus the id of its image.
fn record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(FinRecord, Option<i64>)> {
    Ok((
        FinRecord {
            id_code: row.get(0)?,
            name: row.get(1)?,
            damage_category: row.get(2)?,
            fin_filename: row.get::<_, Option<String>>(3)?.map(PathBuf::from),
            image_filename: PathBuf::from(row.get::<_, Option<String>>(5)?.unwrap_or_default()),
            original_image_filename: row.get::<_, Option<String>>(6)?.map(PathBuf::from),
            image_mods: Vec::new(),
        },
        row.get(4)?,
    ))
}

type ModRow = (i64, i64, [i64; 4]);

fn mod_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        [row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?],
    ))
}

fn decode_mod((image_id, code, values): ModRow) -> Option<(i64, ImageMod)> {
    let m = ImageMod::from_parts(code, values);
    if m.is_none() {
        warn!(code, image_id, "skipping unknown image modification");
    }
    m.map(|m| (image_id, m))
}

impl RecordStore for SqliteCatalog {
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
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM individuals", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn get_item_absolute(&self, index: usize) -> Result<Option<FinRecord>> {
        let row = self
            .conn()?
            .query_row(
                &format!("{RECORDS_QUERY} LIMIT 1 OFFSET ?1"),
                params![index as i64],
                record_row,
            )
            .optional()?;

        match row {
            Some((mut fin, Some(image_id))) => {
                fin.image_mods = self.load_mods(image_id)?;
                Ok(Some(fin))
            }
            Some((fin, None)) => Ok(Some(fin)),
            None => Ok(None),
        }
    }

    fn records_absolute(&self) -> Result<Vec<Option<FinRecord>>> {
        let mut mods = self.load_all_mods()?;
        let mut stmt = self.conn()?.prepare(RECORDS_QUERY)?;
        let rows = stmt
            .query_map([], record_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(mut fin, image_id)| {
                if let Some(found) = image_id.and_then(|id| mods.remove(&id)) {
                    fin.image_mods = found;
                }
                Some(fin)
            })
            .collect())
    }

    // No holes: compacted and absolute indices coincide.
    fn size(&self) -> Result<usize> {
        self.size_absolute()
    }

    fn get_item(&self, index: usize) -> Result<Option<FinRecord>> {
        self.get_item_absolute(index)
    }

    fn add(&mut self, fin: &FinRecord) -> Result<()> {
        let category_id = self.category_id(&fin.damage_category)?;
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::StreamClosed(self.path.clone()))?;

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO individuals (id_code, name, fk_damage_category_id, fin_filename)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                fin.id_code,
                fin.name,
                category_id,
                fin.fin_filename
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            ],
        )?;
        let individual_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO images (fk_individual_id, image_filename, original_image_filename)
             VALUES (?1, ?2, ?3)",
            params![
                individual_id,
                fin.image_filename.to_string_lossy().into_owned(),
                fin.original_image_filename
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            ],
        )?;
        let image_id = tx.last_insert_rowid();

        for (order, m) in fin.image_mods.iter().enumerate() {
            let [v1, v2, v3, v4] = m.values();
            tx.execute(
                "INSERT INTO image_modifications
                    (fk_image_id, order_id, operation, value1, value2, value3, value4)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![image_id, order as i64, m.code(), v1, v2, v3, v4],
            )?;
        }

        tx.commit()?;
        debug!(id_code = %fin.id_code, "added fin");
        Ok(())
    }

    fn close_stream(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            if let Err((conn, err)) = conn.close() {
                self.conn = Some(conn);
                return Err(err.into());
            }
            debug!(path = %self.path.display(), "closed catalog stream");
        }
        Ok(())
    }

    fn open_stream(&mut self) -> Result<()> {
        if self.conn.is_none() {
            self.conn = Some(connect(&self.path)?);
            debug!(path = %self.path.display(), "reopened catalog stream");
        }
        Ok(())
    }
}
