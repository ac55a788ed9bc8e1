//! Reading geometry columns straight out of SQLite, and WK SQL functions.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Type, Value, ValueRef};
use rusqlite::{Connection, Error, Statement, params};

use crate::error::{Result, WkError};
use crate::io::{BinaryProvider, Provider, TextProvider, VecProvider};
use crate::options::{ReadOptions, WkbWriteOptions, WktWriteOptions};
use crate::translate::{wkb_translate_wkt, wkt_translate_wkb};

const DEFAULT_BATCH_SIZE: u32 = 1000;

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Provider over one BLOB or TEXT column of a table, in rowid order.
///
/// Rows are fetched in `LIMIT`/`OFFSET` batches, so only one batch is held
/// in memory at a time.
///
/// ```no_run
/// use rusqlite::Connection;
/// use wkstream::{ReadOptions, SqliteProvider, WktWriteOptions, wkb_translate_wkt};
///
/// let conn = Connection::open("data.gpkg")?;
/// let mut provider = SqliteProvider::new(&conn, "roads", "geom")?.gpkg_geometry(true);
/// let wkt = wkb_translate_wkt(
///     &mut provider,
///     &ReadOptions::default(),
///     WktWriteOptions::default(),
/// )?;
/// # Ok::<(), wkstream::WkError>(())
/// ```
pub struct SqliteProvider<'conn> {
    stmt: Statement<'conn>,
    n_features: usize,
    batch_size: u32,
    offset: i64,
    batch: Vec<Value>,
    pos: Option<usize>,
    exhausted: bool,
    gpkg_geometry: bool,
}

impl<'conn> SqliteProvider<'conn> {
    pub fn new(conn: &'conn Connection, table: &str, column: &str) -> Result<Self> {
        let table = quote_identifier(table);
        let column = quote_identifier(column);

        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        let stmt = conn.prepare(&format!(
            "SELECT {column} FROM {table} ORDER BY rowid LIMIT ?1 OFFSET ?2"
        ))?;
        log::debug!("{count} rows in {table}.{column}");

        Ok(Self {
            stmt,
            n_features: usize::try_from(count).unwrap_or_default(),
            batch_size: DEFAULT_BATCH_SIZE,
            offset: 0,
            batch: Vec::new(),
            pos: None,
            exhausted: false,
            gpkg_geometry: false,
        })
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Treat BLOBs as GeoPackage geometries and skip their header.
    pub fn gpkg_geometry(mut self, enabled: bool) -> Self {
        self.gpkg_geometry = enabled;
        self
    }

    fn fetch_batch(&mut self) -> Result<()> {
        let rows = self
            .stmt
            .query_map(params![self.batch_size, self.offset], |row| row.get::<_, Value>(0))?;
        self.batch = rows.collect::<rusqlite::Result<Vec<Value>>>()?;

        // A short batch means the end of the table.
        if self.batch.len() < self.batch_size as usize {
            self.exhausted = true;
        }
        // LIMIT bounds the batch by a u32, so this only widens.
        self.offset += self.batch.len() as i64;
        log::trace!("fetched {} rows, offset now {}", self.batch.len(), self.offset);
        Ok(())
    }

    fn current(&self) -> Option<&Value> {
        self.pos.and_then(|pos| self.batch.get(pos))
    }
}

impl Provider for SqliteProvider<'_> {
    fn seek_next_feature(&mut self) -> Result<bool> {
        let next = self.pos.map_or(0, |pos| pos + 1);
        if next < self.batch.len() {
            self.pos = Some(next);
            return Ok(true);
        }
        if self.exhausted {
            self.pos = Some(self.batch.len());
            return Ok(false);
        }
        self.fetch_batch()?;
        self.pos = Some(0);
        Ok(!self.batch.is_empty())
    }

    fn feature_is_null(&self) -> bool {
        matches!(self.current(), None | Some(Value::Null))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

impl BinaryProvider for SqliteProvider<'_> {
    fn feature_bytes(&self) -> Result<&[u8]> {
        match self.current() {
            Some(Value::Blob(blob)) if self.gpkg_geometry => strip_gpkg_header(blob),
            Some(Value::Blob(blob)) => Ok(blob.as_slice()),
            Some(other) => Err(WkError::UnsupportedEncoding(format!(
                "expected a BLOB, found {:?}",
                other.data_type()
            ))),
            None => Ok(Default::default()),
        }
    }
}

impl TextProvider for SqliteProvider<'_> {
    fn feature_text(&self) -> Result<&str> {
        match self.current() {
            Some(Value::Text(text)) => Ok(text.as_str()),
            Some(Value::Blob(blob)) => std::str::from_utf8(blob).map_err(|err| {
                WkError::malformed(format!("BLOB is not UTF-8: {err}"), err.valid_up_to())
            }),
            Some(other) => Err(WkError::UnsupportedEncoding(format!(
                "expected TEXT, found {:?}",
                other.data_type()
            ))),
            None => Ok(""),
        }
    }
}

/// The WKB inside a GeoPackage geometry blob.
///
/// cf. https://www.geopackage.org/spec140/index.html#gpb_format
pub(crate) fn strip_gpkg_header(b: &[u8]) -> Result<&[u8]> {
    if b.len() < 8 || !b.starts_with(b"GP") {
        return Err(WkError::UnsupportedEncoding(
            "not a GeoPackage geometry blob".to_string(),
        ));
    }
    let flags = b[3];
    let envelope_size: usize = match flags & 0b00001110 {
        0b00000000 => 0,  // no envelope
        0b00000010 => 32, // [minx, maxx, miny, maxy]
        0b00000100 => 48, // [minx, maxx, miny, maxy, minz, maxz]
        0b00000110 => 48, // [minx, maxx, miny, maxy, minm, maxm]
        0b00001000 => 64, // [minx, maxx, miny, maxy, minz, maxz, minm, maxm]
        _ => {
            return Err(WkError::UnsupportedEncoding(format!(
                "invalid GeoPackage geometry flags {flags:#010b}"
            )));
        }
    };
    let offset = 8 + envelope_size;
    b.get(offset..).ok_or(WkError::TruncatedInput {
        offset: 8,
        needed: envelope_size,
        len: b.len(),
    })
}

/// Register the WK SQL functions in the provided connection:
///
/// - `WK_AsText(wkb)` renders WKB (or a GeoPackage geometry blob) as WKT.
/// - `WK_GeomFromText(wkt)` encodes WKT as little-endian extended WKB.
///
/// Both return NULL for NULL input.
///
/// ```
/// use rusqlite::Connection;
/// use wkstream::register_wk_functions;
///
/// let conn = Connection::open_in_memory()?;
/// register_wk_functions(&conn)?;
/// let text: String = conn.query_row(
///     "SELECT WK_AsText(WK_GeomFromText('point(1 2)'))",
///     [],
///     |row| row.get(0),
/// )?;
/// assert_eq!(text, "POINT (1 2)");
/// # Ok::<(), wkstream::WkError>(())
/// ```
pub fn register_wk_functions(conn: &Connection) -> Result<()> {
    register_wk_as_text(conn)?;
    register_wk_geom_from_text(conn)?;
    Ok(())
}

fn register_wk_as_text(conn: &Connection) -> Result<()> {
    conn.create_scalar_function("WK_AsText", 1, FunctionFlags::SQLITE_DETERMINISTIC, |ctx| {
        let blob = match blob_from_ctx(ctx)? {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let wkb = if blob.starts_with(b"GP") {
            strip_gpkg_header(blob).map_err(user_error)?
        } else {
            blob
        };
        let mut provider = VecProvider::new(vec![Some(wkb)]);
        let out = wkb_translate_wkt(
            &mut provider,
            &ReadOptions::default(),
            WktWriteOptions::default(),
        )
        .map_err(user_error)?;
        Ok(out.into_iter().next().flatten())
    })?;
    Ok(())
}

fn register_wk_geom_from_text(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "WK_GeomFromText",
        1,
        FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = match ctx.get_raw(0) {
                ValueRef::Null => return Ok(None),
                ValueRef::Text(text) => std::str::from_utf8(text).map_err(user_error)?,
                _ => return Err(Error::InvalidFunctionParameterType(0, Type::Text)),
            };
            let mut provider = VecProvider::new(vec![Some(text)]);
            let out = wkt_translate_wkb(
                &mut provider,
                &ReadOptions::default(),
                WkbWriteOptions::default(),
            )
            .map_err(user_error)?;
            Ok(out.into_iter().next().flatten())
        },
    )?;
    Ok(())
}

fn blob_from_ctx<'a>(ctx: &'a Context<'a>) -> std::result::Result<Option<&'a [u8]>, Error> {
    match ctx.get_raw(0) {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(blob) => Ok(Some(blob)),
        _ => Err(Error::InvalidFunctionParameterType(0, Type::Blob)),
    }
}

fn user_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::UserFunctionError(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::{SqliteProvider, register_wk_functions, strip_gpkg_header};
    use crate::Result;
    use crate::error::WkError;
    use crate::io::{Provider, TextProvider};
    use crate::options::{ReadOptions, WktWriteOptions};
    use crate::test_util::wkb_bytes;
    use crate::translate::{wkb_translate_wkt, wkt_translate_wkt};
    use geo_types::{LineString, Point};
    use rusqlite::{Connection, params};

    fn gpkg_blob(wkb: &[u8], envelope: Option<[f64; 4]>) -> Vec<u8> {
        let flags = if envelope.is_some() { 0b00000011 } else { 0b00000001 };
        let mut blob = vec![0x47, 0x50, 0x00, flags];
        blob.extend_from_slice(&4326u32.to_le_bytes());
        for value in envelope.into_iter().flatten() {
            blob.extend_from_slice(&value.to_le_bytes());
        }
        blob.extend_from_slice(wkb);
        blob
    }

    fn table_with_geometries(values: &[Option<Vec<u8>>]) -> Result<Connection> {
        let conn = Connection::open_in_memory()?;
        conn.execute("CREATE TABLE features (id INTEGER PRIMARY KEY, geom BLOB)", [])?;
        for value in values {
            conn.execute("INSERT INTO features (geom) VALUES (?1)", params![value])?;
        }
        Ok(conn)
    }

    #[test]
    fn offset_past_u32_range() -> Result<()> {
        let conn = table_with_geometries(&[Some(wkb_bytes(&Point::new(0.0, 0.0)))])?;
        let mut provider = SqliteProvider::new(&conn, "features", "geom")?;
        let offset = i64::from(u32::MAX) + 1;
        provider.offset = offset;
        assert!(!provider.seek_next_feature()?);
        assert_eq!(provider.offset, offset);
        Ok(())
    }

    #[test]
    fn reads_blob_column_across_batches() -> Result<()> {
        let values: Vec<Option<Vec<u8>>> = (0..7)
            .map(|i| (i != 3).then(|| wkb_bytes(&Point::new(f64::from(i), 0.0))))
            .collect();
        let conn = table_with_geometries(&values)?;

        let mut provider = SqliteProvider::new(&conn, "features", "geom")?.with_batch_size(3);
        assert_eq!(provider.n_features(), 7);
        let out = wkb_translate_wkt(
            &mut provider,
            &ReadOptions::default(),
            WktWriteOptions::default(),
        )?;
        assert_eq!(out.len(), 7);
        assert_eq!(out[0].as_deref(), Some("POINT (0 0)"));
        assert_eq!(out[3], None);
        assert_eq!(out[6].as_deref(), Some("POINT (6 0)"));
        Ok(())
    }

    #[test]
    fn strips_gpkg_header() -> Result<()> {
        let wkb = wkb_bytes(&LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]));
        let conn = table_with_geometries(&[
            Some(gpkg_blob(&wkb, None)),
            Some(gpkg_blob(&wkb, Some([0.0, 1.0, 0.0, 1.0]))),
        ])?;

        let mut provider = SqliteProvider::new(&conn, "features", "geom")?.gpkg_geometry(true);
        let out = wkb_translate_wkt(
            &mut provider,
            &ReadOptions::default(),
            WktWriteOptions::default(),
        )?;
        let expected = Some("LINESTRING (0 0, 1 1)".to_string());
        assert_eq!(out, vec![expected.clone(), expected]);

        assert!(strip_gpkg_header(&wkb).is_err());
        assert!(strip_gpkg_header(&gpkg_blob(&[], Some([0.0; 4]))[..20]).is_err());
        Ok(())
    }

    #[test]
    fn reads_text_column() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute("CREATE TABLE \"odd \"\"name\"\"\" (wkt TEXT)", [])?;
        for text in ["point(1 2)", "LINESTRING EMPTY"] {
            conn.execute("INSERT INTO \"odd \"\"name\"\"\" VALUES (?1)", params![text])?;
        }

        let mut provider = SqliteProvider::new(&conn, "odd \"name\"", "wkt")?;
        let out = wkt_translate_wkt(
            &mut provider,
            &ReadOptions::default(),
            WktWriteOptions::default(),
        )?;
        assert_eq!(
            out,
            vec![Some("POINT (1 2)".to_string()), Some("LINESTRING EMPTY".to_string())]
        );
        Ok(())
    }

    #[test]
    fn non_utf8_blob_is_malformed_text() -> Result<()> {
        let conn = table_with_geometries(&[Some(vec![0xff, 0xfe])])?;
        let mut provider = SqliteProvider::new(&conn, "features", "geom")?;
        assert!(provider.seek_next_feature()?);
        let err = provider.feature_text().expect_err("invalid utf-8");
        assert!(matches!(err, WkError::MalformedText { position: 0, .. }));
        Ok(())
    }

    #[test]
    fn sql_functions() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        register_wk_functions(&conn)?;

        let (text, null): (String, Option<String>) = conn.query_row(
            "SELECT WK_AsText(WK_GeomFromText('SRID=4326;MULTIPOINT (1 2, 3 4)')), WK_AsText(NULL)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(text, "SRID=4326;MULTIPOINT ((1 2), (3 4))");
        assert!(null.is_none());

        let gpkg = gpkg_blob(&wkb_bytes(&Point::new(1.5, -2.0)), None);
        let text: String = conn.query_row("SELECT WK_AsText(?1)", params![gpkg], |row| row.get(0))?;
        assert_eq!(text, "POINT (1.5 -2)");

        let err = conn.query_row("SELECT WK_GeomFromText('POINT (1')", [], |row| {
            row.get::<_, Vec<u8>>(0)
        });
        assert!(err.is_err());
        Ok(())
    }
}
