/*!
Archive of detections.

Every processed granule gets a row in `granules` and every surviving fire
pixel a row in `fires`, so a long-running batch can skip granules it has
already seen and downstream analysis can query detections by time.
*/

use crate::{output::FireRecord, SwathFireResult};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OpenFlags, ToSql};
use std::path::Path;

/// A connection to the sqlite archive.
pub struct FireDatabase {
    conn: Connection,
}

impl FireDatabase {
    /// Initialize a database to make sure it exists and is set up properly.
    ///
    /// Run this in the main thread before any worker opens its own
    /// connection.
    pub fn initialize<P: AsRef<Path>>(path: P) -> SwathFireResult<()> {
        let _conn = Self::open_database_to_write(path.as_ref())?;
        Ok(())
    }

    /// Open a connection for storing detections.
    pub fn connect<P: AsRef<Path>>(path: P) -> SwathFireResult<Self> {
        let conn = Self::open_database_to_write(path.as_ref())?;
        Ok(FireDatabase { conn })
    }

    fn open_database_to_write(path: &Path) -> SwathFireResult<Connection> {
        let conn = rusqlite::Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        const QUERY: &str = include_str!("database/create_fires_db.sql");
        conn.execute_batch(QUERY)?;

        Ok(conn)
    }

    /// Has this granule already been processed into the archive?
    pub fn is_granule_present(&self, granule: &str) -> SwathFireResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM granules WHERE granule = ?",
            [granule],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Prepare the insert statements for a batch of granules.
    pub fn prepare_to_add(&self) -> SwathFireResult<FireDatabaseAdd> {
        const ADD_GRANULE: &str = include_str!("database/add_granule.sql");
        const ADD_FIRE: &str = include_str!("database/add_fire.sql");

        let add_granule_stmt = self.conn.prepare(ADD_GRANULE)?;
        let add_fire_stmt = self.conn.prepare(ADD_FIRE)?;

        Ok(FireDatabaseAdd {
            conn: &self.conn,
            add_granule_stmt,
            add_fire_stmt,
        })
    }
}

pub struct FireDatabaseAdd<'a> {
    conn: &'a Connection,
    add_granule_stmt: rusqlite::Statement<'a>,
    add_fire_stmt: rusqlite::Statement<'a>,
}

impl<'a> FireDatabaseAdd<'a> {
    /// Record one processed granule and all of its fires in a single
    /// transaction.
    pub fn add(
        &mut self,
        granule: &str,
        scan_time: Option<NaiveDateTime>,
        records: &[FireRecord],
    ) -> SwathFireResult<()> {
        let scan_time = scan_time.map(|t| t.timestamp());

        self.conn.execute("BEGIN TRANSACTION", [])?;

        self.add_granule_stmt.execute([
            &granule as &dyn ToSql,
            &scan_time,
            &(records.len() as i64),
        ])?;

        for record in records {
            self.add_fire_stmt.execute([
                &granule as &dyn ToSql,
                &scan_time,
                &(record.line as i64),
                &(record.sample as i64),
                &(record.lat as f64),
                &(record.lon as f64),
                &(record.t_mid as f64),
                &(record.t_lw as f64),
                &record.power,
                &record.area,
                &record.confidence,
            ])?;
        }

        self.conn.execute("COMMIT", [])?;

        Ok(())
    }
}
