use anyhow::Error;
use log::debug;
use rusqlite::Connection;
use std::fmt;
use std::path::Path;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Owns the single connection to the local credentials database.
pub struct SqliteConn {
    conn: Connection,
}

impl fmt::Debug for SqliteConn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SqliteConn {:?}", self.conn.path())
    }
}

impl SqliteConn {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn new(db_path: &Path) -> Result<Self, Error> {
        debug!("open database {}", db_path.display());
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, Error> {
        let report = embedded::migrations::runner().run(&mut conn)?;
        for migration in report.applied_migrations() {
            debug!("applied migration {}", migration);
        }
        Ok(Self { conn })
    }

    pub fn get(&self) -> &Connection {
        &self.conn
    }

    pub fn close(self) -> Result<(), Error> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}
