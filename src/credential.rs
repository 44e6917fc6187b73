use anyhow::Error;
use rusqlite::{params, OptionalExtension};

use crate::sqlite_conn::SqliteConn;

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub login: String,
    pub access_token: String,
}

impl Credential {
    pub fn new(login: &str, access_token: &str) -> Self {
        Self {
            login: login.into(),
            access_token: access_token.into(),
        }
    }

    pub fn from_login(conn: &SqliteConn, login: &str) -> Result<Option<Self>, Error> {
        let query = r#"
            SELECT login, access_token
            FROM users_table
            WHERE login = ?1
            ORDER BY login_id
            LIMIT 1
        "#;
        conn.get()
            .query_row(query, params![login], |row| {
                Ok(Self {
                    login: row.get(0)?,
                    access_token: row.get(1)?,
                })
            })
            .optional()
            .map_err(Into::into)
    }

    pub fn login_exists(conn: &SqliteConn, login: &str) -> Result<bool, Error> {
        Self::from_login(conn, login).map(|c| c.is_some())
    }

    pub fn get_all_logins(conn: &SqliteConn) -> Result<Vec<String>, Error> {
        let query = "SELECT DISTINCT login FROM users_table ORDER BY login";
        let mut stmt = conn.get().prepare(query)?;
        let logins = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(logins)
    }

    pub fn insert_credential(&self, conn: &SqliteConn) -> Result<usize, Error> {
        let query = "INSERT INTO users_table (login, access_token) VALUES (?1, ?2)";
        conn.get()
            .execute(query, params![self.login, self.access_token])
            .map_err(Into::into)
    }

    pub fn remove_login(conn: &SqliteConn, login: &str) -> Result<usize, Error> {
        let query = "DELETE FROM users_table WHERE login = ?1";
        conn.get()
            .execute(query, params![login])
            .map_err(Into::into)
    }
}
