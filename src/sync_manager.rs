use anyhow::Error;
use bytes::Bytes;
use futures::StreamExt;
use log::{debug, error};
use reqwest::{Client, Response, StatusCode, Url};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use tokio::fs::{remove_file, File};
use tokio::io::AsyncWriteExt;

use crate::audio_track::AudioTrack;
use crate::config::Config;
use crate::credential::Credential;
use crate::exponential_retry::ExponentialRetry;
use crate::sqlite_conn::SqliteConn;
use crate::vk_connection::{OwnerId, PageKind, VkConnection};
use crate::vk_error::VkError;

/// Owns the token database for one run and performs the `get` / `token`
/// actions on top of it.
#[derive(Debug)]
pub struct SyncManager {
    config: Config,
    conn: SqliteConn,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
}

impl SyncManager {
    pub fn new(config: &Config) -> Result<Self, Error> {
        create_dir_all(&config.config_dir)?;
        let db_path = config.db_path();
        let log_path = config.log_path();
        let conn = SqliteConn::new(&db_path)?;
        Ok(Self {
            config: config.clone(),
            conn,
            db_path,
            log_path,
        })
    }

    pub fn disconnect(self) -> Result<(), Error> {
        self.conn.close()
    }

    pub async fn create_token(&self, login: &str, password: &str) -> Result<Option<String>, Error> {
        match VkConnection::create_token(&self.config, login, password).await {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.is_auth() => {
                error!("Auth error with password for {}", login);
                debug!("{}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `false` when the password was rejected.
    pub async fn add_login(&self, login: &str, password: &str) -> Result<bool, Error> {
        match self.create_token(login, password).await? {
            Some(token) => {
                Credential::new(login, &token).insert_credential(&self.conn)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn check_login(&self, login: &str) -> Result<bool, Error> {
        Credential::login_exists(&self.conn, login)
    }

    pub fn rm_login(&self, login: &str) -> Result<usize, Error> {
        Credential::remove_login(&self.conn, login)
    }

    pub fn list_logins(&self) -> Result<Vec<String>, Error> {
        Credential::get_all_logins(&self.conn)
    }

    /// Session for a stored login, `None` if no token is stored or the API
    /// rejects it.
    pub async fn open_session(&self, login: &str) -> Result<Option<VkConnection>, Error> {
        let cred = match Credential::from_login(&self.conn, login)? {
            Some(cred) => cred,
            None => {
                error!("No access_token stored for {}", login);
                return Ok(None);
            }
        };
        let session = VkConnection::new(&self.config, &cred.access_token);
        match session.users_get(None).await {
            Ok(_) => Ok(Some(session)),
            Err(e) if e.is_auth() => {
                error!("Auth error with access_token for {}", login);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Without a page name the token owner's own page is used.
    pub async fn name_to_id(
        &self,
        session: &VkConnection,
        page_name: Option<&str>,
        kind: PageKind,
    ) -> Result<Option<OwnerId>, Error> {
        let result = match page_name {
            Some(name) => session.resolve_owner(name, kind).await,
            None => session
                .users_get(None)
                .await
                .map(|users| users.first().map(|u| OwnerId::from(u.id))),
        };
        match result {
            Ok(owner_id) => Ok(owner_id),
            Err(VkError::Api { code, message }) => {
                error!(
                    "Cannot resolve {} {}: {} {}",
                    kind,
                    page_name.unwrap_or(""),
                    code,
                    message
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Download every track of `owner_id` missing from `save_path`, returns
    /// the number of failed downloads.
    pub async fn get_audios(
        &self,
        session: &VkConnection,
        owner_id: OwnerId,
        save_path: Option<&Path>,
        rewrite: bool,
    ) -> Result<usize, Error> {
        let save_path = save_path.unwrap_or(self.config.save_path.as_path());
        if !save_path.exists() {
            create_dir_all(save_path)?;
        }
        let tracks = match session.audio_get(owner_id).await {
            Ok(tracks) => tracks,
            Err(e) => {
                error!("Cannot list audios of {}: {}", owner_id, e);
                return Err(e.into());
            }
        };
        Ok(sync_tracks(session.get_client(), &tracks, save_path, rewrite).await)
    }
}

pub async fn sync_tracks(
    client: &Client,
    tracks: &[AudioTrack],
    save_path: &Path,
    rewrite: bool,
) -> usize {
    let mut errors = 0;
    for track in tracks {
        let track_name = track.track_name();
        let track_path = save_path.join(track.file_name());
        if track_path.exists() && !rewrite {
            debug!("skip {}", track_path.display());
            continue;
        }
        let url = match track.clean_url() {
            Some(url) => url,
            None => {
                error!("track: {}, no url", track_name);
                errors += 1;
                continue;
            }
        };
        println!("download {}", track_name);
        if !download_file(client, &url, &track_path, &track_name).await {
            errors += 1;
        }
    }
    errors
}

pub async fn download_file(client: &Client, url: &Url, file_path: &Path, track_name: &str) -> bool {
    let resp = match client.get(url.clone()).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("track: {}, url: {}, error {}", track_name, url, e);
            return false;
        }
    };
    if resp.status() != StatusCode::OK {
        error!(
            "track: {}, url: {}, status code {}",
            track_name,
            url,
            resp.status().as_u16()
        );
        return false;
    }
    match write_response(resp, file_path).await {
        Ok(size) => {
            debug!("{} {} bytes", file_path.display(), size);
            true
        }
        Err(e) => {
            error!(
                "track: {}, url: {}, write to {} failed {}",
                track_name,
                url,
                file_path.display(),
                e
            );
            remove_file(file_path).await.ok();
            false
        }
    }
}

async fn write_response(resp: Response, file_path: &Path) -> Result<u64, Error> {
    let mut f = File::create(file_path).await?;
    let mut stream = resp.bytes_stream();
    let mut size = 0;
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk?;
        f.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    f.flush().await?;
    Ok(size)
}
