pub mod audio_track;
pub mod config;
pub mod credential;
pub mod exponential_retry;
pub mod logger;
pub mod sqlite_conn;
pub mod sync_manager;
pub mod vk_connection;
pub mod vk_error;
pub mod vkasync_opts;

#[cfg(test)]
mod test_server;
