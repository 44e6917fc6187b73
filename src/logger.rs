use anyhow::Error;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Send log records to `log_path` as `<timestamp> - <LEVEL> - <message>`.
pub fn init_logger(log_path: &Path, log_level: &str) -> Result<(), Error> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let level: LevelFilter = log_level.parse().unwrap_or(LevelFilter::Error);

    Builder::new()
        .filter_level(level)
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .map_err(Into::into)
}

/// One log file per test process, shared by every test that inspects it.
#[cfg(test)]
pub fn init_test_logger() -> &'static Path {
    use std::path::PathBuf;
    use std::sync::OnceLock;

    static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
    LOG_PATH.get_or_init(|| {
        let log_path =
            std::env::temp_dir().join(format!("vkasync-test-{}.log", std::process::id()));
        init_logger(&log_path, "error").unwrap();
        log_path
    })
}
