//! env_logger setup driven by `LOG_LEVEL`, `LOG_FORMAT` and `LOG_FILE`.

use env_logger::{Builder, Target};
use log::{Record, SetLoggerError};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// env_logger filter string, e.g. `info` or `schemadoc=debug,sqlx=warn`.
    pub filter: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            filter: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: match var("LOG_FORMAT").map(|f| f.to_lowercase()).as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            file: var("LOG_FILE").map(PathBuf::from),
        }
    }
}

/// Writes every line to stderr and appends it to a file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn json_line(record: &Record<'_>) -> String {
    serde_json::json!({
        "time": chrono::Local::now().to_rfc3339(),
        "level": record.level().as_str(),
        "target": record.target(),
        "file": record.file(),
        "line": record.line(),
        "message": record.args().to_string(),
    })
    .to_string()
}

/// Installs the global logger. Call once, before anything logs.
///
/// An unusable `LOG_FILE` does not stop logging: output stays on stderr and a
/// warning names the file.
pub fn init(settings: &LogSettings) -> Result<(), SetLoggerError> {
    let mut builder = Builder::new();
    builder.parse_filters(&settings.filter);

    if settings.format == LogFormat::Json {
        builder.format(|buf, record| writeln!(buf, "{}", json_line(record)));
    }

    let mut file_error = None;
    if let Some(path) = &settings.file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(Tee { file })));
            }
            Err(e) => file_error = Some((path, e)),
        }
    }

    builder.try_init()?;
    if let Some((path, e)) = file_error {
        log::warn!("Cannot write log file {}: {e}; logging to stderr only", path.display());
    }
    Ok(())
}
