use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::cache::lock::mutex_lock;

use super::error::InfraError;

const SOURCE: &str = "archivist::infra::request_log";

/// Append-only request log for one collection.
///
/// Appends are serialized so concurrent requests never interleave lines.
#[derive(Debug)]
pub struct RequestLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RequestLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| InfraError::request_log(&path, err))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| InfraError::request_log(&path, err))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one tab-separated line: timestamp, collection, path.
    pub fn append(&self, collection: &str, request_path: &str) -> Result<(), InfraError> {
        let at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "-".to_string());
        let line = format!("{at}\t{collection}\t{}\n", sanitize(request_path));

        let mut file = mutex_lock(&self.file, SOURCE, "append");
        file.write_all(line.as_bytes()).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "Request log append failed");
            InfraError::request_log(&self.path, err)
        })
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
