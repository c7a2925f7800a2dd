use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("request log `{}` is not writable", path.display())]
    RequestLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown timezone `{name}`")]
    Timezone { name: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn request_log(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RequestLog {
            path: path.into(),
            source,
        }
    }

    pub fn timezone(name: impl Into<String>) -> Self {
        Self::Timezone { name: name.into() }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
