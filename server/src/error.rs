use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Index(#[from] chem_index::error::Error),

    #[error("could not read settings {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid settings: {0} must be greater than zero")]
    ZeroSetting(&'static str),

    #[error(transparent)]
    Hyper(#[from] hyper::Error),
}

/// Why the outbound half of a connection stopped early.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConnectionError {
    #[error("write did not finish within {0:?}")]
    WriteTimeout(std::time::Duration),

    #[error("write failed: {0}")]
    Write(String),
}
