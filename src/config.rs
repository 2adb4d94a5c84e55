//! Configuration loading from `.env` files.

use std::{collections::HashMap, path::PathBuf};

use anyhow::{anyhow, Context, Result};

/// How often clients re-fetch the message list, in seconds.
pub const DEFAULT_POLL_SECS: u64 = 2;

/// Runtime settings read from a `.env` file.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding `msg.json` and `users.json`.
    pub data_dir: PathBuf,
    /// HTTP bind address, e.g. `127.0.0.1:7878`.
    pub bind_http: String,
    /// Client polling interval in seconds.
    pub poll_secs: u64,
}

impl Settings {
    /// Load settings from the specified `.env` file. The file is parsed
    /// directly rather than through the process environment, so concurrent
    /// loads of different files cannot interfere.
    pub fn from_env(path: &str) -> Result<Self> {
        let mut vars = HashMap::new();
        for item in dotenvy::from_filename_iter(path).context("reading env file")? {
            let (key, value) = item.context("parsing env file")?;
            vars.insert(key, value);
        }
        let required = |key: &str| {
            vars.get(key)
                .cloned()
                .ok_or_else(|| anyhow!("missing {key} in {path}"))
        };
        let data_dir = PathBuf::from(required("DATA_DIR")?);
        let bind_http = required("BIND_HTTP")?;
        let poll_secs = vars
            .get("POLL_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_SECS);
        Ok(Self {
            data_dir,
            bind_http,
            poll_secs,
        })
    }
}
