use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    domain::ChannelKind,
    errors::Error,
    reconciler::{BatchPolicy, ReconcileOptions},
    Result,
};

/// Typed configuration for the sync shim, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Remote RPC bridge
    pub rpc_url: String,
    pub rpc_token: Option<String>,
    pub rpc_timeout: Duration,

    // Local data
    pub integrations_file: PathBuf,
    pub store_file: Option<PathBuf>,

    // Reconciliation behavior
    pub channel_kind: ChannelKind,
    pub batch_policy: BatchPolicy,
    pub serialize_by_key: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_url = get("CRMSYNC_RPC_URL")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("CRMSYNC_RPC_URL environment variable is required".to_string())
            })?;
        let rpc_token = get("CRMSYNC_RPC_TOKEN").and_then(non_empty);
        let rpc_timeout = Duration::from_millis(
            parse_u64(get("CRMSYNC_RPC_TIMEOUT_MS")).unwrap_or(30_000),
        );

        let integrations_file = get("CRMSYNC_INTEGRATIONS_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("integrations.json"));
        let store_file = get("CRMSYNC_STORE_FILE")
            .and_then(non_empty)
            .map(PathBuf::from);

        let channel_kind = get("CRMSYNC_CHANNEL_KIND")
            .and_then(non_empty)
            .map(|s| ChannelKind(s.trim().to_lowercase()))
            .unwrap_or_default();
        let batch_policy = match get("CRMSYNC_BATCH_POLICY").and_then(non_empty) {
            Some(v) => v.parse::<BatchPolicy>()?,
            None => BatchPolicy::default(),
        };
        let serialize_by_key = parse_bool(get("CRMSYNC_SERIALIZE_BY_KEY")).unwrap_or(true);

        Ok(Self {
            rpc_url,
            rpc_token,
            rpc_timeout,
            integrations_file,
            store_file,
            channel_kind,
            batch_policy,
            serialize_by_key,
        })
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            channel_kind: self.channel_kind.clone(),
            batch_policy: self.batch_policy,
            serialize_by_key: self.serialize_by_key,
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(v: &str) -> &str {
    if v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')))
    {
        &v[1..v.len() - 1]
    } else {
        v
    }
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
