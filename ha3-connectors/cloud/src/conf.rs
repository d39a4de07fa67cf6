use std::{collections::HashMap, fmt, time::Duration};

use ha3_core::{
    config::{self, properties_to_value},
    err::{bail, Context, Result},
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// Connection strings must start with this prefix
pub const URL_PREFIX: &str = "jdbc:ha3://";

/// Pool capacity used when none is configured
pub const DEFAULT_POOL_SIZE: u64 = 10;

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// The connection config
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Ha3ConnectionConfig {
    /// Endpoint domain of the instance
    #[serde(default)]
    pub service_name: String,
    #[serde(default, alias = "user")]
    pub username: String,
    #[serde(default, alias = "pass")]
    pub password: String,
    /// Maximum number of distinct clients held by the process, 0 for the default
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub max_pool_size: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub enable_detail_log: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub enable_dynamic_params: bool,
    /// `local` serves a bundled sample response without any network access
    #[serde(default)]
    pub mode: Option<String>,
    /// Connect timeout of the remote client, 0 for the default
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub connect_timeout_ms: u64,
}

impl Ha3ConnectionConfig {
    pub fn parse(options: config::Value) -> Result<Self> {
        config::from_value::<Self>(options)
            .context("Failed to parse connection configuration options")
    }

    /// Parses a `jdbc:ha3://[host][?k=v&k=v]` connection string.
    ///
    /// Query parameters take precedence over the supplied properties.
    /// A host segment is used as the service name when none is given.
    pub fn from_url(url: &str, props: &HashMap<String, String>) -> Result<Self> {
        let url = url.trim();
        if !url.starts_with(URL_PREFIX) {
            bail!("Expected [{}] url, received [{}]", URL_PREFIX, url);
        }

        let rest = &url[URL_PREFIX.len()..];
        let (host, query) = match rest.split_once('?') {
            Some((host, query)) => (host, Some(query)),
            None => (rest, None),
        };

        let mut merged = Self::normalise_properties(props.clone());

        if let Some(query) = query {
            let mut params = HashMap::new();
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some((key, val)) => params.insert(key.to_string(), val.to_string()),
                    None => bail!("Invalid connection string parameter '{}'", pair),
                };
            }
            merged.extend(Self::normalise_properties(params));
        }

        let host = host.trim_end_matches('/');
        if !host.is_empty() && !merged.contains_key("serviceName") {
            merged.insert("serviceName".into(), host.into());
        }

        Self::parse(properties_to_value(merged))
    }

    /// Collapses the short property aliases onto their canonical keys
    fn normalise_properties(mut props: HashMap<String, String>) -> HashMap<String, String> {
        for (alias, key) in [("user", "username"), ("pass", "password")] {
            if let Some(val) = props.remove(alias) {
                props.insert(key.into(), val);
            }
        }

        props
    }

    pub fn is_local_mode(&self) -> bool {
        self.mode.as_deref() == Some("local")
    }

    /// The pool capacity, substituting the default for 0
    pub fn pool_capacity(&self) -> u64 {
        if self.max_pool_size == 0 {
            DEFAULT_POOL_SIZE
        } else {
            self.max_pool_size
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(match self.connect_timeout_ms {
            0 => DEFAULT_CONNECT_TIMEOUT_MS,
            ms => ms,
        })
    }

    /// Base url of the instance, defaulting to http when no scheme is present
    pub fn endpoint(&self) -> String {
        let endpoint = self.service_name.trim_end_matches('/');

        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        }
    }

    /// Derives the key under which clients are shared.
    /// Flags which do not change the engine a client talks to are excluded.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        ConfigFingerprint(format!(
            "serviceName={};username={};password={};mode={}",
            self.service_name,
            self.username,
            self.password,
            if self.is_local_mode() { "local" } else { "remote" }
        ))
    }
}

/// Identity of a remote connection, embeds credentials so is never logged
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint(String);

impl fmt::Debug for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigFingerprint(..)")
    }
}
