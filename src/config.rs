use std::{
    fs,
    net::{Ipv6Addr, SocketAddr},
    path::Path,
    sync::Arc,
    time::Duration,
};

use reqwest::blocking::Client;
use serde::{de, Deserialize, Deserializer};
use tracing::info;

use crate::{
    check::{Level, ServiceCheck},
    error::{Error, Result, TransportError},
    remote::{RemoteKind, RemoteProbe, DEFAULT_TIMEOUT},
};

/// Daemon configuration, read from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub name: String,
    /// Period between two evaluations
    #[serde(default = "default_interval", deserialize_with = "duration")]
    pub interval: Duration,
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_path")]
    pub path: String,
    /// Timeout of each remote health request
    #[serde(default = "default_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub level: LevelName,
    #[serde(default)]
    pub kind: RemoteKind,
}

/// Level as spelled in config files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelName {
    #[default]
    Soft,
    Hard,
}

impl From<LevelName> for Level {
    fn from(name: LevelName) -> Self {
        match name {
            LevelName::Soft => Level::Soft,
            LevelName::Hard => Level::Hard,
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_listen() -> SocketAddr {
    (Ipv6Addr::UNSPECIFIED, 8080).into()
}

fn default_path() -> String {
    "/health".into()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_duration::parse(&text).map_err(de::Error::custom)
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read {}: {}", path.display(), err)))?;
        text.parse()
    }

    /// Build a check with one remote probe per configured dependency.
    ///
    /// Every dependency is probed once here with a blocking client, so call
    /// this outside async context.
    pub fn into_service_check(self) -> Result<Arc<ServiceCheck>> {
        let check = ServiceCheck::new(self.name, self.interval)?;
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(TransportError::from)?;
        for dep in self.dependencies {
            let probe = RemoteProbe::with_client(client.clone(), dep.url, dep.kind);
            check.register(dep.name, dep.level.into(), probe)?;
        }
        info!(
            "Watching {} dependencies of [{}]",
            check.dependencies().len(),
            check.name()
        );
        Ok(Arc::new(check))
    }
}

impl std::str::FromStr for Config {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
        if !config.path.starts_with('/') {
            return Err(Error::Config(format!(
                "path must start with '/', got {:?}",
                config.path
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: Config = r#"name = "orders""#.parse().unwrap();
        assert_eq!(config.name, "orders");
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.path, "/health");
        assert_eq!(config.listen.port(), 8080);
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn full_config() {
        let config: Config = r#"
            name = "orders"
            interval = "10s"
            listen = "127.0.0.1:9000"
            path = "/status"
            timeout = "2s"

            [[dependencies]]
            name = "payments"
            url = "http://payments:8080/health"
            level = "hard"
            kind = "service"

            [[dependencies]]
            name = "search"
            url = "http://search:9200/"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.dependencies.len(), 2);
        let payments = &config.dependencies[0];
        assert_eq!(Level::from(payments.level), Level::Hard);
        assert_eq!(payments.kind, RemoteKind::Service);
        let search = &config.dependencies[1];
        assert_eq!(Level::from(search.level), Level::Soft);
        assert_eq!(search.kind, RemoteKind::Endpoint);
    }

    #[test]
    fn reject_bad_values() {
        for text in [
            "",
            r#"name = "orders"
               interval = "soon""#,
            r#"name = "orders"
               [[dependencies]]
               name = "db"
               url = "http://db/"
               level = "critical""#,
            r#"name = "orders"
               colour = "blue""#,
            r#"name = "orders"
               path = "health""#,
        ] {
            assert!(matches!(text.parse::<Config>(), Err(Error::Config(_))), "{}", text);
        }
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/depwatch.toml"),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reject_duplicate_dependency_names() {
        let config: Config = r#"
            name = "orders"
            [[dependencies]]
            name = "db"
            url = "http://127.0.0.1:1/"
            [[dependencies]]
            name = "db"
            url = "http://127.0.0.1:1/"
        "#
        .parse()
        .unwrap();
        let result = tokio::task::spawn_blocking(move || config.into_service_check())
            .await
            .unwrap();
        assert!(matches!(result, Err(Error::DuplicateDependency(name)) if name == "db"));
    }
}
