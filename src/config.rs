//! Configuration loading and snapshot management.
//!
//! Configuration is layered: defaults, an optional TOML file, `MERIDIAN_`
//! prefixed environment variables, then CLI flags. The loaded [`AppConfig`]
//! is immutable; components hold a [`SharedConfig`] and read the current
//! snapshot per request. Updates (the config endpoint) build a *new*
//! snapshot and swap it in; nothing mutates a live config in place.

use std::sync::Arc;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Host address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Credentials and endpoints for model providers.
///
/// An absent value means the provider is unconfigured and contributes no
/// models to the catalog.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ollama_api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub searxng_api_url: String,
    pub similarity_measure: String,
}

/// The current configuration snapshot, swappable at runtime.
pub type SharedConfig = Arc<RwLock<Arc<AppConfig>>>;

/// Fields accepted by a provider-configuration update.
///
/// `None` leaves the current value untouched.
#[derive(Debug, Default, Clone)]
pub struct ProviderUpdate {
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub ollama_api_url: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        builder = builder
            .set_default("server.port", 3001)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("search.searxng_api_url", "http://localhost:8080")?
            .set_default("search.similarity_measure", "cosine")?;

        // Config file: explicit path wins, otherwise ./meridian.toml if present.
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("meridian").required(false));
        }

        // Environment variables, e.g. MERIDIAN_SERVER__PORT=8000,
        // MERIDIAN_PROVIDERS__OPENAI_API_KEY=sk-...
        builder = builder.add_source(
            Environment::with_prefix("MERIDIAN")
                .separator("__")
                .try_parsing(true),
        );

        // CLI flags override everything else.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Wrap this config as the initial shared snapshot.
    #[must_use]
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(Arc::new(self)))
    }

    /// Build a new snapshot with the given provider fields replaced.
    #[must_use]
    pub fn with_provider_update(&self, update: ProviderUpdate) -> Self {
        let mut next = self.clone();
        if let Some(v) = update.openai_api_key {
            next.providers.openai_api_key = Some(v);
        }
        if let Some(v) = update.groq_api_key {
            next.providers.groq_api_key = Some(v);
        }
        if let Some(v) = update.anthropic_api_key {
            next.providers.anthropic_api_key = Some(v);
        }
        if let Some(v) = update.ollama_api_url {
            next.providers.ollama_api_url = Some(v);
        }
        next
    }
}

/// Read the current snapshot.
pub async fn snapshot(shared: &SharedConfig) -> Arc<AppConfig> {
    Arc::clone(&*shared.read().await)
}

/// Install a new snapshot.
pub async fn install(shared: &SharedConfig, next: AppConfig) {
    let mut guard = shared.write().await;
    *guard = Arc::new(next);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                port: 3001,
                host: "0.0.0.0".to_string(),
            },
            providers: ProvidersConfig::default(),
            search: SearchConfig {
                searxng_api_url: "http://localhost:8080".to_string(),
                similarity_measure: "cosine".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_update_produces_new_snapshot() {
        let shared = base_config().into_shared();

        let before = snapshot(&shared).await;
        assert!(before.providers.openai_api_key.is_none());

        let next = before.with_provider_update(ProviderUpdate {
            openai_api_key: Some("sk-new".to_string()),
            ..ProviderUpdate::default()
        });
        install(&shared, next).await;

        let after = snapshot(&shared).await;
        assert_eq!(after.providers.openai_api_key.as_deref(), Some("sk-new"));
        // The old snapshot is untouched.
        assert!(before.providers.openai_api_key.is_none());
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut cfg = base_config();
        cfg.providers.groq_api_key = Some("gsk-old".to_string());

        let next = cfg.with_provider_update(ProviderUpdate {
            ollama_api_url: Some("http://localhost:11434".to_string()),
            ..ProviderUpdate::default()
        });

        assert_eq!(next.providers.groq_api_key.as_deref(), Some("gsk-old"));
        assert_eq!(
            next.providers.ollama_api_url.as_deref(),
            Some("http://localhost:11434")
        );
    }
}
