//! Sandbox/live target selection.
//!
//! The active environment decides which Element Pay host receives proxied
//! requests. It is held by an [`EnvironmentManager`] that lives in the
//! application state; subscribers are notified through a `watch` channel and
//! the choice is persisted to a small JSON file so it survives restarts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Live,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Live => "live",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Sandbox => Self::Live,
            Self::Live => Self::Sandbox,
        }
    }

    /// Network that API keys issued against this environment belong to.
    #[must_use]
    pub const fn network(self) -> Network {
        match self {
            Self::Sandbox => Network::Testnet,
            Self::Live => Network::Mainnet,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown environment '{0}', expected 'sandbox' or 'live'")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" => Ok(Self::Live),
            other => Err(UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "live" => Ok(Self::Mainnet),
            "testnet" | "sandbox" => Ok(Self::Testnet),
            other => Err(UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Preference {
    environment: Environment,
}

struct Inner {
    sender: watch::Sender<Environment>,
    preference_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct EnvironmentManager {
    inner: Arc<Inner>,
}

impl EnvironmentManager {
    /// Creates a manager starting from the persisted preference when one
    /// exists, otherwise from `default`.
    #[must_use]
    pub fn new(default: Environment, preference_path: Option<PathBuf>) -> Self {
        let initial = preference_path
            .as_deref()
            .and_then(load_preference)
            .unwrap_or(default);

        debug!(environment = %initial, "Environment manager initialised");

        let (sender, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                sender,
                preference_path,
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let path = config.environment.preference_path.trim();
        let path = (!path.is_empty()).then(|| PathBuf::from(path));
        Self::new(config.upstream.default_environment, path)
    }

    #[must_use]
    pub fn current(&self) -> Environment {
        *self.inner.sender.borrow()
    }

    /// Switches the active environment. Subscribers are only woken when the
    /// value actually changes; the return value reports whether it did.
    pub fn set(&self, environment: Environment) -> bool {
        let changed = self.inner.sender.send_if_modified(|current| {
            if *current == environment {
                false
            } else {
                *current = environment;
                true
            }
        });

        if changed {
            info!(environment = %environment, "Active environment changed");
            self.persist(environment);
        }

        changed
    }

    pub fn toggle(&self) -> Environment {
        let mut next = self.current();
        self.inner.sender.send_modify(|current| {
            *current = current.toggled();
            next = *current;
        });

        info!(environment = %next, "Active environment toggled");
        self.persist(next);
        next
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Environment> {
        self.inner.sender.subscribe()
    }

    fn persist(&self, environment: Environment) {
        let Some(path) = self.inner.preference_path.as_deref() else {
            return;
        };

        if let Err(e) = save_preference(path, environment) {
            warn!("Failed to persist environment preference to {}: {e:#}", path.display());
        }
    }
}

fn load_preference(path: &Path) -> Option<Environment> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Preference>(&content) {
        Ok(pref) => Some(pref.environment),
        Err(e) => {
            warn!("Ignoring unreadable environment preference {}: {e}", path.display());
            None
        }
    }
}

fn save_preference(path: &Path, environment: Environment) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&Preference { environment })?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_preference() -> PathBuf {
        std::env::temp_dir().join(format!("paydash-env-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_parse_environment() {
        assert_eq!("sandbox".parse::<Environment>(), Ok(Environment::Sandbox));
        assert_eq!(" LIVE ".parse::<Environment>(), Ok(Environment::Live));
        assert!("production".parse::<Environment>().is_err());
        assert_eq!(Environment::Live.network(), Network::Mainnet);
        assert_eq!("sandbox".parse::<Network>(), Ok(Network::Testnet));
    }

    #[test]
    fn test_set_notifies_only_on_change() {
        let manager = EnvironmentManager::new(Environment::Sandbox, None);
        let rx = manager.subscribe();

        assert!(!manager.set(Environment::Sandbox));
        assert!(!rx.has_changed().unwrap());

        assert!(manager.set(Environment::Live));
        assert!(rx.has_changed().unwrap());
        assert_eq!(manager.current(), Environment::Live);
    }

    #[test]
    fn test_preference_survives_restart() {
        let path = temp_preference();

        let manager = EnvironmentManager::new(Environment::Sandbox, Some(path.clone()));
        assert_eq!(manager.toggle(), Environment::Live);

        let reloaded = EnvironmentManager::new(Environment::Sandbox, Some(path.clone()));
        assert_eq!(reloaded.current(), Environment::Live);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_corrupt_preference_falls_back_to_default() {
        let path = temp_preference();
        std::fs::write(&path, "not json").unwrap();

        let manager = EnvironmentManager::new(Environment::Live, Some(path.clone()));
        assert_eq!(manager.current(), Environment::Live);

        let _ = std::fs::remove_file(path);
    }
}
