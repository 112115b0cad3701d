//! Coordinator configuration.
//!
//! [`CoordinatorConfig`] holds the key namespace and the polling policy used
//! while another tab owns a task. Build it in code with the `with_*`
//! methods or load it from TOML:
//!
//! ```toml
//! namespace = "__fxa_pending_tasks"
//! poll_interval_ms = 500
//! # max_attempts = 120
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_POLL_INTERVAL_MS, KEY_SEPARATOR};
use crate::error::TaskError;
use crate::retry::FixedDelay;

/// Settings for a [`PendingTasks`](crate::PendingTasks) coordinator.
///
/// # Defaults
///
/// | Setting            | Default               | Description                         |
/// |--------------------|-----------------------|-------------------------------------|
/// | `namespace`        | `__fxa_pending_tasks` | Key prefix in the shared store      |
/// | `poll_interval_ms` | 500                   | Wait between contended reads        |
/// | `max_attempts`     | `None`                | Cap on waits (`None` = wait forever) |
///
/// # Examples
///
/// ```
/// use pending_tasks::CoordinatorConfig;
///
/// let config = CoordinatorConfig::default();
/// assert_eq!(config.namespace, "__fxa_pending_tasks");
/// assert_eq!(config.poll_interval_ms, 500);
/// assert_eq!(config.max_attempts, None);
///
/// let config = CoordinatorConfig::default()
///     .with_namespace("my_app_tasks")
///     .with_poll_interval_ms(250)
///     .with_max_attempts(40);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Prefix of every storage key. Must be non-empty and free of `.`.
    pub namespace: String,

    /// Delay between reads while another live tab owns the task.
    pub poll_interval_ms: u64,

    /// Maximum number of waits before `retrieve` gives up.
    pub max_attempts: Option<u32>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: None,
        }
    }
}

impl CoordinatorConfig {
    /// Sets the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the poll interval in milliseconds.
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Caps the number of waits.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the TOML is malformed or fails
    /// [`validate`](Self::validate).
    ///
    /// # Examples
    ///
    /// ```
    /// use pending_tasks::CoordinatorConfig;
    ///
    /// let config = CoordinatorConfig::from_toml("poll_interval_ms = 100").unwrap();
    /// assert_eq!(config.poll_interval_ms, 100);
    /// assert_eq!(config.namespace, "__fxa_pending_tasks");
    ///
    /// assert!(CoordinatorConfig::from_toml("poll_interval_ms = 0").is_err());
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, TaskError> {
        let config: Self = toml::from_str(content).map_err(|e| TaskError::Config {
            message: format!("failed to parse config TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings for values the coordinator cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] for an empty namespace, a namespace
    /// containing the key separator, or a zero poll interval.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.namespace.is_empty() {
            return Err(TaskError::Config {
                message: "namespace must not be empty".to_string(),
            });
        }
        if self.namespace.contains(KEY_SEPARATOR) {
            return Err(TaskError::Config {
                message: format!(
                    "namespace {:?} must not contain '{KEY_SEPARATOR}'",
                    self.namespace
                ),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(TaskError::Config {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The [`FixedDelay`] strategy these settings describe.
    pub fn retry_strategy(&self) -> FixedDelay {
        FixedDelay {
            delay: self.poll_interval(),
            max_attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_toml_document() {
        let config = CoordinatorConfig::from_toml(
            r#"
namespace = "other_tasks"
poll_interval_ms = 50
max_attempts = 10
"#,
        )
        .unwrap();
        assert_eq!(
            config,
            CoordinatorConfig {
                namespace: "other_tasks".to_string(),
                poll_interval_ms: 50,
                max_attempts: Some(10),
            }
        );
        assert_eq!(
            config.retry_strategy(),
            FixedDelay::new(Duration::from_millis(50)).with_max_attempts(10)
        );
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            CoordinatorConfig::from_toml("").unwrap(),
            CoordinatorConfig::default()
        );
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = CoordinatorConfig::from_toml("poll_interval_ms = \"fast\"").unwrap_err();
        match err {
            TaskError::Config { message } => assert!(message.contains("parse")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_namespaces() {
        assert!(CoordinatorConfig::default()
            .with_namespace("")
            .validate()
            .is_err());
        assert!(CoordinatorConfig::default()
            .with_namespace("a.b")
            .validate()
            .is_err());
    }

    #[test]
    fn default_strategy_matches_default_poll() {
        assert_eq!(
            CoordinatorConfig::default().retry_strategy(),
            FixedDelay::default()
        );
    }
}
