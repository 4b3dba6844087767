use crate::error::{Error, Result};
use crate::types::ReadConsistency;
use std::env;

/// Environment variable holding the project id
pub const PROJECT_ENV: &str = "DATASTORE_PROJECT";

/// Fallback environment variable for the project id
pub const FALLBACK_PROJECT_ENV: &str = "GCLOUD_PROJECT";

/// Environment variable holding the default namespace
pub const NAMESPACE_ENV: &str = "DATASTORE_NAMESPACE";

/// Dataset configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Project every key and request is scoped to
    pub project_id: String,

    /// Namespace stamped onto keys that carry none (None = default namespace)
    pub namespace: Option<String>,

    /// Consistency used by lookups and queries that do not ask for one
    pub default_consistency: Option<ReadConsistency>,
}

impl DatasetConfig {
    /// Create a configuration for a project
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Read the configuration from the environment.
    ///
    /// The project comes from `DATASTORE_PROJECT`, falling back to
    /// `GCLOUD_PROJECT`; the namespace from `DATASTORE_NAMESPACE`.
    pub fn from_env() -> Result<Self> {
        let project_id = env::var(PROJECT_ENV)
            .or_else(|_| env::var(FALLBACK_PROJECT_ENV))
            .map_err(|_| {
                Error::InvalidConfig(format!(
                    "neither {} nor {} is set",
                    PROJECT_ENV, FALLBACK_PROJECT_ENV
                ))
            })?;

        let mut config = Self::new(project_id);
        if let Ok(namespace) = env::var(NAMESPACE_ENV) {
            if !namespace.is_empty() {
                config.namespace = Some(namespace);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the default namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the default read consistency
    pub fn with_default_consistency(mut self, consistency: ReadConsistency) -> Self {
        self.default_consistency = Some(consistency);
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(Error::InvalidConfig("project_id must not be empty".to_string()));
        }

        if let Some(namespace) = &self.namespace {
            if namespace.is_empty() {
                return Err(Error::InvalidConfig(
                    "namespace must not be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}
