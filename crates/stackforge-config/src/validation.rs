use std::collections::HashSet;

use stackforge_utils::error::ConfigError;

use crate::{Config, MAX_CACHE_TTL_SECS};

impl Config {
    /// Validate configuration values.
    ///
    /// Every problem is collected; a single problem is returned as-is and
    /// several are wrapped in [`ConfigError::ValidationFailed`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<ConfigError> = Vec::new();

        if let Some(timeout) = self.defaults.tool_timeout_secs
            && timeout == 0
        {
            errors.push(ConfigError::InvalidValue {
                key: "tool_timeout_secs".to_string(),
                value: "must be at least 1 second".to_string(),
            });
        }

        if let Some(ttl) = self.cache.ttl_secs
            && ttl > MAX_CACHE_TTL_SECS
        {
            errors.push(ConfigError::InvalidValue {
                key: "ttl_secs".to_string(),
                value: format!("{ttl} exceeds maximum of {MAX_CACHE_TTL_SECS} seconds (24 hours)"),
            });
        }

        if let Some(name) = &self.defaults.project_name
            && name.trim().is_empty()
        {
            errors.push(ConfigError::InvalidValue {
                key: "project_name".to_string(),
                value: "must not be empty".to_string(),
            });
        }

        let timeout = self.tool_timeout();
        let mut seen = HashSet::new();
        for raw in &self.components {
            if !seen.insert(raw.name.as_str()) {
                errors.push(ConfigError::DuplicateComponent {
                    name: raw.name.clone(),
                });
                continue;
            }
            if let Err(e) = raw.into_spec(timeout) {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            count => Err(ConfigError::ValidationFailed {
                errors: errors.iter().map(ToString::to_string).collect(),
                error_count: count,
            }),
        }
    }
}
