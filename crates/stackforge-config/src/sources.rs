use std::collections::BTreeMap;

use crate::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> String {
    source.copied().unwrap_or(ConfigSource::Default).to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        add("project_name", self.project_name().to_string());
        add("output_dir", self.output_dir().to_string());
        add(
            "prefer_external_tools",
            self.prefer_external_tools().to_string(),
        );
        add("offline", self.offline().to_string());
        add("detect_offline", self.detect_offline().to_string());
        add("parallel", self.parallel().to_string());
        add("max_workers", self.max_workers().to_string());
        add(
            "tool_timeout_secs",
            self.tool_timeout().as_secs().to_string(),
        );
        add("backup", self.backup().to_string());
        add("keep_backup", self.keep_backup().to_string());
        add("map_mode", self.map_mode().to_string());
        add("verbose", self.verbose().to_string());
        add("cache_ttl_secs", self.cache_ttl().as_secs().to_string());
        add("cache_path", self.cache_path().to_string());

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_labels_sources() {
        let _home = stackforge_utils::paths::with_isolated_home();
        let mut config = Config::default();
        config.defaults.max_workers = Some(2);
        config
            .source_attribution
            .insert("max_workers".to_string(), ConfigSource::Cli);

        let effective = config.effective_config();
        assert_eq!(
            effective.get("max_workers"),
            Some(&("2".to_string(), "cli".to_string()))
        );
        assert_eq!(
            effective.get("parallel"),
            Some(&("true".to_string(), "default".to_string()))
        );
    }
}
