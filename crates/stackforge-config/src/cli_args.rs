use camino::Utf8PathBuf;

use crate::model::MapMode;

/// Command-line overrides layered on top of the config file.
///
/// `None` means "not given on the command line"; the flag-style booleans
/// only ever force a value.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub project_name: Option<String>,
    pub output_dir: Option<Utf8PathBuf>,
    /// `--no-external-tools`
    pub no_external_tools: bool,
    pub offline: bool,
    pub detect_offline: bool,
    /// `--sequential`
    pub sequential: bool,
    pub max_workers: Option<usize>,
    pub tool_timeout_secs: Option<u64>,
    /// `--no-backup`
    pub no_backup: bool,
    pub keep_backup: bool,
    pub map_mode: Option<MapMode>,
    pub verbose: Option<bool>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_path: Option<Utf8PathBuf>,
}
