//! Argument parsing for the stackforge CLI.

use clap::Parser;

use stackforge::MapMode;
use stackforge::cli::{CacheCommands, Cli, Commands, build_cli};

#[test]
fn cli_definition_is_consistent() {
    build_cli().debug_assert();
}

#[test]
fn global_flags_map_to_config_overrides() {
    let cli = Cli::try_parse_from([
        "stackforge",
        "generate",
        "--output-dir",
        "out",
        "--offline",
        "--sequential",
        "--max-workers",
        "2",
        "--map-mode",
        "copy",
        "--keep-backup",
        "--json",
    ])
    .unwrap();

    assert!(matches!(cli.command, Commands::Generate { json: true }));
    let args = cli.to_cli_args();
    assert_eq!(args.output_dir.as_deref().map(|p| p.as_str()), Some("out"));
    assert!(args.offline);
    assert!(args.sequential);
    assert_eq!(args.max_workers, Some(2));
    assert_eq!(args.map_mode, Some(MapMode::Copy));
    assert!(args.keep_backup);
    assert_eq!(args.verbose, None);
}

#[test]
fn unknown_map_mode_is_rejected() {
    assert!(Cli::try_parse_from(["stackforge", "generate", "--map-mode", "hardlink"]).is_err());
}

#[test]
fn cache_refresh_takes_tool_list() {
    let cli = Cli::try_parse_from(["stackforge", "cache", "refresh", "go", "npx"]).unwrap();
    match cli.command {
        Commands::Cache(CacheCommands::Refresh { tools }) => {
            assert_eq!(tools, vec!["go".to_string(), "npx".to_string()]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn verbose_flag_is_global() {
    let cli = Cli::try_parse_from(["stackforge", "doctor", "-v"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.to_cli_args().verbose, Some(true));
}
