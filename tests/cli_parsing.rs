use bothost::cli::{Cli, Commands};
use bothost::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_parse_check() {
    let cli = Cli::try_parse_from(["bothost", "check", "config.yaml", "--strict"]).unwrap();

    assert!(!cli.json);
    match cli.command {
        Commands::Check(args) => {
            assert_eq!(args.config, PathBuf::from("config.yaml"));
            assert!(args.strict);
            assert!(args.env_prefix.is_none());
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_check_with_env_prefix() {
    let cli =
        Cli::try_parse_from(["bothost", "check", "config.yaml", "--env-prefix", "BOTHOST_"]).unwrap();

    match cli.command {
        Commands::Check(args) => {
            let options = args.load_options();
            assert_eq!(options.env_prefix.as_deref(), Some("BOTHOST_"));
            assert!(!options.strict);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_json_flag_is_global() {
    let cli = Cli::try_parse_from(["bothost", "show", "config.yaml", "--json"]).unwrap();
    assert!(cli.json);

    let cli = Cli::try_parse_from(["bothost", "-j", "show", "config.yaml"]).unwrap();
    assert!(cli.json);
}

#[test]
fn test_parse_show_reveal_secrets() {
    let cli = Cli::try_parse_from(["bothost", "show", "bot.yaml", "--reveal-secrets"]).unwrap();

    match cli.command {
        Commands::Show(args) => {
            assert_eq!(args.config, PathBuf::from("bot.yaml"));
            assert!(args.reveal_secrets);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_init_defaults() {
    let cli = Cli::try_parse_from(["bothost", "init"]).unwrap();

    match cli.command {
        Commands::Init(args) => {
            assert_eq!(args.path, PathBuf::from("config.yaml"));
            assert!(!args.force);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_init_force_with_path() {
    let cli = Cli::try_parse_from(["bothost", "init", "etc/bot.yaml", "--force"]).unwrap();

    match cli.command {
        Commands::Init(args) => {
            assert_eq!(args.path, PathBuf::from("etc/bot.yaml"));
            assert!(args.force);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_run_with_log_overrides() {
    let cli = Cli::try_parse_from([
        "bothost",
        "run",
        "config.yaml",
        "--log-level",
        "debug",
        "--log-format",
        "json",
    ])
    .unwrap();

    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.log_level.as_deref(), Some("debug"));
            assert_eq!(args.log_format, Some(LogFormat::Json));
            assert!(!args.strict);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_config_path_is_required() {
    assert!(Cli::try_parse_from(["bothost", "check"]).is_err());
    assert!(Cli::try_parse_from(["bothost", "run"]).is_err());
}

#[test]
fn test_invalid_log_format_rejected() {
    assert!(Cli::try_parse_from(["bothost", "run", "c.yaml", "--log-format", "xml"]).is_err());
}
