use crate::cli::{Cli, Commands};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_serve_with_overrides() {
    let cli = Cli::try_parse_from([
        "oxrouter",
        "serve",
        "--config",
        "oxrouter.yaml",
        "--addr",
        "0.0.0.0:8080",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve { config, addr } => {
            assert_eq!(config, Some(PathBuf::from("oxrouter.yaml")));
            assert_eq!(addr.as_deref(), Some("0.0.0.0:8080"));
        }
        other => panic!("Expected Serve command, got {other:?}"),
    }
}

#[test]
fn test_token_requires_user_id() {
    assert!(Cli::try_parse_from(["oxrouter", "token"]).is_err());

    let cli = Cli::try_parse_from(["oxrouter", "token", "--user-id", "7"]).unwrap();
    match cli.command {
        Commands::Token { user_id, .. } => assert_eq!(user_id, 7),
        other => panic!("Expected Token command, got {other:?}"),
    }
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["oxrouter", "generate"]).is_err());
}
