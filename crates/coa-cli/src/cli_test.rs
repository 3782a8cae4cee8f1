use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_global_args_after_subcommand() {
    let cli = Cli::try_parse_from(["coa", "execute", "-n", "nightly", "-d", "/srv/coa", "-v"]).unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.dir, "/srv/coa");
    match cli.command {
        Commands::Execute(args) => assert_eq!(args.name.as_deref(), Some("nightly")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_run_flags() {
    let cli = Cli::try_parse_from(["coa", "run", "--skip-fetch", "--skip-upload"]).unwrap();
    assert_eq!(cli.global.dir, ".");
    match cli.command {
        Commands::Run(args) => {
            assert!(args.skip_fetch);
            assert!(args.skip_upload);
            assert!(args.name.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
