use super::*;

#[test]
fn token_dir_prefers_flag() {
    let dir = resolve_token_dir(Some(PathBuf::from("/tmp/x")), Some(PathBuf::from("/home/u/.config"))).unwrap();
    assert_eq!(dir, PathBuf::from("/tmp/x"));
}

#[test]
fn token_dir_falls_back_to_config_dir() {
    let dir = resolve_token_dir(None, Some(PathBuf::from("/home/u/.config"))).unwrap();
    assert_eq!(dir, PathBuf::from("/home/u/.config").join(TOKEN_DIR_NAME));
    assert!(matches!(resolve_token_dir(None, None), Err(CliError::MissingTokenDir)));
}

#[test]
fn base_url_flag_is_trimmed() {
    assert_eq!(resolve_base_url(Some("http://api.test/")), "http://api.test");
}

#[test]
fn session_requirement_distinguishes_expiry() {
    assert!(require_session(SessionPhase::Authenticated, true).is_ok());
    assert!(matches!(require_session(SessionPhase::Unauthenticated, true), Err(CliError::SessionExpired)));
    assert!(matches!(require_session(SessionPhase::Unauthenticated, false), Err(CliError::NotLoggedIn)));
    assert_eq!(CliError::SessionExpired.to_string(), "session expired, please log in again");
}

#[test]
fn auth_errors_show_their_message() {
    let err = CliError::from(AuthError::InvalidCredentials("Incorrect username or password".to_owned()));
    assert_eq!(err.to_string(), "Incorrect username or password");
}

#[test]
fn parses_todo_update() {
    let cli = Cli::try_parse_from(["todo", "--via-proxy", "todo", "update", "7", "--completed", "true"]).unwrap();
    assert!(cli.via_proxy);
    match cli.command {
        Command::Todo(TodoCommand { command: TodoSubcommand::Update { id, completed, title, .. } }) => {
            assert_eq!(id, 7);
            assert_eq!(completed, Some(true));
            assert_eq!(title, None);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn list_defaults_to_page_limit() {
    let cli = Cli::try_parse_from(["todo", "todo", "list"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Todo(TodoCommand { command: TodoSubcommand::List { limit: DEFAULT_PAGE_LIMIT, offset: 0, completed: None } })
    ));
}

#[test]
fn failures_print_their_message() {
    let mut out = Vec::new();
    assert_eq!(finish(Err(CliError::SessionExpired), &mut out), ExitCode::FAILURE);
    assert_eq!(String::from_utf8(out).unwrap(), "session expired, please log in again\n");

    let mut out = Vec::new();
    let err = CliError::from(AuthError::InvalidCredentials("Incorrect username or password".to_owned()));
    finish(Err(err), &mut out);
    assert_eq!(String::from_utf8(out).unwrap(), "Incorrect username or password\n");
}

#[test]
fn success_prints_nothing() {
    let mut out = Vec::new();
    assert_eq!(finish(Ok(()), &mut out), ExitCode::SUCCESS);
    assert!(out.is_empty());
}
