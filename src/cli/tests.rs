use super::*;
use clap::CommandFactory;

fn parse_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv)
        .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
}

#[test]
fn cli_definition_is_consistent() {
    Args::command().debug_assert();
}

#[test]
fn test_new_joins_prompt_words() {
    let args = parse_args(&["anim", "new", "Explain", "limits", "visually"]);
    match args.command {
        Commands::New { prompt } => assert_eq!(prompt.join(" "), "Explain limits visually"),
        other => panic!("expected new, got {other:?}"),
    }
}

#[test]
fn test_new_requires_prompt() {
    assert!(Args::try_parse_from(["anim", "new"]).is_err());
}

#[test]
fn test_send_takes_chat_id_then_prompt() {
    let args = parse_args(&["anim", "send", "chat-7", "Now", "derivatives"]);
    match args.command {
        Commands::Send { chat_id, prompt } => {
            assert_eq!(chat_id, "chat-7");
            assert_eq!(prompt, vec!["Now", "derivatives"]);
        }
        other => panic!("expected send, got {other:?}"),
    }
}

#[test]
fn test_global_log_flags() {
    let cases: [(&[&str], Option<&str>, Option<&str>); 3] = [
        (&["anim", "--log", "t.log", "open", "c1"], Some("t.log"), None),
        (&["anim", "open", "c1", "-l", "t.log"], Some("t.log"), None),
        (&["anim", "history", "--debug-log", "d.log"], None, Some("d.log")),
    ];

    for (argv, expected_log, expected_debug) in cases {
        let args = parse_args(argv);
        assert_eq!(
            args.log.as_deref().and_then(|path| path.to_str()),
            expected_log,
            "unexpected --log for argv={argv:?}"
        );
        assert_eq!(
            args.debug_log.as_deref().and_then(|path| path.to_str()),
            expected_debug,
            "unexpected --debug-log for argv={argv:?}"
        );
    }
}

#[test]
fn test_set_and_unset() {
    match parse_args(&["anim", "set", "api-url", "https://anim.example.com"]).command {
        Commands::Set { key, value } => {
            assert_eq!(key, "api-url");
            assert_eq!(value, "https://anim.example.com");
        }
        other => panic!("expected set, got {other:?}"),
    }
    assert!(matches!(
        parse_args(&["anim", "unset", "api-token"]).command,
        Commands::Unset { key } if key == "api-token"
    ));
}

#[test]
fn test_subcommand_is_required() {
    assert!(Args::try_parse_from(["anim"]).is_err());
}
