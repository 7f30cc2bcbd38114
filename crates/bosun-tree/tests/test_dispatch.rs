//! Integration tests for input resolution through the command tree.
//!
//! Covers the walker end to end: literal dispatch, typed arguments,
//! defaults, intermediary executors, flag groups, aggregates, and the
//! failure kinds each misuse produces.

mod common;

use std::sync::Arc;

use bosun_tree::parsers::{
    flag_value_key, AggregateResult, FlagDefinition, FlagParser, IntegerParser,
    StandardAggregateParser, StringMode, StringParser,
};
use bosun_tree::{
    Command, CommandComponent, CommandTree, DefaultValue, InsertError, ParseError, ParsedValue,
    Permission, SenderRequirement, Settings, TreeHooks,
};
use bosun_types::FnAuthority;

use common::{handler, int, lit, parse, parse_with_ctx, Sender};

// ---------------------------------------------------------------------------
// Literal dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_literal_roundtrip() {
    let tree = CommandTree::default();
    let inserted = tree
        .insert_command(Command::new(vec![lit("foo")], handler()))
        .unwrap();

    let resolved = parse(&tree, Sender::user("amy"), "foo").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &inserted));

    let err = parse(&tree, Sender::user("amy"), "foo bar").await.unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));

    let err = parse(&tree, Sender::user("amy"), "bar").await.unwrap_err();
    match err {
        ParseError::NoSuchCommand { token, .. } => assert_eq!(token, "bar"),
        other => panic!("expected NoSuchCommand, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_tree_has_no_commands() {
    let tree = CommandTree::default();
    let err = parse(&tree, Sender::user("amy"), "anything").await.unwrap_err();
    assert!(matches!(err, ParseError::NoSuchCommand { .. }));
}

#[tokio::test]
async fn test_empty_input_is_no_such_command() {
    let tree = CommandTree::default();
    tree.insert_command(Command::new(vec![lit("foo")], handler()))
        .unwrap();
    let err = parse(&tree, Sender::user("amy"), "").await.unwrap_err();
    match err {
        ParseError::NoSuchCommand { token, .. } => assert_eq!(token, ""),
        other => panic!("expected NoSuchCommand, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Typed arguments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_bounded_integer_argument() {
    let tree = CommandTree::default();
    let inserted = tree
        .insert_command(Command::new(
            vec![
                lit("foo"),
                CommandComponent::required("n", Arc::new(IntegerParser::bounded(0, 10))),
            ],
            handler(),
        ))
        .unwrap();

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "foo 5").await;
    assert!(Arc::ptr_eq(&result.unwrap(), &inserted));
    assert_eq!(*ctx.get::<i64>("n").unwrap(), 5);

    // Out of range on the committed branch is a real argument failure, not
    // a silent mismatch.
    let err = parse(&tree, Sender::user("amy"), "foo 11").await.unwrap_err();
    assert!(matches!(err, ParseError::ArgumentParse { .. }));

    // Required argument missing.
    let err = parse(&tree, Sender::user("amy"), "foo").await.unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));
}

#[tokio::test]
async fn test_greedy_string_takes_the_tail() {
    let tree = CommandTree::default();
    tree.insert_command(Command::new(
        vec![
            lit("say"),
            CommandComponent::required(
                "message",
                Arc::new(StringParser::new(StringMode::Greedy)),
            ),
        ],
        handler(),
    ))
    .unwrap();

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "say hello there world").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<String>("message").unwrap(), "hello there world");
}

#[tokio::test]
async fn test_aggregate_argument_stores_sub_values() {
    let tree = CommandTree::default();
    tree.insert_command(Command::new(
        vec![
            lit("warp"),
            CommandComponent::required(
                "pos",
                Arc::new(StandardAggregateParser::new(vec![int("x"), int("y")])),
            ),
        ],
        handler(),
    ))
    .unwrap();

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "warp 3 -4").await;
    assert!(result.is_ok());
    let pos = ctx.get::<AggregateResult>("pos").unwrap();
    assert_eq!(*pos.get::<i64>("x").unwrap(), 3);
    assert_eq!(*pos.get::<i64>("y").unwrap(), -4);
    assert_eq!(*ctx.get::<i64>("x").unwrap(), 3);

    let err = parse(&tree, Sender::user("amy"), "warp 3").await.unwrap_err();
    assert!(matches!(err, ParseError::ArgumentParse { .. }));
}

// ---------------------------------------------------------------------------
// Defaults and optional tails
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_constant_default_bypasses_parser() {
    let tree = CommandTree::default();
    let inserted = tree
        .insert_command(Command::new(
            vec![
                lit("foo"),
                CommandComponent::optional("n", Arc::new(IntegerParser::any()))
                    .with_default(DefaultValue::Constant(Arc::new(42i64) as ParsedValue)),
            ],
            handler(),
        ))
        .unwrap();

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "foo").await;
    assert!(Arc::ptr_eq(&result.unwrap(), &inserted));
    assert_eq!(*ctx.get::<i64>("n").unwrap(), 42);

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "foo 7").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("n").unwrap(), 7);
}

#[tokio::test]
async fn test_parsed_default_runs_through_the_parser() {
    let tree = CommandTree::default();
    tree.insert_command(Command::new(
        vec![
            lit("foo"),
            CommandComponent::optional("n", Arc::new(IntegerParser::bounded(0, 100)))
                .with_default(DefaultValue::Parsed("42".into())),
        ],
        handler(),
    ))
    .unwrap();

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "foo").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("n").unwrap(), 42);
}

#[tokio::test]
async fn test_elided_optional_tail_resolves_down_the_chain() {
    let tree = CommandTree::default();
    let inserted = tree
        .insert_command(Command::new(
            vec![
                lit("fleet"),
                lit("status"),
                CommandComponent::optional("page", Arc::new(IntegerParser::any())),
            ],
            handler(),
        ))
        .unwrap();

    let resolved = parse(&tree, Sender::user("amy"), "fleet status").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &inserted));

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "fleet status 2").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("page").unwrap(), 2);
}

#[tokio::test]
async fn test_two_elided_optionals() {
    let tree = CommandTree::default();
    let inserted = tree
        .insert_command(Command::new(
            vec![
                lit("page"),
                CommandComponent::optional("number", Arc::new(IntegerParser::any())),
                CommandComponent::optional("size", Arc::new(IntegerParser::any())),
            ],
            handler(),
        ))
        .unwrap();

    // The owning command sits two optional hops below "page".
    let resolved = parse(&tree, Sender::user("amy"), "page").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &inserted));
    let resolved = parse(&tree, Sender::user("amy"), "page 3").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &inserted));
    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "page 3 50").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("size").unwrap(), 50);
}

// ---------------------------------------------------------------------------
// Intermediary executors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_intermediary_and_leaf_commands_coexist() {
    let tree = CommandTree::default();
    let foo = tree
        .insert_command(Command::new(vec![lit("foo")], handler()))
        .unwrap();
    let foo_bar = tree
        .insert_command(Command::new(vec![lit("foo"), lit("bar")], handler()))
        .unwrap();

    let resolved = parse(&tree, Sender::user("amy"), "foo").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &foo));
    let resolved = parse(&tree, Sender::user("amy"), "foo bar").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &foo_bar));
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

fn restart_flags() -> CommandComponent<Sender> {
    CommandComponent::flag(
        "flags",
        Arc::new(FlagParser::new(vec![
            FlagDefinition::new("force").with_shorthand('f'),
            FlagDefinition::new("level").with_value(CommandComponent::required(
                "level",
                Arc::new(IntegerParser::bounded(0, 3)),
            )),
        ])),
    )
}

#[tokio::test]
async fn test_flags_at_the_end_of_a_command() {
    let tree = CommandTree::default();
    let inserted = tree
        .insert_command(
            Command::new(vec![lit("fleet"), lit("restart")], handler())
                .with_flags(restart_flags()),
        )
        .unwrap();

    // No flags given: the flag node still completes.
    let resolved = parse(&tree, Sender::user("amy"), "fleet restart").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &inserted));

    let (result, ctx) =
        parse_with_ctx(&tree, Sender::user("amy"), "fleet restart --force --level 2").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<bool>(&flag_value_key("force")).unwrap(), true);
    assert_eq!(*ctx.get::<i64>(&flag_value_key("level")).unwrap(), 2);

    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "fleet restart -f").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<bool>(&flag_value_key("force")).unwrap(), true);

    // Unknown flags fail on the committed branch.
    let err = parse(&tree, Sender::user("amy"), "fleet restart --bogus")
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::ArgumentParse { .. }));

    let err = parse(&tree, Sender::user("amy"), "fleet restart --level 9")
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::ArgumentParse { .. }));
}

#[tokio::test]
async fn test_liberal_flags_parse_before_and_after_arguments() {
    let settings = Settings {
        liberal_flag_parsing: true,
        ..Settings::default()
    };
    let tree = CommandTree::new(settings, TreeHooks::default());
    tree.insert_command(
        Command::new(vec![lit("fleet"), lit("scale"), int("count")], handler())
            .with_flags(restart_flags()),
    )
    .unwrap();

    // Flag before the argument.
    let (result, ctx) =
        parse_with_ctx(&tree, Sender::user("amy"), "fleet scale --force 3").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("count").unwrap(), 3);
    assert_eq!(*ctx.get::<bool>(&flag_value_key("force")).unwrap(), true);

    // Flag after the argument.
    let (result, ctx) =
        parse_with_ctx(&tree, Sender::user("amy"), "fleet scale 3 --force").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("count").unwrap(), 3);
    assert_eq!(*ctx.get::<bool>(&flag_value_key("force")).unwrap(), true);

    // No flags at all.
    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "fleet scale 3").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("count").unwrap(), 3);
}

// ---------------------------------------------------------------------------
// Senders and permissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sender_requirement_is_checked_after_resolution() {
    let tree = CommandTree::default();
    tree.insert_command(
        Command::new(vec![lit("shutdown")], handler()).with_sender_requirement(
            SenderRequirement::new("console", |s: &Sender| s.console),
        ),
    )
    .unwrap();

    assert!(parse(&tree, Sender::console(), "shutdown").await.is_ok());
    let err = parse(&tree, Sender::user("amy"), "shutdown").await.unwrap_err();
    match err {
        ParseError::InvalidCommandSender { expected, .. } => assert_eq!(expected, "console"),
        other => panic!("expected InvalidCommandSender, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_permission_is_surfaced_with_the_permission() {
    let hooks = TreeHooks {
        authority: Arc::new(FnAuthority::new(|s: &Sender, node| {
            s.perms.iter().any(|p| p == node)
        })),
        ..TreeHooks::default()
    };
    let tree = CommandTree::new(Settings::default(), hooks);
    tree.insert_command(
        Command::new(vec![lit("fleet"), lit("restart")], handler())
            .with_permission(Permission::of("fleet.restart")),
    )
    .unwrap();

    assert!(
        parse(&tree, Sender::user("amy").with_perm("fleet.restart"), "fleet restart")
            .await
            .is_ok()
    );
    let err = parse(&tree, Sender::user("amy"), "fleet restart").await.unwrap_err();
    match err {
        ParseError::NoPermission { permission, .. } => {
            assert_eq!(permission, Permission::of("fleet.restart"));
        }
        other => panic!("expected NoPermission, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Insertion failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_conflicting_variable_types_are_ambiguous() {
    let tree = CommandTree::default();
    tree.insert_command(Command::new(vec![lit("foo"), int("n")], handler()))
        .unwrap();

    let err = tree
        .insert_command(Command::new(
            vec![
                lit("foo"),
                CommandComponent::required("n", Arc::new(StringParser::new(StringMode::Single))),
            ],
            handler(),
        ))
        .unwrap_err();
    assert!(matches!(err, InsertError::AmbiguousNode { .. }));

    // The failed insert left the original command intact.
    let (result, ctx) = parse_with_ctx(&tree, Sender::user("amy"), "foo 9").await;
    assert!(result.is_ok());
    assert_eq!(*ctx.get::<i64>("n").unwrap(), 9);
}

#[tokio::test]
async fn test_identical_chain_is_a_duplicate() {
    let tree = CommandTree::default();
    tree.insert_command(Command::new(vec![lit("foo"), int("n")], handler()))
        .unwrap();
    let err = tree
        .insert_command(Command::new(vec![lit("foo"), int("n")], handler()))
        .unwrap_err();
    assert!(matches!(err, InsertError::DuplicateCommand { .. }));
}

#[tokio::test]
async fn test_sibling_commands_share_the_argument_node() {
    let tree = CommandTree::default();
    let give = tree
        .insert_command(Command::new(
            vec![lit("give"), int("amount"), lit("coins")],
            handler(),
        ))
        .unwrap();
    let take = tree
        .insert_command(Command::new(
            vec![lit("give"), int("amount"), lit("gems")],
            handler(),
        ))
        .unwrap();

    let resolved = parse(&tree, Sender::user("amy"), "give 5 coins").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &give));
    let resolved = parse(&tree, Sender::user("amy"), "give 5 gems").await.unwrap();
    assert!(Arc::ptr_eq(&resolved, &take));
}
