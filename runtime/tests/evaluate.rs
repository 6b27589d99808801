//! End-to-end evaluation tests using in-process executors, plus a few that
//! spawn real processes on unix.

use shell_expr::shell::parser::Operator;
use shell_expr::{evaluate, evaluate_with, Construct, Environment, EvalError, ExecError};
use std::cell::RefCell;

fn env(pairs: &[(&str, &str)]) -> Environment {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Executor that returns the command line it was given.
fn echo_command_line(command: &str, _env: &Environment) -> Result<String, ExecError> {
    Ok(command.to_string())
}

/// Executor that always returns `output`.
fn fixed(output: &'static str) -> impl Fn(&str, &Environment) -> Result<String, ExecError> {
    move |_: &str, _: &Environment| -> Result<String, ExecError> { Ok(output.to_string()) }
}

fn unreachable_executor(command: &str, _env: &Environment) -> Result<String, ExecError> {
    panic!("executor should not run, got {command:?}")
}

#[test]
fn test_empty_string() {
    assert_eq!(evaluate("", &Environment::new()).unwrap(), "");
    assert_eq!(
        evaluate_with("", &env(&[("A", "b")]), &unreachable_executor).unwrap(),
        ""
    );
}

#[test]
fn test_parameter_substitution() {
    let vars = env(&[("FOO", "bar")]);
    assert_eq!(evaluate_with("$FOO", &vars, &unreachable_executor).unwrap(), "bar");
    assert_eq!(evaluate_with("${FOO}", &vars, &unreachable_executor).unwrap(), "bar");
    assert_eq!(
        evaluate_with("prefix-$FOO-suffix", &vars, &unreachable_executor).unwrap(),
        "prefix-bar-suffix"
    );
}

#[test]
fn test_missing_parameter_is_empty() {
    assert_eq!(
        evaluate_with("$MISSING", &Environment::new(), &unreachable_executor).unwrap(),
        ""
    );
    assert_eq!(
        evaluate_with("a$MISSING", &Environment::new(), &unreachable_executor).unwrap(),
        "a"
    );
}

#[test]
fn test_parameter_value_is_field_split() {
    let vars = env(&[("SPACED", "  a   b  ")]);
    assert_eq!(evaluate_with("$SPACED", &vars, &unreachable_executor).unwrap(), "a b");
    // Quoted: one field, only the edges are trimmed
    assert_eq!(
        evaluate_with("\"$SPACED\"", &vars, &unreachable_executor).unwrap(),
        "a   b"
    );
}

#[test]
fn test_quote_removal() {
    let vars = env(&[("NAME", "world")]);
    assert_eq!(
        evaluate_with("\"hello $NAME\"", &vars, &unreachable_executor).unwrap(),
        "hello world"
    );
    assert_eq!(
        evaluate_with("'hello $NAME'", &vars, &unreachable_executor).unwrap(),
        "hello $NAME"
    );
    assert_eq!(
        evaluate_with("a'  'b", &vars, &unreachable_executor).unwrap(),
        "a  b"
    );
}

#[test]
fn test_command_substitution_output_collapses() {
    let result = evaluate_with("$(anything)", &Environment::new(), &fixed("  a   b  ")).unwrap();
    assert_eq!(result, "a b");
}

#[test]
fn test_command_substitution_delegates() {
    let result = evaluate_with("$(anything)", &Environment::new(), &fixed("X Y")).unwrap();
    assert_eq!(result, "X Y");

    let result = evaluate_with("`anything`", &Environment::new(), &fixed("X Y")).unwrap();
    assert_eq!(result, "X Y");
}

#[test]
fn test_trailing_newline_removed() {
    let result =
        evaluate_with("\"$(uname -m)\"", &Environment::new(), &fixed("x86_64\n")).unwrap();
    assert_eq!(result, "x86_64");
}

#[test]
fn test_executor_receives_evaluated_words_and_environment() {
    let seen = RefCell::new(Vec::new());
    let recording = |command: &str, env: &Environment| -> Result<String, ExecError> {
        seen.borrow_mut()
            .push((command.to_string(), env.get("TOOL").cloned()));
        Ok("ok".to_string())
    };
    let vars = env(&[("TOOL", "gcc"), ("FLAGS", "-O2   -g")]);

    let result = evaluate_with("$($TOOL \"--flags=$FLAGS\" x)", &vars, &recording).unwrap();
    assert_eq!(result, "ok");
    assert_eq!(
        seen.borrow().as_slice(),
        &[("gcc --flags=-O2   -g x".to_string(), Some("gcc".to_string()))]
    );
}

#[test]
fn test_compound_sequencing() {
    let result =
        evaluate_with("$(echo a; echo b)", &Environment::new(), &echo_command_line).unwrap();
    assert_eq!(result, "echo aecho b");
}

#[test]
fn test_compound_order() {
    let calls = RefCell::new(Vec::new());
    let recording = |command: &str, _: &Environment| -> Result<String, ExecError> {
        calls.borrow_mut().push(command.to_string());
        Ok(format!("[{command}]"))
    };

    let result = evaluate_with("$(one; two\nthree)", &Environment::new(), &recording).unwrap();
    assert_eq!(result, "[one][two][three]");
    assert_eq!(*calls.borrow(), vec!["one", "two", "three"]);
}

#[test]
fn test_compound_stops_at_first_failure() {
    let calls = RefCell::new(Vec::new());
    let failing = |command: &str, _: &Environment| -> Result<String, ExecError> {
        calls.borrow_mut().push(command.to_string());
        if command == "false" {
            Err(ExecError::Other("exit status 1".to_string()))
        } else {
            Ok("out".to_string())
        }
    };

    let result = evaluate_with("$(echo a; false; echo c)", &Environment::new(), &failing);
    assert!(matches!(
        result,
        Err(EvalError::ExecutionFailure(ExecError::Other(_)))
    ));
    assert_eq!(*calls.borrow(), vec!["echo a", "false"]);
}

#[test]
fn test_unsupported_operators() {
    let cases = [
        ("$(a || b)", Operator::Or),
        ("$(a && b)", Operator::And),
        ("$(a | b)", Operator::Pipe),
        ("$(a & b)", Operator::Background),
        ("$(a; b || c)", Operator::Or),
    ];
    for (expression, expected) in cases {
        match evaluate_with(expression, &Environment::new(), &unreachable_executor) {
            Err(EvalError::UnsupportedConstruct(Construct::Operator(op))) => {
                assert_eq!(op, expected, "{expression}")
            }
            other => panic!("Expected unsupported operator for {expression}, got {other:?}"),
        }
    }
}

#[test]
fn test_unsupported_operator_message_names_symbol() {
    let err = evaluate_with("$(false || true)", &Environment::new(), &unreachable_executor)
        .unwrap_err();
    assert!(err.to_string().contains("\"||\""), "{err}");
}

#[test]
fn test_unsupported_redirect() {
    let result = evaluate_with("$(cat < /etc/passwd)", &Environment::new(), &unreachable_executor);
    assert!(matches!(
        result,
        Err(EvalError::UnsupportedConstruct(Construct::Node("redirect")))
    ));
}

#[test]
fn test_unsupported_shell_syntax() {
    let cases = [
        ("$(if true; then echo x; fi)", "if"),
        ("$(while x; do y; done)", "while"),
        ("$(for i in a b; do echo $i; done)", "for"),
        ("$({ echo a; })", "brace group"),
        ("$(! false)", "negation"),
        ("$(A=1 env)", "assignment"),
        ("${A:-x}", "parameter operation"),
        ("(sub)", "subshell"),
        ("key=value", "assignment"),
    ];
    for (expression, expected) in cases {
        match evaluate_with(expression, &Environment::new(), &unreachable_executor) {
            Err(EvalError::UnsupportedConstruct(Construct::Node(kind))) => {
                assert_eq!(kind, expected, "{expression}")
            }
            other => panic!("Expected unsupported construct for {expression}, got {other:?}"),
        }
    }
}

#[test]
fn test_compound_rejects_non_command_parts() {
    let cases = [
        ("$(echo a; { echo b; })", "brace group"),
        ("$(! false; echo a)", "negation"),
        ("$(echo a; (echo b))", "subshell"),
    ];
    for (expression, expected) in cases {
        match evaluate_with(expression, &Environment::new(), &unreachable_executor) {
            Err(EvalError::UnsupportedConstruct(Construct::CompoundPart(kind))) => {
                assert_eq!(kind, expected, "{expression}")
            }
            other => panic!("Expected rejected list part for {expression}, got {other:?}"),
        }
    }
}

#[test]
fn test_trailing_newline_in_expression() {
    assert_eq!(
        evaluate_with("abc\n", &Environment::new(), &unreachable_executor).unwrap(),
        "abc"
    );
    assert_eq!(
        evaluate_with("$(a;)", &Environment::new(), &echo_command_line).unwrap(),
        "a"
    );
}

#[test]
fn test_multi_word_rejected() {
    for expression in ["a b", "$(x) y", "  a   b  "] {
        match evaluate_with(expression, &Environment::new(), &unreachable_executor) {
            Err(EvalError::MalformedExpression { input, .. }) => assert_eq!(input, expression),
            other => panic!("Expected MalformedExpression for {expression:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_top_level_list_rejected() {
    assert!(matches!(
        evaluate_with("a; b", &Environment::new(), &unreachable_executor),
        Err(EvalError::MalformedExpression { .. })
    ));
}

#[test]
fn test_blank_expression_rejected() {
    assert!(matches!(
        evaluate_with("   ", &Environment::new(), &unreachable_executor),
        Err(EvalError::MalformedExpression { .. })
    ));
}

#[test]
fn test_parse_error_is_malformed() {
    for expression in ["'open", "\"open", "$(echo", "a &&"] {
        assert!(
            matches!(
                evaluate_with(expression, &Environment::new(), &unreachable_executor),
                Err(EvalError::MalformedExpression { .. })
            ),
            "{expression}"
        );
    }
}

#[test]
fn test_unbalanced_quote_in_output_is_malformed() {
    let result = evaluate_with("$(x)", &Environment::new(), &fixed("it's"));
    assert!(matches!(result, Err(EvalError::MalformedExpression { .. })));
}

#[test]
fn test_idempotent_on_literals() {
    let vars = env(&[("A", "1")]);
    for literal in ["plain", "/usr/local/bin", "a-b_c.d", "--opt=value"] {
        let once = evaluate_with(literal, &vars, &unreachable_executor).unwrap();
        assert_eq!(once, literal);
        let twice = evaluate_with(&once, &vars, &unreachable_executor).unwrap();
        assert_eq!(twice, once);
    }
}

#[test]
fn test_nested_substitution() {
    let executor = |command: &str, _: &Environment| -> Result<String, ExecError> {
        match command {
            "uname -m" => Ok("arm64\n".to_string()),
            "echo arm64" => Ok("arm64\n".to_string()),
            other => Err(ExecError::Other(format!("unexpected {other:?}"))),
        }
    };
    let result = evaluate_with("build-$(echo $(uname -m))", &Environment::new(), &executor);
    assert_eq!(result.unwrap(), "build-arm64");
}

#[test]
fn test_execution_failure_propagates() {
    let failing = |_: &str, _: &Environment| -> Result<String, ExecError> {
        Err(ExecError::Status {
            command: "false".to_string(),
            code: 1,
            stderr: String::new(),
        })
    };
    let result = evaluate_with("x-$(false)", &Environment::new(), &failing);
    assert!(matches!(
        result,
        Err(EvalError::ExecutionFailure(ExecError::Status { code: 1, .. }))
    ));
}

#[cfg(unix)]
mod process {
    use super::*;

    fn path_env() -> Environment {
        env(&[("PATH", "/usr/bin:/bin")])
    }

    #[test]
    fn test_default_executor_runs_command() {
        let result = evaluate("$(echo hello   world)", &path_env()).unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_default_executor_output_trimmed() {
        let result = evaluate("\"v=$(printf \"'1.2\\n\\n'\")\"", &path_env()).unwrap();
        assert_eq!(result, "v=1.2");
    }

    #[test]
    fn test_default_executor_uses_given_environment() {
        let mut vars = path_env();
        vars.insert("FOO".to_string(), "from-env".to_string());
        let result = evaluate("$(sh -c \"'echo \\$FOO'\")", &vars).unwrap();
        assert_eq!(result, "from-env");
    }

    #[test]
    fn test_default_executor_keeps_hash_argument() {
        let result = evaluate("$(echo \"#x\")", &path_env()).unwrap();
        assert_eq!(result, "#x");
    }

    #[test]
    fn test_default_executor_failure() {
        let result = evaluate("$(sh -c \"'exit 7'\")", &path_env());
        assert!(matches!(
            result,
            Err(EvalError::ExecutionFailure(ExecError::Status { code: 7, .. }))
        ));
    }

    #[test]
    fn test_default_executor_missing_program() {
        let result = evaluate("$(no-such-program-9c1e)", &path_env());
        assert!(matches!(
            result,
            Err(EvalError::ExecutionFailure(ExecError::Spawn { .. }))
        ));
    }
}
