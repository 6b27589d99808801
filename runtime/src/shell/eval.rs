//! Evaluator - walks the syntax tree and turns a single word into a string.
//!
//! Words are rebuilt from their source text with every embedded parameter and
//! command substitution replaced by its value, then re-split and rejoined the
//! way bash treats an expanded word. Command substitutions hand their command
//! line to the context's [`Executor`].

use super::env::Environment;
use super::error::{Construct, EvalError};
use super::executor::{Executor, ProcessExecutor};
use super::expand::{self, Substitution};
use super::parser::{self, Node, Span};

/// Everything threaded through one evaluation. Read-only for its lifetime.
pub struct EvalContext<'a> {
    pub environment: &'a Environment,
    /// The original expression; node spans index into it.
    pub input: &'a str,
    pub executor: &'a dyn Executor,
}

/// Evaluate `expression` against `environment`, running command
/// substitutions as child processes.
///
/// ```
/// use shell_expr::{evaluate, Environment};
///
/// let env = Environment::from([("VAR".to_string(), "bar".to_string())]);
/// assert_eq!(evaluate("prefix-$VAR", &env)?, "prefix-bar");
/// # Ok::<(), shell_expr::EvalError>(())
/// ```
pub fn evaluate(expression: &str, environment: &Environment) -> Result<String, EvalError> {
    evaluate_with(expression, environment, &ProcessExecutor::default())
}

/// Evaluate `expression` with a caller-supplied executor.
///
/// The expression must parse to exactly one word. The empty string evaluates
/// to the empty string without being parsed.
#[tracing::instrument(level = "debug", skip(environment, executor), fields(vars = environment.len()))]
pub fn evaluate_with(
    expression: &str,
    environment: &Environment,
    executor: &dyn Executor,
) -> Result<String, EvalError> {
    if expression.is_empty() {
        return Ok(String::new());
    }

    let tree = parser::parse(expression).map_err(|e| EvalError::malformed(expression, e))?;
    tracing::trace!(?tree, "parsed expression");

    let [word] = tree.parts() else {
        return Err(EvalError::malformed(
            expression,
            format!("expected a single word, found {}", tree.parts().len()),
        ));
    };

    let context = EvalContext {
        environment,
        input: expression,
        executor,
    };
    evaluate_node(word, &context)
}

fn evaluate_node(node: &Node, ctx: &EvalContext<'_>) -> Result<String, EvalError> {
    match node {
        Node::Word { span, parts } => evaluate_word_node(span, parts, ctx),
        Node::CommandSubstitution { command, .. } => evaluate_command_node(command, ctx),
        Node::Parameter { name, .. } => Ok(evaluate_parameter_node(name, ctx)),
        Node::Command { .. }
        | Node::Operator { .. }
        | Node::Assignment { .. }
        | Node::Redirect { .. }
        | Node::Compound { .. }
        | Node::Negation { .. }
        | Node::Arithmetic { .. }
        | Node::Expansion { .. } => Err(EvalError::UnsupportedConstruct(Construct::Node(
            node.kind_name(),
        ))),
    }
}

fn evaluate_word_node(
    span: &Span,
    parts: &[Node],
    ctx: &EvalContext<'_>,
) -> Result<String, EvalError> {
    let text = ctx
        .input
        .get(span.clone())
        .ok_or_else(|| EvalError::malformed(ctx.input, format!("word span {span:?} out of range")))?;

    let substitutions = parts
        .iter()
        .map(|part| {
            let range = part.span().start.saturating_sub(span.start)
                ..part.span().end.saturating_sub(span.start);
            Ok(Substitution {
                range,
                value: evaluate_node(part, ctx)?,
            })
        })
        .collect::<Result<Vec<_>, EvalError>>()?;

    let value = expand::splice(text, &substitutions);
    // Same quote removal and whitespace collapsing bash applies after expansion
    expand::collapse_fields(&value).map_err(|e| EvalError::malformed(&value, e))
}

fn evaluate_command_node(node: &Node, ctx: &EvalContext<'_>) -> Result<String, EvalError> {
    let Node::Command { parts, .. } = node else {
        return Err(EvalError::UnsupportedConstruct(Construct::Node(
            node.kind_name(),
        )));
    };

    if parts.iter().any(|part| matches!(part, Node::Operator { .. })) {
        evaluate_compound_command(parts, ctx)
    } else {
        evaluate_simple_command(parts, ctx)
    }
}

/// Run every command of a `;`-separated list, concatenating their output.
///
/// The whole list is checked before anything runs, so an unsupported operator
/// is reported no matter what its operands would do. The first failing
/// command stops the list, as under `set -o errexit`.
fn evaluate_compound_command(parts: &[Node], ctx: &EvalContext<'_>) -> Result<String, EvalError> {
    for part in parts {
        match part {
            Node::Command { .. } => {}
            Node::Operator { op, .. } if op.is_sequencer() => {}
            Node::Operator { op, .. } => {
                return Err(EvalError::UnsupportedConstruct(Construct::Operator(*op)));
            }
            other => {
                return Err(EvalError::UnsupportedConstruct(Construct::CompoundPart(
                    other.kind_name(),
                )));
            }
        }
    }

    parts
        .iter()
        .filter(|part| matches!(part, Node::Command { .. }))
        .map(|command| evaluate_command_node(command, ctx))
        .collect()
}

fn evaluate_simple_command(parts: &[Node], ctx: &EvalContext<'_>) -> Result<String, EvalError> {
    // `$()` runs nothing
    if parts.is_empty() {
        return Ok(String::new());
    }

    let words = parts
        .iter()
        .map(|part| evaluate_node(part, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    let command = words.join(" ");

    tracing::debug!(command = %command, "executing command substitution");
    Ok(ctx.executor.execute(&command, ctx.environment)?)
}

fn evaluate_parameter_node(name: &str, ctx: &EvalContext<'_>) -> String {
    ctx.environment.get(name).cloned().unwrap_or_default()
}
