//! Shell Expr - evaluate shell-like expressions in configuration values
//!
//! Lets users write values such as `"$(uname -m)"` or `"prefix-$VAR"` without
//! handing them a full shell: only parameter expansion and command
//! substitution are performed, and command lists inside a substitution may
//! only be joined with `;`. Pipes, `&&`/`||`, redirections, assignments,
//! compound commands and arithmetic are rejected with
//! [`EvalError::UnsupportedConstruct`].
//!
//! ## Example
//! ```
//! use shell_expr::{evaluate_with, Environment, ExecError};
//!
//! let env = Environment::from([("VAR".to_string(), "bar".to_string())]);
//! let stub = |_: &str, _: &Environment| -> Result<String, ExecError> { Ok("X  Y\n".into()) };
//!
//! assert_eq!(evaluate_with("prefix-$VAR", &env, &stub)?, "prefix-bar");
//! assert_eq!(evaluate_with("$(anything)", &env, &stub)?, "X Y");
//! # Ok::<(), shell_expr::EvalError>(())
//! ```

pub mod config;
pub mod shell;

pub use config::{Config, ConfigError, ExecutorConfig};
pub use shell::{
    evaluate, evaluate_with, parse_environment, Assignment, AssignmentValue, Construct,
    EnvParseError, Environment, EvalError, ExecError, Executor, ParsedEnvironment,
    ProcessExecutor,
};
