//! Shell module - evaluates a restricted subset of shell syntax.
//!
//! Supports words, parameter expansion and command substitution, with command
//! lists inside a substitution limited to `;`-sequencing. Everything else is
//! rejected rather than approximated.

mod env;
mod error;
mod eval;
mod executor;
pub mod expand;
pub mod parser;

pub use env::{
    parse_environment, Assignment, AssignmentValue, EnvParseError, Environment, ParsedEnvironment,
};
pub use error::{Construct, EvalError};
pub use eval::{evaluate, evaluate_with};
pub use executor::{ExecError, Executor, ProcessExecutor};
