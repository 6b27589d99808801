//! Parser module - builds a span-tracking syntax tree from brush-parser output.
//!
//! brush-parser does the shell grammar work: its program parser gives the
//! command structure, its word parser finds the expansions inside each word,
//! and its tokenizer gives each word's position in the source. This module
//! joins the three into one [`Node`] tree the evaluator can walk.
//!
//! Every node carries a byte span `[start, end)` into the original input. Child
//! spans lie inside their parent's span and never overlap a sibling. Constructs
//! the evaluator does not support (compound commands, assignments, redirections,
//! `!`, arithmetic and parameter operations) still get their own node kinds so
//! they can be rejected by name.

use brush_parser::ast;
use brush_parser::word::{self, Parameter, ParameterExpr, WordPiece};
use brush_parser::{Parser, ParserOptions, SourceInfo, Token};
use std::fmt;
use std::io::Cursor;
use std::ops::Range;
use thiserror::Error;

/// Byte range into the source text.
pub type Span = Range<usize>;

/// An operator joining commands in a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `;` or a newline
    Sequence,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `|`
    Pipe,
    /// `&`
    Background,
}

impl Operator {
    /// The operator as written in the source.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Sequence => ";",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Pipe => "|",
            Operator::Background => "&",
        }
    }

    /// Whether this operator only sequences commands, with no conditional
    /// or concurrent meaning.
    pub fn is_sequencer(self) -> bool {
        matches!(self, Operator::Sequence)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Shell grammar constructs that wrap other commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    BraceGroup,
    Subshell,
    For,
    ArithmeticFor,
    Case,
    If,
    While,
    Until,
    Arithmetic,
    Function,
    ExtendedTest,
}

impl CompoundKind {
    pub fn name(self) -> &'static str {
        match self {
            CompoundKind::BraceGroup => "brace group",
            CompoundKind::Subshell => "subshell",
            CompoundKind::For => "for",
            CompoundKind::ArithmeticFor => "arithmetic for",
            CompoundKind::Case => "case",
            CompoundKind::If => "if",
            CompoundKind::While => "while",
            CompoundKind::Until => "until",
            CompoundKind::Arithmetic => "arithmetic command",
            CompoundKind::Function => "function",
            CompoundKind::ExtendedTest => "extended test",
        }
    }
}

/// A node in the parsed syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text with embedded expansions at known offsets.
    Word { span: Span, parts: Vec<Node> },
    /// `$NAME`, `${NAME}`, a positional or a special parameter such as `$?`.
    Parameter { span: Span, name: String },
    /// `$(...)` or `` `...` ``; `command` is always a [`Node::Command`].
    CommandSubstitution { span: Span, command: Box<Node> },
    /// Either a simple command (parts are words, assignments and redirects)
    /// or a list of commands joined by operators.
    Command { span: Span, parts: Vec<Node> },
    /// An operator between two commands.
    Operator { span: Span, op: Operator },
    /// `NAME=value` in front of a command.
    Assignment { span: Span, name: String },
    /// An I/O redirection or here-document.
    Redirect { span: Span },
    /// `if`, `while`, `{ ...; }`, function definitions and the like.
    Compound { span: Span, kind: CompoundKind },
    /// `!` in front of a pipeline.
    Negation { span: Span },
    /// `$((...))`
    Arithmetic { span: Span },
    /// Any other expansion inside a word, e.g. `${A:-x}`.
    Expansion { span: Span, kind: &'static str },
}

impl Node {
    pub fn span(&self) -> &Span {
        match self {
            Node::Word { span, .. }
            | Node::Parameter { span, .. }
            | Node::CommandSubstitution { span, .. }
            | Node::Command { span, .. }
            | Node::Operator { span, .. }
            | Node::Assignment { span, .. }
            | Node::Redirect { span }
            | Node::Compound { span, .. }
            | Node::Negation { span }
            | Node::Arithmetic { span }
            | Node::Expansion { span, .. } => span,
        }
    }

    fn span_mut(&mut self) -> &mut Span {
        match self {
            Node::Word { span, .. }
            | Node::Parameter { span, .. }
            | Node::CommandSubstitution { span, .. }
            | Node::Command { span, .. }
            | Node::Operator { span, .. }
            | Node::Assignment { span, .. }
            | Node::Redirect { span }
            | Node::Compound { span, .. }
            | Node::Negation { span }
            | Node::Arithmetic { span }
            | Node::Expansion { span, .. } => span,
        }
    }

    /// Child nodes of words and commands; empty for every other kind.
    pub fn parts(&self) -> &[Node] {
        match self {
            Node::Word { parts, .. } | Node::Command { parts, .. } => parts.as_slice(),
            _ => &[],
        }
    }

    /// Short label for the node kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Word { .. } => "word",
            Node::Parameter { .. } => "parameter",
            Node::CommandSubstitution { .. } => "commandsubstitution",
            Node::Command { .. } => "command",
            Node::Operator { .. } => "operator",
            Node::Assignment { .. } => "assignment",
            Node::Redirect { .. } => "redirect",
            Node::Compound { kind, .. } => kind.name(),
            Node::Negation { .. } => "negation",
            Node::Arithmetic { .. } => "arithmetic",
            Node::Expansion { kind, .. } => *kind,
        }
    }

    /// Operators and `!` are placed between their neighbours once the list
    /// is complete.
    fn fills_gap(&self) -> bool {
        matches!(self, Node::Operator { .. } | Node::Negation { .. })
    }
}

/// Errors produced while parsing an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("cannot parse word {word:?}: {reason}")]
    Word { word: String, reason: String },
    #[error("cannot locate {0:?} in the source text")]
    Locate(String),
    #[error("escaped characters inside backquotes are not supported, use $(...): {0:?}")]
    EscapedBackquote(String),
}

/// Parse a shell expression into a [`Node::Command`].
///
/// The returned command's parts are the top-level words when the input is a
/// single simple command, or commands interleaved with operators when the
/// input is a list. Empty input yields a command with no parts.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    let builder = TreeBuilder {
        input,
        options: ParserOptions::default(),
    };
    builder.parse_range(0, input.len())
}

/// Whether `name` is a valid shell variable identifier.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if first == b'_' || first.is_ascii_alphabetic() => {
            bytes.all(|b| b == b'_' || b.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn parse_program(text: &str, options: &ParserOptions) -> Result<ast::Program, ParseError> {
    let cursor = Cursor::new(format!("{}\n", text));
    let source_info = SourceInfo::default();
    let mut parser = Parser::new(cursor, options, &source_info);
    parser
        .parse_program()
        .map_err(|e| ParseError::Syntax(format!("{:?}", e)))
}

/// Byte offset of the `index`th character, or the end of `text`.
fn char_to_byte(text: &str, index: usize) -> Option<usize> {
    text.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .nth(index)
}

// ============================================================================
// Word positions
// ============================================================================

/// Finds the source position of each word the program parser hands back.
///
/// Words come out of the AST in source order, so a single forward pass over
/// the tokenizer's word tokens is enough.
struct WordLocator<'a> {
    source: &'a str,
    /// Offset of `source` within the whole expression.
    base: usize,
    words: Vec<(String, Option<usize>)>,
    next: usize,
    cursor: usize,
}

impl<'a> WordLocator<'a> {
    fn new(source: &'a str, base: usize) -> Result<Self, ParseError> {
        let tokens = brush_parser::tokenize_str(source)
            .map_err(|e| ParseError::Syntax(format!("{:?}", e)))?;
        let words = tokens
            .into_iter()
            .filter_map(|token| match token {
                Token::Word(text, location) => {
                    let start = usize::try_from(location.start.index)
                        .ok()
                        .and_then(|index| char_to_byte(source, index));
                    Some((text, start))
                }
                _ => None,
            })
            .collect();
        Ok(Self {
            source,
            base,
            words,
            next: 0,
            cursor: 0,
        })
    }

    /// Absolute offset just past the last located word.
    fn here(&self) -> usize {
        self.base + self.cursor
    }

    fn locate(&mut self, value: &str) -> Result<Span, ParseError> {
        while let Some((text, start)) = self.words.get(self.next) {
            let start = *start;
            self.next += 1;
            if text != value {
                continue;
            }
            let verified = start.filter(|&start| {
                start >= self.cursor
                    && self
                        .source
                        .get(start..)
                        .is_some_and(|rest| rest.starts_with(value))
            });
            let start = match verified {
                Some(start) => start,
                None => self
                    .source
                    .get(self.cursor..)
                    .and_then(|rest| rest.find(value))
                    .map(|offset| self.cursor + offset)
                    .ok_or_else(|| ParseError::Locate(value.to_string()))?,
            };
            self.cursor = start + value.len();
            return Ok(self.base + start..self.base + self.cursor);
        }
        Err(ParseError::Locate(value.to_string()))
    }
}

// ============================================================================
// Tree building
// ============================================================================

struct TreeBuilder<'a> {
    input: &'a str,
    options: ParserOptions,
}

impl<'a> TreeBuilder<'a> {
    /// Parse `input[start..end]` as a command list.
    fn parse_range(&self, start: usize, end: usize) -> Result<Node, ParseError> {
        let text = self
            .input
            .get(start..end)
            .ok_or_else(|| ParseError::Locate(format!("{}..{}", start, end)))?;
        let program = parse_program(text, &self.options)?;
        let mut locator = WordLocator::new(text, start)?;

        let items: Vec<ast::CompoundListItem> = program
            .complete_commands
            .into_iter()
            .flat_map(|list| list.0)
            .collect();
        let count = items.len();

        let mut parts = Vec::new();
        for (i, ast::CompoundListItem(and_or, separator)) in items.into_iter().enumerate() {
            self.convert_and_or(and_or, &mut locator, &mut parts)?;
            match separator {
                ast::SeparatorOperator::Async => parts.push(operator(Operator::Background)),
                _ if i + 1 < count => parts.push(operator(Operator::Sequence)),
                _ => {}
            }
        }
        fill_gaps(&mut parts, start, end);

        // A lone simple command is the command itself
        if let [Node::Command { parts: words, .. }] = parts.as_mut_slice() {
            return Ok(Node::Command {
                span: start..end,
                parts: std::mem::take(words),
            });
        }
        Ok(Node::Command {
            span: start..end,
            parts,
        })
    }

    fn convert_and_or(
        &self,
        list: ast::AndOrList,
        locator: &mut WordLocator<'_>,
        parts: &mut Vec<Node>,
    ) -> Result<(), ParseError> {
        self.convert_pipeline(list.first, locator, parts)?;
        for next in list.additional {
            let (op, pipeline) = match next {
                ast::AndOr::And(pipeline) => (Operator::And, pipeline),
                ast::AndOr::Or(pipeline) => (Operator::Or, pipeline),
            };
            parts.push(operator(op));
            self.convert_pipeline(pipeline, locator, parts)?;
        }
        Ok(())
    }

    fn convert_pipeline(
        &self,
        pipeline: ast::Pipeline,
        locator: &mut WordLocator<'_>,
        parts: &mut Vec<Node>,
    ) -> Result<(), ParseError> {
        if pipeline.bang {
            parts.push(Node::Negation { span: 0..0 });
        }
        for (i, command) in pipeline.seq.into_iter().enumerate() {
            if i > 0 {
                parts.push(operator(Operator::Pipe));
            }
            parts.push(self.convert_command(command, locator)?);
        }
        Ok(())
    }

    fn convert_command(
        &self,
        command: ast::Command,
        locator: &mut WordLocator<'_>,
    ) -> Result<Node, ParseError> {
        let kind = match command {
            ast::Command::Simple(simple) => return self.convert_simple_command(simple, locator),
            ast::Command::Compound(compound, _redirects) => compound_kind(&compound),
            ast::Command::Function(_) => CompoundKind::Function,
            ast::Command::ExtendedTest(_) => CompoundKind::ExtendedTest,
        };
        let here = locator.here();
        Ok(Node::Compound {
            span: here..here,
            kind,
        })
    }

    fn convert_simple_command(
        &self,
        command: ast::SimpleCommand,
        locator: &mut WordLocator<'_>,
    ) -> Result<Node, ParseError> {
        let mut parts = Vec::new();
        for item in command.prefix.into_iter().flat_map(|prefix| prefix.0) {
            parts.push(self.convert_item(item, true, locator)?);
        }
        if let Some(name) = command.word_or_name {
            parts.push(self.convert_word(&name.value, locator)?);
        }
        for item in command.suffix.into_iter().flat_map(|suffix| suffix.0) {
            parts.push(self.convert_item(item, false, locator)?);
        }

        let here = locator.here();
        let start = parts.first().map_or(here, |part| part.span().start);
        let end = parts.last().map_or(start, |part| part.span().end).max(start);
        Ok(Node::Command {
            span: start..end,
            parts,
        })
    }

    fn convert_item(
        &self,
        item: ast::CommandPrefixOrSuffixItem,
        in_prefix: bool,
        locator: &mut WordLocator<'_>,
    ) -> Result<Node, ParseError> {
        match item {
            ast::CommandPrefixOrSuffixItem::AssignmentWord(assignment, word) if in_prefix => {
                Ok(Node::Assignment {
                    span: locator.locate(&word.value)?,
                    name: assignment.name.to_string(),
                })
            }
            // After the command name `NAME=value` is an ordinary argument
            ast::CommandPrefixOrSuffixItem::AssignmentWord(_, word)
            | ast::CommandPrefixOrSuffixItem::Word(word) => self.convert_word(&word.value, locator),
            ast::CommandPrefixOrSuffixItem::IoRedirect(_) => {
                let here = locator.here();
                Ok(Node::Redirect { span: here..here })
            }
            ast::CommandPrefixOrSuffixItem::ProcessSubstitution(_, _) => {
                let here = locator.here();
                Ok(Node::Expansion {
                    span: here..here,
                    kind: "process substitution",
                })
            }
        }
    }

    fn convert_word(
        &self,
        value: &str,
        locator: &mut WordLocator<'_>,
    ) -> Result<Node, ParseError> {
        let span = locator.locate(value)?;
        let parts = self.convert_word_pieces(value, span.start)?;
        Ok(Node::Word { span, parts })
    }

    /// Nodes for the expansions inside `text`, which starts at `base`.
    ///
    /// Literal text, quotes and escapes produce no node; they stay in the
    /// word's source text for the evaluator to rebuild around.
    fn convert_word_pieces(&self, text: &str, base: usize) -> Result<Vec<Node>, ParseError> {
        let pieces = word::parse(text, &self.options).map_err(|e| ParseError::Word {
            word: text.to_string(),
            reason: format!("{:?}", e),
        })?;

        let mut parts = Vec::new();
        let mut pending: Vec<_> = pieces.into_iter().rev().collect();
        while let Some(piece) = pending.pop() {
            let source = text
                .get(piece.start_index..piece.end_index)
                .ok_or_else(|| ParseError::Locate(text.to_string()))?;
            let span = base + piece.start_index..base + piece.end_index;

            match piece.piece {
                WordPiece::DoubleQuotedSequence(inner) => pending.extend(inner.into_iter().rev()),
                WordPiece::ParameterExpansion(expr) => {
                    if !source.starts_with('$') {
                        return Err(ParseError::Locate(source.to_string()));
                    }
                    parts.push(parameter_node(expr, source, span));
                }
                WordPiece::CommandSubstitution(_) => {
                    if !(source.starts_with("$(") && source.ends_with(')')) {
                        return Err(ParseError::Locate(source.to_string()));
                    }
                    let command = self.parse_range(span.start + 2, span.end - 1)?;
                    parts.push(Node::CommandSubstitution {
                        span,
                        command: Box::new(command),
                    });
                }
                WordPiece::BackquotedCommandSubstitution(command_text) => {
                    let raw = source
                        .strip_prefix('`')
                        .and_then(|rest| rest.strip_suffix('`'))
                        .ok_or_else(|| ParseError::Locate(source.to_string()))?;
                    if raw != command_text {
                        return Err(ParseError::EscapedBackquote(source.to_string()));
                    }
                    let command = self.parse_range(span.start + 1, span.end - 1)?;
                    parts.push(Node::CommandSubstitution {
                        span,
                        command: Box::new(command),
                    });
                }
                WordPiece::ArithmeticExpression(_) => parts.push(Node::Arithmetic { span }),
                _ => {}
            }
        }
        Ok(parts)
    }
}

fn operator(op: Operator) -> Node {
    Node::Operator { span: 0..0, op }
}

/// Give operators and `!` the span between their neighbours.
fn fill_gaps(parts: &mut [Node], start: usize, end: usize) {
    for i in 0..parts.len() {
        if !parts[i].fills_gap() {
            continue;
        }
        let before = if i > 0 { parts[i - 1].span().end } else { start };
        let after = parts.get(i + 1).map_or(end, |next| next.span().start);
        *parts[i].span_mut() = before..after.max(before);
    }
}

fn compound_kind(command: &ast::CompoundCommand) -> CompoundKind {
    match command {
        ast::CompoundCommand::Arithmetic(_) => CompoundKind::Arithmetic,
        ast::CompoundCommand::ArithmeticForClause(_) => CompoundKind::ArithmeticFor,
        ast::CompoundCommand::BraceGroup(_) => CompoundKind::BraceGroup,
        ast::CompoundCommand::Subshell(_) => CompoundKind::Subshell,
        ast::CompoundCommand::ForClause(_) => CompoundKind::For,
        ast::CompoundCommand::CaseClause(_) => CompoundKind::Case,
        ast::CompoundCommand::IfClause(_) => CompoundKind::If,
        ast::CompoundCommand::WhileClause(_) => CompoundKind::While,
        ast::CompoundCommand::UntilClause(_) => CompoundKind::Until,
    }
}

fn parameter_node(expr: ParameterExpr, source: &str, span: Span) -> Node {
    let indirect = source.starts_with("${!") && source.len() > "${!}".len();
    match expr {
        ParameterExpr::Parameter {
            parameter: Parameter::Named(_) | Parameter::Positional(_) | Parameter::Special(_),
            ..
        } if !indirect => Node::Parameter {
            span,
            name: parameter_name(source).to_string(),
        },
        ParameterExpr::Parameter { .. } => Node::Expansion {
            span,
            kind: "array or indirect parameter",
        },
        _ => Node::Expansion {
            span,
            kind: "parameter operation",
        },
    }
}

/// `$NAME` and `${NAME}` both name `NAME`.
fn parameter_name(source: &str) -> &str {
    let name = source.strip_prefix('$').unwrap_or(source);
    name.strip_prefix('{')
        .and_then(|braced| braced.strip_suffix('}'))
        .unwrap_or(name)
}
