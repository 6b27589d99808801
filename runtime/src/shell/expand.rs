//! Expansion helpers - rebuilding a word from its literal text and the values
//! substituted for its embedded expansions, then re-splitting the result the
//! way a shell does after expansion.

use std::ops::Range;
use thiserror::Error;

/// A substituted value and the byte range of the word it replaces.
///
/// The range is relative to the start of the word's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub range: Range<usize>,
    pub value: String,
}

/// Errors from re-splitting an expanded word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldSplitError {
    #[error("no closing quotation")]
    UnclosedQuote,
    #[error("no escaped character")]
    TrailingEscape,
}

/// Build a new string from `text`, replacing each substitution's range with
/// its value.
///
/// Substitutions must be sorted by position. A range that overlaps the one
/// before it is clipped so literal text is never copied twice.
pub fn splice(text: &str, substitutions: &[Substitution]) -> String {
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    for sub in substitutions {
        let start = sub.range.start.clamp(cursor, text.len());
        let end = sub.range.end.clamp(start, text.len());
        result.push_str(text.get(cursor..start).unwrap_or_default());
        result.push_str(&sub.value);
        cursor = end;
    }

    result.push_str(text.get(cursor..).unwrap_or_default());
    result
}

/// Split an expanded value into fields using POSIX quoting rules.
///
/// Blanks separate fields outside quotes and quote characters are consumed.
/// Inside double quotes a backslash only escapes `$`, `` ` ``, `"` and `\`.
/// An explicitly quoted empty string yields an empty field. `#` has no
/// special meaning here: comments are gone by the time text is expanded.
pub fn split_fields(value: &str) -> Result<Vec<String>, FieldSplitError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_field = false;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                if in_field {
                    fields.push(std::mem::take(&mut field));
                    in_field = false;
                }
            }
            '\\' => {
                field.push(chars.next().ok_or(FieldSplitError::TrailingEscape)?);
                in_field = true;
            }
            '\'' => {
                in_field = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => field.push(c),
                        None => return Err(FieldSplitError::UnclosedQuote),
                    }
                }
            }
            '"' => {
                in_field = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('$' | '`' | '"' | '\\')) => field.push(c),
                            Some(c) => {
                                field.push('\\');
                                field.push(c);
                            }
                            None => return Err(FieldSplitError::UnclosedQuote),
                        },
                        Some(c) => field.push(c),
                        None => return Err(FieldSplitError::UnclosedQuote),
                    }
                }
            }
            c => {
                field.push(c);
                in_field = true;
            }
        }
    }

    if in_field {
        fields.push(field);
    }
    Ok(fields)
}

/// Split `value` into fields, trim each one and rejoin with single spaces.
pub fn collapse_fields(value: &str) -> Result<String, FieldSplitError> {
    let fields = split_fields(value)?;
    Ok(fields
        .iter()
        .map(|field| field.trim())
        .collect::<Vec<_>>()
        .join(" "))
}
