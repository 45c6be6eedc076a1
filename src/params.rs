//! Named-parameter handling for SQL text.
//!
//! `:name` placeholders outside quoted literals are rewritten to `?` so the
//! statement can be prepared server-side. Statements that cannot be prepared
//! (multi-statement text) fall back to substituting escaped literal values.

use crate::arguments::MySqlArgument;
use crate::error::{Error, Result};

/// A `:name` placeholder found outside quoted literals.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Placeholder {
    pub(crate) name: String,

    // byte range of `:name` within the SQL, colon included
    pub(crate) start: usize,
    pub(crate) end: usize,
}

/// Scan for `:name` placeholders, skipping single- and double-quoted
/// literals (including backslash escapes and doubled quotes inside them).
pub(crate) fn scan_placeholders(sql: &str) -> Vec<Placeholder> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;

                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 2;
                    } else if bytes[i] == quote {
                        // a doubled quote stays inside the literal
                        if bytes.get(i + 1) == Some(&quote) {
                            i += 2;
                        } else {
                            i += 1;
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }

            b':' => {
                let start = i;
                i += 1;

                let name_start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }

                if i > name_start {
                    found.push(Placeholder {
                        name: sql[name_start..i].to_owned(),
                        start,
                        end: i,
                    });
                }
            }

            _ => i += 1,
        }
    }

    found
}

/// Rewrite every placeholder to `?` and return the parameter names in
/// positional order.
pub(crate) fn rewrite_to_positional(sql: &str, placeholders: &[Placeholder]) -> (String, Vec<String>) {
    let mut rewritten = String::with_capacity(sql.len());
    let mut names = Vec::with_capacity(placeholders.len());
    let mut cursor = 0;

    for placeholder in placeholders {
        rewritten.push_str(&sql[cursor..placeholder.start]);
        rewritten.push('?');
        cursor = placeholder.end;

        names.push(placeholder.name.clone());
    }

    rewritten.push_str(&sql[cursor..]);

    (rewritten, names)
}

/// Substitute every placeholder with the escaped literal rendering of its
/// value. Used where the statement cannot be prepared server-side.
pub(crate) fn substitute_literals(
    sql: &str,
    placeholders: &[Placeholder],
    lookup: impl Fn(&str) -> Option<MySqlArgument>,
) -> Result<String> {
    let mut substituted = String::with_capacity(sql.len());
    let mut cursor = 0;

    for placeholder in placeholders {
        let value = lookup(&placeholder.name).ok_or_else(|| missing(&placeholder.name))?;

        substituted.push_str(&sql[cursor..placeholder.start]);
        substituted.push_str(&render_literal(&value));
        cursor = placeholder.end;
    }

    substituted.push_str(&sql[cursor..]);

    Ok(substituted)
}

/// `true` if the SQL contains a statement separator outside quoted
/// literals, with another statement following it. Such text cannot be
/// prepared server-side.
pub(crate) fn is_multi_statement(sql: &str) -> bool {
    let bytes = sql.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;

                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 2;
                    } else if bytes[i] == quote {
                        if bytes.get(i + 1) == Some(&quote) {
                            i += 2;
                        } else {
                            i += 1;
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }

            b';' => {
                // a trailing separator does not start a second statement
                return !sql[i + 1..].trim().is_empty();
            }

            _ => i += 1,
        }
    }

    false
}

pub(crate) fn missing(name: &str) -> Error {
    Error::config(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("no value supplied for named parameter `:{name}`"),
    ))
}

/// Render a value as a SQL literal: strings escape `\` and `'` and are
/// single-quoted, numbers go verbatim, booleans as TRUE/FALSE, NULL as NULL,
/// bytes as a hex literal.
fn render_literal(value: &MySqlArgument) -> String {
    match value {
        MySqlArgument::Null => "NULL".to_owned(),
        MySqlArgument::Bool(true) => "TRUE".to_owned(),
        MySqlArgument::Bool(false) => "FALSE".to_owned(),
        MySqlArgument::Int(v) => v.to_string(),
        MySqlArgument::UInt(v) => v.to_string(),
        MySqlArgument::Double(v) => v.to_string(),
        MySqlArgument::Text(v) => quote_string(v),
        MySqlArgument::DateTime(v) => quote_string(&v.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),

        MySqlArgument::Bytes(v) => {
            let mut hex = String::with_capacity(v.len() * 2 + 3);
            hex.push_str("X'");
            for b in v {
                hex.push_str(&format!("{b:02X}"));
            }
            hex.push('\'');
            hex
        }
    }
}

fn quote_string(v: &str) -> String {
    let mut quoted = String::with_capacity(v.len() + 2);
    quoted.push('\'');

    for c in v.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("''"),
            c => quoted.push(c),
        }
    }

    quoted.push('\'');
    quoted
}
