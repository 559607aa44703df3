//! Identifier validation and quoting.
//!
//! Object and parameter names that tools splice into generated SQL go
//! through here first. Names are either regular identifiers or bracket-quoted
//! (`[my table]`, with `]` doubled inside), and come out bracket-quoted.

use crate::error::{DbError, DbResult};

/// Most parts an object name can have: `database.schema.object`.
const MAX_NAME_PARTS: usize = 3;

/// Bracket-quote one identifier part.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Validate a plain identifier such as a column or index name and quote it.
///
/// Any text is allowed except empty names and control characters, since the
/// result is always bracket-quoted.
pub fn safe_identifier(name: &str) -> DbResult<String> {
    if name.trim().is_empty() {
        return Err(DbError::invalid_input("Identifier must not be empty"));
    }
    if name.chars().any(char::is_control) {
        return Err(DbError::invalid_input(format!(
            "Identifier '{}' contains control characters",
            name.escape_default()
        )));
    }
    Ok(quote_identifier(name))
}

/// Parse an optionally qualified object name (`fn`, `dbo.fn`, `[my db].dbo.[fn]`)
/// into its unquoted parts.
pub fn parse_qualified_name(name: &str) -> DbResult<Vec<String>> {
    let invalid = || DbError::invalid_input(format!("Invalid object name '{}'", name));

    let mut parts = Vec::new();
    let mut chars = name.trim().chars().peekable();

    loop {
        let mut part = String::new();
        if chars.peek() == Some(&'[') {
            chars.next();
            loop {
                match chars.next() {
                    Some(']') if chars.peek() == Some(&']') => {
                        chars.next();
                        part.push(']');
                    }
                    Some(']') => break,
                    Some(c) => part.push(c),
                    None => return Err(invalid()),
                }
            }
            if part.is_empty() {
                return Err(invalid());
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let allowed = if part.is_empty() {
                    is_identifier_start(c)
                } else {
                    is_identifier_char(c)
                };
                if !allowed {
                    return Err(invalid());
                }
                part.push(c);
                chars.next();
            }
            if part.is_empty() {
                return Err(invalid());
            }
        }
        parts.push(part);

        match chars.next() {
            None => break,
            Some('.') if parts.len() < MAX_NAME_PARTS => continue,
            Some(_) => return Err(invalid()),
        }
    }

    Ok(parts)
}

/// Validate an optionally qualified object name and return it with every part quoted.
pub fn quote_object_name(name: &str) -> DbResult<String> {
    let parts = parse_qualified_name(name)?;
    Ok(parts
        .iter()
        .map(|part| quote_identifier(part))
        .collect::<Vec<_>>()
        .join("."))
}

/// Validate a routine parameter name, returning it without the leading `@`.
pub fn parameter_name(name: &str) -> DbResult<&str> {
    let bare = name.strip_prefix('@').unwrap_or(name);
    let mut chars = bare.chars();
    let valid = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(is_identifier_char);
    if !valid {
        return Err(DbError::invalid_input(format!(
            "Invalid parameter name '{}'",
            name
        )));
    }
    Ok(bare)
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '#'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_doubles_closing_bracket() {
        assert_eq!(quote_identifier("Orders"), "[Orders]");
        assert_eq!(quote_identifier("odd]name"), "[odd]]name]");
    }

    #[test]
    fn test_parse_plain_and_qualified_names() {
        assert_eq!(parse_qualified_name("fn_Total").unwrap(), vec!["fn_Total"]);
        assert_eq!(
            parse_qualified_name(" dbo.fn_Total ").unwrap(),
            vec!["dbo", "fn_Total"]
        );
        assert_eq!(
            parse_qualified_name("[Sales DB].dbo.[usp Get]]Orders]").unwrap(),
            vec!["Sales DB", "dbo", "usp Get]Orders"]
        );
    }

    #[test]
    fn test_parse_rejects_injection_and_malformed_names() {
        for name in [
            "",
            "dbo.",
            ".fn",
            "fn(); DROP TABLE t",
            "fn --",
            "[unterminated",
            "[]",
            "a.b.c.d",
            "1abc",
        ] {
            assert!(parse_qualified_name(name).is_err(), "{:?}", name);
        }
    }

    #[test]
    fn test_quote_object_name() {
        assert_eq!(quote_object_name("dbo.fn_Total").unwrap(), "[dbo].[fn_Total]");
        assert_eq!(quote_object_name("[a]]b]").unwrap(), "[a]]b]");
    }

    #[test]
    fn test_parameter_name() {
        assert_eq!(parameter_name("@CustomerId").unwrap(), "CustomerId");
        assert_eq!(parameter_name("Total").unwrap(), "Total");
        assert!(parameter_name("@").is_err());
        assert!(parameter_name("x = 1; --").is_err());
        assert!(parameter_name("9lives").is_err());
    }

    #[test]
    fn test_safe_identifier() {
        assert_eq!(safe_identifier("IX Orders").unwrap(), "[IX Orders]");
        assert!(safe_identifier("  ").is_err());
        assert!(safe_identifier("a\nb").is_err());
    }
}
