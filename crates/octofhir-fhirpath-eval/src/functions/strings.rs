//! String functions
//!
//! Positions and lengths count characters, not bytes. Regular expressions
//! use the `regex` syntax; an invalid pattern is an argument error.

use super::{COLL, INTEGER, STRING, empty, single};
use crate::error::{EvalError, EvalResult};
use crate::registry::{Arg, Propagation, SymbolTable};
use octofhir_fhirpath_model::Collection;
use octofhir_fhirpath_types::Value;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;

/// Compiled patterns shared across evaluations; cleared once it fills up
static PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

const PATTERN_CACHE_LIMIT: usize = 256;

pub(super) fn register(table: &mut SymbolTable) {
    table
        .add_native("indexOf", &[STRING, STRING], Propagation::All, |_, args| {
            let (text, needle) = (text(&args[0]), text(&args[1]));
            let index = match text.find(needle) {
                Some(byte) => char_count(&text[..byte])?,
                None => -1,
            };
            single(index)
        })
        .add_native("substring", &[STRING, INTEGER], Propagation::Focus, |_, args| {
            substring(text(&args[0]), args[1].as_integer(), None)
        })
        .add_native(
            "substring",
            &[STRING, INTEGER, INTEGER],
            Propagation::Focus,
            |_, args| substring(text(&args[0]), args[1].as_integer(), args[2].as_integer()),
        )
        .add_native("startsWith", &[STRING, STRING], Propagation::All, |_, args| {
            single(text(&args[0]).starts_with(text(&args[1])))
        })
        .add_native("endsWith", &[STRING, STRING], Propagation::All, |_, args| {
            single(text(&args[0]).ends_with(text(&args[1])))
        })
        .add_native("contains", &[STRING, STRING], Propagation::All, |_, args| {
            single(text(&args[0]).contains(text(&args[1])))
        })
        .add_native("upper", &[STRING], Propagation::Focus, |_, args| {
            single(text(&args[0]).to_uppercase())
        })
        .add_native("lower", &[STRING], Propagation::Focus, |_, args| {
            single(text(&args[0]).to_lowercase())
        })
        .add_native("length", &[STRING], Propagation::Focus, |_, args| {
            single(char_count(text(&args[0]))?)
        })
        .add_native("toChars", &[STRING], Propagation::Focus, |_, args| {
            Ok(Collection::from_values(
                text(&args[0]).chars().map(|c| Value::String(c.to_string())),
            ))
        })
        .add_native("trim", &[STRING], Propagation::Focus, |_, args| {
            single(text(&args[0]).trim())
        })
        .add_native(
            "replace",
            &[STRING, STRING, STRING],
            Propagation::All,
            |_, args| single(text(&args[0]).replace(text(&args[1]), text(&args[2]))),
        )
        .add_native("matches", &[STRING, STRING], Propagation::All, |_, args| {
            single(compile(text(&args[1]))?.is_match(text(&args[0])))
        })
        .add_native(
            "replaceMatches",
            &[STRING, STRING, STRING],
            Propagation::All,
            |_, args| {
                let pattern = compile(text(&args[1]))?;
                single(pattern.replace_all(text(&args[0]), text(&args[2])).into_owned())
            },
        )
        .add_native("split", &[STRING, STRING], Propagation::All, |_, args| {
            let (text, separator) = (text(&args[0]), text(&args[1]));
            if separator.is_empty() {
                return single(text);
            }
            Ok(Collection::from_values(
                text.split(separator).map(|part| Value::String(part.to_string())),
            ))
        })
        .add_native("join", &[COLL], Propagation::None, |_, args| {
            join(&args[0], "")
        })
        .add_native("join", &[COLL, STRING], Propagation::None, |_, args| {
            join(&args[0], args[1].as_str().unwrap_or_default())
        });
}

/// String content of a converted argument; null reads as empty text
fn text(arg: &Arg) -> &str {
    arg.as_str().unwrap_or_default()
}

fn char_count(text: &str) -> EvalResult<i32> {
    i32::try_from(text.chars().count()).map_err(|_| EvalError::overflow("string length"))
}

/// Out-of-range start is empty; a missing length takes the rest
fn substring(text: &str, start: Option<i32>, length: Option<i32>) -> EvalResult<Collection> {
    let Some(start) = start.and_then(|s| usize::try_from(s).ok()) else {
        return empty();
    };
    let total = text.chars().count();
    if start >= total {
        return empty();
    }
    let taken = match length {
        Some(length) => usize::try_from(length).unwrap_or(0),
        None => total,
    };
    single(text.chars().skip(start).take(taken).collect::<String>())
}

fn compile(pattern: &str) -> EvalResult<Regex> {
    let mut patterns = PATTERNS.lock();
    if let Some(regex) = patterns.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern)
        .map_err(|e| EvalError::invalid_argument(format!("invalid pattern '{pattern}': {e}")))?;
    if patterns.len() >= PATTERN_CACHE_LIMIT {
        patterns.clear();
    }
    patterns.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Items must all be strings
fn join(items: &Arg, separator: &str) -> EvalResult<Collection> {
    let items = items.collection();
    if items.is_empty() {
        return empty();
    }
    let parts = items
        .iter()
        .map(|node| {
            node.value()
                .and_then(Value::as_str)
                .ok_or_else(|| EvalError::conversion(node, "String"))
        })
        .collect::<EvalResult<Vec<_>>>()?;
    single(parts.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &Collection) -> Vec<String> {
        items
            .iter()
            .filter_map(|n| n.value().and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_substring_bounds() {
        assert_eq!(strings(&substring("abcdef", Some(1), Some(3)).unwrap()), ["bcd"]);
        assert_eq!(strings(&substring("abcdef", Some(4), None).unwrap()), ["ef"]);
        assert!(substring("abc", Some(3), None).unwrap().is_empty());
        assert!(substring("abc", Some(-1), None).unwrap().is_empty());
        assert!(substring("abc", None, Some(1)).unwrap().is_empty());
        assert_eq!(strings(&substring("abc", Some(0), Some(-2)).unwrap()), [""]);
    }

    #[test]
    fn test_char_counting_is_not_bytes() {
        assert_eq!(char_count("café").unwrap(), 4);
        assert_eq!(strings(&substring("café!", Some(3), Some(1)).unwrap()), ["é"]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(compile("("), Err(EvalError::InvalidArgument { .. })));
        assert!(!PATTERNS.lock().contains_key("("));
    }

    #[test]
    fn test_patterns_are_compiled_once() {
        let pattern = "^cached-[0-9]+$";
        let first = compile(pattern).unwrap();
        assert!(PATTERNS.lock().contains_key(pattern));
        let second = compile(pattern).unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(second.is_match("cached-42"));
    }

    #[test]
    fn test_join_rejects_non_strings() {
        let arg = Arg::Collection(Collection::from_values([Value::from("a"), Value::Integer(1)]));
        assert!(join(&arg, ",").is_err());
        let arg = Arg::Collection(Collection::from_values([Value::from("a"), Value::from("b")]));
        assert_eq!(strings(&join(&arg, ",").unwrap()), ["a,b"]);
    }
}
