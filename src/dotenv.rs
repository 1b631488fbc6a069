//! Reading and writing `NAME=VALUE` dotenv files.
//!
//! Output is sorted by name so generated files are stable under version
//! control. Values that are canonical integers are written bare; everything
//! else is double-quoted with `\\`, `\n`, `\r` and `\"` escaped.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{DenvError, Result};
use crate::utils::write_private_file;

/// Serialize `env` as dotenv text, one line per entry, without a trailing
/// newline.
pub fn marshal(env: &BTreeMap<String, String>) -> String {
    let mut lines = Vec::with_capacity(env.len());
    for (name, value) in env {
        if is_canonical_integer(value) {
            lines.push(format!("{}={}", name, value));
        } else {
            lines.push(format!("{}=\"{}\"", name, escape(value)));
        }
    }
    lines.join("\n")
}

/// Parse dotenv text. Blank lines and `#` comments are skipped; any other
/// line without `=` fails the whole parse. Later duplicates win.
pub fn unmarshal(content: &str) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();

    for (index, line) in content.split('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (name, raw) = line.split_once('=').ok_or_else(|| DenvError::MalformedLine {
            line_number: index + 1,
            line: line.to_string(),
        })?;

        env.insert(name.to_string(), unescape(strip_quotes(raw)));
    }

    Ok(env)
}

/// Write `env` to `path` atomically with owner-only permissions.
pub fn write_file(path: &Path, env: &BTreeMap<String, String>) -> Result<()> {
    let mut content = marshal(env);
    content.push('\n');
    write_private_file(path, content.as_bytes())?;
    debug!(path = %path.display(), count = env.len(), "wrote dotenv file");
    Ok(())
}

pub fn read_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    unmarshal(&content)
}

/// True when `value` is exactly the decimal rendering of an `i64`. Values
/// like `012345`, `+5` or `-0` stay quoted so they read back unchanged.
fn is_canonical_integer(value: &str) -> bool {
    value
        .parse::<i64>()
        .is_ok_and(|n| n.to_string() == value)
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('"', "\\\"")
}

/// Drop one matching pair of surrounding `"` or `'`.
fn strip_quotes(raw: &str) -> &str {
    if raw.len() >= 2 {
        for quote in ['"', '\''] {
            if let Some(inner) = raw
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
            {
                return inner;
            }
        }
    }
    raw
}

/// Inverse of [`escape`]. A single left-to-right pass, so an escaped
/// backslash is never reinterpreted as the start of another escape. Unknown
/// escapes are kept verbatim.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_marshal_sorts_and_quotes() {
        let env = map(&[
            ("EXAMPLE_SECRET", "secret-value"),
            ("EXAMPLE_ENV", "example-value"),
        ]);
        assert_eq!(
            marshal(&env),
            "EXAMPLE_ENV=\"example-value\"\nEXAMPLE_SECRET=\"secret-value\""
        );
    }

    #[test]
    fn test_marshal_edge_values() {
        assert_eq!(marshal(&BTreeMap::new()), "");
        assert_eq!(marshal(&map(&[("E", "")])), "E=\"\"");
        assert_eq!(marshal(&map(&[("N", "12345")])), "N=12345");
        assert_eq!(marshal(&map(&[("N", "-42")])), "N=-42");
        assert_eq!(marshal(&map(&[("Z", "012345")])), "Z=\"012345\"");
        assert_eq!(marshal(&map(&[("P", "+5")])), "P=\"+5\"");
    }

    #[test]
    fn test_marshal_escaping() {
        assert_eq!(
            marshal(&map(&[("LF", "test1\ntest2\ntest3")])),
            "LF=\"test1\\ntest2\\ntest3\""
        );
        assert_eq!(
            marshal(&map(&[("CRLF", "test1\r\ntest2")])),
            "CRLF=\"test1\\r\\ntest2\""
        );
        assert_eq!(
            marshal(&map(&[("Q", "example\"value")])),
            "Q=\"example\\\"value\""
        );
        assert_eq!(
            marshal(&map(&[("B", "example\\value")])),
            "B=\"example\\\\value\""
        );
    }

    #[test]
    fn test_unmarshal_basic_forms() {
        let parsed = unmarshal(
            "# comment\n\nEXAMPLE_ENV=\"example-value\"\nEMPTY=\nDQ=\"\"\nSQ=''\nNUM=12345\nSINGLE='single value'",
        )
        .unwrap();
        assert_eq!(
            parsed,
            map(&[
                ("EXAMPLE_ENV", "example-value"),
                ("EMPTY", ""),
                ("DQ", ""),
                ("SQ", ""),
                ("NUM", "12345"),
                ("SINGLE", "single value"),
            ])
        );
    }

    #[test]
    fn test_unmarshal_escapes() {
        let parsed = unmarshal(
            "LF=\"test1\\ntest2\"\nCR=\"a\\rb\"\nQ=\"example\\\"value\"\nB=\"example\\\\value\"\nRAW=un\\nquoted",
        )
        .unwrap();
        assert_eq!(parsed["LF"], "test1\ntest2");
        assert_eq!(parsed["CR"], "a\rb");
        assert_eq!(parsed["Q"], "example\"value");
        assert_eq!(parsed["B"], "example\\value");
        assert_eq!(parsed["RAW"], "un\nquoted");
    }

    #[test]
    fn test_unmarshal_splits_on_first_equals() {
        let parsed = unmarshal("URL=\"postgres://u:p@h/db?a=b\"").unwrap();
        assert_eq!(parsed["URL"], "postgres://u:p@h/db?a=b");
    }

    #[test]
    fn test_unmarshal_lone_quote_is_kept() {
        let parsed = unmarshal("Q=\"").unwrap();
        assert_eq!(parsed["Q"], "\"");
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let err = unmarshal("A=1\n# ok\nNOT_A_PAIR\nB=2").unwrap_err();
        match err {
            DenvError::MalformedLine { line_number, line } => {
                assert_eq!(line_number, 3);
                assert_eq!(line, "NOT_A_PAIR");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let env = map(&[
            ("ZERO_PADDED", "012345"),
            ("INT", "7"),
            ("LITERAL_BACKSLASH_N", "C:\\new\\path"),
            ("ESCAPED_QUOTE_TEXT", "say \\\"hi\\\""),
            ("MULTILINE", "line1\r\nline2\n"),
            ("EMPTY", ""),
            ("SPACES", "  padded  "),
        ]);
        assert_eq!(unmarshal(&marshal(&env)).unwrap(), env);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let env = map(&[("A", "1"), ("B", "two words")]);

        write_file(&path, &env).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "A=1\nB=\"two words\"\n");
        assert_eq!(read_file(&path).unwrap(), env);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, DenvError::Io(_)));
    }
}
