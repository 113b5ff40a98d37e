use std::fmt::Write;

use lazy_static::lazy_static;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::Result;
use crate::frontmatter::{Categories, Frontmatter};

lazy_static! {
    static ref NUMBER_LIKE: Regex =
        Regex::new(r"^[-+]?(\.[0-9]+|[0-9][0-9_]*(\.[0-9_]*)?)([eE][-+]?[0-9]+)?$|^[-+]?0x[0-9a-fA-F_]+$|^[-+]?0o[0-7_]+$|^[-+]?0b[01_]+$|^[-+]?\.(inf|Inf|INF)$|^\.(nan|NaN|NAN)$")
            .unwrap();
    static ref DATE_LIKE: Regex = Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}").unwrap();
}

const RESERVED: [&str; 11] = ["true", "false", "yes", "no", "on", "off", "null", "~", "y", "n", "<<"];

fn needs_quotes(s: &str, in_flow: bool) -> bool {
    if s.is_empty() || s.trim() != s {
        return true;
    }

    let lower = s.to_ascii_lowercase();
    if RESERVED.contains(&lower.as_str()) || NUMBER_LIKE.is_match(s) || DATE_LIKE.is_match(s) {
        return true;
    }

    let Some(first) = s.chars().next() else {
        return true;
    };
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }

    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return true;
    }

    if in_flow && s.contains([',', '[', ']', '{', '}']) {
        return true;
    }

    if s.chars().any(|c| c.is_control()) {
        return true;
    }

    // Plain text must read back as this exact string
    !matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(ref parsed)) if parsed == s)
}

/// Double-quoted YAML scalar. JSON string escapes are valid YAML escapes.
fn quoted(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.replace('"', "\\\"")))
}

pub(crate) fn block_scalar(s: &str) -> String {
    if needs_quotes(s, false) {
        quoted(s)
    } else {
        s.to_string()
    }
}

fn flow_scalar(s: &str) -> String {
    if needs_quotes(s, true) {
        quoted(s)
    } else {
        s.to_string()
    }
}

fn flow_list(items: &[String]) -> String {
    let inner: Vec<String> = items.iter().map(|s| flow_scalar(s)).collect();
    format!("[{}]", inner.join(", "))
}

fn flow_categories(categories: &Categories) -> String {
    match categories {
        Categories::Flat(names) => flow_list(names),
        Categories::Nested(groups) => {
            let inner: Vec<String> = groups.iter().map(|g| flow_list(g)).collect();
            format!("[{}]", inner.join(", "))
        }
    }
}

fn value_scalar(value: &Value, in_flow: bool) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if in_flow => Some(flow_scalar(s)),
        Value::String(s) => Some(block_scalar(s)),
        _ => None,
    }
}

/// Sequences of scalars, or of sequences of scalars, in `[a, [b, c]]` form.
/// `None` when the value holds a mapping or goes deeper than two levels.
fn flow_sequence(items: &[Value], depth: usize) -> Option<String> {
    let mut inner = vec![];
    for item in items {
        let rendered = match item {
            Value::Sequence(nested) if depth < 2 => flow_sequence(nested, depth + 1)?,
            Value::Tagged(_) | Value::Mapping(_) | Value::Sequence(_) => return None,
            scalar => value_scalar(scalar, true)?,
        };
        inner.push(rendered);
    }
    Some(format!("[{}]", inner.join(", ")))
}

fn key_text(key: &Value) -> Result<String> {
    match value_scalar(key, false) {
        Some(text) => Ok(text),
        None => {
            let text = serde_yaml::to_string(key)?;
            Ok(format!("? {}", text.trim_end()))
        }
    }
}

fn write_extra(buf: &mut String, extra: &Mapping) -> Result<()> {
    for (key, value) in extra.iter() {
        let key_str = key_text(key)?;

        let inline = match value {
            Value::Sequence(items) => flow_sequence(items, 1),
            other => value_scalar(other, false),
        };

        match inline {
            Some(text) => {
                let _ = writeln!(buf, "{}: {}", key_str, text);
            }
            None => {
                let mut single = Mapping::new();
                single.insert(key.clone(), value.clone());
                buf.push_str(&serde_yaml::to_string(&single)?);
            }
        }
    }
    Ok(())
}

/// Renders a post file. Dates come out unquoted in local form and lists in
/// flow style, matching the files hand-written for the blog.
pub fn serialize(frontmatter: &Frontmatter, body: &str) -> Result<String> {
    let mut buf = String::new();

    let _ = writeln!(&mut buf, "---");
    let _ = writeln!(&mut buf, "title: {}", block_scalar(&frontmatter.title));
    let _ = writeln!(&mut buf, "date: {}", frontmatter.date);
    if let Some(ref updated) = frontmatter.updated {
        let _ = writeln!(&mut buf, "updated: {}", updated);
    }
    let _ = writeln!(&mut buf, "categories: {}", flow_categories(&frontmatter.categories));
    let _ = writeln!(&mut buf, "tags: {}", flow_list(&frontmatter.tags));
    let _ = writeln!(&mut buf, "draft: {}", frontmatter.draft);
    if let Some(sticky) = frontmatter.sticky {
        let _ = writeln!(&mut buf, "sticky: {}", sticky);
    }
    write_extra(&mut buf, &frontmatter.extra)?;
    let _ = writeln!(&mut buf, "---");
    let _ = writeln!(&mut buf);
    buf.push_str(body);

    Ok(buf)
}
