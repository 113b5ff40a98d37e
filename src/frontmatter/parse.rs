use serde_yaml::{Mapping, Value};

use crate::error::{CmsError, Result};

const DELIMITER: &str = "---";

/// Splits `text` into the raw YAML header and the body. `None` when the text
/// does not open with a `---` line.
fn split_header(text: &str) -> Result<Option<(&str, &str)>> {
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok(None);
    };
    if first.trim_end() != DELIMITER {
        return Ok(None);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            // The blank line after the closing delimiter belongs to the header
            let body = body
                .strip_prefix("\r\n")
                .or_else(|| body.strip_prefix('\n'))
                .unwrap_or(body);
            return Ok(Some((yaml, body)));
        }
        offset += line.len();
    }

    Err(CmsError::Frontmatter("closing --- is missing".to_string()))
}

/// Parses a post file into its frontmatter mapping and body. A file without
/// a header yields an empty mapping and the whole text as body.
pub fn parse(text: &str) -> Result<(Mapping, String)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let Some((yaml, body)) = split_header(text)? else {
        return Ok((Mapping::new(), text.to_string()));
    };

    let value: Value = if yaml.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(yaml).map_err(|e| CmsError::Frontmatter(e.to_string()))?
    };

    match value {
        Value::Null => Ok((Mapping::new(), body.to_string())),
        Value::Mapping(mapping) => Ok((mapping, body.to_string())),
        other => Err(CmsError::Frontmatter(format!(
            "expected a mapping, found {:?}",
            other
        ))),
    }
}
