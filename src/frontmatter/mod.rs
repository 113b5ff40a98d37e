//! YAML frontmatter of a post: the block between the leading `---` lines.
//!
//! Known keys are lifted into [`Frontmatter`]; anything else is kept in
//! `extra`, in file order, and written back untouched.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_yaml::{Mapping, Value};
use spdlog::warn;

use crate::error::{CmsError, Result};
use crate::util::post_date::PostDate;

pub mod emit;
pub mod parse;

pub use emit::serialize;
pub use parse::parse;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DatePolicy {
    /// Reading posts: bad dates become "now" with a warning.
    Lenient,
    /// Saving posts: bad dates are rejected.
    Strict,
}

/// `categories: [a, b]` or the legacy hierarchical `categories: [[a, b], [c]]`.
#[derive(Clone, Debug, PartialEq)]
pub enum Categories {
    Flat(Vec<String>),
    Nested(Vec<Vec<String>>),
}

impl Default for Categories {
    fn default() -> Self {
        Categories::Flat(vec![])
    }
}

impl Categories {
    /// All names, de-duplicated, in first-seen order.
    pub fn flatten(&self) -> Vec<String> {
        let names: Vec<&String> = match self {
            Categories::Flat(names) => names.iter().collect(),
            Categories::Nested(groups) => groups.iter().flatten().collect(),
        };
        dedup(names.into_iter().cloned())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Categories::Flat(names) => names.is_empty(),
            Categories::Nested(groups) => groups.iter().all(|g| g.is_empty()),
        }
    }

    fn from_value(value: &Value) -> Categories {
        match value {
            Value::Sequence(items) if items.iter().any(|v| v.is_sequence()) => {
                let groups = items
                    .iter()
                    .map(|item| match item {
                        Value::Sequence(group) => group.iter().filter_map(scalar_to_string).collect(),
                        other => scalar_to_string(other).into_iter().collect(),
                    })
                    .collect();
                Categories::Nested(groups)
            }
            other => Categories::Flat(string_list(other)),
        }
    }
}

impl Serialize for Categories {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Categories::Flat(names) => names.serialize(serializer),
            Categories::Nested(groups) => groups.serialize(serializer),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frontmatter {
    pub title: String,
    pub date: PostDate,
    pub updated: Option<PostDate>,
    pub categories: Categories,
    pub tags: Vec<String>,
    pub draft: bool,
    /// `None` when the file never mentioned `sticky`; it is then not written back.
    pub sticky: Option<bool>,
    pub extra: Mapping,
}

impl Frontmatter {
    pub fn new(title: &str, date: PostDate) -> Frontmatter {
        Frontmatter {
            title: title.to_string(),
            date,
            updated: None,
            categories: Categories::default(),
            tags: vec![],
            draft: false,
            sticky: None,
            extra: Mapping::new(),
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky.unwrap_or(false)
    }

    /// `context` names the source (usually the post id) in log lines.
    pub fn from_mapping(mapping: Mapping, policy: DatePolicy, context: &str) -> Result<Frontmatter> {
        let mut frontmatter = Frontmatter::new("", PostDate::now());
        let mut date_seen = false;

        for (key, value) in mapping {
            let Some(name) = key.as_str() else {
                frontmatter.extra.insert(key, value);
                continue;
            };

            match name {
                "title" => frontmatter.title = scalar_to_string(&value).unwrap_or_default(),
                "date" => {
                    date_seen = true;
                    frontmatter.date = read_date(&value, policy, context, "date")?
                        .unwrap_or_else(|| {
                            warn!("Empty date in {}. Using current time", context);
                            PostDate::now()
                        });
                }
                "updated" => frontmatter.updated = read_date(&value, policy, context, "updated")?,
                "categories" => frontmatter.categories = Categories::from_value(&value),
                "tags" => frontmatter.tags = string_list(&value),
                "draft" => frontmatter.draft = read_bool(&value),
                "sticky" => frontmatter.sticky = Some(read_bool(&value)),
                _ => {
                    frontmatter.extra.insert(key, value);
                }
            }
        }

        if !date_seen && policy == DatePolicy::Lenient {
            warn!("Missing date in {}. Using current time", context);
        }

        Ok(frontmatter)
    }

    /// Frontmatter as sent by the editor. Dates are checked strictly.
    pub fn from_json(value: serde_json::Value, context: &str) -> Result<Frontmatter> {
        if !value.is_object() {
            return Err(CmsError::Validation("frontmatter must be an object".to_string()));
        }
        let yaml: Value = serde_yaml::to_value(&value)?;
        match yaml {
            Value::Mapping(mapping) => Self::from_mapping(mapping, DatePolicy::Strict, context),
            _ => Err(CmsError::Validation("frontmatter must be an object".to_string())),
        }
    }
}

impl Serialize for Frontmatter {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("date", &self.date)?;
        if let Some(ref updated) = self.updated {
            map.serialize_entry("updated", updated)?;
        }
        map.serialize_entry("categories", &self.categories)?;
        map.serialize_entry("tags", &self.tags)?;
        map.serialize_entry("draft", &self.draft)?;
        if let Some(sticky) = self.sticky {
            map.serialize_entry("sticky", &sticky)?;
        }
        for (key, value) in self.extra.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn read_date(value: &Value, policy: DatePolicy, context: &str, field: &str) -> Result<Option<PostDate>> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => match policy {
            DatePolicy::Strict => return Err(CmsError::InvalidDate(format!("{}: {:?}", field, other))),
            DatePolicy::Lenient => {
                warn!("Unsupported {} value {:?} in {}", field, other, context);
                return Ok(match field {
                    "date" => Some(PostDate::now()),
                    _ => None,
                });
            }
        },
    };

    match policy {
        DatePolicy::Strict => PostDate::parse_strict(&text)
            .map(Some)
            .map_err(CmsError::InvalidDate),
        DatePolicy::Lenient if field == "date" => Ok(Some(PostDate::parse_lenient(&text, context))),
        DatePolicy::Lenient => match PostDate::parse_strict(&text) {
            Ok(date) => Ok(Some(date)),
            Err(bad) => {
                warn!("Ignoring unparsable {} '{}' in {}", field, bad, context);
                Ok(None)
            }
        },
    }
}

fn read_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::Null => vec![],
        other => scalar_to_string(other).into_iter().collect(),
    }
}

pub(crate) fn dedup<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
