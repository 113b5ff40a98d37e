use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use spdlog::{info, warn};

use crate::error::{CmsError, Result};
use crate::frontmatter::emit::block_scalar;
use crate::util::slug::{is_valid_slug, suggest_category_slug};

const SECTION: &str = "category_map:";
const DEFAULT_INDENT: &str = "  ";

/// Display name -> URL slug, as kept in the site config under `category_map`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategoryMap {
    entries: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryMapping {
    pub name: String,
    pub slug: String,
}

/// `categoryMappings` as sent by the editor: `{"Name": "slug"}` or `[{name, slug}]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryMappings {
    Object(BTreeMap<String, String>),
    List(Vec<CategoryMapping>),
}

impl CategoryMappings {
    pub fn into_vec(self) -> Vec<CategoryMapping> {
        match self {
            CategoryMappings::Object(map) => map
                .into_iter()
                .map(|(name, slug)| CategoryMapping { name, slug })
                .collect(),
            CategoryMappings::List(list) => list,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub suggested_slug: String,
}

#[derive(Deserialize, Default)]
struct SiteConfig {
    #[serde(default)]
    category_map: Option<Mapping>,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl CategoryMap {
    pub fn from_entries<I: IntoIterator<Item = (String, String)>>(entries: I) -> CategoryMap {
        CategoryMap {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn parse(site_config: &str) -> Result<CategoryMap> {
        let config: Option<SiteConfig> = serde_yaml::from_str(site_config)?;
        let mapping = config.and_then(|c| c.category_map).unwrap_or_default();

        let mut entries = BTreeMap::new();
        for (name, slug) in mapping.iter() {
            match (scalar_text(name), scalar_text(slug)) {
                (Some(name), Some(slug)) => {
                    entries.insert(name, slug);
                }
                _ => warn!("Skipping category map entry {:?}: {:?}", name, slug),
            }
        }
        Ok(CategoryMap { entries })
    }

    /// Missing file means an empty map.
    pub fn load(site_config_path: &Path) -> Result<CategoryMap> {
        match fs::read_to_string(site_config_path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Site config {} not found. Starting with an empty category map", site_config_path.display());
                Ok(CategoryMap::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    /// Names without a slug, each once, with a suggestion the editor may override.
    pub fn detect_new_categories(&self, names: &[String]) -> Vec<NewCategory> {
        let mut seen = HashSet::new();
        names
            .iter()
            .filter(|name| !name.trim().is_empty() && !self.contains(name))
            .filter(|name| seen.insert(name.as_str()))
            .map(|name| NewCategory {
                name: name.clone(),
                suggested_slug: suggest_category_slug(name),
            })
            .collect()
    }

    /// Persists mappings for names the map does not know yet. Existing entries
    /// are never overwritten, so applying the same mappings twice is a no-op.
    /// Returns the number of entries added.
    pub fn merge(&mut self, site_config_path: &Path, mappings: &[CategoryMapping]) -> Result<usize> {
        for mapping in mappings {
            if mapping.name.trim().is_empty() {
                return Err(CmsError::Validation("category name must not be empty".to_string()));
            }
            if !is_valid_slug(&mapping.slug) {
                return Err(CmsError::Validation(format!(
                    "invalid slug '{}' for category '{}': use lowercase letters, digits and hyphens",
                    mapping.slug, mapping.name
                )));
            }
        }

        let mut seen = HashSet::new();
        let additions: Vec<&CategoryMapping> = mappings
            .iter()
            .filter(|m| !self.contains(&m.name) && seen.insert(m.name.as_str()))
            .collect();

        if additions.is_empty() {
            return Ok(0);
        }

        let text = match fs::read_to_string(site_config_path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = additions
            .iter()
            .map(|m| format!("{}: {}", block_scalar(&m.name), block_scalar(&m.slug)))
            .collect();
        let updated = insert_into_section(&text, &lines)?;
        fs::write(site_config_path, updated)?;

        for mapping in additions.iter() {
            info!("Category '{}' mapped to '{}'", mapping.name, mapping.slug);
            self.entries.insert(mapping.name.clone(), mapping.slug.clone());
        }

        Ok(additions.len())
    }
}

fn split_comment(rest: &str) -> (&str, &str) {
    match rest.find(" #") {
        Some(pos) => (rest[..pos].trim(), &rest[pos..]),
        None if rest.trim_start().starts_with('#') => ("", rest),
        None => (rest.trim(), ""),
    }
}

/// Adds `entries` (already rendered as `key: value`) to the end of the
/// `category_map:` block, leaving every other line of the config alone.
fn insert_into_section(text: &str, entries: &[String]) -> Result<String> {
    let mut lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();

    let Some(header) = lines.iter().position(|l| l.starts_with(SECTION)) else {
        if lines.last().is_some_and(|l| !l.trim().is_empty()) {
            lines.push(String::new());
        }
        lines.push(SECTION.to_string());
        lines.extend(entries.iter().map(|e| format!("{}{}", DEFAULT_INDENT, e)));
        return Ok(lines.join("\n") + "\n");
    };

    // `category_map: {}` or `category_map: {A: a}` become a block
    let (inline, comment) = {
        let (inline, comment) = split_comment(&lines[header][SECTION.len()..]);
        (inline.to_string(), comment.to_string())
    };
    let mut carried = vec![];
    if !inline.is_empty() {
        let existing: Mapping = serde_yaml::from_str(&inline)
            .map_err(|e| CmsError::Validation(format!("cannot extend category_map '{}': {}", inline, e)))?;
        for (name, slug) in existing.iter() {
            if let (Some(name), Some(slug)) = (scalar_text(name), scalar_text(slug)) {
                carried.push(format!("{}: {}", block_scalar(&name), block_scalar(&slug)));
            }
        }
        lines[header] = format!("{}{}", SECTION, comment);
    }

    let mut last_child = header;
    let mut indent: Option<String> = None;
    for (idx, line) in lines.iter().enumerate().skip(header + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with([' ', '\t']) {
            if line.starts_with('#') {
                continue;
            }
            break;
        }
        last_child = idx;
        if indent.is_none() && !line.trim_start().starts_with('#') {
            let width = line.len() - line.trim_start().len();
            indent = Some(line[..width].to_string());
        }
    }

    let indent = indent.unwrap_or_else(|| DEFAULT_INDENT.to_string());
    let new_lines: Vec<String> = carried
        .iter()
        .chain(entries.iter())
        .map(|e| format!("{}{}", indent, e))
        .collect();

    let tail = lines.split_off(last_child + 1);
    lines.extend(new_lines);
    lines.extend(tail);

    Ok(lines.join("\n") + "\n")
}
