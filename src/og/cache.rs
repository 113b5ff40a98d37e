use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use spdlog::{info, warn};

use crate::error::Result;
use crate::og::OgEntry;

pub const DEFAULT_TTL_DAYS: i64 = 7;

/// The whole cache lives in one JSON document and every store rewrites it.
/// Fine for a single local editor, not for several writers.
pub struct OgCache {
    path: PathBuf,
    ttl: Duration,
    entries: BTreeMap<String, OgEntry>,
}

impl OgCache {
    /// A missing or unreadable file starts an empty cache.
    pub fn load(path: &Path, ttl: Duration) -> OgCache {
        let entries = match File::open(path) {
            Ok(fd) => match serde_json::from_reader(BufReader::new(fd)) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("OG cache {} is corrupt ({}). Starting empty", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("OG cache file {} does not exist. Starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Could not open OG cache {}: {}. Starting empty", path.display(), e);
                BTreeMap::new()
            }
        };

        OgCache {
            path: path.to_path_buf(),
            ttl,
            entries,
        }
    }

    pub fn is_fresh(&self, entry: &OgEntry, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at < self.ttl
    }

    /// Only entries younger than the TTL are returned.
    pub fn lookup(&self, url: &str, now: DateTime<Utc>) -> Option<&OgEntry> {
        self.entries.get(url).filter(|entry| self.is_fresh(entry, now))
    }

    pub fn store(&mut self, url: &str, entry: OgEntry) -> Result<()> {
        self.entries.insert(url.to_string(), entry);
        self.save()
    }

    pub fn entries(&self) -> &BTreeMap<String, OgEntry> {
        &self.entries
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, &self.entries)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::og::OgData;

    use super::*;

    fn entry_at(fetched_at: DateTime<Utc>) -> OgEntry {
        OgEntry {
            data: OgData {
                url: "https://example.com".to_string(),
                title: Some("Example".to_string()),
                ..Default::default()
            },
            fetched_at,
        }
    }

    #[test]
    fn test_ttl_boundary() {
        let dir = TempDir::new().unwrap();
        let mut cache = OgCache::load(&dir.path().join("og.json"), Duration::days(DEFAULT_TTL_DAYS));
        let now = Utc::now();

        cache.store("young", entry_at(now - Duration::days(7) + Duration::seconds(1))).unwrap();
        cache.store("old", entry_at(now - Duration::days(7) - Duration::seconds(1))).unwrap();

        assert!(cache.lookup("young", now).is_some());
        assert!(cache.lookup("old", now).is_none());
        assert!(cache.lookup("unknown", now).is_none());
        assert_eq!(cache.entries().len(), 2);
    }

    #[test]
    fn test_persisted_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("og.json");
        let mut cache = OgCache::load(&path, Duration::days(7));
        let fetched_at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        cache.store("https://example.com", entry_at(fetched_at)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let stored = &json["https://example.com"];
        assert_eq!(stored["title"], "Example");
        assert_eq!(stored["fetchedAt"], "2026-01-01T00:00:00Z");

        let reloaded = OgCache::load(&path, Duration::days(7));
        assert_eq!(reloaded.entries(), cache.entries());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("og.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(OgCache::load(&path, Duration::days(7)).entries().is_empty());
    }
}
