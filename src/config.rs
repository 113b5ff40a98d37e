use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;

use crate::og::cache::DEFAULT_TTL_DAYS;
use crate::og::fetch::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

#[derive(Deserialize)]
pub struct Paths {
    /// Root of the blog project. Also sent to the dashboard to build editor links.
    pub project_root: PathBuf,
    /// Markdown posts. Relative paths are taken from `project_root`.
    pub content_dir: PathBuf,
    /// Blog config holding `category_map`.
    #[serde(default = "default_site_config")]
    pub site_config: PathBuf,
    #[serde(default = "default_og_cache")]
    pub og_cache: PathBuf,
}

fn default_site_config() -> PathBuf {
    PathBuf::from("_config.yml")
}

fn default_og_cache() -> PathBuf {
    PathBuf::from("og-cache.json")
}

#[derive(Deserialize)]
pub struct Server {
    #[serde(default = "default_address")]
    pub address: String,
    pub port: u16,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

#[derive(Deserialize, Default)]
pub struct Og {
    pub ttl_days: Option<i64>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub server: Server,
    #[serde(default)]
    pub og: Og,
    pub log: Option<Log>,
}

impl Config {
    pub fn og_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.og.ttl_days.unwrap_or(DEFAULT_TTL_DAYS))
    }

    pub fn og_timeout(&self) -> Duration {
        Duration::from_secs(self.og.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn og_user_agent(&self) -> &str {
        self.og.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

fn parse_path(path: PathBuf) -> io::Result<PathBuf> {
    if !path.starts_with("${exe_dir}") {
        return Ok(path);
    }

    let cur_exe = env::current_exe()?;
    let exe_dir = cur_exe
        .parent()
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "Executable has no parent directory"))?;
    let rest = path.strip_prefix("${exe_dir}").unwrap_or(Path::new(""));
    Ok(exe_dir.join(rest))
}

fn under_root(root: &Path, path: PathBuf) -> io::Result<PathBuf> {
    let path = parse_path(path)?;
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(root.join(path))
    }
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    let mut cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    let project_root = parse_path(cfg.paths.project_root)?;
    cfg.paths = Paths {
        content_dir: under_root(&project_root, cfg.paths.content_dir)?,
        site_config: under_root(&project_root, cfg.paths.site_config)?,
        og_cache: under_root(&project_root, cfg.paths.og_cache)?,
        project_root,
    };

    Ok(cfg)
}

pub fn read_config(cfg_path: &Path) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}
