use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::WatchArgs;

pub const DEFAULT_SITEMAP_URL: &str = "https://waitly.eu/da/sitemap";

/// Postcode range mapped to an area label. Sitemap discoveries outside every
/// configured area are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Area {
    pub label: String,
    pub lo: u32,
    pub hi: u32,
}

impl Area {
    fn new(label: &str, lo: u32, hi: u32) -> Self {
        Area { label: label.to_string(), lo, hi }
    }

    pub fn contains(&self, postcode: u32) -> bool {
        self.lo <= postcode && postcode <= self.hi
    }
}

/// Copenhagen plus Frederiksberg, the areas the watcher was built for.
pub fn default_areas() -> Vec<Area> {
    vec![
        Area::new("København K", 1000, 1499),
        Area::new("København V", 1500, 1799),
        Area::new("Frederiksberg", 1800, 2000),
        Area::new("København Ø", 2100, 2100),
        Area::new("København N", 2200, 2200),
        Area::new("København S", 2300, 2450),
    ]
}

/// On-disk config shape. Every field is optional so a missing or partial file
/// degrades to defaults instead of failing the run.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    sitemap_url: Option<String>,
    areas: Option<Vec<Area>>,
    watch_file: Option<PathBuf>,
    positions_url: Option<String>,
    positions_token: Option<String>,
    export_path: Option<PathBuf>,
    webhook_url: Option<String>,
    notify_on_first_run: Option<bool>,
    timeout: Option<String>,
}

pub struct Config {
    pub sitemap_url: String,
    pub areas: Vec<Area>,
    pub watch_file: Option<PathBuf>,
    pub positions_url: Option<String>,
    pub positions_token: Option<String>,
    pub export_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub notify_on_first_run: bool,
    pub timeout: Duration,
    pub dry_run: bool,
    pub json_output: bool,
    pub verbose: bool,
}

impl Config {
    pub fn from_watch_args(args: &WatchArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let path = match &args.config {
            Some(p) => Some(p.clone()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(p) if p.exists() => Config::from_file(&p)?,
            _ => Config::default(),
        };

        if let Some(secs) = args.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config.dry_run = args.dry_run;
        config.json_output = args.json;
        config.verbose = args.verbose;
        config.apply_env();

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&text)?;

        let timeout = match file.timeout {
            Some(s) => humantime::parse_duration(&s)
                .map_err(|e| format!("invalid timeout '{s}': {e}"))?,
            None => Duration::from_secs(30),
        };

        Ok(Config {
            sitemap_url: file.sitemap_url.unwrap_or_else(|| DEFAULT_SITEMAP_URL.to_string()),
            areas: file.areas.unwrap_or_else(default_areas),
            watch_file: file.watch_file,
            positions_url: file.positions_url,
            positions_token: file.positions_token,
            export_path: file.export_path,
            webhook_url: file.webhook_url,
            notify_on_first_run: file.notify_on_first_run.unwrap_or(false),
            timeout,
            dry_run: false,
            json_output: false,
            verbose: false,
        })
    }

    pub fn default() -> Self {
        Config {
            sitemap_url: DEFAULT_SITEMAP_URL.to_string(),
            areas: default_areas(),
            watch_file: None,
            positions_url: None,
            positions_token: None,
            export_path: None,
            webhook_url: None,
            notify_on_first_run: false,
            timeout: Duration::from_secs(30),
            dry_run: false,
            json_output: false,
            verbose: false,
        }
    }

    /// Secrets come from the environment so the config file can be committed.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("VIGIL_WEBHOOK_URL") {
            if !url.is_empty() {
                self.webhook_url = Some(url);
            }
        }
        if let Ok(token) = std::env::var("VIGIL_POSITIONS_TOKEN") {
            if !token.is_empty() {
                self.positions_token = Some(token);
            }
        }
    }

    /// Area label for a postcode, if any configured area covers it.
    pub fn area_for_postcode(&self, postcode: u32) -> Option<&str> {
        self.areas
            .iter()
            .find(|a| a.contains(postcode))
            .map(|a| a.label.as_str())
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vigil")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Read the watched-URL file: one URL per line, blank lines and `#` comments
/// skipped.
pub fn read_watch_urls(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut urls = Vec::new();
    for line in fs::read_to_string(path)?.lines() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        urls.push(s.to_string());
    }

    Ok(urls)
}

/// Rewrite the watched-URL file via write-then-rename so a crash mid-write
/// leaves the previous list intact.
pub fn write_watch_urls(path: &Path, urls: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut content = urls.join("\n");
    if !urls.is_empty() {
        content.push('\n');
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;

    Ok(())
}
