use crate::error::{Error, Result};
use crate::record::Grade;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REGIONS: [&str; 14] = [
    "基北區", "桃連區", "竹苗區", "中投區", "雲林區", "彰化區", "嘉義區", "台南區", "高雄區",
    "屏東區", "宜蘭區", "花蓮區", "金門區", "澎湖區",
];

pub const DEFAULT_YEARS: [&str; 4] = ["114", "113", "112", "111"];

/// Static enumerations used to build filter controls and validate filter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Catalog {
    pub regions: Vec<String>,
    pub years: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
            years: DEFAULT_YEARS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Catalog {
    pub fn grades(&self) -> Vec<&'static str> {
        Grade::ALL.iter().map(|g| g.as_str()).collect()
    }

    pub fn has_region(&self, v: &str) -> bool {
        self.regions.iter().any(|r| r == v)
    }

    pub fn has_year(&self, v: &str) -> bool {
        self.years.iter().any(|y| y == v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Settings {
    pub source_url: Option<String>,
    /// Year counted by the "latest year" summary card.
    pub target_year: String,
    pub page_sizes: Vec<usize>,
    pub default_page_size: usize,
    pub pin_capacity: usize,
    pub fetch_timeout_secs: u64,
    pub mirror_path: Option<PathBuf>,
    pub catalog: Catalog,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_url: None,
            target_year: "114".to_string(),
            page_sizes: vec![12, 24, 60],
            default_page_size: 12,
            pin_capacity: 4,
            fetch_timeout_secs: 20,
            mirror_path: None,
            catalog: Catalog::default(),
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source_url: Option<String>,
    pub mirror_path: Option<PathBuf>,
    pub target_year: Option<String>,
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Settings> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Settings> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Config file (if any) under CLI/env overrides, then validated.
    pub fn resolve(config_path: Option<&Path>, overrides: Overrides) -> Result<Settings> {
        let mut settings = match config_path {
            Some(p) => Self::from_file(p)?,
            None => Settings::default(),
        };
        if overrides.source_url.is_some() {
            settings.source_url = overrides.source_url;
        }
        if overrides.mirror_path.is_some() {
            settings.mirror_path = overrides.mirror_path;
        }
        if let Some(year) = overrides.target_year {
            settings.target_year = year;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_sizes.is_empty() || self.page_sizes.contains(&0) {
            return Err(Error::Config(
                "page_sizes must be a non-empty list of positive sizes".into(),
            ));
        }
        if !self.page_sizes.contains(&self.default_page_size) {
            return Err(Error::Config(format!(
                "default_page_size {} is not one of page_sizes",
                self.default_page_size
            )));
        }
        if self.pin_capacity == 0 {
            return Err(Error::Config("pin_capacity must be >= 1".into()));
        }
        if self.catalog.regions.is_empty() || self.catalog.years.is_empty() {
            return Err(Error::Config("catalog regions and years must not be empty".into()));
        }
        if self.target_year.trim().is_empty() {
            return Err(Error::Config("target_year must not be empty".into()));
        }
        Ok(())
    }
}
