//! Dashboard configuration: title, class registry and ordered time slices.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use landflow_core::ClassRegistry;
use serde::Deserialize;

/// One classified raster of the study area at a point in time.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSlice {
    pub label: String,
    pub path: PathBuf,
}

/// Slice labels end up in output file names.
fn is_file_safe(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('.')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub registry: ClassRegistry,
    pub slices: Vec<TimeSlice>,
}

impl DashboardConfig {
    /// Read and validate a config file. Relative slice paths are resolved
    /// against the directory holding the config.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let mut cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("cannot parse config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for slice in &mut cfg.slices {
            if slice.path.is_relative() {
                slice.path = base.join(&slice.path);
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slices.len() < 2 {
            bail!("at least two time slices are required, found {}", self.slices.len());
        }
        let mut seen = HashSet::new();
        for s in &self.slices {
            if !is_file_safe(&s.label) {
                bail!("slice label {:?} must be letters, digits, '-', '_' or '.' and not start with '.'", s.label);
            }
            if !seen.insert(s.label.as_str()) {
                bail!("duplicate slice label {:?}", s.label);
            }
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Landcover change")
    }

    pub fn slice(&self, label: &str) -> Result<&TimeSlice> {
        self.slices.iter().find(|s| s.label == label).with_context(|| {
            let known: Vec<&str> = self.slices.iter().map(|s| s.label.as_str()).collect();
            format!("no slice labelled {label:?} (known: {})", known.join(", "))
        })
    }

    /// Resolve the `--from` / `--to` pair. Missing ends default to the first
    /// and last configured slice.
    pub fn pair(&self, from: Option<&str>, to: Option<&str>) -> Result<(&TimeSlice, &TimeSlice)> {
        let first = self.slices.first().context("no slices configured")?;
        let last = self.slices.last().context("no slices configured")?;
        let from = match from {
            Some(l) => self.slice(l)?,
            None => first,
        };
        let to = match to {
            Some(l) => self.slice(l)?,
            None => last,
        };
        if from.label == to.label {
            bail!("--from and --to both select slice {:?}", from.label);
        }
        Ok((from, to))
    }
}
