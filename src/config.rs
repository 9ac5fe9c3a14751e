//! Pipeline configuration
//!
//! Built once at startup from the command line and passed read-only into the
//! pipeline.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const RAW_ORDERS_FILE: &str = "E-Commerce Order Fulfillment Dataset (50K Records).csv";
pub const PROCESSED_FILE: &str = "cleaned_merged_data.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub project_root: PathBuf,
    pub raw_orders_path: PathBuf,
    pub processed_path: PathBuf,
    pub visuals_dir: PathBuf,
    /// Optional JSON export of the computed KPIs
    pub kpi_json_path: Option<PathBuf>,
    pub render_charts: bool,
    pub chart: ChartStyle,
}

/// Look of the rendered charts
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub caption_size: u32,
    pub label_size: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            font_family: "sans-serif".to_string(),
            caption_size: 28,
            label_size: 16,
        }
    }
}

impl PipelineConfig {
    /// Default layout under a project root:
    /// `data/raw/`, `data/processed/` and `visuals/`
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let project_root = root.into();
        Self {
            raw_orders_path: project_root.join("data").join("raw").join(RAW_ORDERS_FILE),
            processed_path: project_root.join("data").join("processed").join(PROCESSED_FILE),
            visuals_dir: project_root.join("visuals"),
            kpi_json_path: None,
            render_charts: true,
            chart: ChartStyle::default(),
            project_root,
        }
    }

    /// Resolve a user-supplied path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Create the processed-data and visuals directories if they are missing
    pub fn ensure_output_dirs(&self) -> Result<()> {
        let mut dirs: Vec<&Path> = Vec::new();
        if let Some(parent) = self.processed_path.parent() {
            dirs.push(parent);
        }
        if let Some(parent) = self.kpi_json_path.as_deref().and_then(Path::parent) {
            dirs.push(parent);
        }
        if self.render_charts {
            dirs.push(&self.visuals_dir);
        }

        for dir in dirs {
            if dir.as_os_str().is_empty() {
                continue;
            }
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::from_root("/srv/orders");
        assert_eq!(
            config.raw_orders_path,
            PathBuf::from("/srv/orders/data/raw").join(RAW_ORDERS_FILE)
        );
        assert_eq!(
            config.processed_path,
            PathBuf::from("/srv/orders/data/processed/cleaned_merged_data.csv")
        );
        assert_eq!(config.visuals_dir, PathBuf::from("/srv/orders/visuals"));
        assert!(config.render_charts);
    }

    #[test]
    fn test_resolve_relative_paths() {
        let config = PipelineConfig::from_root("/srv/orders");
        assert_eq!(config.resolve(Path::new("in.csv")), PathBuf::from("/srv/orders/in.csv"));
        assert_eq!(config.resolve(Path::new("/tmp/in.csv")), PathBuf::from("/tmp/in.csv"));
    }

    #[test]
    fn test_ensure_output_dirs_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_root(tmp.path());

        config.ensure_output_dirs().unwrap();
        config.ensure_output_dirs().unwrap();

        assert!(tmp.path().join("data/processed").is_dir());
        assert!(tmp.path().join("visuals").is_dir());
    }
}
