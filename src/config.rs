// src/config.rs
use std::{ops::RangeInclusive, path::PathBuf};
use tracing::{debug, warn};

/// Environment variable holding the optional map-tile access token.
pub const MAPBOX_TOKEN_VAR: &str = "MAPBOX_TOKEN";

/// Every fixed input/output location and constant of a run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the `DIS_PLV_<year>_*.txt` sample files.
    pub dataset_dir: PathBuf,
    /// File name prefix of the per-year sample files.
    pub file_prefix: String,
    pub years: RangeInclusive<i32>,
    /// GeoJSON FeatureCollection with one feature per commune.
    pub boundaries_path: PathBuf,
    pub heatmap_path: PathBuf,
    pub barplot_path: PathBuf,
    pub report_path: PathBuf,
    /// Token for a Mapbox-hosted base layer. Unused by the open base layer.
    pub mapbox_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset_dir: PathBuf::from("dataset"),
            file_prefix: "DIS_PLV".to_string(),
            years: 2016..=2023,
            boundaries_path: PathBuf::from("communes-corse.geojson"),
            heatmap_path: PathBuf::from("heatmap.png"),
            barplot_path: PathBuf::from("barplot.png"),
            report_path: PathBuf::from("index.html"),
            mapbox_token: None,
        }
    }
}

impl Config {
    /// Fixed defaults, plus the Mapbox token from the process environment.
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => debug!("no .env file"),
            Err(e) => warn!("ignoring unreadable .env: {}", e),
        }

        let mapbox_token = std::env::var(MAPBOX_TOKEN_VAR)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Config {
            mapbox_token,
            ..Config::default()
        }
    }

    /// Image path as referenced from the HTML report (relative to it when possible).
    pub fn report_relative(&self, target: &std::path::Path) -> String {
        let base = self.report_path.parent().unwrap_or(std::path::Path::new(""));
        target
            .strip_prefix(base)
            .unwrap_or(target)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.years, 2016..=2023);
        assert_eq!(cfg.dataset_dir, Path::new("dataset"));
        assert!(cfg.mapbox_token.is_none());
    }

    #[test]
    fn test_report_relative() {
        let cfg = Config {
            report_path: PathBuf::from("/tmp/out/index.html"),
            ..Config::default()
        };
        assert_eq!(
            cfg.report_relative(Path::new("/tmp/out/heatmap.png")),
            "heatmap.png"
        );
        assert_eq!(
            Config::default().report_relative(Path::new("barplot.png")),
            "barplot.png"
        );
    }
}
