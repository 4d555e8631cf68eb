// src/pipeline.rs
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

use crate::{
    config::Config,
    geo, load,
    render::{
        barplot::{rank_communes, render_barplot},
        choropleth::{join_counts, ChoroplethFigure},
        heatmap::{render_heatmap, MonthYearGrid},
        report::{write_report, ReportPage},
    },
};

/// Load → aggregate → heatmap + bar chart → choropleth report.
pub fn run(config: &Config) -> Result<()> {
    let start = Instant::now();

    // ─── 1) load & aggregate every year ──────────────────────────────
    let counts = load::load_and_process(
        &config.dataset_dir,
        &config.file_prefix,
        config.years.clone(),
    )?;
    let total: u64 = counts.iter().map(|r| r.count).sum();
    info!(groups = counts.len(), samples = total, "non-conforming samples counted");

    // ─── 2) month × year heatmap ─────────────────────────────────────
    let grid = MonthYearGrid::from_counts(&counts);
    render_heatmap(&grid, &config.heatmap_path).context("rendering heatmap")?;

    // ─── 3) ranked commune bar chart ─────────────────────────────────
    let ranked = rank_communes(&counts);
    render_barplot(&ranked, &config.barplot_path).context("rendering bar chart")?;

    // ─── 4) choropleth + report ──────────────────────────────────────
    let boundaries = geo::load_boundaries(&config.boundaries_path)?;
    let joined = join_counts(&boundaries, &ranked);
    let figure = ChoroplethFigure::build(&joined, config.mapbox_token.as_deref());
    let page = ReportPage::new(
        *config.years.start(),
        *config.years.end(),
        &config.report_relative(&config.heatmap_path),
        &config.report_relative(&config.barplot_path),
    );
    write_report(&figure, &page, &config.report_path)?;

    info!(elapsed = ?start.elapsed(), "all done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_run_end_to_end() -> Result<()> {
        let dir = tempdir()?;
        let dataset = dir.path().join("dataset");
        fs::create_dir_all(&dataset)?;

        let header = "nomcommuneprinc,dateprel,conclusionprel\n";
        fs::write(
            dataset.join("DIS_PLV_2020_2A.txt"),
            format!(
                "{}{}{}{}",
                header,
                "Ajaccio,2020-03-02,Eau d'alimentation non-conforme\n",
                "Ajaccio,2020-03-09,Eau d'alimentation non conforme\n",
                "Lévie,2020-04-01,Eau conforme\n"
            ),
        )?;

        let square = |x: f64| {
            json!({"type": "Polygon", "coordinates": [[[x, 41.9], [x + 0.1, 41.9], [x + 0.1, 42.0], [x, 41.9]]]})
        };
        let geojson = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"nom": "Ajaccio"}, "geometry": square(8.7)},
                {"type": "Feature", "properties": {"nom": "Lévie"}, "geometry": square(9.0)},
            ]
        });
        let boundaries_path = dir.path().join("communes-corse.geojson");
        fs::write(&boundaries_path, serde_json::to_vec(&geojson)?)?;

        let config = Config {
            dataset_dir: dataset,
            years: 2019..=2020,
            boundaries_path,
            heatmap_path: dir.path().join("heatmap.png"),
            barplot_path: dir.path().join("barplot.png"),
            report_path: dir.path().join("index.html"),
            ..Config::default()
        };
        run(&config)?;

        assert!(config.heatmap_path.is_file());
        assert!(config.barplot_path.is_file());
        let html = fs::read_to_string(&config.report_path)?;
        assert!(html.contains("src=\"heatmap.png\""));
        assert!(html.contains("(2019-2020)"));
        assert!(html.contains("\"z\":[2,0]"));
        Ok(())
    }
}
