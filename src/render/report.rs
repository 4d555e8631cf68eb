// src/render/report.rs
use anyhow::{Context, Result};
use std::{fmt::Write as _, fs, path::Path};
use tracing::{info, instrument};

use super::{choropleth::ChoroplethFigure, escape_text};

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const MAP_DIV_ID: &str = "choropleth";

/// What goes into the report besides the map.
#[derive(Debug, Clone)]
pub struct ReportPage {
    pub heading: String,
    /// `src` of the heatmap image, relative to the report.
    pub heatmap_src: String,
    /// `src` of the bar chart image, relative to the report.
    pub barplot_src: String,
}

impl ReportPage {
    pub fn new(first_year: i32, last_year: i32, heatmap_src: &str, barplot_src: &str) -> Self {
        ReportPage {
            heading: format!(
                "Occurrences de non-conformité de l'eau en Corse ({}-{})",
                first_year, last_year
            ),
            heatmap_src: heatmap_src.to_string(),
            barplot_src: barplot_src.to_string(),
        }
    }
}

/// The figure as an embeddable fragment; Plotly itself comes from the CDN.
pub fn map_fragment(figure: &ChoroplethFigure) -> Result<String> {
    // keep `</script>` inside string values from closing the tag
    let figure_json = figure
        .to_json()
        .context("serializing choropleth figure")?
        .replace("</", "<\\/");

    let mut out = String::new();
    writeln!(out, "<div>")?;
    writeln!(
        out,
        "    <script type=\"text/javascript\">window.PlotlyConfig = {{MathJaxConfig: 'local'}};</script>"
    )?;
    writeln!(out, "    <script charset=\"utf-8\" src=\"{}\"></script>", PLOTLY_CDN)?;
    writeln!(
        out,
        "    <div id=\"{id}\" class=\"plotly-graph-div\" style=\"height:{h}px; width:{w}px;\"></div>",
        id = MAP_DIV_ID,
        h = super::choropleth::HEIGHT_PX,
        w = super::choropleth::WIDTH_PX
    )?;
    writeln!(out, "    <script type=\"text/javascript\">")?;
    writeln!(out, "        window.PLOTLYENV = window.PLOTLYENV || {{}};")?;
    writeln!(out, "        var figure = {};", figure_json)?;
    writeln!(out, "        if (document.getElementById(\"{}\")) {{", MAP_DIV_ID)?;
    writeln!(
        out,
        "            Plotly.newPlot(\"{}\", figure.data, figure.layout, {{\"responsive\": true}});",
        MAP_DIV_ID
    )?;
    writeln!(out, "        }}")?;
    writeln!(out, "    </script>")?;
    writeln!(out, "</div>")?;
    Ok(out)
}

/// Assemble the full HTML page.
pub fn render_report(figure: &ChoroplethFigure, page: &ReportPage) -> Result<String> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>")?;
    writeln!(html, "<head>")?;
    writeln!(html, "    <meta charset=\"UTF-8\">")?;
    writeln!(html, "    <title>Corsica Water Quality</title>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html)?;
    writeln!(html, "<h1>{}</h1>", escape_text(&page.heading))?;
    writeln!(html)?;
    writeln!(html, "<h2>Carte Choroplèthe</h2>")?;
    html.push_str(&map_fragment(figure)?);
    writeln!(html)?;
    writeln!(html, "<h2>Heatmap</h2>")?;
    writeln!(
        html,
        "<img height=\"600\" src=\"{}\" alt=\"Heatmap\">",
        escape_text(&page.heatmap_src)
    )?;
    writeln!(html)?;
    writeln!(html, "<h2>Barplot</h2>")?;
    writeln!(
        html,
        "<img width=\"980\" src=\"{}\" alt=\"Barplot\">",
        escape_text(&page.barplot_src)
    )?;
    writeln!(html)?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

/// Write the report to `path`, replacing any previous one.
#[instrument(level = "info", skip(figure, page, path), fields(path = %path.display()))]
pub fn write_report(figure: &ChoroplethFigure, page: &ReportPage, path: &Path) -> Result<()> {
    let html = render_report(figure, page)?;
    fs::write(path, html.as_bytes()).with_context(|| format!("writing {}", path.display()))?;
    info!(bytes = html.len(), "wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CommuneBoundary;
    use crate::render::choropleth::join_counts;
    use serde_json::json;
    use tempfile::tempdir;

    fn figure() -> ChoroplethFigure {
        let boundaries = vec![CommuneBoundary {
            name: "AJACCIO</script>".to_string(),
            geometry: json!({"type": "Point", "coordinates": [8.7, 41.9]}),
        }];
        ChoroplethFigure::build(&join_counts(&boundaries, &[]), None)
    }

    fn page() -> ReportPage {
        ReportPage::new(2016, 2023, "heatmap.png", "barplot.png")
    }

    #[test]
    fn test_report_structure() -> Result<()> {
        let html = render_report(&figure(), &page())?;
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Corsica Water Quality</title>"));
        assert!(html.contains("(2016-2023)</h1>"));
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("Plotly.newPlot(\"choropleth\""));
        assert!(html.contains("<img height=\"600\" src=\"heatmap.png\""));
        assert!(html.contains("<img width=\"980\" src=\"barplot.png\""));

        let map = html.find("Carte Choroplèthe").unwrap();
        let heat = html.find("<h2>Heatmap</h2>").unwrap();
        let bar = html.find("<h2>Barplot</h2>").unwrap();
        assert!(map < heat && heat < bar);
        Ok(())
    }

    #[test]
    fn test_inline_json_cannot_close_script() -> Result<()> {
        let fragment = map_fragment(&figure())?;
        assert_eq!(fragment.matches("</script>").count(), 3);
        assert!(fragment.contains("AJACCIO<\\/script>"));
        Ok(())
    }

    #[test]
    fn test_write_report_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("index.html");
        fs::write(&path, "stale content that is much longer than nothing")?;
        write_report(&figure(), &page(), &path)?;
        let written = fs::read_to_string(&path)?;
        assert!(!written.contains("stale"));
        assert!(written.trim_end().ends_with("</html>"));
        Ok(())
    }
}
