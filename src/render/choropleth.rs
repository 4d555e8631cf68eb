// src/render/choropleth.rs
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use super::barplot::CommuneTotal;
use super::palette::{self, Rgb};
use crate::geo::CommuneBoundary;

pub const FIRST_TITLE: &str =
    "Occurrences de non-conformité de l'eau potable distribuée en Corse depuis 2016.";
pub const TITLE: &str = "Occurrences de non-conformité de l'eau en Corse";
pub const COLORBAR_TITLE: &str = "Occurrences";
pub const HOVER_TEMPLATE: &str = "Commune: %{hovertext}<br>Occurrences: %{z}";

/// Quantile of the joined counts used as the top of the colour scale.
pub const CAP_QUANTILE: f64 = 0.95;
pub const CENTER_LAT: f64 = 42.039604;
pub const CENTER_LON: f64 = 9.012893;
pub const ZOOM: f64 = 7.8;
pub const WIDTH_PX: u32 = 1280;
pub const HEIGHT_PX: u32 = 1080;
pub const OPACITY: f64 = 0.5;

/// A commune boundary with its occurrence count (0 when no sample matched).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCommune {
    pub name: String,
    /// Name of the matching sample commune, if any.
    pub matched: Option<String>,
    pub count: u64,
    pub geometry: Value,
}

/// Left join: every boundary is kept, in input order; unmatched ones get 0.
pub fn join_counts(boundaries: &[CommuneBoundary], ranked: &[CommuneTotal]) -> Vec<JoinedCommune> {
    let by_name: HashMap<&str, &CommuneTotal> =
        ranked.iter().map(|c| (c.commune.as_str(), c)).collect();

    let joined: Vec<JoinedCommune> = boundaries
        .iter()
        .map(|b| {
            let hit = by_name.get(b.name.as_str());
            JoinedCommune {
                name: b.name.clone(),
                matched: hit.map(|c| c.commune.clone()),
                count: hit.map_or(0, |c| c.count),
                geometry: b.geometry.clone(),
            }
        })
        .collect();

    let matched = joined.iter().filter(|j| j.matched.is_some()).count();
    info!(
        boundaries = joined.len(),
        matched,
        unmatched_samples = ranked.len().saturating_sub(matched),
        "joined counts to boundaries"
    );
    joined
}

/// Quantile with linear interpolation between closest ranks. 0 for no values.
pub fn quantile(values: &[u64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

/// Continuous five-stop scale from 0 to `cap`. Plotly clamps values past the cap
/// to the top colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub cap: f64,
}

impl ColorScale {
    pub const STOPS: [(f64, Rgb); 5] = [
        (0.0, palette::WHITE),
        (0.25, palette::LIGHT_BLUE),
        (0.5, palette::VIOLET),
        (0.75, palette::INDIGO),
        (1.0, palette::RED),
    ];

    /// A zero cap (most communes clean) is widened to 1 so the axis stays valid.
    pub fn new(cap: f64) -> Self {
        let cap = if cap.is_finite() && cap > 0.0 { cap } else { 1.0 };
        ColorScale { cap }
    }

    pub fn from_counts(joined: &[JoinedCommune]) -> Self {
        let counts: Vec<u64> = joined.iter().map(|j| j.count).collect();
        let cap = quantile(&counts, CAP_QUANTILE);
        debug!(cap, "colour scale cap");
        ColorScale::new(cap)
    }

    /// Plotly `colorscale` array, stop colours as hex.
    pub fn plotly_stops(&self) -> Value {
        Value::Array(
            Self::STOPS
                .iter()
                .map(|(pos, color)| json!([pos, color.hex()]))
                .collect(),
        )
    }
}

/// Base map tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MapStyle {
    #[serde(rename = "carto-positron")]
    CartoPositron,
    #[serde(rename = "open-street-map")]
    OpenStreetMap,
}

#[derive(Debug, Clone, Serialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Serialize)]
struct MapboxLayout {
    style: MapStyle,
    center: LatLon,
    zoom: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    accesstoken: Option<String>,
}

/// Map layout. Setters overwrite, so the last call wins.
#[derive(Debug, Clone, Serialize)]
pub struct MapLayout {
    title: Value,
    width: u32,
    height: u32,
    mapbox: MapboxLayout,
    coloraxis: Value,
    margin: Value,
}

impl MapLayout {
    pub fn new(scale: &ColorScale, token: Option<&str>) -> Self {
        MapLayout {
            title: json!({ "text": FIRST_TITLE }),
            width: WIDTH_PX,
            height: HEIGHT_PX,
            mapbox: MapboxLayout {
                style: MapStyle::CartoPositron,
                center: LatLon {
                    lat: CENTER_LAT,
                    lon: CENTER_LON,
                },
                zoom: ZOOM,
                accesstoken: token.map(str::to_string),
            },
            coloraxis: json!({
                "cmin": 0.0,
                "cmax": scale.cap,
                "colorscale": scale.plotly_stops(),
                "colorbar": { "title": { "text": COLORBAR_TITLE } }
            }),
            margin: json!({ "t": 60, "l": 0, "r": 0, "b": 0 }),
        }
    }

    pub fn with_style(mut self, style: MapStyle) -> Self {
        self.mapbox.style = style;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = json!({ "text": title });
        self
    }

    /// Colour bar anchored on its left edge, title along its right side.
    pub fn with_colorbar_title_right(mut self) -> Self {
        if let Some(bar) = self.coloraxis.get_mut("colorbar") {
            bar["xanchor"] = json!("left");
            bar["title"]["side"] = json!("right");
        }
        self
    }

    pub fn style(&self) -> MapStyle {
        self.mapbox.style
    }
}

/// Plotly figure (`data` + `layout`) for the commune choropleth.
#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethFigure {
    pub data: Vec<Value>,
    pub layout: MapLayout,
}

impl ChoroplethFigure {
    pub fn build(joined: &[JoinedCommune], token: Option<&str>) -> Self {
        let scale = ColorScale::from_counts(joined);

        let features: Vec<Value> = joined
            .iter()
            .enumerate()
            .map(|(idx, j)| {
                json!({
                    "type": "Feature",
                    "id": idx,
                    "properties": {},
                    "geometry": j.geometry,
                })
            })
            .collect();

        let trace = json!({
            "type": "choroplethmapbox",
            "geojson": { "type": "FeatureCollection", "features": features },
            "locations": (0..joined.len()).collect::<Vec<_>>(),
            "z": joined.iter().map(|j| j.count).collect::<Vec<_>>(),
            "hovertext": joined.iter().map(|j| j.name.as_str()).collect::<Vec<_>>(),
            "hovertemplate": HOVER_TEMPLATE,
            "coloraxis": "coloraxis",
            "marker": { "opacity": OPACITY },
            "name": "",
        });

        let layout = MapLayout::new(&scale, token)
            .with_style(MapStyle::OpenStreetMap)
            .with_colorbar_title_right()
            .with_title(TITLE);

        ChoroplethFigure {
            data: vec![trace],
            layout,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary(name: &str) -> CommuneBoundary {
        CommuneBoundary {
            name: name.to_string(),
            geometry: json!({"type": "Point", "coordinates": [9.0, 42.0]}),
        }
    }

    fn total(commune: &str, count: u64) -> CommuneTotal {
        CommuneTotal {
            commune: commune.to_string(),
            count,
        }
    }

    #[test]
    fn test_left_join_keeps_every_boundary() {
        let boundaries = vec![boundary("AJACCIO"), boundary("LEVIE"), boundary("BASTIA")];
        let ranked = vec![total("BASTIA", 9), total("AJACCIO", 3), total("NOWHERE", 2)];

        let joined = join_counts(&boundaries, &ranked);
        let got: Vec<(&str, u64, bool)> = joined
            .iter()
            .map(|j| (j.name.as_str(), j.count, j.matched.is_some()))
            .collect();
        assert_eq!(
            got,
            vec![("AJACCIO", 3, true), ("LEVIE", 0, false), ("BASTIA", 9, true)]
        );
    }

    #[test]
    fn test_quantile_linear() {
        assert_eq!(quantile(&[], 0.95), 0.0);
        assert_eq!(quantile(&[7], 0.95), 7.0);
        // pos = 0.95 * 4 = 3.8 → 4 + 0.8 * (100 - 4)
        let q = quantile(&[0, 1, 2, 4, 100], 0.95);
        assert!((q - 80.8).abs() < 1e-9);
        let values: Vec<u64> = (0..=100).collect();
        assert!((quantile(&values, 0.95) - 95.0).abs() < 1e-9);
    }

    fn emitted_coloraxis(joined: &[JoinedCommune]) -> anyhow::Result<Value> {
        let fig = ChoroplethFigure::build(joined, None);
        let v: Value = serde_json::from_str(&fig.to_json()?)?;
        Ok(v["layout"]["coloraxis"].clone())
    }

    #[test]
    fn test_colour_cap() -> anyhow::Result<()> {
        let boundaries: Vec<CommuneBoundary> =
            ["A", "B", "C", "D", "E"].iter().map(|n| boundary(n)).collect();
        let ranked = vec![
            total("A", 0),
            total("B", 1),
            total("C", 2),
            total("D", 4),
            total("E", 100),
        ];
        let joined = join_counts(&boundaries, &ranked);
        let axis = emitted_coloraxis(&joined)?;

        let counts: Vec<u64> = joined.iter().map(|j| j.count).collect();
        let cap = quantile(&counts, CAP_QUANTILE);
        assert!((cap - 80.8).abs() < 1e-9);
        assert_eq!(axis["cmin"], 0.0);
        assert!((axis["cmax"].as_f64().unwrap() - cap).abs() < 1e-9);
        assert_eq!(
            axis["colorscale"],
            json!([
                [0.0, palette::WHITE.hex()],
                [0.25, palette::LIGHT_BLUE.hex()],
                [0.5, palette::VIOLET.hex()],
                [0.75, palette::INDIGO.hex()],
                [1.0, palette::RED.hex()],
            ])
        );
        Ok(())
    }

    #[test]
    fn test_zero_cap_is_widened() -> anyhow::Result<()> {
        assert_eq!(ColorScale::new(0.0).cap, 1.0);
        let joined = join_counts(&[boundary("A"), boundary("B")], &[]);
        let axis = emitted_coloraxis(&joined)?;
        assert_eq!(axis["cmin"], 0.0);
        assert_eq!(axis["cmax"], 1.0);
        Ok(())
    }

    #[test]
    fn test_figure_json() -> anyhow::Result<()> {
        let boundaries = vec![boundary("AJACCIO"), boundary("LEVIE")];
        let joined = join_counts(&boundaries, &[total("AJACCIO", 4)]);
        let fig = ChoroplethFigure::build(&joined, None);
        let v: Value = serde_json::from_str(&fig.to_json()?)?;

        let trace = &v["data"][0];
        assert_eq!(trace["type"], "choroplethmapbox");
        assert_eq!(trace["z"], json!([4, 0]));
        assert_eq!(trace["locations"], json!([0, 1]));
        assert_eq!(trace["hovertext"], json!(["AJACCIO", "LEVIE"]));
        assert_eq!(trace["hovertemplate"], HOVER_TEMPLATE);
        assert!(trace.get("customdata").is_none());
        assert_eq!(trace["marker"]["opacity"], 0.5);
        assert_eq!(trace["geojson"]["features"][1]["id"], 1);

        let layout = &v["layout"];
        assert_eq!(layout["mapbox"]["style"], "open-street-map");
        assert_eq!(layout["mapbox"]["zoom"], 7.8);
        assert_eq!(layout["mapbox"]["center"]["lat"], 42.039604);
        assert!(layout["mapbox"].get("accesstoken").is_none());
        assert_eq!(layout["title"]["text"], TITLE);
        assert_eq!(layout["width"], 1280);
        assert_eq!(layout["height"], 1080);
        assert_eq!(layout["coloraxis"]["cmin"], 0.0);
        // 0.95 quantile of [0, 4] = 3.8
        assert!((layout["coloraxis"]["cmax"].as_f64().unwrap() - 3.8).abs() < 1e-9);
        assert_eq!(layout["coloraxis"]["colorscale"][2], json!([0.5, palette::VIOLET.hex()]));
        assert_eq!(layout["coloraxis"]["colorbar"]["xanchor"], "left");
        assert_eq!(layout["coloraxis"]["colorbar"]["title"]["side"], "right");
        Ok(())
    }

    #[test]
    fn test_last_style_wins_and_token_is_passed() {
        let scale = ColorScale::new(5.0);
        let layout = MapLayout::new(&scale, Some("pk.test"))
            .with_style(MapStyle::OpenStreetMap)
            .with_style(MapStyle::CartoPositron);
        assert_eq!(layout.style(), MapStyle::CartoPositron);

        let fig = ChoroplethFigure::build(&[], Some("pk.test"));
        assert_eq!(fig.layout.style(), MapStyle::OpenStreetMap);
        let v = serde_json::to_value(&fig).unwrap();
        assert_eq!(v["layout"]["mapbox"]["accesstoken"], "pk.test");
    }
}
