// src/geo/mod.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{fs::File, io::BufReader, path::Path};
use tracing::{info, instrument};

use crate::normalize::canonical_name;

/// Property holding the commune name in the boundary file.
pub const NAME_PROPERTY: &str = "nom";

/// One commune outline, keyed by its canonical name.
#[derive(Debug, Clone, PartialEq)]
pub struct CommuneBoundary {
    /// Accent-free uppercase name.
    pub name: String,
    /// GeoJSON geometry object, passed through untouched.
    pub geometry: Value,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Value>,
}

/// Load a GeoJSON FeatureCollection of communes, normalizing each `nom`.
#[instrument(level = "info", skip(path), fields(path = %path.display()))]
pub fn load_boundaries(path: &Path) -> Result<Vec<CommuneBoundary>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let collection: FeatureCollection = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing GeoJSON {}", path.display()))?;
    let boundaries = boundaries_from_collection(collection)
        .with_context(|| format!("reading features of {}", path.display()))?;
    info!(communes = boundaries.len(), "loaded boundaries");
    Ok(boundaries)
}

fn boundaries_from_collection(collection: FeatureCollection) -> Result<Vec<CommuneBoundary>> {
    if collection.kind != "FeatureCollection" {
        bail!("expected a FeatureCollection, found `{}`", collection.kind);
    }

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| {
            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(NAME_PROPERTY))
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("feature #{} has no `{}` property", idx, NAME_PROPERTY))?;
            let geometry = feature
                .geometry
                .filter(|g| !g.is_null())
                .ok_or_else(|| anyhow!("feature #{} ({}) has no geometry", idx, name))?;
            Ok(CommuneBoundary {
                name: canonical_name(name),
                geometry,
            })
        })
        .collect()
}
