// src/render/barplot.rs
use anyhow::Result;
use std::{collections::BTreeMap, path::Path};
use tracing::{debug, instrument};

use super::{
    approx_text_width, nice_ticks,
    palette::{self, rainbow_descending},
    Anchor, SvgDoc, TextStyle, PT_PER_INCH,
};
use crate::transform::CountRecord;

pub const TITLE: &str =
    "Eau d'alimentation non-conforme aux limites de qualité par commune depuis 2016.";
pub const X_LABEL: &str = "Nombre d'échantillons d'eau non-conforme aux limites de qualité";
pub const Y_LABEL: &str = "Nom de la commune";

const FIG_WIDTH_IN: f32 = 8.0;
const FIG_HEIGHT_IN: f32 = 45.0;
const LABEL_PT: f32 = 7.0;
/// Smallest row pitch that keeps 7pt labels from overlapping.
const MIN_ROW_PT: f32 = 10.5;

/// Total non-conforming samples of one commune over the whole period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommuneTotal {
    pub commune: String,
    pub count: u64,
}

/// Sum counts per commune and rank them, largest first.
/// Communes are grouped in name order and the sort is stable, so ties stay alphabetical.
pub fn rank_communes(records: &[CountRecord]) -> Vec<CommuneTotal> {
    let mut sums: BTreeMap<&str, u64> = BTreeMap::new();
    for r in records {
        *sums.entry(r.commune.as_str()).or_insert(0) += r.count;
    }

    let mut ranked: Vec<CommuneTotal> = sums
        .into_iter()
        .map(|(commune, count)| CommuneTotal {
            commune: commune.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// Draw one horizontal bar per commune, highest count on top.
#[instrument(level = "info", skip(ranked, path), fields(path = %path.display(), communes = ranked.len()))]
pub fn render_barplot(ranked: &[CommuneTotal], path: &Path) -> Result<()> {
    barplot_svg(ranked).write_png(path)
}

fn barplot_svg(ranked: &[CommuneTotal]) -> SvgDoc {
    let n = ranked.len();
    let top = 36.0;
    let bottom = 72.0;

    let label_w = ranked
        .iter()
        .map(|c| approx_text_width(&c.commune, LABEL_PT))
        .fold(0.0, f32::max);
    let left = 24.0 + label_w + 8.0;
    let right = 28.0;

    let width = (FIG_WIDTH_IN * PT_PER_INCH).max(left + right + 200.0);
    let height = (FIG_HEIGHT_IN * PT_PER_INCH).max(top + bottom + n as f32 * MIN_ROW_PT);
    debug!(width, height, "barplot figure size (pt)");

    let plot_w = width - left - right;
    let plot_h = height - top - bottom;
    let mut doc = SvgDoc::new(width, height);

    doc.text(
        width / 2.0,
        22.0,
        TextStyle::new(9.0).anchor(Anchor::Middle),
        TITLE,
    );

    let max_count = ranked.iter().map(|c| c.count).max().unwrap_or(0);
    // headroom for the count annotations
    let ticks = nice_ticks(max_count as f64 * 1.08, 6);
    let x_max = ticks.last().copied().unwrap_or(1.0).max(1.0) as f32;
    let x_of = |v: f64| left + plot_w * (v as f32 / x_max);

    let row_h = if n > 0 { plot_h / n as f32 } else { plot_h };
    let colors = rainbow_descending(n);

    for (i, (c, color)) in ranked.iter().zip(colors).enumerate() {
        let y_mid = top + (i as f32 + 0.5) * row_h;
        let bar_h = row_h * 0.8;
        let bar_end = x_of(c.count as f64);
        doc.rect(left, y_mid - bar_h / 2.0, bar_end - left, bar_h, color);
        doc.text(
            left - 4.0,
            y_mid,
            TextStyle::new(LABEL_PT).anchor(Anchor::End).centered(),
            &c.commune,
        );
        doc.text(
            bar_end + 3.0,
            y_mid,
            TextStyle::new(LABEL_PT).centered(),
            &c.count.to_string(),
        );
    }

    doc.outline(left, top, plot_w, plot_h, palette::BLACK, 0.6);
    for tick in &ticks {
        let x = x_of(*tick);
        doc.line(x, top + plot_h, x, top + plot_h + 3.0, palette::BLACK, 0.6);
        doc.text(
            x,
            top + plot_h + 12.0,
            TextStyle::new(8.0).anchor(Anchor::End).rotate(45.0),
            &format!("{:.0}", tick),
        );
    }

    doc.text(
        left + plot_w / 2.0,
        height - 12.0,
        TextStyle::new(9.0).anchor(Anchor::Middle),
        X_LABEL,
    );
    doc.text(
        12.0,
        top + plot_h / 2.0,
        TextStyle::new(9.0).anchor(Anchor::Middle).rotate(90.0),
        Y_LABEL,
    );

    doc
}
