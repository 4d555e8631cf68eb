// src/render/heatmap.rs
use anyhow::Result;
use std::{collections::BTreeMap, path::Path};
use tracing::instrument;

use super::{
    approx_text_width,
    palette::{self, coolwarm},
    Anchor, SvgDoc, TextStyle, PT_PER_INCH,
};
use crate::transform::CountRecord;

/// French month abbreviations, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Août", "Sep", "Oct", "Nov", "Déc",
];

pub const TITLE: &str = "Eau d'alimentation non-conforme aux limites de qualité.";
pub const X_LABEL: &str = "Année";
pub const Y_LABEL: &str = "Mois";
pub const COLORBAR_LABEL: &str = "Nombre d'occurrences";

const FIG_WIDTH_IN: f32 = 12.0;
const FIG_HEIGHT_IN: f32 = 8.0;

/// Monthly totals pivoted into 12 month rows by one column per year.
/// A cell with no data is `None`, not zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthYearGrid {
    /// Column labels, ascending.
    pub years: Vec<i32>,
    /// `cells[month - 1][year_index]`
    cells: Vec<Vec<Option<u64>>>,
}

impl MonthYearGrid {
    /// Sum counts over communes per (year, month) and pivot.
    pub fn from_counts(records: &[CountRecord]) -> Self {
        let mut sums: BTreeMap<(i32, u32), u64> = BTreeMap::new();
        for r in records {
            *sums.entry((r.year, r.month)).or_insert(0) += r.count;
        }

        let mut years: Vec<i32> = sums.keys().map(|(y, _)| *y).collect();
        years.dedup();

        let mut cells = vec![vec![None; years.len()]; 12];
        for ((year, month), total) in sums {
            if !(1..=12).contains(&month) {
                continue;
            }
            if let Ok(col) = years.binary_search(&year) {
                cells[month as usize - 1][col] = Some(total);
            }
        }

        MonthYearGrid { years, cells }
    }

    pub fn get(&self, month: u32, year: i32) -> Option<u64> {
        let col = self.years.binary_search(&year).ok()?;
        let row = self.cells.get(month.checked_sub(1)? as usize)?;
        row.get(col).copied().flatten()
    }

    /// Smallest and largest filled cell, if any.
    pub fn value_range(&self) -> Option<(u64, u64)> {
        let mut filled = self.cells.iter().flatten().filter_map(|c| *c);
        let first = filled.next()?;
        Some(filled.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Draw the month × year grid as an annotated heatmap PNG.
#[instrument(level = "info", skip(grid, path), fields(path = %path.display(), years = grid.years.len()))]
pub fn render_heatmap(grid: &MonthYearGrid, path: &Path) -> Result<()> {
    heatmap_svg(grid).write_png(path)
}

fn heatmap_svg(grid: &MonthYearGrid) -> SvgDoc {
    let width = FIG_WIDTH_IN * PT_PER_INCH;
    let height = FIG_HEIGHT_IN * PT_PER_INCH;
    let mut doc = SvgDoc::new(width, height);

    let left = 72.0;
    let top = 44.0;
    let right = 118.0;
    let bottom = 74.0;
    let grid_w = width - left - right;
    let grid_h = height - top - bottom;
    let cell_h = grid_h / 12.0;
    let n_years = grid.years.len();
    let cell_w = if n_years > 0 { grid_w / n_years as f32 } else { grid_w };

    doc.text(
        left + grid_w / 2.0,
        24.0,
        TextStyle::new(14.0).anchor(Anchor::Middle),
        TITLE,
    );

    let range = grid.value_range();
    let scale = |v: u64| -> f64 {
        match range {
            Some((lo, hi)) if hi > lo => (v - lo) as f64 / (hi - lo) as f64,
            _ => 0.5,
        }
    };

    for (m, label) in MONTH_LABELS.iter().enumerate() {
        let y = top + m as f32 * cell_h;
        doc.text(
            left - 8.0,
            y + cell_h / 2.0,
            TextStyle::new(10.0).anchor(Anchor::End).centered(),
            label,
        );
        for (col, year) in grid.years.iter().enumerate() {
            let Some(v) = grid.get(m as u32 + 1, *year) else {
                continue;
            };
            let x = left + col as f32 * cell_w;
            let fill = coolwarm(scale(v));
            // 0.5pt white separators between cells
            doc.rect(x + 0.25, y + 0.25, cell_w - 0.5, cell_h - 0.5, fill);
            doc.text(
                x + cell_w / 2.0,
                y + cell_h / 2.0,
                TextStyle::new(12.0)
                    .anchor(Anchor::Middle)
                    .centered()
                    .color(fill.contrasting_text()),
                &v.to_string(),
            );
        }
    }

    for (col, year) in grid.years.iter().enumerate() {
        let x = left + (col as f32 + 0.5) * cell_w;
        doc.text(
            x,
            top + grid_h + 10.0,
            TextStyle::new(10.0).anchor(Anchor::End).rotate(45.0),
            &year.to_string(),
        );
    }

    doc.text(
        left + grid_w / 2.0,
        height - 10.0,
        TextStyle::new(11.0).anchor(Anchor::Middle),
        X_LABEL,
    );
    doc.text(
        18.0,
        top + grid_h / 2.0,
        TextStyle::new(11.0).anchor(Anchor::Middle).rotate(90.0),
        Y_LABEL,
    );

    if let Some((lo, hi)) = range {
        draw_colorbar(&mut doc, left + grid_w + 24.0, top, grid_h, lo, hi);
    }

    doc
}

fn draw_colorbar(doc: &mut SvgDoc, x: f32, top: f32, height: f32, lo: u64, hi: u64) {
    const BAR_WIDTH: f32 = 16.0;
    const SLICES: usize = 64;

    let slice_h = height / SLICES as f32;
    for i in 0..SLICES {
        // top slice is the maximum
        let t = 1.0 - (i as f64 + 0.5) / SLICES as f64;
        doc.rect(x, top + i as f32 * slice_h, BAR_WIDTH, slice_h + 0.3, coolwarm(t));
    }
    doc.outline(x, top, BAR_WIDTH, height, palette::BLACK, 0.5);

    let mut widest: f32 = 0.0;
    let steps = if hi > lo { 4 } else { 0 };
    for i in 0..=steps {
        let frac = if steps == 0 { 0.5 } else { i as f32 / steps as f32 };
        let value = lo as f64 + (hi - lo) as f64 * frac as f64;
        let label = format!("{:.0}", value);
        let y = top + height * (1.0 - frac);
        doc.line(x + BAR_WIDTH, y, x + BAR_WIDTH + 3.0, y, palette::BLACK, 0.5);
        doc.text(
            x + BAR_WIDTH + 5.0,
            y,
            TextStyle::new(9.0).centered(),
            &label,
        );
        widest = widest.max(approx_text_width(&label, 9.0));
    }

    doc.text(
        x + BAR_WIDTH + widest + 18.0,
        top + height / 2.0,
        TextStyle::new(11.0).anchor(Anchor::Middle).rotate(90.0),
        COLORBAR_LABEL,
    );
}
