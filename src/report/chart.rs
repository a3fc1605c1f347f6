//! Record counts grouped by a column, drawn as a bar or pie chart.

use super::pdf::{PdfDocument, Rgb};
use crate::features::FeatureTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SKY_BLUE: Rgb = Rgb(135, 206, 235);
const AXIS: Rgb = Rgb(0, 0, 0);
// Qualitative "Paired" palette
const PAIRED: [Rgb; 12] = [
    Rgb(166, 206, 227),
    Rgb(31, 120, 180),
    Rgb(178, 223, 138),
    Rgb(51, 160, 44),
    Rgb(251, 154, 153),
    Rgb(227, 26, 28),
    Rgb(253, 191, 111),
    Rgb(255, 127, 0),
    Rgb(202, 178, 214),
    Rgb(106, 61, 154),
    Rgb(255, 255, 153),
    Rgb(177, 89, 40),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
}

impl ChartKind {
    /// `"pie"` selects a pie chart; anything else falls back to bars.
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("pie") {
            ChartKind::Pie
        } else {
            ChartKind::Bar
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar",
            ChartKind::Pie => "Pie",
        }
    }
}

/// Number of rows per distinct value of one column, sorted by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCounts {
    pub field: String,
    pub groups: Vec<(String, usize)>,
}

impl GroupCounts {
    pub fn total(&self) -> usize {
        self.groups.iter().map(|(_, n)| n).sum()
    }

    pub fn max(&self) -> usize {
        self.groups.iter().map(|(_, n)| *n).max().unwrap_or(0)
    }
}

/// `None` when the table has no such column.
pub fn group_counts(table: &FeatureTable, field: &str) -> Option<GroupCounts> {
    let values = table.column(field)?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    Some(GroupCounts {
        field: field.to_string(),
        groups: counts.into_iter().collect(),
    })
}

pub fn chart_title(field: &str, kind: ChartKind) -> String {
    format!("Threat Logs Grouped by {field} ({} Chart)", kind.label())
}

/// Tick step giving at most ~6 ticks for a whole-number axis
fn tick_step(max: usize) -> usize {
    let mut step = 1;
    while max / step > 6 {
        step = match step.to_string().chars().next() {
            Some('1') => step * 2,
            Some('2') => step * 5 / 2,
            _ => step * 2,
        };
    }
    step
}

/// Draw the chart inside the box at (x, y) of size w × h (millimetres).
pub fn draw_chart(pdf: &mut PdfDocument, counts: &GroupCounts, kind: ChartKind, x: f32, y: f32, w: f32, h: f32) {
    pdf.set_font(true, 11.0);
    let title = chart_title(&counts.field, kind);
    let tw = pdf.text_width(&title);
    pdf.set_draw_color(AXIS);
    pdf.text_at(x + (w - tw) / 2.0, y + 6.0, &title);
    pdf.set_font(false, 8.0);
    match kind {
        ChartKind::Bar => draw_bars(pdf, counts, x, y + 10.0, w, h - 10.0),
        ChartKind::Pie => draw_pie(pdf, counts, x, y + 10.0, w, h - 10.0),
    }
}

fn draw_bars(pdf: &mut PdfDocument, counts: &GroupCounts, x: f32, y: f32, w: f32, h: f32) {
    // Leave room for the value axis on the left and rotated labels below.
    let left = x + 14.0;
    let plot_w = w - 18.0;
    let plot_h = h - 32.0;
    let bottom = y + plot_h;
    let max = counts.max().max(1);
    let step = tick_step(max);
    let top_value = max.div_ceil(step) * step;

    pdf.set_fill_color(AXIS);
    let mut tick = 0;
    while tick <= top_value {
        let ty = bottom - plot_h * tick as f32 / top_value as f32;
        pdf.line(left - 1.5, ty, left, ty);
        let label = tick.to_string();
        let lw = pdf.text_width(&label);
        pdf.text_at(left - 2.5 - lw, ty + 1.0, &label);
        tick += step;
    }
    pdf.text_rotated(x + 3.0, y + plot_h / 2.0 + 5.0, 90.0, "Count");

    let n = counts.groups.len().max(1) as f32;
    let slot = plot_w / n;
    let bar_w = slot * 0.8;
    for (i, (label, count)) in counts.groups.iter().enumerate() {
        let bx = left + slot * i as f32 + (slot - bar_w) / 2.0;
        let bh = plot_h * *count as f32 / top_value as f32;
        pdf.set_fill_color(SKY_BLUE);
        pdf.rect(bx, bottom - bh, bar_w, bh, true);
        pdf.set_fill_color(AXIS);
        // Labels rotated 45°, right end aligned under the bar centre.
        let lw = pdf.text_width(label);
        let d = lw * std::f32::consts::FRAC_1_SQRT_2;
        pdf.text_rotated(bx + bar_w / 2.0 - d, bottom + 3.0 + d, 45.0, label);
    }
    pdf.line(left, y, left, bottom);
    pdf.line(left, bottom, left + plot_w, bottom);

    let fw = pdf.text_width(&counts.field);
    pdf.text_at(left + (plot_w - fw) / 2.0, y + h - 2.0, &counts.field);
}

fn draw_pie(pdf: &mut PdfDocument, counts: &GroupCounts, x: f32, y: f32, w: f32, h: f32) {
    let total = counts.total();
    if total == 0 {
        return;
    }
    let r = (w.min(h) / 2.0 - 12.0).max(5.0);
    let (cx, cy) = (x + w / 2.0, y + h / 2.0);
    let mut angle = 90.0f32;
    for (i, (label, count)) in counts.groups.iter().enumerate() {
        let frac = *count as f32 / total as f32;
        let sweep = 360.0 * frac;
        pdf.set_fill_color(PAIRED[i % PAIRED.len()]);
        pdf.wedge(cx, cy, r, angle, angle + sweep);

        // Page y grows downwards, so the sine term is subtracted.
        let mid = (angle + sweep / 2.0).to_radians();
        let (s, c) = mid.sin_cos();
        pdf.set_fill_color(AXIS);
        let pct = format!("{:.1}%", frac * 100.0);
        let pw = pdf.text_width(&pct);
        pdf.text_at(cx + 0.6 * r * c - pw / 2.0, cy - 0.6 * r * s + 1.0, &pct);
        let lw = pdf.text_width(label);
        let lx = cx + 1.1 * r * c;
        let lx = if c < 0.0 { lx - lw } else { lx };
        pdf.text_at(lx, cy - 1.1 * r * s + 1.0, label);
        angle += sweep;
    }
}
