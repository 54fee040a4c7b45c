// src/visualisation.rs

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

use crate::condition::{Condition, MarkerLine};
use crate::config::PlotConfig;
use crate::error::{CompareError, Result};
use crate::field_series::FieldSeries;

/// One stacked subplot: a condition and its (already windowed) data.
#[derive(Clone, Copy)]
pub struct Panel<'a> {
    pub condition: Condition,
    pub series: &'a FieldSeries,
    pub marker: Option<MarkerLine>,
}

/// Pixel size, axis limits and probe column shared by all panels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub y_min: f64,
    pub y_max: f64,
    pub probe: usize,
}

impl From<&PlotConfig> for FrameLayout {
    fn from(p: &PlotConfig) -> Self {
        Self {
            width: p.width,
            height: p.height,
            y_min: p.y_min,
            y_max: p.y_max,
            probe: p.probe,
        }
    }
}

impl FrameLayout {
    /// Size of one RGB24 frame buffer.
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Split a row into drawable polylines.
///
/// Non-finite samples break the line; finite samples are clamped into
/// `[y_min, y_max]` so nothing is drawn outside the panel.
pub fn finite_segments(row: &[f64], y_min: f64, y_max: f64) -> Vec<Vec<(f64, f64)>> {
    let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    for (i, &v) in row.iter().enumerate() {
        if v.is_finite() {
            current.push((i as f64, v.clamp(y_min, y_max)));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Dashes of a vertical line at `x` spanning `[y_min, y_max]`.
/// Each dash covers half of its period.
pub fn dashed_vline(x: f64, y_min: f64, y_max: f64, n_dashes: usize) -> Vec<[(f64, f64); 2]> {
    let n = n_dashes.max(1);
    let period = (y_max - y_min) / n as f64;
    (0..n)
        .map(|k| {
            let y0 = y_min + k as f64 * period;
            [(x, y0), (x, y0 + 0.5 * period)]
        })
        .collect()
}

/// Height of the red dot, or `None` when the sample falls outside the panel
/// (out of range or not finite) and the dot is left out.
pub fn dot_y(v: f64, y_min: f64, y_max: f64) -> Option<f64> {
    if v.is_finite() && v >= y_min && v <= y_max {
        Some(v)
    } else {
        None
    }
}

/// Draw the three-panel comparison for one frame onto any backend.
pub fn draw_comparison<DB>(
    root: &DrawingArea<DB, Shift>,
    panels: &[Panel<'_>],
    frame: usize,
    layout: &FrameLayout,
) -> std::result::Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (w, h) = root.dim_in_pixel();
    let (w, h) = (w as f64, h as f64);

    // Shared y label, vertical, 4% in from the left edge
    let y_label_style = ("sans-serif", 15)
        .into_font()
        .transform(FontTransform::Rotate270)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    root.draw(&Text::new(
        "Field Strength []",
        ((0.04 * w) as i32, (0.5 * h) as i32),
        y_label_style,
    ))?;

    let body = root.margin(
        (0.05 * h) as i32,
        (0.04 * h) as i32,
        (0.07 * w) as i32,
        (0.08 * w) as i32,
    );
    let gap = (0.04 * h) as i32;
    let areas = body.split_evenly((panels.len().max(1), 1));

    for (i, (area, panel)) in areas.iter().zip(panels.iter()).enumerate() {
        let last = i + 1 == panels.len();
        let n_points = panel.series.n_points();
        let color = panel.condition.line_color().rgb();

        let mut chart = ChartBuilder::on(area)
            .caption(panel.condition.title(), ("sans-serif", 15))
            .margin_bottom(if last { 0 } else { gap })
            .margin_right(5)
            .x_label_area_size(if last { 35 } else { 20 })
            .y_label_area_size(40)
            .build_cartesian_2d(0f64..n_points as f64, layout.y_min..layout.y_max)?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .x_labels(6)
            .y_labels(5)
            .label_style(("sans-serif", 11));
        if last {
            mesh.x_desc("n-points").axis_desc_style(("sans-serif", 13));
        }
        mesh.draw()?;

        let row = panel.series.frame(frame);
        chart
            .draw_series(
                finite_segments(row, layout.y_min, layout.y_max)
                    .into_iter()
                    .map(|pts| PathElement::new(pts, color.stroke_width(1))),
            )?
            .label(panel.condition.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        if let Some(marker) = panel.marker {
            let style = marker.color.rgb().stroke_width(1);
            chart.draw_series(
                dashed_vline(marker.x, layout.y_min, layout.y_max, 20)
                    .into_iter()
                    .map(|seg| PathElement::new(seg.to_vec(), style)),
            )?;
        }

        if layout.probe < n_points {
            let v = panel.series.value(frame, layout.probe);
            if let Some(y) = dot_y(v, layout.y_min, layout.y_max) {
                chart.draw_series(std::iter::once(Circle::new(
                    (layout.probe as f64, y),
                    4,
                    RED.filled(),
                )))?;
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(("sans-serif", 12))
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()?;
    }

    Ok(())
}

/// Turns a frame index into pixels. The animation loop only talks to this.
pub trait FrameRenderer: Sync {
    /// Length of the buffer returned by `render_rgb`.
    fn frame_len(&self) -> usize;

    fn render_rgb(&self, panels: &[Panel<'_>], frame: usize) -> Result<Vec<u8>>;

    fn save_png(&self, path: &Path, panels: &[Panel<'_>], frame: usize) -> Result<()>;
}

/// Bitmap renderer backed by plotters.
#[derive(Debug, Clone, Copy)]
pub struct PlotRenderer {
    pub layout: FrameLayout,
}

impl PlotRenderer {
    pub fn new(layout: FrameLayout) -> Self {
        Self { layout }
    }
}

impl FrameRenderer for PlotRenderer {
    fn frame_len(&self) -> usize {
        self.layout.rgb_len()
    }

    /// RGB24, `width * height * 3` bytes, row-major from the top-left.
    fn render_rgb(&self, panels: &[Panel<'_>], frame: usize) -> Result<Vec<u8>> {
        let layout = &self.layout;
        let mut buf = vec![0u8; layout.rgb_len()];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (layout.width, layout.height))
                .into_drawing_area();
            draw_comparison(&root, panels, frame, layout).map_err(CompareError::plot)?;
            root.present().map_err(CompareError::plot)?;
        }
        Ok(buf)
    }

    fn save_png(&self, path: &Path, panels: &[Panel<'_>], frame: usize) -> Result<()> {
        let layout = &self.layout;
        let root = BitMapBackend::new(path, (layout.width, layout.height)).into_drawing_area();
        draw_comparison(&root, panels, frame, layout).map_err(CompareError::plot)?;
        root.present().map_err(CompareError::plot)?;
        Ok(())
    }
}

/// Plot the probe-column value against frame index for every condition.
pub fn save_probe_trace_plot(
    traces: &[(Condition, Vec<f64>)],
    probe: usize,
    filename: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let n_frames = traces.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    if n_frames < 2 {
        return Ok(()); // nothing worth plotting
    }

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &v in traces.iter().flat_map(|(_, v)| v.iter()) {
        if v.is_finite() {
            y_min = y_min.min(v);
            y_max = y_max.max(v);
        }
    }

    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = -1.0;
        y_max = 1.0;
    } else if (y_max - y_min).abs() < 1e-12 {
        let delta = if y_max.abs() < 1e-12 { 1.0 } else { 0.1 * y_max.abs() };
        y_min -= delta;
        y_max += delta;
    } else {
        // 10% margin
        let margin = 0.1 * (y_max - y_min);
        y_min -= margin;
        y_max += margin;
    }

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(
            format!("Field at probe column {probe} vs frame"),
            ("sans-serif", 30),
        )
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(0f64..(n_frames - 1) as f64, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("frame")
        .y_desc("Field Strength []")
        .draw()?;

    for (condition, values) in traces {
        let color = condition.line_color().rgb();
        chart
            .draw_series(
                finite_segments(values, y_min, y_max)
                    .into_iter()
                    .map(|pts| PathElement::new(pts, color.stroke_width(1))),
            )?
            .label(condition.label())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}
