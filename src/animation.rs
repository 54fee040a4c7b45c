// src/animation.rs
//
// The comparison run: load the three inputs, draw every frame, keep the
// snapshot subset as PNG and stream all frames to the movie encoder.

use tracing::{debug, info, warn};
use rayon::prelude::*;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::condition::Condition;
use crate::config::{CompareConfig, PlotConfig};
use crate::error::{CompareError, Result};
use crate::field_series::FieldSeries;
use crate::movie::{FfmpegEncoder, FrameSink};
use crate::snapshot::SnapshotPolicy;
use crate::visualisation::{save_probe_trace_plot, FrameLayout, FrameRenderer, Panel, PlotRenderer};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: usize,
    pub snapshots: usize,
    /// Frames accepted by the movie encoder, `None` if no movie was made.
    pub movie_frames: Option<usize>,
    pub movie: Option<PathBuf>,
    pub frames_dir: PathBuf,
    pub probe_trace: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationStats {
    pub frames: usize,
    pub snapshots: usize,
    pub movie_frames: Option<usize>,
}

/// Load the three inputs in parallel and cut the configured column window.
/// Returned in `Condition::ALL` order.
pub fn load_inputs(cfg: &CompareConfig) -> Result<Vec<FieldSeries>> {
    Condition::ALL
        .par_iter()
        .map(|&condition| {
            let path = cfg.inputs.path(condition);
            let raw = FieldSeries::load_txt(path)?;
            info!(
                "{}: {} frames x {} points from {}",
                condition.as_str(),
                raw.n_frames(),
                raw.n_points(),
                path.display()
            );
            raw.window(cfg.window.start, cfg.window.end)
        })
        .collect()
}

/// Number of frames all three inputs can supply, optionally capped.
pub fn frame_count(series: &[FieldSeries], max_frames: Option<usize>) -> usize {
    let shortest = series.iter().map(FieldSeries::n_frames).min().unwrap_or(0);
    let longest = series.iter().map(FieldSeries::n_frames).max().unwrap_or(0);
    if shortest != longest {
        warn!(
            "inputs have different frame counts ({}..{}); animating the first {}",
            shortest, longest, shortest
        );
    }
    match max_frames {
        Some(cap) => shortest.min(cap),
        None => shortest,
    }
}

/// Windows must agree in width, and the probe and marker lines must fall inside.
pub fn check_geometry(series: &[FieldSeries], plot: &PlotConfig) -> Result<()> {
    let Some(first) = series.first() else {
        return Err(CompareError::Empty);
    };
    let width = first.n_points();

    for (condition, s) in Condition::ALL.iter().zip(series).skip(1) {
        if s.n_points() != width {
            return Err(CompareError::WidthMismatch {
                condition: condition.as_str(),
                control: width,
                other: s.n_points(),
            });
        }
    }

    if plot.probe >= width {
        return Err(CompareError::ProbeOutOfRange {
            what: "probe",
            column: plot.probe as f64,
            width,
        });
    }
    for condition in Condition::ALL {
        if let Some(marker) = plot.marker(condition) {
            if !(marker.x >= 0.0 && marker.x <= width as f64) {
                return Err(CompareError::ProbeOutOfRange {
                    what: "marker line",
                    column: marker.x,
                    width,
                });
            }
        }
    }
    Ok(())
}

pub fn build_panels<'a>(series: &'a [FieldSeries], plot: &PlotConfig) -> Vec<Panel<'a>> {
    Condition::ALL
        .iter()
        .zip(series)
        .map(|(&condition, s)| Panel {
            condition,
            series: s,
            marker: plot.marker(condition),
        })
        .collect()
}

/// Draw frames `0..n_frames` in order.
///
/// Frames are rendered in parallel chunks but handed to `sink` strictly in
/// order. A sink that fails is dropped with a warning; snapshots keep going.
pub fn animate(
    panels: &[Panel<'_>],
    n_frames: usize,
    renderer: &dyn FrameRenderer,
    snapshots: &SnapshotPolicy,
    frames_dir: &Path,
    mut sink: Option<&mut dyn FrameSink>,
) -> Result<AnimationStats> {
    create_dir_all(frames_dir)?;

    let chunk = (rayon::current_num_threads() * 2).max(1);
    let report_every = (n_frames / 10).max(1);
    let mut snapshots_saved = 0usize;
    let mut sink_failed = false;

    let mut start = 0usize;
    while start < n_frames {
        let end = (start + chunk).min(n_frames);
        let want_rgb = sink.is_some();

        let rendered: Vec<(bool, Option<Vec<u8>>)> = (start..end)
            .into_par_iter()
            .map(|frame| -> Result<(bool, Option<Vec<u8>>)> {
                let saved = snapshots.should_save(frame);
                if saved {
                    let path = frames_dir.join(SnapshotPolicy::file_name(frame));
                    renderer.save_png(&path, panels, frame)?;
                }
                let rgb = if want_rgb {
                    Some(renderer.render_rgb(panels, frame)?)
                } else {
                    None
                };
                Ok((saved, rgb))
            })
            .collect::<Result<Vec<_>>>()?;

        for (offset, (saved, rgb)) in rendered.into_iter().enumerate() {
            let frame = start + offset;
            if saved {
                snapshots_saved += 1;
            }
            if let (Some(s), Some(rgb)) = (sink.as_mut(), rgb) {
                if let Err(e) = s.push_frame(frame, &rgb) {
                    warn!("movie encoding stopped at frame {frame}: {e}");
                    sink_failed = true;
                }
            }
            if sink_failed {
                sink = None;
            }
            if (frame + 1) % report_every == 0 || frame + 1 == n_frames {
                info!("frame {:6} / {}", frame + 1, n_frames);
            }
        }

        start = end;
    }

    let movie_frames = match sink {
        Some(s) => match s.finish() {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("movie encoder failed: {e}");
                None
            }
        },
        None => None,
    };

    debug!(
        "animation done: {} frames, {} snapshots, movie frames {:?}",
        n_frames, snapshots_saved, movie_frames
    );

    Ok(AnimationStats {
        frames: n_frames,
        snapshots: snapshots_saved,
        movie_frames,
    })
}

/// Probe-column value per frame for each panel.
pub fn probe_traces(panels: &[Panel<'_>], n_frames: usize, probe: usize) -> Vec<(Condition, Vec<f64>)> {
    panels
        .iter()
        .map(|p| {
            let values = (0..n_frames).map(|t| p.series.value(t, probe)).collect();
            (p.condition, values)
        })
        .collect()
}

pub fn write_probe_trace_csv(path: &Path, traces: &[(Condition, Vec<f64>)]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);

    let header: Vec<&str> = traces.iter().map(|(c, _)| c.as_str()).collect();
    writeln!(w, "frame,{}", header.join(","))?;

    let n = traces.iter().map(|(_, v)| v.len()).min().unwrap_or(0);
    for t in 0..n {
        write!(w, "{t}")?;
        for (_, values) in traces {
            write!(w, ",{:.16e}", values[t])?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

/// Full run with an explicit renderer and sink.
pub fn run_with(
    cfg: &CompareConfig,
    run_dir: &Path,
    renderer: &dyn FrameRenderer,
    sink: Option<&mut dyn FrameSink>,
) -> Result<RunSummary> {
    cfg.validate()?;

    let series = load_inputs(cfg)?;
    check_geometry(&series, &cfg.plot)?;
    let n_frames = frame_count(&series, cfg.max_frames);
    for (condition, s) in Condition::ALL.iter().zip(&series) {
        if let Some((lo, hi)) = s.finite_range() {
            if lo < cfg.plot.y_min || hi > cfg.plot.y_max {
                warn!(
                    "{} data spans [{:.3e}, {:.3e}], outside y range [{}, {}]; clipping",
                    condition.as_str(),
                    lo,
                    hi,
                    cfg.plot.y_min,
                    cfg.plot.y_max
                );
            }
        }
    }
    let panels = build_panels(&series, &cfg.plot);

    let frames_dir = run_dir.join("frames");
    let stats = animate(
        &panels,
        n_frames,
        renderer,
        &cfg.snapshots,
        &frames_dir,
        sink,
    )?;

    let traces = probe_traces(&panels, n_frames, cfg.plot.probe);
    let probe_trace = run_dir.join("probe_trace.csv");
    write_probe_trace_csv(&probe_trace, &traces)?;
    if let Err(e) = save_probe_trace_plot(&traces, cfg.plot.probe, &run_dir.join("probe_trace.png")) {
        warn!("could not draw probe trace plot: {e}");
    }

    Ok(RunSummary {
        frames: stats.frames,
        snapshots: stats.snapshots,
        movie_frames: stats.movie_frames,
        movie: None,
        frames_dir,
        probe_trace,
    })
}

/// Run with the plotters renderer and, if enabled, an ffmpeg encoder.
pub fn run(cfg: &CompareConfig, run_dir: &Path) -> Result<RunSummary> {
    cfg.validate()?;
    let renderer = PlotRenderer::new(FrameLayout::from(&cfg.plot));

    let movie_path = run_dir.join(&cfg.movie.file_name);
    let mut encoder = if cfg.movie.enabled {
        match FfmpegEncoder::spawn(&cfg.movie, cfg.plot.width, cfg.plot.height, &movie_path) {
            Ok(enc) => Some(enc),
            Err(e) => {
                warn!("continuing without a movie: {e}");
                None
            }
        }
    } else {
        None
    };

    let sink = encoder.as_mut().map(|e| e as &mut dyn FrameSink);
    let mut summary = run_with(cfg, run_dir, &renderer, sink)?;
    if summary.movie_frames.is_some() {
        summary.movie = encoder.as_ref().map(|e| e.output().to_path_buf());
    }
    Ok(summary)
}
