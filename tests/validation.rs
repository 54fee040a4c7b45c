// tests/validation.rs
//
// End-to-end checks of the comparison run, using a stub renderer and an
// in-memory sink so no fonts or ffmpeg are needed.
// Run with: cargo test --test validation

use std::fs;
use std::path::Path;

use field_compare::animation::{self, RunSummary};
use field_compare::condition::Condition;
use field_compare::config::{CompareConfig, InputConfig};
use field_compare::error::{CompareError, Result};
use field_compare::movie::{FrameSink, MemorySink};
use field_compare::visualisation::{FrameRenderer, Panel};

/// Encodes (frame, probe value of the first panel) into a tiny buffer.
struct StubRenderer {
    probe: usize,
}

impl FrameRenderer for StubRenderer {
    fn frame_len(&self) -> usize {
        9
    }

    fn render_rgb(&self, panels: &[Panel<'_>], frame: usize) -> Result<Vec<u8>> {
        let v = panels[0].series.value(frame, self.probe);
        let mut buf = vec![0u8; self.frame_len()];
        buf[0] = frame as u8;
        buf[1] = (v * 100.0).round() as i64 as u8;
        Ok(buf)
    }

    fn save_png(&self, path: &Path, panels: &[Panel<'_>], frame: usize) -> Result<()> {
        let v = panels[0].series.value(frame, self.probe);
        fs::write(path, format!("frame {frame} value {v:.6}"))?;
        Ok(())
    }
}

/// Rejects every frame after `limit`.
struct FailingSink {
    limit: usize,
    accepted: usize,
}

impl FrameSink for FailingSink {
    fn push_frame(&mut self, index: usize, _rgb: &[u8]) -> Result<()> {
        if index >= self.limit {
            return Err(CompareError::Encoder("pipe closed".into()));
        }
        self.accepted += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize> {
        Ok(self.accepted)
    }
}

/// `n_frames` rows of `n_points` columns; value = (t * 0.01) + column marker.
fn write_series(path: &Path, n_frames: usize, n_points: usize, offset: f64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = String::from("# synthetic field\n");
    for t in 0..n_frames {
        let row: Vec<String> = (0..n_points)
            .map(|x| format!("{:.6}", offset + t as f64 * 0.01 + x as f64 * 1e-4))
            .collect();
        text.push_str(&row.join(" "));
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}

fn small_config(data_dir: &Path) -> CompareConfig {
    let mut cfg = CompareConfig::default();
    cfg.inputs = InputConfig::from_data_dir(data_dir, "Ex");
    cfg.window.start = 20;
    cfg.window.end = 80;
    cfg.plot.probe = 50;
    cfg.plot.markers = [None, None, None];
    cfg.movie.enabled = false;
    cfg
}

fn run_small(
    cfg: &CompareConfig,
    run_dir: &Path,
    sink: Option<&mut dyn FrameSink>,
) -> Result<RunSummary> {
    let renderer = StubRenderer {
        probe: cfg.plot.probe,
    };
    animation::run_with(cfg, run_dir, &renderer, sink)
}

#[test]
fn full_run_saves_snapshot_subset_and_streams_every_frame() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for c in Condition::ALL {
        write_series(&c.default_path(data.path(), "Ex"), 45, 100, 0.0);
    }
    let cfg = small_config(data.path());

    let mut sink = MemorySink::default();
    let summary = run_small(&cfg, out.path(), Some(&mut sink)).unwrap();

    assert_eq!(summary.frames, 45);
    // frames 0..29 plus 30 and 40
    assert_eq!(summary.snapshots, 32);
    assert_eq!(summary.movie_frames, Some(45));
    assert!(sink.finished);

    // Frames arrive in order even though rendering is parallel
    let order: Vec<usize> = sink.frames.iter().map(|(i, _)| *i).collect();
    assert_eq!(order, (0..45).collect::<Vec<_>>());
    for (i, rgb) in &sink.frames {
        assert_eq!(rgb[0] as usize, *i);
    }

    let frames_dir = out.path().join("frames");
    assert!(frames_dir.join("frame_0000.png").exists());
    assert!(frames_dir.join("frame_0029.png").exists());
    assert!(!frames_dir.join("frame_0031.png").exists());
    assert!(frames_dir.join("frame_0040.png").exists());
    let n_files = fs::read_dir(&frames_dir).unwrap().count();
    assert_eq!(n_files, 32);
}

#[test]
fn snapshot_shows_its_own_frame() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for c in Condition::ALL {
        write_series(&c.default_path(data.path(), "Ex"), 45, 100, 0.0);
    }
    let cfg = small_config(data.path());

    run_small(&cfg, out.path(), None).unwrap();

    // column 50 of window 20..80 is absolute column 70
    let frames_dir = out.path().join("frames");
    for frame in [0usize, 1, 29, 30, 40] {
        let text = fs::read_to_string(frames_dir.join(format!("frame_{frame:04}.png"))).unwrap();
        let expected = frame as f64 * 0.01 + 70.0 * 1e-4;
        assert_eq!(text, format!("frame {frame} value {expected:.6}"));
    }
}

#[test]
fn window_and_probe_pick_the_right_column() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for c in Condition::ALL {
        write_series(&c.default_path(data.path(), "Ex"), 3, 100, 0.0);
    }
    let cfg = small_config(data.path());

    run_small(&cfg, out.path(), None).unwrap();

    // probe 50 in window 20..80 is absolute column 70
    let csv = fs::read_to_string(out.path().join("probe_trace.csv")).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows[0], "frame,control,constructive,destructive");
    assert_eq!(rows.len(), 4);

    let fields: Vec<f64> = rows[3]
        .split(',')
        .skip(1)
        .map(|s| s.parse().unwrap())
        .collect();
    let expected = 2.0 * 0.01 + 70.0 * 1e-4;
    for v in fields {
        assert!((v - expected).abs() < 1e-9, "got {v}, expected {expected}");
    }
}

#[test]
fn shorter_input_limits_the_frame_count() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_series(&Condition::Control.default_path(data.path(), "Ex"), 12, 100, 0.0);
    write_series(&Condition::Constructive.default_path(data.path(), "Ex"), 8, 100, 0.1);
    write_series(&Condition::Destructive.default_path(data.path(), "Ex"), 12, 100, -0.1);
    let mut cfg = small_config(data.path());
    cfg.snapshots.dense_prefix = 2;
    cfg.snapshots.stride = 5;

    let summary = run_small(&cfg, out.path(), None).unwrap();
    assert_eq!(summary.frames, 8);
    // 0, 1, 5
    assert_eq!(summary.snapshots, 3);
    assert_eq!(summary.movie_frames, None);
    assert_eq!(summary.movie, None);
}

#[test]
fn failing_encoder_does_not_stop_snapshots() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for c in Condition::ALL {
        write_series(&c.default_path(data.path(), "Ex"), 20, 100, 0.0);
    }
    let cfg = small_config(data.path());

    let mut sink = FailingSink {
        limit: 5,
        accepted: 0,
    };
    let summary = run_small(&cfg, out.path(), Some(&mut sink)).unwrap();

    assert_eq!(summary.frames, 20);
    assert_eq!(summary.snapshots, 20);
    assert_eq!(sink.accepted, 5);
    // the sink was dropped, so it never reported a finished movie
    assert_eq!(summary.movie_frames, None);
}

#[test]
fn max_frames_caps_the_animation() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for c in Condition::ALL {
        write_series(&c.default_path(data.path(), "Ex"), 50, 100, 0.0);
    }
    let mut cfg = small_config(data.path());
    cfg.max_frames = Some(4);

    let mut sink = MemorySink::default();
    let summary = run_small(&cfg, out.path(), Some(&mut sink)).unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(sink.frames.len(), 4);
}

#[test]
fn missing_input_reports_the_path() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_series(&Condition::Control.default_path(data.path(), "Ex"), 3, 100, 0.0);
    write_series(&Condition::Destructive.default_path(data.path(), "Ex"), 3, 100, 0.0);
    let cfg = small_config(data.path());

    let err = run_small(&cfg, out.path(), None).unwrap_err();
    match err {
        CompareError::Read { path, .. } => {
            assert!(path.ends_with(Path::new("constructive").join("Ex.txt")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ragged_input_is_reported_with_file_and_line() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for c in Condition::ALL {
        write_series(&c.default_path(data.path(), "Ex"), 3, 100, 0.0);
    }
    let bad = Condition::Destructive.default_path(data.path(), "Ex");
    fs::write(&bad, "0 0 0\n0 0\n").unwrap();
    let cfg = small_config(data.path());

    let err = run_small(&cfg, out.path(), None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("destructive"), "{msg}");
    match err {
        CompareError::InFile { source, .. } => {
            assert!(matches!(*source, CompareError::RaggedRow { line: 2, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn window_narrower_than_probe_is_rejected() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    // 60 columns: window 20..80 is clamped to 20..60, only 40 wide
    for c in Condition::ALL {
        write_series(&c.default_path(data.path(), "Ex"), 3, 60, 0.0);
    }
    let cfg = small_config(data.path());

    let err = run_small(&cfg, out.path(), None).unwrap_err();
    assert!(matches!(
        err,
        CompareError::ProbeOutOfRange {
            what: "probe",
            width: 40,
            ..
        }
    ));
}
