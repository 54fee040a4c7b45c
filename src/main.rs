// src/main.rs
//
// Driver for the three-condition field comparison movie.
//
// Outputs are written to `runs/` (or the directory given via `out=`).
//
// Examples:
//
//   cargo run --release
//       -> reads control/Ex.txt, constructive/Ex.txt, destructive/Ex.txt,
//          columns 2000..4000, writes snapshots and live_plot_comparison.mp4.
//
//   cargo run --release -- data=sim_out component=Ey start=1000 end=3000 probe=250
//       -> same comparison for another field component and window.
//
//   cargo run --release -- config=compare.json frames=200 nomovie
//       -> settings from a JSON file, first 200 frames, snapshots only.
//
// Typical outputs (per run directory):
//   runs/<run_id>/
//     ├── config.json
//     ├── frames/frame_*.png        (first 30 frames, then every 10th)
//     ├── probe_trace.csv
//     ├── probe_trace.png
//     └── live_plot_comparison.mp4  (unless `nomovie`)

use std::env;
use std::error::Error;
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;

use field_compare::animation;
use field_compare::condition::Condition;
use field_compare::config::{CompareConfig, InputConfig};

fn print_usage() {
    eprintln!(
        r#"Usage:
  field-compare [config=FILE.json]
                [data=DIR] [component=NAME]
                [control=FILE] [constructive=FILE] [destructive=FILE]
                [start=N] [end=N] [probe=N] [ymin=VAL] [ymax=VAL]
                [width=PX] [height=PX] [frames=N]
                [fps=N] [ffmpeg=PATH] [nomovie]
                [out=DIR] [run=RUN_ID] [verbose]

Notes:
  - Inputs are plain-text arrays: one snapshot per line, whitespace separated.
  - Default inputs are <data>/<condition>/<component>.txt with data=. component=Ex.
  - start/end select the column window; probe is relative to the window start.
  - Snapshots: frames 0..29, then every 10th frame.
"#
    );
}

/// `verbose` forces debug level, otherwise RUST_LOG or info.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_run_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0));
    format!("{}{:03}_compare", now.as_secs(), now.subsec_millis())
}

fn unique_run_dir(out_root: &str, run_id: &str) -> PathBuf {
    let base = PathBuf::from(out_root);
    let mut dir = base.join(run_id);
    if !dir.exists() {
        return dir;
    }
    for k in 1..1000 {
        let cand = base.join(format!("{}_{}", run_id, k));
        if !cand.exists() {
            dir = cand;
            break;
        }
    }
    dir
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, v: &str) -> Option<T> {
    match v.trim().parse::<T>() {
        Ok(x) => Some(x),
        Err(_) => {
            eprintln!("Warning: could not parse {key} value '{v}', ignoring");
            None
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let argv: Vec<String> = env::args().collect();

    let mut verbose = false;
    let mut config_path: Option<PathBuf> = None;

    // Input overrides
    let mut data_dir: Option<PathBuf> = None;
    let mut component: Option<String> = None;
    let mut path_overrides: Vec<(Condition, PathBuf)> = Vec::new();

    // Window / plot overrides
    let mut start_override: Option<usize> = None;
    let mut end_override: Option<usize> = None;
    let mut probe_override: Option<usize> = None;
    let mut ymin_override: Option<f64> = None;
    let mut ymax_override: Option<f64> = None;
    let mut width_override: Option<u32> = None;
    let mut height_override: Option<u32> = None;
    let mut frames_override: Option<usize> = None;

    // Movie overrides
    let mut fps_override: Option<u32> = None;
    let mut ffmpeg_override: Option<PathBuf> = None;
    let mut no_movie = false;

    // Output controls
    let mut out_root_override: Option<String> = None;
    let mut run_id_override: Option<String> = None;

    for arg in argv.iter().skip(1) {
        if arg == "-h" || arg == "--help" || arg == "help" {
            print_usage();
            return Ok(());
        }
        if arg == "verbose" || arg == "-v" {
            verbose = true;
            continue;
        }
        if arg == "nomovie" {
            no_movie = true;
            continue;
        }

        let Some((key, value)) = arg.split_once('=') else {
            eprintln!("Warning: ignoring unknown argument '{arg}'");
            continue;
        };

        if let Some(condition) = Condition::from_arg(key) {
            path_overrides.push((condition, PathBuf::from(value)));
            continue;
        }

        match key {
            "config" => config_path = Some(PathBuf::from(value)),
            "data" => data_dir = Some(PathBuf::from(value)),
            "component" => component = Some(value.to_string()),
            "start" => start_override = parse_or_warn(key, value),
            "end" => end_override = parse_or_warn(key, value),
            "probe" => probe_override = parse_or_warn(key, value),
            "ymin" => ymin_override = parse_or_warn(key, value),
            "ymax" => ymax_override = parse_or_warn(key, value),
            "width" => width_override = parse_or_warn(key, value),
            "height" => height_override = parse_or_warn(key, value),
            "frames" => frames_override = parse_or_warn(key, value),
            "fps" => fps_override = parse_or_warn(key, value),
            "ffmpeg" => ffmpeg_override = Some(PathBuf::from(value)),
            "out" => out_root_override = Some(value.to_string()),
            "run" => run_id_override = Some(value.to_string()),
            _ => eprintln!("Warning: ignoring unknown argument '{arg}'"),
        }
    }

    init_logging(verbose);

    let mut cfg = match &config_path {
        Some(p) => CompareConfig::from_json_file(p)?,
        None => CompareConfig::default(),
    };

    // Apply overrides
    if data_dir.is_some() || component.is_some() {
        let dir = data_dir.unwrap_or_else(|| PathBuf::from("."));
        let comp = component.unwrap_or_else(|| "Ex".to_string());
        cfg.inputs = InputConfig::from_data_dir(&dir, &comp);
    }
    for (condition, path) in path_overrides {
        cfg.inputs.set_path(condition, path);
    }
    if let Some(v) = start_override {
        cfg.window.start = v;
    }
    if let Some(v) = end_override {
        cfg.window.end = v;
    }
    if let Some(v) = probe_override {
        cfg.plot.probe = v;
    }
    if let Some(v) = ymin_override {
        cfg.plot.y_min = v;
    }
    if let Some(v) = ymax_override {
        cfg.plot.y_max = v;
    }
    if let Some(v) = width_override {
        cfg.plot.width = v;
    }
    if let Some(v) = height_override {
        cfg.plot.height = v;
    }
    if frames_override.is_some() {
        cfg.max_frames = frames_override;
    }
    if let Some(v) = fps_override {
        cfg.movie.fps = v;
    }
    if let Some(v) = ffmpeg_override {
        cfg.movie.ffmpeg = v;
    }
    if no_movie {
        cfg.movie.enabled = false;
    }

    cfg.validate()?;

    // -------- output directory setup --------
    let out_root = out_root_override.unwrap_or_else(|| "runs".to_string());
    create_dir_all(&out_root)?;

    let run_id = sanitize_run_id(&run_id_override.unwrap_or_else(default_run_id));
    let run_dir = unique_run_dir(&out_root, &run_id);
    create_dir_all(&run_dir)?;
    cfg.write_to_dir(&run_dir)?;

    println!("--- field-compare run config ---");
    println!("run_dir: {}", run_dir.to_string_lossy());
    for condition in Condition::ALL {
        println!(
            "{:<13} {}",
            format!("{}:", condition.as_str()),
            cfg.inputs.path(condition).display()
        );
    }
    println!(
        "window:       columns {}..{}  probe={}  y=[{}, {}]",
        cfg.window.start, cfg.window.end, cfg.plot.probe, cfg.plot.y_min, cfg.plot.y_max
    );
    println!(
        "image:        {}x{} px  snapshots: first {} then every {}",
        cfg.plot.width, cfg.plot.height, cfg.snapshots.dense_prefix, cfg.snapshots.stride
    );
    if cfg.movie.enabled {
        println!(
            "movie:        {} fps={} codec={} ({})",
            cfg.movie.file_name,
            cfg.movie.fps,
            cfg.movie.codec,
            cfg.movie.ffmpeg.display()
        );
    } else {
        println!("movie:        disabled");
    }
    println!("--------------------------------");

    println!("Generating a live plot for the start ...");
    let summary = animation::run(&cfg, &run_dir)?;

    println!(
        "Rendered {} frames, saved {} snapshots to {}",
        summary.frames,
        summary.snapshots,
        summary.frames_dir.to_string_lossy()
    );
    println!("Probe trace: {}", summary.probe_trace.to_string_lossy());
    match &summary.movie {
        Some(movie) => {
            println!("Live plot successfully finished and saved as video!!");
            println!("Saved movie to {}", movie.to_string_lossy());
        }
        None if cfg.movie.enabled => eprintln!("Could not create movie; snapshots were kept."),
        None => println!("Movie generation skipped ('nomovie')."),
    }

    println!("Done. Outputs in {}", run_dir.to_string_lossy());
    Ok(())
}
