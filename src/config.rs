// src/config.rs
//
// Run configuration. Loaded from an optional JSON file, overridden by CLI
// tokens, and written back as `config.json` next to the outputs.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::condition::{Condition, MarkerLine};
use crate::error::{CompareError, Result};
use crate::snapshot::SnapshotPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub inputs: InputConfig,
    pub window: WindowConfig,
    pub plot: PlotConfig,
    pub movie: MovieConfig,
    pub snapshots: SnapshotPolicy,
    /// Stop after this many frames (all frames if unset).
    pub max_frames: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub control: PathBuf,
    pub constructive: PathBuf,
    pub destructive: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub y_min: f64,
    pub y_max: f64,
    /// Window-local column marked with a red dot.
    pub probe: usize,
    /// Dashed reference lines, one slot per condition (control, constructive, destructive).
    pub markers: [Option<MarkerLine>; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieConfig {
    pub enabled: bool,
    pub fps: u32,
    pub ffmpeg: PathBuf,
    pub codec: String,
    pub file_name: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::from_data_dir(Path::new("."), "Ex")
    }
}

impl InputConfig {
    /// `<dir>/control/<component>.txt` and friends.
    pub fn from_data_dir(dir: &Path, component: &str) -> Self {
        Self {
            control: Condition::Control.default_path(dir, component),
            constructive: Condition::Constructive.default_path(dir, component),
            destructive: Condition::Destructive.default_path(dir, component),
        }
    }

    pub fn path(&self, condition: Condition) -> &Path {
        match condition {
            Condition::Control => &self.control,
            Condition::Constructive => &self.constructive,
            Condition::Destructive => &self.destructive,
        }
    }

    pub fn set_path(&mut self, condition: Condition, path: PathBuf) {
        match condition {
            Condition::Control => self.control = path,
            Condition::Constructive => self.constructive = path,
            Condition::Destructive => self.destructive = path,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: 2000,
            end: 4000,
        }
    }
}

impl WindowConfig {
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            y_min: -1.0,
            y_max: 1.0,
            probe: 500,
            markers: Condition::ALL.map(|c| c.default_marker()),
        }
    }
}

impl PlotConfig {
    pub fn marker(&self, condition: Condition) -> Option<MarkerLine> {
        self.markers[condition.index()]
    }
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fps: 10,
            ffmpeg: PathBuf::from("ffmpeg"),
            codec: "libx264".to_string(),
            file_name: "live_plot_comparison.mp4".to_string(),
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            inputs: InputConfig::default(),
            window: WindowConfig::default(),
            plot: PlotConfig::default(),
            movie: MovieConfig::default(),
            snapshots: SnapshotPolicy::default(),
            max_frames: None,
        }
    }
}

impl CompareConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CompareError::read(path, e))?;
        let cfg: CompareConfig = serde_json::from_reader(BufReader::new(file))?;
        Ok(cfg)
    }

    /// Checks that do not need the input data.
    pub fn validate(&self) -> Result<()> {
        if self.window.start >= self.window.end {
            return Err(CompareError::Config(format!(
                "window start {} must be below end {}",
                self.window.start, self.window.end
            )));
        }
        if !(self.plot.y_min < self.plot.y_max) {
            return Err(CompareError::Config(format!(
                "y range [{}, {}] is empty",
                self.plot.y_min, self.plot.y_max
            )));
        }
        if self.plot.width == 0 || self.plot.height == 0 {
            return Err(CompareError::Config("image size must be non-zero".into()));
        }
        // yuv420p needs even dimensions
        if self.movie.enabled && (self.plot.width % 2 != 0 || self.plot.height % 2 != 0) {
            return Err(CompareError::Config(format!(
                "movie frames must have even dimensions, got {}x{}",
                self.plot.width, self.plot.height
            )));
        }
        if self.movie.enabled && self.movie.fps == 0 {
            return Err(CompareError::Config("fps must be positive".into()));
        }
        if self.plot.probe >= self.window.width() {
            return Err(CompareError::ProbeOutOfRange {
                what: "probe",
                column: self.plot.probe as f64,
                width: self.window.width(),
            });
        }
        if self.max_frames == Some(0) {
            return Err(CompareError::Config("frames must be at least 1".into()));
        }
        Ok(())
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
