// src/condition.rs

use std::path::{Path, PathBuf};

use plotters::style::{RGBColor, BLACK, BLUE, GREEN, RED};
use serde::{Deserialize, Serialize};

/// The three experimental conditions, in panel order (top to bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Control,
    Constructive,
    Destructive,
}

impl Condition {
    pub const ALL: [Condition; 3] = [
        Condition::Control,
        Condition::Constructive,
        Condition::Destructive,
    ];

    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "control" => Some(Self::Control),
            "constructive" => Some(Self::Constructive),
            "destructive" => Some(Self::Destructive),
            _ => None,
        }
    }

    /// Lowercase name, also the input sub-directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Constructive => "constructive",
            Self::Destructive => "destructive",
        }
    }

    /// Legend label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Control => "Control",
            Self::Constructive => "Constructive",
            Self::Destructive => "Destructive",
        }
    }

    pub fn title(&self) -> String {
        format!("{} Field", self.label())
    }

    pub fn line_color(&self) -> LineColor {
        match self {
            Self::Control => LineColor::Black,
            Self::Constructive => LineColor::Blue,
            Self::Destructive => LineColor::Red,
        }
    }

    /// Dashed reference line drawn on the panel, in window-local columns.
    pub fn default_marker(&self) -> Option<MarkerLine> {
        match self {
            Self::Control => None,
            Self::Constructive => Some(MarkerLine {
                x: 485.0,
                color: LineColor::Green,
            }),
            Self::Destructive => Some(MarkerLine {
                x: 475.0,
                color: LineColor::Black,
            }),
        }
    }

    /// `<data_dir>/<condition>/<component>.txt`, e.g. `control/Ex.txt`.
    pub fn default_path(&self, data_dir: &Path, component: &str) -> PathBuf {
        data_dir
            .join(self.as_str())
            .join(format!("{component}.txt"))
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Control => 0,
            Self::Constructive => 1,
            Self::Destructive => 2,
        }
    }
}

/// Named colours usable in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineColor {
    Black,
    Blue,
    Red,
    Green,
}

impl LineColor {
    pub fn rgb(&self) -> RGBColor {
        match self {
            Self::Black => BLACK,
            Self::Blue => BLUE,
            Self::Red => RED,
            Self::Green => GREEN,
        }
    }
}

/// Vertical dashed line at window-local column `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerLine {
    pub x: f64,
    pub color: LineColor,
}
