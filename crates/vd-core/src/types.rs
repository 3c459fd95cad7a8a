use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 2-D landmark position in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Pixel size of a detected face region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Both dimensions finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// One face as reported by an external face detector.
///
/// Every landmark is optional; detectors running in "fast" mode report only
/// the bounding box. The estimator never mutates this record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceLandmarks {
    pub bounding_box: Option<BoundingBox>,
    pub left_eye: Option<Point>,
    pub right_eye: Option<Point>,
    pub left_cheek: Option<Point>,
    pub right_cheek: Option<Point>,
    pub nose_base: Option<Point>,
    pub left_eye_open_probability: Option<f32>,
    pub right_eye_open_probability: Option<f32>,
}

impl FaceLandmarks {
    /// Whether any landmark point was supplied.
    pub fn has_landmarks(&self) -> bool {
        self.left_eye.is_some()
            || self.right_eye.is_some()
            || self.left_cheek.is_some()
            || self.right_cheek.is_some()
            || self.nose_base.is_some()
    }

    /// Both eye positions, when present.
    pub fn eyes(&self) -> Option<(Point, Point)> {
        Some((self.left_eye?, self.right_eye?))
    }

    /// Distance between the two eye positions.
    pub fn eye_distance(&self) -> Option<f32> {
        self.eyes().map(|(l, r)| l.distance(&r))
    }

    /// Mean of both eye-open probabilities; `None` unless both are reported.
    pub fn eye_openness(&self) -> Option<f32> {
        match (self.left_eye_open_probability, self.right_eye_open_probability) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            _ => None,
        }
    }
}

/// A streak category. Each category keeps its own count and milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Virgin,
    NoFap,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Virgin, Category::NoFap];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Virgin => "virgin",
            Category::NoFap => "nofap",
        }
    }

    /// Human-facing label, as shown on tabs and cards.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Virgin => "Virgin",
            Category::NoFap => "NoFap",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0} (expected \"virgin\" or \"nofap\")")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "virgin" => Ok(Category::Virgin),
            "nofap" => Ok(Category::NoFap),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}
