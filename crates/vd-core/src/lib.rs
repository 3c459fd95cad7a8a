//! vd-core — Virgin Detector core logic.
//!
//! Heuristic age estimation over facial landmarks, the age-weighted verdict,
//! and the daily streak engine. No I/O: callers own capture, detection, and
//! persistence, and pass in their own random source.

pub mod age;
pub mod analysis;
pub mod catalog;
pub mod profile;
pub mod streak;
pub mod types;
pub mod verdict;

pub use age::{detect_glasses, estimate_age, EstimateError};
pub use analysis::{analyze, Analysis, AnalysisError};
pub use profile::{Login, ProfileError, ProfileStore, Registration, UserProfile};
pub use streak::{
    advance_streak, initial_streak, progress, reset_streak, Advance, Milestone, StreakBook,
    StreakError, StreakState,
};
pub use types::{BoundingBox, Category, FaceLandmarks, Point};
pub use verdict::Verdict;
