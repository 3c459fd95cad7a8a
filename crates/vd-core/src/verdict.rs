//! Age-weighted verdict.
//!
//! The label is random; the estimated age only shifts the odds.

use rand::Rng;
use serde::Serialize;

pub const VIRGIN_STATUS: &str = "Certified Virgin";
pub const NON_VIRGIN_STATUS: &str = "Non-Virgin Detected";

const CONFIDENCE_MIN: u8 = 80;
const CONFIDENCE_MAX: u8 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub is_virgin: bool,
    pub status: &'static str,
    /// Displayed confidence percentage in `[80, 99]`.
    pub confidence: u8,
}

/// Threshold a uniform draw must exceed for a virgin verdict, or `None`
/// when the age needs no draw.
fn draw_threshold(age: u8) -> Option<f64> {
    match age {
        0..=19 => None,
        20..=24 => Some(0.2),
        25..=29 => Some(0.6),
        _ => Some(0.9),
    }
}

/// Probability of a virgin verdict for a given age.
pub fn virgin_probability(age: u8) -> f64 {
    draw_threshold(age).map_or(1.0, |t| 1.0 - t)
}

/// Draw a verdict for `age`.
///
/// Ages under 20 are always virgin and skip the draw; otherwise one uniform
/// sample in `[0, 1)` decides the label before the confidence is drawn.
pub fn classify<R: Rng + ?Sized>(age: u8, rng: &mut R) -> Verdict {
    let is_virgin = match draw_threshold(age) {
        None => true,
        Some(threshold) => rng.gen::<f64>() > threshold,
    };
    let confidence = rng.gen_range(CONFIDENCE_MIN..=CONFIDENCE_MAX);

    Verdict {
        is_virgin,
        status: if is_virgin { VIRGIN_STATUS } else { NON_VIRGIN_STATUS },
        confidence,
    }
}
