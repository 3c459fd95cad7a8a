//! Landmark-based age estimation.
//!
//! Combines up to seven geometric ratios over the detected landmarks into a
//! weighted average, adjusts for likely glasses, and adds a small bounded
//! jitter drawn from the caller's random source.

use crate::types::{BoundingBox, FaceLandmarks};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

// --- Output range ---
pub const MIN_AGE: u8 = 8;
pub const MAX_AGE: u8 = 40;
const FALLBACK_AGE_MIN: u8 = 10;
const FALLBACK_AGE_MAX: u8 = 29;
const JITTER_YEARS: f32 = 1.0;

// --- Glasses heuristic ---
const GLASSES_OPENNESS_THRESHOLD: f32 = 0.8;
const GLASSES_EYE_RATIO_THRESHOLD: f32 = 0.35;
const GLASSES_EYE_OFFSET: f32 = -3.0;
const GLASSES_FOREHEAD_OFFSET: f32 = 1.0;
const GLASSES_FINAL_OFFSET: i32 = 2;

// --- Signal weights ---
const EYE_WEIGHT: f32 = 3.0;
const SHAPE_WEIGHT: f32 = 2.2;
const SYMMETRY_WEIGHT: f32 = 1.0;
const FOREHEAD_WEIGHT: f32 = 2.0;
const SIZE_WEIGHT: f32 = 1.2;
const NOSE_WEIGHT: f32 = 1.5;
const CHEEK_WEIGHT: f32 = 1.8;

/// Face width (px) at which the size signal reads as its base value.
const REFERENCE_FACE_WIDTH: f32 = 250.0;
/// Nose width is not reported by detectors; approximate it from eye spacing.
const NOSE_TO_EYE_DISTANCE: f32 = 0.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Which geometric ratio produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    EyeDistance,
    FaceShape,
    Symmetry,
    Forehead,
    FaceSize,
    Nose,
    Cheek,
}

/// One weighted contribution to the age estimate, in years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgeSignal {
    pub kind: SignalKind,
    pub value: f32,
    pub weight: f32,
}

/// Heuristic glasses detection.
///
/// True when the mean eye-open probability is below 0.8, or when the eyes
/// sit unusually far apart relative to the face width (ratio above 0.35).
/// Each indicator is only evaluated when its inputs are present.
pub fn detect_glasses(face: &FaceLandmarks) -> bool {
    let low_openness = face
        .eye_openness()
        .is_some_and(|openness| openness < GLASSES_OPENNESS_THRESHOLD);

    let wide_eyes = match (face.eye_distance(), face.bounding_box) {
        (Some(dist), Some(bbox)) if bbox.is_valid() => {
            dist / bbox.width > GLASSES_EYE_RATIO_THRESHOLD
        }
        _ => false,
    };

    low_openness || wide_eyes
}

/// Compute every signal whose landmarks are present.
///
/// `glasses` applies the eye-distance and forehead corrections. Signals whose
/// landmarks are missing are skipped silently.
pub fn age_signals(face: &FaceLandmarks, bbox: &BoundingBox, glasses: bool) -> Vec<AgeSignal> {
    let w = bbox.width;
    let h = bbox.height;
    let mut signals = Vec::with_capacity(7);
    let mut push = |kind, value, weight| signals.push(AgeSignal { kind, value, weight });

    // Larger eyes relative to the face read younger.
    if let Some(eye_dist) = face.eye_distance() {
        let mut value = 25.0 - (eye_dist / w) * 130.0;
        if glasses {
            value += GLASSES_EYE_OFFSET;
        }
        push(SignalKind::EyeDistance, value, EYE_WEIGHT);
    }

    let face_ratio = h / w;
    let mut shape = 12.0 + (face_ratio - 1.0) * 20.0;
    if face_ratio > 0.95 && face_ratio < 1.05 {
        shape -= 4.0;
    }
    push(SignalKind::FaceShape, shape, SHAPE_WEIGHT);

    if let (Some((left, right)), Some(nose)) = (face.eyes(), face.nose_base) {
        let left_to_nose = (left.y - nose.y).abs();
        let right_to_nose = (right.y - nose.y).abs();
        let asymmetry = (left_to_nose - right_to_nose).abs() / h;
        push(SignalKind::Symmetry, 15.0 + asymmetry * 50.0, SYMMETRY_WEIGHT);
    }

    if let Some((left, right)) = face.eyes() {
        let eye_height = (left.y + right.y) / 2.0;
        let forehead_ratio = eye_height / h;
        let mut value = 12.0 + (1.0 - forehead_ratio) * 35.0;
        if glasses {
            value += GLASSES_FOREHEAD_OFFSET;
        }
        push(SignalKind::Forehead, value, FOREHEAD_WEIGHT);
    }

    let size_ratio = w / REFERENCE_FACE_WIDTH;
    let mut size = size_ratio * 15.0 + 8.0;
    if size_ratio < 0.8 {
        size -= 2.0;
    }
    push(SignalKind::FaceSize, size, SIZE_WEIGHT);

    if let (Some(eye_dist), Some(_)) = (face.eye_distance(), face.nose_base) {
        let nose_ratio = (eye_dist * NOSE_TO_EYE_DISTANCE) / w;
        push(SignalKind::Nose, 10.0 + nose_ratio * 100.0, NOSE_WEIGHT);
    }

    if let (Some(lc), Some(rc), Some(nose)) = (face.left_cheek, face.right_cheek, face.nose_base) {
        let avg = (lc.distance(&nose) + rc.distance(&nose)) / 2.0;
        push(SignalKind::Cheek, 8.0 + (avg / w) * 60.0, CHEEK_WEIGHT);
    }

    signals
}

/// Weighted mean of the signals, or `None` when there are none.
pub fn weighted_mean(signals: &[AgeSignal]) -> Option<f32> {
    let total_weight: f32 = signals.iter().map(|s| s.weight).sum();
    if signals.is_empty() || total_weight <= 0.0 {
        return None;
    }
    let sum: f32 = signals.iter().map(|s| s.value * s.weight).sum();
    Some(sum / total_weight)
}

fn validated_box(face: &FaceLandmarks) -> Result<BoundingBox, EstimateError> {
    let bbox = face
        .bounding_box
        .ok_or_else(|| EstimateError::InvalidInput("face has no bounding box".into()))?;
    if !bbox.is_valid() {
        return Err(EstimateError::InvalidInput(format!(
            "bounding box must have positive finite size, got {}x{}",
            bbox.width, bbox.height
        )));
    }
    Ok(bbox)
}

/// Estimate an age in `[8, 40]` from one detected face.
///
/// A face carrying no landmark points at all gets a uniform random age in
/// `[10, 29]` instead of a weighted estimate. Deterministic for a seeded `rng`.
pub fn estimate_age<R: Rng + ?Sized>(face: &FaceLandmarks, rng: &mut R) -> Result<u8, EstimateError> {
    let bbox = validated_box(face)?;

    if !face.has_landmarks() {
        let age = rng.gen_range(FALLBACK_AGE_MIN..=FALLBACK_AGE_MAX);
        tracing::debug!(age, "no landmarks; using fallback age");
        return Ok(age);
    }

    let glasses = detect_glasses(face);
    let signals = age_signals(face, &bbox, glasses);
    let Some(base) = weighted_mean(&signals) else {
        let age = rng.gen_range(FALLBACK_AGE_MIN..=FALLBACK_AGE_MAX);
        tracing::debug!(age, "no usable signals; using fallback age");
        return Ok(age);
    };

    let jitter: f32 = rng.gen_range(-JITTER_YEARS..=JITTER_YEARS);
    let mut age = (base + jitter).round() as i32;
    if glasses {
        age = (age - GLASSES_FINAL_OFFSET).max(MIN_AGE as i32);
    }
    let age = age.clamp(MIN_AGE as i32, MAX_AGE as i32) as u8;

    tracing::debug!(
        signals = signals.len(),
        base,
        jitter,
        glasses,
        age,
        "age estimated"
    );

    Ok(age)
}
