//! Photo analysis: first detected face → age → verdict.

use crate::age::{self, EstimateError};
use crate::types::FaceLandmarks;
use crate::verdict::{self, Verdict};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("no face detected; try again with a clearer photo")]
    NoFaceDetected,
    #[error("age estimation failed: {0}")]
    Estimate(#[from] EstimateError),
}

/// Result of analysing one photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    /// Number of faces the detector reported.
    pub faces: usize,
    pub age: u8,
    pub glasses: bool,
    pub verdict: Verdict,
}

/// Analyse the faces reported for one photo.
///
/// Only the first face is used; detectors order faces by confidence.
pub fn analyze<R: Rng + ?Sized>(faces: &[FaceLandmarks], rng: &mut R) -> Result<Analysis, AnalysisError> {
    let face = faces.first().ok_or(AnalysisError::NoFaceDetected)?;

    let age = age::estimate_age(face, rng)?;
    let glasses = age::detect_glasses(face);
    let verdict = verdict::classify(age, rng);

    tracing::debug!(
        faces = faces.len(),
        age,
        glasses,
        is_virgin = verdict.is_virgin,
        confidence = verdict.confidence,
        "analysis complete"
    );

    Ok(Analysis {
        faces: faces.len(),
        age,
        glasses,
        verdict,
    })
}
