//! Simple (authoring) and expanded (backend) motion parameter models.

use serde::{Deserialize, Serialize};

use super::error::{TransformError, TransformResult};

/// Context window length used by every motion-context tier.
pub const DEFAULT_CONTEXT_LENGTH: i64 = 16;

/// Discrete motion-context tier, selects a (context_stride, context_overlap) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MotionContext {
    Low,
    #[default]
    Standard,
    High,
    Unknown,
}

impl MotionContext {
    /// Tier table shared by both transform directions.
    const TIERS: [(MotionContext, i64, i64); 3] = [
        (MotionContext::Low, 1, 2),
        (MotionContext::Standard, 2, 4),
        (MotionContext::High, 4, 4),
    ];

    /// (stride, overlap) for a known tier, `None` for `Unknown`.
    pub fn stride_overlap(self) -> Option<(i64, i64)> {
        Self::TIERS
            .iter()
            .find(|(tier, _, _)| *tier == self)
            .map(|(_, stride, overlap)| (*stride, *overlap))
    }

    /// Exact match against the tier table; any other pair is `Unknown`.
    pub fn identify(stride: i64, overlap: i64) -> Self {
        Self::TIERS
            .iter()
            .find(|(_, s, o)| *s == stride && *o == overlap)
            .map(|(tier, _, _)| *tier)
            .unwrap_or(MotionContext::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionContext::Low => "Low",
            MotionContext::Standard => "Standard",
            MotionContext::High => "High",
            MotionContext::Unknown => "Unknown",
        }
    }

    pub fn from_name(s: &str) -> Self {
        match s {
            "Low" => MotionContext::Low,
            "Standard" => MotionContext::Standard,
            "High" => MotionContext::High,
            _ => MotionContext::Unknown,
        }
    }

    /// Position in the tier selector (Low, Standard, High). `Unknown` lands on the last slot.
    pub fn selector_index(&self) -> usize {
        match self {
            MotionContext::Low => 0,
            MotionContext::Standard => 1,
            _ => 2,
        }
    }

    pub fn from_selector_index(index: usize) -> Self {
        match index {
            0 => MotionContext::Low,
            1 => MotionContext::Standard,
            _ => MotionContext::High,
        }
    }
}

/// User-facing motion authoring model for one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimpleMotionParams {
    /// One per key frame, 0.0..=1.0
    pub strength_of_frames: Vec<f64>,
    /// frames - 1 entries, roughly -1.0..=1.0
    pub freedom_between_frames: Vec<f64>,
    /// frames - 1 entries, 0.0..=1.0
    pub speed_of_transitions: Vec<f64>,
    /// frames - 1 entries, non-negative
    pub distance_to_next_frames: Vec<f64>,
    pub type_of_motion_context: MotionContext,
    pub strength_of_adherence: f64,
    pub individual_prompts: Vec<String>,
    pub individual_negative_prompts: Vec<String>,
    /// One per key frame
    pub motions_during_frames: Vec<f64>,
    pub buffer: i64,
}

impl SimpleMotionParams {
    pub fn frame_count(&self) -> usize {
        self.strength_of_frames.len()
    }

    /// Check every sequence length against `frames`.
    ///
    /// Between-frame sequences must hold exactly `frames - 1` values. Prompt
    /// lists may be empty (no prompts) but otherwise hold one entry per frame.
    pub fn validate(&self, frames: usize) -> TransformResult<()> {
        let pairs = frames.saturating_sub(1);
        check_len("strength_of_frames", self.strength_of_frames.len(), frames)?;
        check_len("freedom_between_frames", self.freedom_between_frames.len(), pairs)?;
        check_len("speed_of_transitions", self.speed_of_transitions.len(), pairs)?;
        check_len("distance_to_next_frames", self.distance_to_next_frames.len(), pairs)?;
        check_len("motions_during_frames", self.motions_during_frames.len(), frames)?;
        if !self.individual_prompts.is_empty() {
            check_len("individual_prompts", self.individual_prompts.len(), frames)?;
        }
        if !self.individual_negative_prompts.is_empty() {
            check_len(
                "individual_negative_prompts",
                self.individual_negative_prompts.len(),
                frames,
            )?;
        }
        if let Some(d) = self.distance_to_next_frames.iter().find(|d| **d < 0.0 || !d.is_finite()) {
            return Err(TransformError::OutOfRange {
                field: "distance_to_next_frames",
                value: *d,
            });
        }
        Ok(())
    }
}

fn check_len(field: &'static str, actual: usize, expected: usize) -> TransformResult<()> {
    if actual != expected {
        return Err(TransformError::MalformedInput { field, expected, actual });
    }
    Ok(())
}

/// `(prev_adjusted, middle, next_adjusted)`; boundary frames carry `None` on the open side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthTuple(pub Option<f64>, pub f64, pub Option<f64>);

impl StrengthTuple {
    pub fn prev_adjusted(&self) -> Option<f64> {
        self.0
    }

    pub fn middle(&self) -> f64 {
        self.1
    }

    pub fn next_adjusted(&self) -> Option<f64> {
        self.2
    }
}

/// `(current, next)` inverted half-scale transition speeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfluenceTuple(pub Option<f64>, pub Option<f64>);

impl InfluenceTuple {
    pub fn current(&self) -> Option<f64> {
        self.0
    }

    pub fn next(&self) -> Option<f64> {
        self.1
    }
}

/// Backend-facing motion settings, serialized under the request's wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedMotionParams {
    pub dynamic_strength_values: Vec<StrengthTuple>,
    pub dynamic_key_frame_influence_values: Vec<InfluenceTuple>,
    pub dynamic_frame_distribution_values: Vec<i64>,
    pub context_length: i64,
    pub context_stride: i64,
    pub context_overlap: i64,
    #[serde(rename = "multipled_base_end_percent")]
    pub multiplied_base_end_percent: f64,
    #[serde(rename = "multipled_base_adapter_strength", default)]
    pub multiplied_base_adapter_strength: f64,
    pub individual_prompts: String,
    pub individual_negative_prompts: String,
    pub motion_scales: String,
    #[serde(default)]
    pub buffer: i64,
    /// Grammar revision of the formatted strings; 0 marks records written
    /// before the field existed
    #[serde(rename = "motion_format_version", default)]
    pub format_version: u32,
}

impl ExpandedMotionParams {
    pub fn frame_count(&self) -> usize {
        self.dynamic_strength_values.len()
    }
}
