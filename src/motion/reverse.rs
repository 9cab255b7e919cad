//! Expanded → simple: rebuild authoring controls from stored request settings.
//!
//! Relative, speed and distance values come back rounded to 2 decimals.
//! Two losses are accepted rather than reported: a (stride, overlap) pair
//! outside the tier table reads as `Unknown`, and a formatted string with no
//! recognisable pairs reads as an empty list (unless `strict_strings` is set).

use log::{debug, warn};
use std::borrow::Cow;

use super::codec::{decode_motions, decode_prompts, is_ascending, round2, upgrade_legacy_prompts};
use super::error::{TransformError, TransformResult};
use super::forward::{END_PERCENT_SCALE, UNITS_PER_DISTANCE};
use super::keys::{K_INDIVIDUAL_NEGATIVE_PROMPTS, K_INDIVIDUAL_PROMPTS, K_MOTION_SCALES};
use super::types::{ExpandedMotionParams, InfluenceTuple, MotionContext, SimpleMotionParams, StrengthTuple};

/// Reverse transform options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseTransform {
    /// Offset subtracted from frame indices in the motion string
    pub buffer: i64,
    /// Fail on a non-blank formatted string that yields no pairs
    pub strict_strings: bool,
}

impl ReverseTransform {
    pub fn new(buffer: i64) -> Self {
        Self { buffer, strict_strings: false }
    }

    pub fn strict(mut self) -> Self {
        self.strict_strings = true;
        self
    }

    pub fn apply(&self, expanded: &ExpandedMotionParams) -> TransformResult<SimpleMotionParams> {
        let strength_of_frames = expanded
            .dynamic_strength_values
            .iter()
            .map(StrengthTuple::middle)
            .collect();
        let freedom_between_frames = freedoms(&expanded.dynamic_strength_values)?;
        let speed_of_transitions = speeds(&expanded.dynamic_key_frame_influence_values);
        let distance_to_next_frames = distances(&expanded.dynamic_frame_distribution_values);

        let type_of_motion_context =
            MotionContext::identify(expanded.context_stride, expanded.context_overlap);
        if type_of_motion_context == MotionContext::Unknown {
            warn!(
                "context (stride {}, overlap {}) matches no tier, reading as Unknown",
                expanded.context_stride, expanded.context_overlap
            );
        }

        let legacy = expanded.format_version == 0;
        let individual_prompts =
            self.prompts(K_INDIVIDUAL_PROMPTS, &expanded.individual_prompts, legacy)?;
        let individual_negative_prompts = self.prompts(
            K_INDIVIDUAL_NEGATIVE_PROMPTS,
            &expanded.individual_negative_prompts,
            legacy,
        )?;
        let motions_during_frames = self.motions(&expanded.motion_scales)?;

        debug!(
            "reverse transform: {} frames, {} prompts, {} motions",
            expanded.frame_count(),
            individual_prompts.len(),
            motions_during_frames.len()
        );

        Ok(SimpleMotionParams {
            strength_of_frames,
            freedom_between_frames,
            speed_of_transitions,
            distance_to_next_frames,
            type_of_motion_context,
            strength_of_adherence: expanded.multiplied_base_end_percent / END_PERCENT_SCALE,
            individual_prompts,
            individual_negative_prompts,
            motions_during_frames,
            buffer: self.buffer,
        })
    }

    fn prompts(&self, field: &str, formatted: &str, legacy: bool) -> TransformResult<Vec<String>> {
        let text: Cow<'_, str> = if legacy {
            upgrade_legacy_prompts(formatted)
        } else {
            Cow::Borrowed(formatted)
        };
        let pairs = decode_prompts(field, &text)?;
        self.check_nonempty(field, &text, pairs.len())?;
        let fractions: Vec<f64> = pairs.iter().map(|p| p.fraction).collect();
        if !is_ascending(&fractions) {
            warn!("{}: positions out of order, prompts kept in string order", field);
        }
        Ok(pairs.into_iter().map(|p| p.text).collect())
    }

    fn motions(&self, formatted: &str) -> TransformResult<Vec<f64>> {
        let pairs = decode_motions(K_MOTION_SCALES, formatted, self.buffer)?;
        self.check_nonempty(K_MOTION_SCALES, formatted, pairs.len())?;
        let frames: Vec<i64> = pairs.iter().map(|p| p.frame).collect();
        if !is_ascending(&frames) {
            warn!("{}: frame indices out of order, strengths kept in string order", K_MOTION_SCALES);
        }
        Ok(pairs.into_iter().map(|p| p.strength).collect())
    }

    fn check_nonempty(&self, field: &str, formatted: &str, found: usize) -> TransformResult<()> {
        if self.strict_strings && found == 0 && !formatted.trim().is_empty() {
            return Err(TransformError::malformed(field, "no pairs found"));
        }
        Ok(())
    }
}

/// Lenient reverse transform.
pub fn reverse_transform(
    expanded: &ExpandedMotionParams,
    buffer: i64,
) -> TransformResult<SimpleMotionParams> {
    ReverseTransform::new(buffer).apply(expanded)
}

fn freedoms(strengths: &[StrengthTuple]) -> TransformResult<Vec<f64>> {
    let mut out = Vec::new();
    for (frame, tuple) in strengths.iter().enumerate().skip(1) {
        let Some(adjusted) = tuple.prev_adjusted() else {
            continue;
        };
        let middle = tuple.middle();
        if middle == 0.0 {
            return Err(TransformError::DegenerateStrength { frame });
        }
        out.push(round2((middle - adjusted) / middle));
    }
    Ok(out)
}

fn speeds(influences: &[InfluenceTuple]) -> Vec<f64> {
    let Some((_, leading)) = influences.split_last() else {
        return Vec::new();
    };
    leading
        .iter()
        .filter_map(InfluenceTuple::next)
        .map(|next| round2(1.0 - next / 2.0))
        .collect()
}

fn distances(positions: &[i64]) -> Vec<f64> {
    positions
        .windows(2)
        .map(|w| round2((w[1] - w[0]) as f64 / UNITS_PER_DISTANCE))
        .collect()
}
