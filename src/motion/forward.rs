//! Simple → expanded: authoring controls into backend request settings.
//!
//! Per frame `i` of `n`:
//! - strength tuple `(middle * (1 - freedom[i-1]), middle, middle * (1 - freedom[i]))`,
//!   with `None` on the open side of the first and last frame
//! - influence tuple `(current, next)` where `next = 2 * (1 - speed[i])` clamped to
//!   `0.0..=2.0`, and `current` repeats the previous tuple's `next`
//! - absolute position `base + round(sum(distance[..i]) * 16)`

use log::debug;

use super::codec::{FORMAT_VERSION, encode_motions, encode_prompts};
use super::error::{TransformError, TransformResult};
use super::types::{
    DEFAULT_CONTEXT_LENGTH, ExpandedMotionParams, InfluenceTuple, SimpleMotionParams, StrengthTuple,
};

/// Position units per unit of `distance_to_next_frames`.
pub const UNITS_PER_DISTANCE: f64 = 16.0;
/// `multipled_base_end_percent = adherence * END_PERCENT_SCALE` (0.05 * 10)
pub const END_PERCENT_SCALE: f64 = 0.05 * 10.0;
/// `multipled_base_adapter_strength = adherence * ADAPTER_STRENGTH_SCALE` (0.05 * 20)
pub const ADAPTER_STRENGTH_SCALE: f64 = 0.05 * 20.0;
/// Valid range of a key-frame influence value.
pub const INFLUENCE_RANGE: (f64, f64) = (0.0, 2.0);

/// Forward transform options.
#[derive(Debug, Clone, Copy)]
pub struct ForwardTransform {
    /// Offset added to frame indices in the motion string
    pub buffer: i64,
    /// Position of the first frame
    pub base_offset: i64,
    pub context_length: i64,
}

impl Default for ForwardTransform {
    fn default() -> Self {
        Self {
            buffer: 0,
            base_offset: 0,
            context_length: DEFAULT_CONTEXT_LENGTH,
        }
    }
}

impl ForwardTransform {
    pub fn new(buffer: i64) -> Self {
        Self { buffer, ..Default::default() }
    }

    /// Start positions from an existing first-frame position instead of 0.
    pub fn with_base_offset(mut self, base_offset: i64) -> Self {
        self.base_offset = base_offset;
        self
    }

    pub fn with_context_length(mut self, context_length: i64) -> Self {
        self.context_length = context_length;
        self
    }

    pub fn apply(
        &self,
        params: &SimpleMotionParams,
        frame_count: usize,
    ) -> TransformResult<ExpandedMotionParams> {
        if frame_count == 0 {
            return Err(TransformError::MalformedInput {
                field: "strength_of_frames",
                expected: 1,
                actual: 0,
            });
        }
        params.validate(frame_count)?;

        let (context_stride, context_overlap) = params
            .type_of_motion_context
            .stride_overlap()
            .ok_or_else(|| {
                TransformError::UnsupportedMotionContext(
                    params.type_of_motion_context.as_str().to_string(),
                )
            })?;

        let strengths = strength_tuples(&params.strength_of_frames, &params.freedom_between_frames);
        let influences = influence_tuples(frame_count, &params.speed_of_transitions);
        let positions = frame_positions(self.base_offset, &params.distance_to_next_frames);

        let fractions = position_fractions(&positions);
        let individual_prompts = format_prompts(&fractions, &params.individual_prompts);
        let individual_negative_prompts =
            format_prompts(&fractions, &params.individual_negative_prompts);
        let motion_scales = encode_motions(&params.motions_during_frames, self.buffer);

        debug!(
            "forward transform: {} frames, context {} -> ({}, {}), span {}..{}",
            frame_count,
            params.type_of_motion_context.as_str(),
            context_stride,
            context_overlap,
            positions.first().copied().unwrap_or(0),
            positions.last().copied().unwrap_or(0),
        );

        Ok(ExpandedMotionParams {
            dynamic_strength_values: strengths,
            dynamic_key_frame_influence_values: influences,
            dynamic_frame_distribution_values: positions,
            context_length: self.context_length,
            context_stride,
            context_overlap,
            multiplied_base_end_percent: params.strength_of_adherence * END_PERCENT_SCALE,
            multiplied_base_adapter_strength: params.strength_of_adherence * ADAPTER_STRENGTH_SCALE,
            individual_prompts,
            individual_negative_prompts,
            motion_scales,
            buffer: self.buffer,
            format_version: FORMAT_VERSION,
        })
    }
}

/// Forward transform with positions starting at 0.
pub fn forward_transform(
    params: &SimpleMotionParams,
    frame_count: usize,
    buffer: i64,
) -> TransformResult<ExpandedMotionParams> {
    ForwardTransform::new(buffer).apply(params, frame_count)
}

fn strength_tuples(strengths: &[f64], freedoms: &[f64]) -> Vec<StrengthTuple> {
    let last = strengths.len() - 1;
    strengths
        .iter()
        .enumerate()
        .map(|(i, &middle)| {
            let prev = (i > 0).then(|| middle * (1.0 - freedoms[i - 1]));
            let next = (i < last).then(|| middle * (1.0 - freedoms[i]));
            StrengthTuple(prev, middle, next)
        })
        .collect()
}

fn influence_tuples(frame_count: usize, speeds: &[f64]) -> Vec<InfluenceTuple> {
    let mut tuples = vec![InfluenceTuple(None, None); frame_count];
    for (i, speed) in speeds.iter().enumerate() {
        let inverted = (2.0 * (1.0 - speed)).clamp(INFLUENCE_RANGE.0, INFLUENCE_RANGE.1);
        tuples[i].1 = Some(inverted);
        tuples[i + 1].0 = Some(inverted);
    }
    tuples
}

fn frame_positions(base_offset: i64, distances: &[f64]) -> Vec<i64> {
    let mut positions = Vec::with_capacity(distances.len() + 1);
    positions.push(base_offset);
    let mut total = 0.0;
    for distance in distances {
        total += distance;
        positions.push(base_offset + (total * UNITS_PER_DISTANCE).round() as i64);
    }
    positions
}

/// Position of each frame as a fraction of the shot span. A zero span puts every frame at 0.
fn position_fractions(positions: &[i64]) -> Vec<f64> {
    let first = positions.first().copied().unwrap_or(0);
    let span = positions.last().copied().unwrap_or(0) - first;
    positions
        .iter()
        .map(|p| if span > 0 { (p - first) as f64 / span as f64 } else { 0.0 })
        .collect()
}

fn format_prompts(fractions: &[f64], prompts: &[String]) -> String {
    encode_prompts(fractions.iter().copied().zip(prompts.iter().map(String::as_str)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::types::MotionContext;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn three_frames() -> SimpleMotionParams {
        SimpleMotionParams {
            strength_of_frames: vec![1.0, 0.8, 0.6],
            freedom_between_frames: vec![0.25, 0.5],
            speed_of_transitions: vec![0.5, 0.25],
            distance_to_next_frames: vec![1.0, 2.5],
            type_of_motion_context: MotionContext::Low,
            strength_of_adherence: 0.6,
            individual_prompts: vec!["a".into(), "b".into(), "c".into()],
            individual_negative_prompts: vec![],
            motions_during_frames: vec![1.0, 1.25, 0.5],
            buffer: 0,
        }
    }

    #[test]
    fn test_strength_tuples() {
        let out = forward_transform(&three_frames(), 3, 0).unwrap();
        let s = &out.dynamic_strength_values;
        assert_eq!(s.len(), 3);

        assert_eq!(s[0].prev_adjusted(), None);
        assert_eq!(s[0].middle(), 1.0);
        assert!(approx(s[0].next_adjusted().unwrap(), 0.75));

        assert!(approx(s[1].prev_adjusted().unwrap(), 0.6));
        assert!(approx(s[1].next_adjusted().unwrap(), 0.4));

        assert!(approx(s[2].prev_adjusted().unwrap(), 0.3));
        assert_eq!(s[2].next_adjusted(), None);
    }

    #[test]
    fn test_influence_tuples() {
        let out = forward_transform(&three_frames(), 3, 0).unwrap();
        let k = &out.dynamic_key_frame_influence_values;
        assert_eq!(k, &vec![
            InfluenceTuple(None, Some(1.0)),
            InfluenceTuple(Some(1.0), Some(1.5)),
            InfluenceTuple(Some(1.5), None),
        ]);
    }

    #[test]
    fn test_influence_clamped() {
        let mut p = three_frames();
        p.speed_of_transitions = vec![-0.5, 1.5];
        let out = forward_transform(&p, 3, 0).unwrap();
        let k = &out.dynamic_key_frame_influence_values;
        assert_eq!(k[0].next(), Some(2.0));
        assert_eq!(k[1].next(), Some(0.0));
    }

    #[test]
    fn test_frame_distribution() {
        let out = forward_transform(&three_frames(), 3, 0).unwrap();
        assert_eq!(out.dynamic_frame_distribution_values, vec![0, 16, 56]);

        let out = ForwardTransform::new(0)
            .with_base_offset(8)
            .apply(&three_frames(), 3)
            .unwrap();
        assert_eq!(out.dynamic_frame_distribution_values, vec![8, 24, 64]);
    }

    #[test]
    fn test_context_and_adherence() {
        let out = forward_transform(&three_frames(), 3, 0).unwrap();
        assert_eq!((out.context_length, out.context_stride, out.context_overlap), (16, 1, 2));
        assert!(approx(out.multiplied_base_end_percent, 0.3));
        assert!(approx(out.multiplied_base_adapter_strength, 0.6));
    }

    #[test]
    fn test_unknown_context_rejected() {
        let mut p = three_frames();
        p.type_of_motion_context = MotionContext::Unknown;
        let err = forward_transform(&p, 3, 0).unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedMotionContext(_)));
    }

    #[test]
    fn test_formatted_strings() {
        let out = forward_transform(&three_frames(), 3, 4).unwrap();
        assert_eq!(out.motion_scales, "4:(1.0)5:(1.25)6:(0.5)");
        assert_eq!(
            out.individual_prompts,
            r#""0.0000": "a", "0.2857": "b", "1.0000": "c""#
        );
        assert_eq!(out.individual_negative_prompts, "");
        assert_eq!(out.buffer, 4);
        assert_eq!(out.format_version, FORMAT_VERSION);
    }

    #[test]
    fn test_length_mismatch() {
        let mut p = three_frames();
        p.freedom_between_frames.pop();
        let err = forward_transform(&p, 3, 0).unwrap_err();
        assert!(matches!(
            err,
            TransformError::MalformedInput { field: "freedom_between_frames", .. }
        ));

        let err = forward_transform(&three_frames(), 0, 0).unwrap_err();
        assert!(matches!(err, TransformError::MalformedInput { .. }));
    }

    #[test]
    fn test_single_frame() {
        let p = SimpleMotionParams {
            strength_of_frames: vec![0.9],
            motions_during_frames: vec![1.0],
            individual_prompts: vec!["only".into()],
            ..Default::default()
        };
        let out = forward_transform(&p, 1, 0).unwrap();
        assert_eq!(out.dynamic_strength_values, vec![StrengthTuple(None, 0.9, None)]);
        assert_eq!(out.dynamic_key_frame_influence_values, vec![InfluenceTuple(None, None)]);
        assert_eq!(out.dynamic_frame_distribution_values, vec![0]);
        assert_eq!(out.individual_prompts, r#""0.0000": "only""#);
    }
}
