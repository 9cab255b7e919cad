//! String micro-formats and numeric coercions shared by both transforms.
//!
//! # Prompt pairs
//!
//! `"<fraction>": "<text>"` segments joined by `", "`. The fraction is the
//! frame's position within the shot's span, printed with 4 decimals. A `"`
//! inside the text is doubled.
//!
//! ```text
//! "0.0000": "a cat", "0.2857": "a ""big"" cat", "1.0000": ""
//! ```
//!
//! # Motion pairs
//!
//! `<frame + buffer>:(<strength>)` segments, concatenated without separator.
//! The decoder also accepts `", "` between segments.
//!
//! ```text
//! 8:(0.5)9:(0.8)
//! ```
//!
//! Decoders return pairs in the order they appear in the string.
//!
//! # Versions
//!
//! - 0: unversioned records. Quotes are not escaped and an empty prompt may
//!   be stored as `"""`, see [`upgrade_legacy_prompts`].
//! - 1: the grammars above.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

use super::error::{TransformError, TransformResult};

/// Grammar revision of the prompt/motion strings written by this crate.
pub const FORMAT_VERSION: u32 = 1;

lazy_static! {
    static ref PROMPT_PAIR: Regex =
        Regex::new(r#""(\d+(?:\.\d+)?)":\s*"((?:[^"]|"")*)""#).expect("prompt pair regex");
    static ref MOTION_PAIR: Regex =
        Regex::new(r"(-?\d+):\(([^)]*)\)").expect("motion pair regex");
}

/// Round to 2 decimals, the precision of every reconstructed relative value.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shortest text that parses back to the same float, always with a decimal point.
pub fn fmt_float(value: f64) -> String {
    format!("{:?}", value)
}

// === Prompt pairs ===

/// Prompt text at a fractional position along the shot.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    pub fraction: f64,
    pub text: String,
}

pub fn encode_prompts<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (f64, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(fraction, text)| format!("\"{:.4}\": \"{}\"", fraction, text.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extract every prompt pair. Zero matches is an empty list, not an error.
pub fn decode_prompts(field: &str, formatted: &str) -> TransformResult<Vec<PromptPair>> {
    let mut pairs = Vec::new();
    for caps in PROMPT_PAIR.captures_iter(formatted) {
        let fraction = parse_f64(field, &caps[1])?;
        pairs.push(PromptPair {
            fraction,
            text: caps[2].replace("\"\"", "\""),
        });
    }
    if pairs.is_empty() && !formatted.trim().is_empty() {
        log::warn!("{}: no prompt pairs found in {:?}", field, formatted);
    }
    Ok(pairs)
}

const LEGACY_EMPTY_PROMPT: &str = "\"\"\"";

/// Rewrite an unversioned prompt string into the current grammar.
///
/// Old writers stored an empty prompt as `"""`; it reads as `""`.
pub fn upgrade_legacy_prompts(formatted: &str) -> Cow<'_, str> {
    if formatted.contains(LEGACY_EMPTY_PROMPT) {
        Cow::Owned(formatted.replace(LEGACY_EMPTY_PROMPT, "\"\""))
    } else {
        Cow::Borrowed(formatted)
    }
}

// === Motion pairs ===

/// Motion strength at a frame index (buffer already removed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPair {
    pub frame: i64,
    pub strength: f64,
}

pub fn encode_motions(strengths: &[f64], buffer: i64) -> String {
    strengths
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}:({})", i as i64 + buffer, fmt_float(*s)))
        .collect()
}

/// Extract every motion pair and subtract `buffer` from its frame index.
pub fn decode_motions(field: &str, formatted: &str, buffer: i64) -> TransformResult<Vec<MotionPair>> {
    let mut pairs = Vec::new();
    for caps in MOTION_PAIR.captures_iter(formatted) {
        let frame = parse_i64(field, &caps[1])?;
        let strength = parse_f64(field, &caps[2])?;
        pairs.push(MotionPair {
            frame: frame - buffer,
            strength,
        });
    }
    if pairs.is_empty() && !formatted.trim().is_empty() {
        log::warn!("{}: no motion pairs found in {:?}", field, formatted);
    }
    Ok(pairs)
}

/// True when `keys` never decreases.
pub fn is_ascending<T: PartialOrd>(keys: &[T]) -> bool {
    keys.windows(2).all(|w| w[0] <= w[1])
}

// === Numeric coercions ===

pub fn parse_f64(field: &str, text: &str) -> TransformResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| TransformError::coercion(field, text))
}

/// Integer text; an integral float such as `"16.0"` is accepted too.
pub fn parse_i64(field: &str, text: &str) -> TransformResult<i64> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(TransformError::coercion(field, text)),
    }
}

/// Number or numeric string.
pub fn value_to_f64(field: &str, value: &Value) -> TransformResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| TransformError::coercion(field, n)),
        Value::String(s) => parse_f64(field, s),
        other => Err(TransformError::coercion(field, other)),
    }
}

pub fn value_to_i64(field: &str, value: &Value) -> TransformResult<i64> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => Ok(v),
            None => parse_i64(field, &n.to_string()),
        },
        Value::String(s) => parse_i64(field, s),
        other => Err(TransformError::coercion(field, other)),
    }
}

/// Text field; `null` reads as empty.
pub fn value_to_string(field: &str, value: &Value) -> TransformResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(TransformError::malformed(field, format!("expected text, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.333333), 0.33);
        assert_eq!(round2(0.126), 0.13);
        assert_eq!(round2(-0.124), -0.12);
    }

    #[test]
    fn test_fmt_float_keeps_decimal_point() {
        assert_eq!(fmt_float(1.0), "1.0");
        assert_eq!(fmt_float(0.5), "0.5");
        assert_eq!(fmt_float(1.25), "1.25");
    }

    #[test]
    fn test_motion_string_with_buffer() {
        let s = encode_motions(&[0.5, 0.8], 8);
        assert_eq!(s, "8:(0.5)9:(0.8)");

        let pairs = decode_motions("motion_scales", &s, 8).unwrap();
        assert_eq!(pairs, vec![
            MotionPair { frame: 0, strength: 0.5 },
            MotionPair { frame: 1, strength: 0.8 },
        ]);
    }

    #[test]
    fn test_motion_decoder_tolerates_separators() {
        let pairs = decode_motions("motion_scales", "0:(1.0), 16:(1.25), 56:(0.9)", 0).unwrap();
        let strengths: Vec<f64> = pairs.iter().map(|p| p.strength).collect();
        assert_eq!(strengths, vec![1.0, 1.25, 0.9]);
        assert_eq!(pairs[2].frame, 56);
    }

    #[test]
    fn test_motion_decoder_rejects_non_numeric_strength() {
        let err = decode_motions("motion_scales", "3:(fast)", 0).unwrap_err();
        assert!(matches!(err, TransformError::TypeCoercionError { .. }));
    }

    #[test]
    fn test_prompt_pairs_escape_quotes() {
        let s = encode_prompts([(0.0, "a cat"), (0.5, "say \"hi\""), (1.0, "")]);
        assert_eq!(
            s,
            r#""0.0000": "a cat", "0.5000": "say ""hi""", "1.0000": """#
        );

        let pairs = decode_prompts("individual_prompts", &s).unwrap();
        let texts: Vec<&str> = pairs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["a cat", "say \"hi\"", ""]);
        assert_eq!(pairs[1].fraction, 0.5);
    }

    #[test]
    fn test_prompt_text_ending_in_quote() {
        let s = encode_prompts([(0.0, "end\""), (1.0, "next")]);
        let pairs = decode_prompts("individual_prompts", &s).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].text, "end\"");
        assert_eq!(pairs[1].text, "next");
    }

    #[test]
    fn test_prompt_decoder_zero_matches_is_empty() {
        assert!(decode_prompts("individual_prompts", "").unwrap().is_empty());
        assert!(decode_prompts("individual_prompts", "garbage without pairs").unwrap().is_empty());
    }

    #[test]
    fn test_legacy_empty_prompt() {
        let legacy = "\"0.0\": \"\"\", \"1.0\": \"x\"";
        let pairs = decode_prompts("individual_prompts", &upgrade_legacy_prompts(legacy)).unwrap();
        let texts: Vec<&str> = pairs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["", "x"]);

        assert!(matches!(upgrade_legacy_prompts("\"0.0\": \"a\""), Cow::Borrowed(_)));
    }

    #[test]
    fn test_prompt_decoder_keeps_appearance_order() {
        let pairs = decode_prompts("individual_prompts", r#""0.9": "late", "0.1": "early""#).unwrap();
        assert_eq!(pairs[0].text, "late");
        assert!(!is_ascending(&pairs.iter().map(|p| p.fraction).collect::<Vec<_>>()));
    }

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(parse_i64("context_length", "16").unwrap(), 16);
        assert_eq!(parse_i64("context_length", "16.0").unwrap(), 16);
        assert!(parse_i64("context_length", "16.5").is_err());
        assert!(parse_f64("end", "abc").is_err());

        assert_eq!(value_to_f64("end", &serde_json::json!("0.3")).unwrap(), 0.3);
        assert_eq!(value_to_i64("stride", &serde_json::json!(2)).unwrap(), 2);
        assert_eq!(value_to_i64("stride", &serde_json::json!(2.0)).unwrap(), 2);
        assert!(value_to_i64("stride", &serde_json::json!(true)).is_err());
        assert_eq!(value_to_string("p", &Value::Null).unwrap(), "");
    }
}
