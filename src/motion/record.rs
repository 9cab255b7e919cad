//! Inference-log ingestion: find the stored settings and type them.
//!
//! A log's `input_params` is a JSON object. Interpolation runs nest their
//! settings under `origin_data.settings` (tagged `inference_type ==
//! "frame_interpolation"`); anything else keeps them at the top level next to
//! backend bookkeeping entries, which are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::codec::{value_to_f64, value_to_i64, value_to_string};
use super::error::{TransformError, TransformResult};
use super::keys::*;
use super::literal::{Literal, Setting};
use super::reverse::ReverseTransform;
use super::types::{ExpandedMotionParams, InfluenceTuple, SimpleMotionParams, StrengthTuple};

/// Stored record of a past generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceLog {
    /// Serialized JSON object of the request parameters
    #[serde(default)]
    pub input_params: Option<String>,
}

impl InferenceLog {
    pub fn new(input_params: impl Into<String>) -> Self {
        Self { input_params: Some(input_params.into()) }
    }

    /// Settings that produced this log, `None` when the log holds no parameters.
    pub fn settings(&self) -> TransformResult<Option<Map<String, Value>>> {
        match self.input_params.as_deref() {
            Some(text) if !text.trim().is_empty() => fetch_inference_data(text),
            _ => Ok(None),
        }
    }

    /// Rebuild simple params using the buffer recorded in the settings.
    pub fn load_simple_params(&self) -> TransformResult<Option<SimpleMotionParams>> {
        let Some(settings) = self.settings()? else {
            return Ok(None);
        };
        let expanded = ExpandedMotionParams::from_settings(&settings)?;
        ReverseTransform::new(expanded.buffer).apply(&expanded).map(Some)
    }
}

/// Apply the nesting rule to serialized `input_params`.
pub fn fetch_inference_data(input_params: &str) -> TransformResult<Option<Map<String, Value>>> {
    let Value::Object(mut data) = serde_json::from_str::<Value>(input_params)? else {
        return Err(TransformError::malformed("input_params", "expected a JSON object"));
    };

    let nested = data
        .get(K_ORIGIN_DATA)
        .and_then(|origin| {
            let tag = origin.get(K_INFERENCE_TYPE)?.as_str()?;
            (tag == INFERENCE_TYPE_FRAME_INTERPOLATION).then(|| origin.get(K_SETTINGS))?
        })
        .cloned();

    if let Some(settings) = nested {
        return match settings {
            Value::Object(map) => Ok(Some(map)),
            Value::Null => Ok(None),
            _ => Err(TransformError::malformed(
                "origin_data.settings",
                "expected a JSON object",
            )),
        };
    }

    for key in BOOKKEEPING_KEYS {
        data.remove(*key);
    }
    Ok((!data.is_empty()).then_some(data))
}

impl ExpandedMotionParams {
    /// Type the recognised fields of a stored settings map.
    ///
    /// Tuple lists may be native arrays or literal text; scalars may be numbers
    /// or numeric text. `buffer` defaults to 0, the adapter strength to 0, and a
    /// missing `motion_format_version` marks an unversioned record.
    pub fn from_settings(settings: &Map<String, Value>) -> TransformResult<Self> {
        let strengths = setting(settings, K_DYNAMIC_STRENGTH_VALUES)?;
        let influences = setting(settings, K_DYNAMIC_KEY_FRAME_INFLUENCE_VALUES)?;
        let positions = setting(settings, K_DYNAMIC_FRAME_DISTRIBUTION_VALUES)?;

        Ok(Self {
            dynamic_strength_values: strength_tuples(&strengths)?,
            dynamic_key_frame_influence_values: influence_tuples(&influences)?,
            dynamic_frame_distribution_values: positions_from(&positions)?,
            context_length: value_to_i64(K_CONTEXT_LENGTH, required(settings, K_CONTEXT_LENGTH)?)?,
            context_stride: value_to_i64(K_CONTEXT_STRIDE, required(settings, K_CONTEXT_STRIDE)?)?,
            context_overlap: value_to_i64(K_CONTEXT_OVERLAP, required(settings, K_CONTEXT_OVERLAP)?)?,
            multiplied_base_end_percent: value_to_f64(
                K_MULTIPLIED_BASE_END_PERCENT,
                required(settings, K_MULTIPLIED_BASE_END_PERCENT)?,
            )?,
            multiplied_base_adapter_strength: settings
                .get(K_MULTIPLIED_BASE_ADAPTER_STRENGTH)
                .map(|v| value_to_f64(K_MULTIPLIED_BASE_ADAPTER_STRENGTH, v))
                .transpose()?
                .unwrap_or(0.0),
            individual_prompts: optional_text(settings, K_INDIVIDUAL_PROMPTS)?,
            individual_negative_prompts: optional_text(settings, K_INDIVIDUAL_NEGATIVE_PROMPTS)?,
            motion_scales: optional_text(settings, K_MOTION_SCALES)?,
            buffer: settings
                .get(K_BUFFER)
                .map(|v| value_to_i64(K_BUFFER, v))
                .transpose()?
                .unwrap_or(0),
            format_version: settings
                .get(K_MOTION_FORMAT_VERSION)
                .map(|v| {
                    let version = value_to_i64(K_MOTION_FORMAT_VERSION, v)?;
                    u32::try_from(version)
                        .map_err(|_| TransformError::coercion(K_MOTION_FORMAT_VERSION, version))
                })
                .transpose()?
                .unwrap_or(0),
        })
    }
}

fn required<'a>(settings: &'a Map<String, Value>, key: &str) -> TransformResult<&'a Value> {
    settings
        .get(key)
        .ok_or_else(|| TransformError::malformed(key, "missing from stored settings"))
}

fn setting(settings: &Map<String, Value>, key: &str) -> TransformResult<Setting> {
    required(settings, key).map(Setting::from_json)
}

fn optional_text(settings: &Map<String, Value>, key: &str) -> TransformResult<String> {
    settings
        .get(key)
        .map(|v| value_to_string(key, v))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn tuple_items<'a>(field: &str, item: &'a Literal, arity: usize) -> TransformResult<&'a [Literal]> {
    match item.items() {
        Some(values) if values.len() == arity => Ok(values),
        _ => Err(TransformError::malformed(
            field,
            format!("expected a {}-tuple, got {:?}", arity, item),
        )),
    }
}

fn strength_tuples(setting: &Setting) -> TransformResult<Vec<StrengthTuple>> {
    let field = K_DYNAMIC_STRENGTH_VALUES;
    setting
        .items(field)?
        .iter()
        .map(|item| {
            let v = tuple_items(field, item, 3)?;
            Ok(StrengthTuple(
                v[0].as_opt_f64(field)?,
                v[1].as_f64(field)?,
                v[2].as_opt_f64(field)?,
            ))
        })
        .collect()
}

fn influence_tuples(setting: &Setting) -> TransformResult<Vec<InfluenceTuple>> {
    let field = K_DYNAMIC_KEY_FRAME_INFLUENCE_VALUES;
    setting
        .items(field)?
        .iter()
        .map(|item| {
            let v = tuple_items(field, item, 2)?;
            Ok(InfluenceTuple(v[0].as_opt_f64(field)?, v[1].as_opt_f64(field)?))
        })
        .collect()
}

/// Positions are truncated to integers (`"16.0"` and `16.9` both read as 16).
fn positions_from(setting: &Setting) -> TransformResult<Vec<i64>> {
    let field = K_DYNAMIC_FRAME_DISTRIBUTION_VALUES;
    setting
        .items(field)?
        .iter()
        .map(|item| item.as_f64(field).map(|v| v.trunc() as i64))
        .collect()
}
