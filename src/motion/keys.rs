//! Wire field names of the interpolation request and stored settings.
//!
//! Avoid string typos in lookups: `settings.get(K_CONTEXT_STRIDE)`.
//! The backend spells the end-percent keys `multipled_*`; keep that spelling.

// === Expanded motion settings ===
/// Per-frame `(prev_adjusted, middle, next_adjusted)` strength tuples
pub const K_DYNAMIC_STRENGTH_VALUES: &str = "dynamic_strength_values";
/// Per-frame `(current, next)` key-frame influence tuples
pub const K_DYNAMIC_KEY_FRAME_INFLUENCE_VALUES: &str = "dynamic_key_frame_influence_values";
/// Absolute frame positions (16 units per distance unit)
pub const K_DYNAMIC_FRAME_DISTRIBUTION_VALUES: &str = "dynamic_frame_distribution_values";
/// Context window length
pub const K_CONTEXT_LENGTH: &str = "context_length";
/// Context window stride
pub const K_CONTEXT_STRIDE: &str = "context_stride";
/// Context window overlap
pub const K_CONTEXT_OVERLAP: &str = "context_overlap";
/// Adherence scaled into the backend end percent
pub const K_MULTIPLIED_BASE_END_PERCENT: &str = "multipled_base_end_percent";
/// Adherence scaled into the backend adapter strength
pub const K_MULTIPLIED_BASE_ADAPTER_STRENGTH: &str = "multipled_base_adapter_strength";
/// Formatted `"fraction": "prompt"` pairs
pub const K_INDIVIDUAL_PROMPTS: &str = "individual_prompts";
/// Formatted `"fraction": "negative prompt"` pairs
pub const K_INDIVIDUAL_NEGATIVE_PROMPTS: &str = "individual_negative_prompts";
/// Formatted `frame:(strength)` pairs
pub const K_MOTION_SCALES: &str = "motion_scales";
/// Frame index offset
pub const K_BUFFER: &str = "buffer";
/// Grammar revision of the formatted strings
pub const K_MOTION_FORMAT_VERSION: &str = "motion_format_version";

// === Inference log nesting ===
pub const K_ORIGIN_DATA: &str = "origin_data";
pub const K_INFERENCE_TYPE: &str = "inference_type";
pub const K_SETTINGS: &str = "settings";
/// `inference_type` tag marking nested interpolation settings
pub const INFERENCE_TYPE_FRAME_INTERPOLATION: &str = "frame_interpolation";

/// Backend bookkeeping entries stripped from top-level log params
pub const BOOKKEEPING_KEYS: &[&str] = &[
    "query_dict",
    "origin_data",
    "file_relation_data",
    "gpu_inference",
    "sai_inference",
    "replicate_inference",
];

// === Request ===
pub const K_QUEUE_INFERENCE: &str = "queue_inference";
