//! frameweave - motion settings for key-frame interpolation
//!
//! Re-exports all modules for use by binary targets.

// Transform engine
pub mod motion;

// App modules
pub mod cli;
pub mod interpolator;
pub mod paths;
pub mod server;
pub mod session;
pub mod settings;
pub mod widgets;

// Re-export commonly used types
pub use interpolator::{AnimationStyle, InferenceClient, InferenceOutcome, InterpolationRequest};
pub use motion::{
    ExpandedMotionParams, InferenceLog, MotionContext, SimpleMotionParams, TransformError,
    forward_transform, reverse_transform,
};
pub use session::{SessionStore, ShotSession};
pub use settings::AppSettings;
