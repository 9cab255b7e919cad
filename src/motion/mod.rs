//! Motion-parameter transforms between authoring controls and backend settings.
//!
//! # Flow
//!
//! ```text
//! UI controls ──▶ SimpleMotionParams ──forward──▶ ExpandedMotionParams ──▶ request
//!                        ▲                                                   │
//!                        └──reverse── ExpandedMotionParams ◀── InferenceLog ◀┘
//! ```
//!
//! Both directions are pure functions: no I/O, no shared state, safe to call
//! from any number of sessions at once.

pub mod codec;
pub mod error;
pub mod forward;
pub mod keys;
pub mod literal;
pub mod record;
pub mod reverse;
pub mod types;

pub use error::{TransformError, TransformResult};
pub use forward::{ForwardTransform, forward_transform};
pub use literal::{Literal, Setting};
pub use record::{InferenceLog, fetch_inference_data};
pub use reverse::{ReverseTransform, reverse_transform};
pub use types::{
    ExpandedMotionParams, InfluenceTuple, MotionContext, SimpleMotionParams, StrengthTuple,
};
