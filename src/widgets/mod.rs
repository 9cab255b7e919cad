//! UI widget state, kept free of any drawing backend.

pub mod timeline;
pub mod variants;

pub use timeline::{TimelineState, TimelineToggles, interpolation_style_index};
pub use variants::{VariantKind, VariantPager};
