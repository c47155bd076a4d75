//! Feature extraction and encoding
//!
//! Converts labeled samples and raw player seasons into model-ready rows.

pub mod encoding;
pub mod pipeline;
pub mod scaler;

pub use encoding::OneHotEncoder;
pub use pipeline::FeaturePipeline;
pub use scaler::StandardScaler;
