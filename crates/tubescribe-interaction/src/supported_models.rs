//! Gemini model ids accepted by the gateway.
//!
//! | Model ID | Status |
//! |----------|--------|
//! | `gemini-2.0-flash` | Default |
//! | `gemini-2.0-flash-lite` | Supported |
//! | `gemini-2.5-flash` | Supported |
//! | `gemini-2.5-pro` | Supported |
//! | `gemini-1.5-flash` | Supported |
//! | `gemini-1.5-pro` | Supported |
//! | `gemini-pro`, `gemini-1.0-pro`, `gemini-pro-vision` | Deprecated |
//!
//! Requests naming a deprecated or unknown id are sent to the default model.

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub const SUPPORTED_MODELS: &[&str] = &[
    DEFAULT_MODEL,
    "gemini-2.0-flash-lite",
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
];

pub const DEPRECATED_MODELS: &[&str] = &["gemini-pro", "gemini-1.0-pro", "gemini-pro-vision"];

pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

/// Resolves the model a request is actually sent to.
///
/// `default_model` comes from configuration; if it is itself unsupported the
/// built-in default is used.
pub fn normalize_model(requested: Option<&str>, default_model: &str) -> String {
    let fallback = if is_supported(default_model) {
        default_model
    } else {
        DEFAULT_MODEL
    };

    match requested.map(str::trim) {
        Some(model) if is_supported(model) => model.to_string(),
        Some(model) if !model.is_empty() => {
            if DEPRECATED_MODELS.contains(&model) {
                tracing::info!("[Gateway] Model {} is deprecated, using {}", model, fallback);
            } else {
                tracing::warn!("[Gateway] Unknown model {}, using {}", model, fallback);
            }
            fallback.to_string()
        }
        _ => fallback.to_string(),
    }
}
