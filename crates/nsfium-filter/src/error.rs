use thiserror::Error;

/// Errors raised while parsing a filter spec or building a filter from it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("malformed filter spec {spec:?}: {reason}")]
    Syntax { spec: String, reason: &'static str },
    #[error("unsupported filter family {0:?}")]
    UnsupportedFamily(String),
    #[error("filter order {0} out of range (1..=10)")]
    InvalidOrder(u32),
    #[error("corner frequency {corner_hz} Hz must lie in (0, {nyquist_hz}) Hz")]
    InvalidFrequency { corner_hz: f64, nyquist_hz: f64 },
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(f64),
}
