use thiserror::Error;

/// Caller contract violations detected at the engine entry point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("{earlier} must be less than {later}")]
    AgeOrder {
        earlier: &'static str,
        later: &'static str,
    },
    #[error("{field} must be a finite value >= 0, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },
    #[error("{field} must be between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("volatility must be >= 0, got {0}")]
    NegativeVolatility(f64),
    #[error("{field} must be at most {max}, got {value}")]
    AboveLimit {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("simulations must be > 0")]
    NoSimulations,
}
