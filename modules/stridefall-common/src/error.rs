use thiserror::Error;

/// Closed taxonomy of claim rejections. Every consumer (rules engine, event
/// logging, HTTP mapping) matches exhaustively on this.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    #[error("path does not form a closed polygon")]
    InvalidPath,

    #[error("run duration must be positive")]
    InvalidDuration,

    #[error("territory is too small ({area_m2:.0} m²)")]
    TerritoryTooSmall { area_m2: f64 },

    #[error("area ({area_m2:.0} m²) exceeds the allowed maximum")]
    AreaTooLarge { area_m2: f64, max_m2: f64 },

    #[error("a pace of {required_pace:.2} min/km or better is required to steal this territory")]
    PaceInsufficient { required_pace: f64 },

    #[error("territory is temporarily protected")]
    TerritoryProtected,

    #[error("you must wait before attacking this territory again")]
    CooldownActive { remaining_ms: i64 },

    #[error("territory is shielded")]
    ShieldActive,

    #[error("authentication failed")]
    AuthFailure,

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ClaimError {
    /// Remaining cooldown in milliseconds, when the variant carries one.
    pub fn cooldown_remaining_ms(&self) -> Option<i64> {
        match self {
            ClaimError::CooldownActive { remaining_ms } => Some(*remaining_ms),
            _ => None,
        }
    }
}
