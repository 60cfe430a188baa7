use std::fmt;

use serde::Serialize;

/// Outcome recorded for one provider attempt.
///
/// Every variant except `Success` advances the fallback chain. `Cancelled`
/// additionally stops it.
///
/// | Outcome | Advances chain? | Typical cause |
/// |---------|-----------------|---------------|
/// | `Success` | No | usable, validated data |
/// | `EmptyResult` | Yes | unknown or delisted symbol |
/// | `Timeout` | Yes | deadline expired |
/// | `TransportError` | Yes | connection failure, 5xx, 429, adapter panic |
/// | `MalformedResponse` | Yes | provider schema drift |
/// | `Disabled` | Yes | missing credentials |
/// | `Cancelled` | No (stops) | caller aborted the request |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum AttemptOutcome {
    Success,
    EmptyResult,
    Timeout,
    TransportError,
    MalformedResponse,
    Disabled,
    Cancelled,
}

impl AttemptOutcome {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "Success",
            Self::EmptyResult => "EmptyResult",
            Self::Timeout => "Timeout",
            Self::TransportError => "TransportError",
            Self::MalformedResponse => "MalformedResponse",
            Self::Disabled => "Disabled",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}
