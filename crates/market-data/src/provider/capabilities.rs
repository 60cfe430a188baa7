//! Provider capability declarations.
//!
//! A provider is only ever tried for the request kinds it declares here.

use serde::Serialize;

use crate::models::RequestKind;

/// Describes which request kinds a market data provider can serve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    /// Whether the provider returns live quotes.
    pub supports_quote: bool,

    /// Whether the provider returns historical bars.
    pub supports_history: bool,

    /// Whether the provider returns company facts.
    pub supports_facts: bool,
}

impl ProviderCapabilities {
    /// A provider serving every request kind.
    pub const ALL: ProviderCapabilities = ProviderCapabilities {
        supports_quote: true,
        supports_history: true,
        supports_facts: true,
    };

    pub fn supports(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Quote => self.supports_quote,
            RequestKind::History => self.supports_history,
            RequestKind::Facts => self.supports_facts,
        }
    }
}
