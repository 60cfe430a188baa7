use std::borrow::Cow;
use std::fmt;

use serde::{Serialize, Serializer};

use super::types::ProviderId;

/// Label used for placeholder data generated when every provider failed.
pub const SYNTHETIC_LABEL: &str = "SYNTHETIC";

/// Where a canonical record came from.
///
/// Serialized as a plain string: the provider id, `SYNTHETIC`, or
/// `FACTS+PRICE` for records that merge two sources.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceProvider {
    /// A single real provider satisfied the request.
    Provider(ProviderId),
    /// Facts and price were obtained from different sources.
    Composite { facts: ProviderId, price: ProviderId },
    /// Deterministic placeholder data.
    Synthetic,
}

impl SourceProvider {
    pub fn provider(id: impl Into<ProviderId>) -> Self {
        Self::Provider(id.into())
    }

    /// Combines the sources of a facts record and a price record.
    ///
    /// Identical sources collapse to that source; anything else gets a
    /// composite label so the merge stays visible downstream.
    pub fn combine(facts: &SourceProvider, price: &SourceProvider) -> Self {
        if facts == price {
            return facts.clone();
        }
        Self::Composite {
            facts: facts.label(),
            price: price.label(),
        }
    }

    pub fn label(&self) -> ProviderId {
        match self {
            Self::Provider(id) => id.clone(),
            Self::Synthetic => Cow::Borrowed(SYNTHETIC_LABEL),
            Self::Composite { facts, price } => Cow::Owned(format!("{}+{}", facts, price)),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic)
    }

    /// True when any part of the record is placeholder data.
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::Synthetic => true,
            Self::Provider(_) => false,
            Self::Composite { facts, price } => facts == SYNTHETIC_LABEL || price == SYNTHETIC_LABEL,
        }
    }
}

impl fmt::Display for SourceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for SourceProvider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
