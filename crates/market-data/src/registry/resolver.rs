//! Per-kind provider priority table.
//!
//! Resolved once from the configured providers and never re-read. Providers
//! that cannot serve a kind are recorded with a [`SkipReason`] so the
//! diagnostics endpoint can explain the table.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::config::MarketDataConfig;
use crate::models::{ProviderId, RequestKind};
use crate::provider::MarketDataProvider;

/// Why a provider was left out of a kind's candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Missing credentials or feature flag.
    Unconfigured,
    /// The provider does not declare this request kind.
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedProvider {
    pub provider_id: ProviderId,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSummary {
    pub kind: RequestKind,
    pub candidates: Vec<ProviderId>,
    pub skipped: Vec<SkippedProvider>,
}

/// Ordered candidates per request kind.
#[derive(Clone, Default)]
pub struct ProviderTable {
    candidates: HashMap<RequestKind, Vec<Arc<dyn MarketDataProvider>>>,
    skipped: HashMap<RequestKind, Vec<SkippedProvider>>,
}

impl ProviderTable {
    /// Builds the table.
    ///
    /// Orders by:
    /// 1. Position in the kind's configured override list
    /// 2. The provider's own priority (lower is higher priority)
    /// 3. Registration order
    pub fn resolve(providers: &[Arc<dyn MarketDataProvider>], config: &MarketDataConfig) -> Self {
        let mut table = Self::default();

        for kind in RequestKind::ALL {
            let overrides = config.priority_override(kind);
            let mut eligible: Vec<Arc<dyn MarketDataProvider>> = Vec::new();
            let mut skipped = Vec::new();

            for provider in providers {
                let provider_id: ProviderId = ProviderId::Borrowed(provider.id());
                if !provider.capabilities().supports(kind) {
                    skipped.push(SkippedProvider {
                        provider_id,
                        reason: SkipReason::Unsupported,
                    });
                } else if !provider.is_configured() {
                    skipped.push(SkippedProvider {
                        provider_id,
                        reason: SkipReason::Unconfigured,
                    });
                } else {
                    eligible.push(provider.clone());
                }
            }

            // Stable sort keeps registration order for ties.
            eligible.sort_by_key(|p| {
                let position = overrides
                    .iter()
                    .position(|id| id.eq_ignore_ascii_case(p.id()))
                    .unwrap_or(usize::MAX);
                (position, p.priority())
            });

            info!(
                "Market data {} chain: [{}]",
                kind,
                eligible
                    .iter()
                    .map(|p| p.id())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            table.candidates.insert(kind, eligible);
            table.skipped.insert(kind, skipped);
        }

        table
    }

    pub fn candidates(&self, kind: RequestKind) -> &[Arc<dyn MarketDataProvider>] {
        self.candidates
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn skipped(&self, kind: RequestKind) -> &[SkippedProvider] {
        self.skipped.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn candidate_ids(&self, kind: RequestKind) -> Vec<ProviderId> {
        self.candidates(kind)
            .iter()
            .map(|p| ProviderId::Borrowed(p.id()))
            .collect()
    }

    /// Serializable view, one entry per kind.
    pub fn summary(&self) -> Vec<KindSummary> {
        RequestKind::ALL
            .iter()
            .map(|kind| KindSummary {
                kind: *kind,
                candidates: self.candidate_ids(*kind),
                skipped: self.skipped(*kind).to_vec(),
            })
            .collect()
    }
}
