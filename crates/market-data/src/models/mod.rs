//! Market data models
//!
//! This module contains the canonical data types every adapter normalizes into:
//! - `types` - Type aliases and the request kind enum (ProviderId, RequestKind)
//! - `symbol` - Validated ticker (Symbol)
//! - `source` - Provenance label (SourceProvider)
//! - `quote` - Live quote (CanonicalQuote)
//! - `history` - Date-ordered bars (HistoryPoint, HistorySeries)
//! - `facts` - Company reference data (CompanyFacts, StockDetail)
//! - `timeframe` - UI timeframe tokens and history windows (Timeframe, Interval, HistoryRequest)

mod facts;
mod history;
mod quote;
mod source;
mod symbol;
mod timeframe;
mod types;

pub use facts::{CompanyFacts, StockDetail};
pub use history::{HistoryPoint, HistorySeries};
pub use quote::CanonicalQuote;
pub use source::{SourceProvider, SYNTHETIC_LABEL};
pub use symbol::{Symbol, MAX_SYMBOL_LEN};
pub use timeframe::{HistoryRequest, Interval, Timeframe};
pub use types::{ProviderId, RequestKind};
