use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// The kind of data a request asks for. Providers declare support per kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Quote,
    History,
    Facts,
}

impl RequestKind {
    pub const ALL: [RequestKind; 3] = [RequestKind::Quote, RequestKind::History, RequestKind::Facts];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Quote => "quote",
            RequestKind::History => "history",
            RequestKind::Facts => "facts",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
