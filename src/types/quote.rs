use serde::{Deserialize, Serialize};

pub type QuoteId = i64;
pub type AuthorId = i64;

/// Quote ratings live in `MIN_RATING..=MAX_RATING`.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const DEFAULT_RATING: u8 = MIN_RATING;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}

/// A quote resolved with its author's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    #[serde(skip)]
    pub author_id: AuthorId,
    #[serde(rename = "author")]
    pub author_name: String,
    pub text: String,
    pub rating: u8,
}

/// Validated field changes for a single quote row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteChanges {
    pub author_id: Option<AuthorId>,
    pub text: Option<String>,
    pub rating: Option<u8>,
}

impl QuoteChanges {
    pub fn is_empty(&self) -> bool {
        self.author_id.is_none() && self.text.is_none() && self.rating.is_none()
    }
}

/// Raw update request. Each field is validated on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuotePatch {
    pub author: Option<String>,
    pub text: Option<String>,
    pub rating: Option<String>,
}

impl QuotePatch {
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.text.is_none() && self.rating.is_none()
    }
}

/// Filter values exactly as they arrive from the query string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FilterParams {
    pub id: Option<String>,
    pub author: Option<String>,
    pub text: Option<String>,
    pub rating: Option<String>,
}

/// Typed equality constraints, combined with AND.
///
/// Serializes to only the constraints that are set, which is what callers
/// see as `filters_applied`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteFilter {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<QuoteId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rating: Option<u8>,
}

impl QuoteFilter {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.author.is_none() && self.text.is_none() && self.rating.is_none()
    }
}
