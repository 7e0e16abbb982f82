//! Request URL construction for the news search endpoint.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::constants::NEWS_API_PATH;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid endpoint URL provided: '{0}'")]
    InvalidEndpoint(String),
}

/// Field the API sorts results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Relevancy,
    Date,
}

impl SortField {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevancy => "relevancy",
            Self::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A scalar query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Query parameters in insertion order.
///
/// Setting a key that is already present replaces its value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, ParamValue)>,
}

impl QueryParams {
    pub fn set(&mut self, key: &str, value: ParamValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Fluent builder for news search request URLs.
///
/// The builder starts with only the `token` parameter set. Each `with_*`
/// call adds or replaces one parameter; [`WebzQueryBuilder::with_endpoint`]
/// swaps the whole set for the parameters of a server-supplied URL.
#[derive(Debug, Clone)]
pub struct WebzQueryBuilder {
    base_url: Url,
    params: QueryParams,
}

impl WebzQueryBuilder {
    /// Create a builder for the API at `base_url`, seeded with the auth token.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(token: &str, base_url: &str) -> Result<Self, QueryError> {
        let base_url = Url::parse(base_url).map_err(|source| QueryError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        let mut params = QueryParams::default();
        params.set("token", ParamValue::Text(token.to_string()));

        Ok(Self { base_url, params })
    }

    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.params.set("q", ParamValue::Text(query.to_string()));
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: &str) -> Self {
        self.params.set("language", ParamValue::Text(language.to_string()));
        self
    }

    /// Set the page size, clamped into `1..=100`.
    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.params.set("size", ParamValue::Int(size.clamp(1, 100)));
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.params.set("sort", ParamValue::Text(sort.as_str().to_string()));
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.params.set("order", ParamValue::Text(order.as_str().to_string()));
        self
    }

    /// Only return posts crawled after `date` (sent as epoch milliseconds).
    #[must_use]
    pub fn with_start_date(mut self, date: DateTime<Utc>) -> Self {
        self.params.set("ts", ParamValue::Int(date.timestamp_millis()));
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.params.set("from", ParamValue::Int(offset));
        self
    }

    #[must_use]
    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.params.set("highlight", ParamValue::Bool(highlight));
        self
    }

    /// Replace every parameter with the query string of `endpoint`.
    ///
    /// `endpoint` is either an absolute URL or a path starting with `/`,
    /// which is resolved against the base URL. This is how a `next` link
    /// returned by the API is followed verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if `endpoint` is neither a valid absolute URL nor a
    /// resolvable absolute path.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, QueryError> {
        let parsed = if endpoint.starts_with('/') {
            self.base_url.join(endpoint)
        } else {
            Url::parse(endpoint)
        };
        let parsed = parsed.map_err(|_| QueryError::InvalidEndpoint(endpoint.to_string()))?;

        self.params.clear();
        for (key, value) in parsed.query_pairs() {
            self.params.set(&key, ParamValue::Text(value.into_owned()));
        }

        Ok(self)
    }

    #[must_use]
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Compose the request URL: the fixed search path on the base URL's
    /// origin, followed by every parameter in insertion order.
    #[must_use]
    pub fn build(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(NEWS_API_PATH);
        url.set_query(None);
        url.set_fragment(None);

        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.params.iter() {
                pairs.append_pair(key, &value.to_string());
            }
        }

        url
    }
}
