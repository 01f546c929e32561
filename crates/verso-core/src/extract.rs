//! Version extraction
//!
//! How the pipeline learns which version a client asked for. The extractor
//! is chosen once at router construction time; the two variants make the
//! resolver mode explicit instead of probing capabilities per request:
//! [`VersionExtractor::Exact`] pairs with lexicographic resolution, while
//! [`VersionExtractor::DateAware`] carries a date parser enabling the
//! nearest-lower-date fallback for requested dates between releases.

use chrono::NaiveDate;
use http::request::Parts;
use std::fmt;
use std::sync::Arc;

/// Reads the requested version out of a request head, if present.
pub type ExtractFn = Arc<dyn Fn(&Parts) -> Option<String> + Send + Sync>;

/// Parses a version identifier into a comparable date.
pub type ParseDateFn = Arc<dyn Fn(&str) -> Option<NaiveDate> + Send + Sync>;

/// The version extraction capability consumed by the dispatch pipeline.
#[derive(Clone)]
pub enum VersionExtractor {
    /// Requested versions are matched against the history as-is.
    Exact {
        /// How to read the version from a request.
        extract: ExtractFn,
    },
    /// Requested versions may be arbitrary dates; the resolver may snap them
    /// to the nearest lower release.
    DateAware {
        /// How to read the version from a request.
        extract: ExtractFn,
        /// How to parse identifiers into dates.
        parse_date: ParseDateFn,
    },
}

impl VersionExtractor {
    /// Exact-mode extractor reading a header (`X-Api-Version`-style).
    pub fn header(name: &str) -> Self {
        Self::Exact {
            extract: header_fn(name),
        }
    }

    /// Exact-mode extractor reading a query parameter.
    pub fn query(param: &str) -> Self {
        Self::Exact {
            extract: query_fn(param),
        }
    }

    /// Date-aware extractor reading a header; identifiers parse as
    /// `YYYY-MM-DD`.
    pub fn date_header(name: &str) -> Self {
        Self::DateAware {
            extract: header_fn(name),
            parse_date: iso_date_fn(),
        }
    }

    /// Date-aware extractor reading a query parameter; identifiers parse as
    /// `YYYY-MM-DD`.
    pub fn date_query(param: &str) -> Self {
        Self::DateAware {
            extract: query_fn(param),
            parse_date: iso_date_fn(),
        }
    }

    /// Exact-mode extractor with a custom read function.
    pub fn custom(extract: impl Fn(&Parts) -> Option<String> + Send + Sync + 'static) -> Self {
        Self::Exact {
            extract: Arc::new(extract),
        }
    }

    /// Date-aware extractor with custom read and parse functions.
    pub fn custom_date(
        extract: impl Fn(&Parts) -> Option<String> + Send + Sync + 'static,
        parse_date: impl Fn(&str) -> Option<NaiveDate> + Send + Sync + 'static,
    ) -> Self {
        Self::DateAware {
            extract: Arc::new(extract),
            parse_date: Arc::new(parse_date),
        }
    }

    /// Extractor that never finds a version; for unversioned route bags.
    pub fn none() -> Self {
        Self::Exact {
            extract: Arc::new(|_| None),
        }
    }

    /// Read the requested version from a request head.
    pub fn extract(&self, parts: &Parts) -> Option<String> {
        match self {
            Self::Exact { extract } | Self::DateAware { extract, .. } => extract(parts),
        }
    }

    /// The date parser, present only in date-aware mode.
    pub fn parse_date_fn(&self) -> Option<&ParseDateFn> {
        match self {
            Self::Exact { .. } => None,
            Self::DateAware { parse_date, .. } => Some(parse_date),
        }
    }
}

impl fmt::Debug for VersionExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { .. } => f.write_str("VersionExtractor::Exact"),
            Self::DateAware { .. } => f.write_str("VersionExtractor::DateAware"),
        }
    }
}

fn header_fn(name: &str) -> ExtractFn {
    let name = name.to_lowercase();
    Arc::new(move |parts: &Parts| {
        parts
            .headers
            .get(&name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn query_fn(param: &str) -> ExtractFn {
    let param = param.to_string();
    Arc::new(move |parts: &Parts| {
        let query = parts.uri.query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find(|(name, _)| *name == param)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    })
}

fn iso_date_fn() -> ParseDateFn {
    Arc::new(|value: &str| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}
