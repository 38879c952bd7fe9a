//! Turns an HTTP-style parameter map into a validated `Query` (spec.md §6).
//!
//! Spec.md places HTTP extraction and the cursor's wire encoding out of
//! scope as external collaborators — this crate owns only what spec.md
//! does specify: the recognized parameter names, clamping/validation
//! behavior, and the tagged-error taxonomy for strict mode. The actual
//! cursor codec is injected via `CursorCodec` (a default base64
//! implementation is provided for convenience and tests).

use std::collections::HashMap;

use listcache_common::{CursorCodec, Descriptor, Direction, FilterValue, Query};

const MAX_STRING_LEN: usize = 256;
const MIN_LIMIT: u16 = 1;
const MAX_LIMIT: u16 = 100;
const DEFAULT_LIMIT: u16 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseMode {
    /// Any invalid parameter is a hard error.
    Strict,
    /// Invalid parameters are dropped (falling back to defaults); only the
    /// shape of the parameter map itself (e.g. a cursor that fails to
    /// decode) ever produces an error, since there is no sensible default
    /// to fall back to for an unparsable cursor.
    Lenient,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
    #[error("invalid value for filter {name}: {value}")]
    InvalidFilterValue { name: String, value: String },
    #[error("invalid sort field: {0}")]
    InvalidSort(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("both cursor and offset were supplied")]
    ConflictingPagination,
    #[error("cursor could not be decoded: {0}")]
    CursorDecode(String),
    #[error("value for {name} exceeds the maximum string length")]
    ValueTooLong { name: String },
}

/// Default `CursorCodec`: standard base64 (no padding), matching the
/// teacher pack's general preference for the common/no-frills encoding
/// variant over URL-safe alphabets unless a wire format specifically needs
/// URL embedding.
pub struct Base64CursorCodec;

impl CursorCodec for Base64CursorCodec {
    fn encode(&self, raw: &[u8]) -> String {
        use base64::engine::general_purpose::STANDARD_NO_PAD;
        use base64::Engine;
        STANDARD_NO_PAD.encode(raw)
    }

    fn decode(&self, encoded: &str) -> Result<Vec<u8>, listcache_common::CacheError> {
        use base64::engine::general_purpose::STANDARD_NO_PAD;
        use base64::Engine;
        STANDARD_NO_PAD
            .decode(encoded)
            .map_err(|e| listcache_common::CacheError::InvalidFilter(e.to_string()))
    }
}

fn coerce_filter_value(raw: &str) -> FilterValue {
    if let Ok(i) = raw.parse::<i64>() {
        FilterValue::Int(i)
    } else if raw.eq_ignore_ascii_case("true") {
        FilterValue::Bool(true)
    } else if raw.eq_ignore_ascii_case("false") {
        FilterValue::Bool(false)
    } else {
        FilterValue::Text(raw.to_string())
    }
}

/// Parses `params` into a `Query` for descriptor `D`. Recognized parameter
/// names are each declared filter's `name`, plus `sort` (a field name,
/// optionally prefixed with `-` for descending), `limit`, `cursor`, and
/// `offset`.
pub fn parse_query<D: Descriptor>(
    params: &HashMap<String, String>,
    mode: ParseMode,
    codec: &dyn CursorCodec,
) -> Result<Query, ParseError> {
    let strict = mode == ParseMode::Strict;
    let filters = D::filters();
    let sorts = D::sorts();

    let mut filter_values: Vec<Option<FilterValue>> = vec![None; filters.len()];

    for (key, value) in params {
        if key == "sort" || key == "limit" || key == "cursor" || key == "offset" {
            continue;
        }
        let Some(idx) = filters.iter().position(|f| f.name == key) else {
            if strict {
                return Err(ParseError::UnknownFilter(key.clone()));
            }
            continue;
        };
        if value.len() > MAX_STRING_LEN {
            if strict {
                return Err(ParseError::ValueTooLong { name: key.clone() });
            }
            continue;
        }
        filter_values[idx] = Some(coerce_filter_value(value));
    }

    for (idx, decl) in filters.iter().enumerate() {
        if decl.required && filter_values[idx].is_none() && strict {
            return Err(ParseError::InvalidFilterValue {
                name: decl.name.to_string(),
                value: String::new(),
            });
        }
    }

    let sort = match params.get("sort") {
        Some(raw) => {
            let (name, desc) = match raw.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (raw.as_str(), false),
            };
            match sorts.iter().position(|s| s.name == name) {
                Some(idx) => Some((idx, Direction::from_flag(desc))),
                None => {
                    if strict {
                        return Err(ParseError::InvalidSort(raw.clone()));
                    }
                    None
                }
            }
        }
        None => None,
    };

    let limit = match params.get("limit") {
        Some(raw) => match raw.parse::<u16>() {
            Ok(n) if (MIN_LIMIT..=MAX_LIMIT).contains(&n) => n,
            Ok(n) => {
                if strict {
                    return Err(ParseError::InvalidLimit(n.to_string()));
                }
                n.clamp(MIN_LIMIT, MAX_LIMIT)
            }
            Err(_) => {
                if strict {
                    return Err(ParseError::InvalidLimit(raw.clone()));
                }
                DEFAULT_LIMIT
            }
        },
        None => DEFAULT_LIMIT,
    };

    let cursor_raw = params.get("cursor");
    let offset_raw = params.get("offset");

    if cursor_raw.is_some() && offset_raw.is_some() && strict {
        return Err(ParseError::ConflictingPagination);
    }

    let cursor = match cursor_raw {
        Some(raw) => {
            if raw.len() > MAX_STRING_LEN {
                return Err(ParseError::ValueTooLong {
                    name: "cursor".to_string(),
                });
            }
            Some(
                codec
                    .decode(raw)
                    .map_err(|e| ParseError::CursorDecode(e.to_string()))?,
            )
        }
        None => None,
    };

    let offset = if cursor.is_some() {
        0
    } else {
        match offset_raw {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) => n,
                Err(_) => {
                    if strict {
                        return Err(ParseError::InvalidLimit(raw.clone()));
                    }
                    0
                }
            },
            None => 0,
        }
    };

    Ok(Query {
        filter_values,
        sort,
        limit,
        cursor,
        offset,
    })
}
