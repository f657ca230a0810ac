//! Small shared helpers

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use uuid::Uuid;

/// Header a client sets to override `Accept-Language`
pub const LANGUAGE_HEADER: &str = "language";

/// Tag used when no header names a usable language
pub const DEFAULT_LANGUAGE: &str = "en";

/// Random version 4 UUID in hyphenated lowercase form,
/// e.g. `9f1c2d3e-4b5a-4c6d-8e7f-0a1b2c3d4e5f`
pub fn generate_uuid() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Language tag the client prefers for responses.
///
/// The `language` header wins over `Accept-Language`; both accept a weighted
/// list (`fr-CH, fr;q=0.9`). Falls back to [`DEFAULT_LANGUAGE`].
pub fn preferred_language(headers: &HeaderMap) -> String {
    [
        headers.get(LANGUAGE_HEADER),
        headers.get(header::ACCEPT_LANGUAGE),
    ]
    .into_iter()
    .flatten()
    .filter_map(|value| value.to_str().ok())
    .find_map(best_weighted_tag)
    .unwrap_or(DEFAULT_LANGUAGE)
    .to_string()
}

/// Highest-weighted tag of an `Accept-Language` style list, earliest on ties
fn best_weighted_tag(list: &str) -> Option<&str> {
    let mut best: Option<(&str, f32)> = None;

    for entry in list.split(',') {
        let mut pieces = entry.split(';');
        let tag = pieces.next().unwrap_or_default().trim();
        if tag == "*" || !is_language_tag(tag) {
            continue;
        }

        let weight = pieces
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if weight <= 0.0 {
            continue;
        }

        if best.map_or(true, |(_, w)| weight > w) {
            best = Some((tag, weight));
        }
    }

    best.map(|(tag, _)| tag)
}

/// `en`, `pt-BR`, `zh-Hant-TW`: an alphabetic primary subtag of 2-8 letters
/// followed by alphanumeric subtags of 1-8 characters
fn is_language_tag(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let primary_ok = subtags
        .next()
        .is_some_and(|s| (2..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphabetic()));

    primary_ok && subtags.all(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Extractor for [`preferred_language`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferredLanguage(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for PreferredLanguage
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(preferred_language(&parts.headers)))
    }
}
