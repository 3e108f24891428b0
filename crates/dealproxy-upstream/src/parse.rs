//! Conversion from app-details wire data to [`Metadata`].

use std::sync::LazyLock;

use dealproxy_core::Metadata;
use regex::Regex;

use crate::types::AppData;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid regex"));

/// Pulls the first standalone four-digit group out of a free-text date
/// (`"18 Apr, 2011"` → `"2011"`, `"Q3 2025"` → `"2025"`, `"Coming soon"` → `None`).
#[must_use]
pub fn extract_release_year(date: &str) -> Option<String> {
    YEAR_RE
        .captures(date)
        .and_then(|cap| cap.get(1).map(|m| m.as_str().to_owned()))
}

#[must_use]
pub fn parse_metadata(data: AppData) -> Metadata {
    let release_date = data
        .release_date
        .and_then(|rd| rd.date)
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty());
    let release_year = release_date.as_deref().and_then(extract_release_year);

    Metadata {
        title: data.name.trim().to_owned(),
        release_date,
        release_year,
        genres: data.genres.into_iter().map(|g| g.description).collect(),
        publishers: data
            .publishers
            .into_iter()
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty())
            .collect(),
        rating_score: data.metacritic.map(|m| m.score),
    }
}
