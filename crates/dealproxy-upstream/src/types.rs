//! Wire types for the deal-listing and app-details APIs.
//!
//! ### Deal list
//! Every field arrives as a string, prices included (`"9.99"`). `steamAppID`
//! is `null` for titles that are not on the platform and is occasionally an
//! empty string; both mean "no app id".
//!
//! ### Store list
//! `isActive` is an integer flag (`1` / `0`). Missing means active.
//!
//! ### App details
//! Keyed by the requested app id:
//! `{"620": {"success": true, "data": {...}}}`. When `success` is `false`
//! the `data` key is missing or an empty array, so `data` is kept as a raw
//! value and only decoded into [`AppData`] on success.

use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawStore {
    #[serde(rename = "storeID")]
    pub store_id: String,
    #[serde(rename = "storeName")]
    pub store_name: String,
    #[serde(rename = "isActive", default = "default_active")]
    pub is_active: u8,
}

fn default_active() -> u8 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDeal {
    #[serde(rename = "gameID")]
    pub game_id: String,
    #[serde(rename = "storeID")]
    pub store_id: String,
    /// Decimal string; parsed by the aggregator so one bad record cannot
    /// fail a whole page.
    #[serde(rename = "salePrice")]
    pub sale_price: String,
    #[serde(rename = "normalPrice", default)]
    pub normal_price: Option<String>,
    #[serde(default)]
    pub savings: Option<String>,
    #[serde(rename = "steamAppID", default)]
    pub steam_app_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "dealID", default)]
    pub deal_id: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
}

impl RawDeal {
    /// App id with blanks treated as missing.
    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        self.steam_app_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Parsed sale price, or `None` if the string is not a decimal.
    #[must_use]
    pub fn parsed_sale_price(&self) -> Option<Decimal> {
        parse_decimal(&self.sale_price)
    }
}

/// Parses an upstream decimal string, tolerating surrounding whitespace.
#[must_use]
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.trim().parse::<Decimal>().ok()
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppDetailsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// The subset of the app-details `data` object we keep.
#[derive(Debug, Clone, Deserialize)]
pub struct AppData {
    pub name: String,
    #[serde(default)]
    pub release_date: Option<ReleaseDate>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub metacritic: Option<Metacritic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub coming_soon: bool,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metacritic {
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_deal_decodes_null_app_id() {
        let deal: RawDeal = serde_json::from_value(json!({
            "gameID": "1",
            "storeID": "2",
            "salePrice": "4.99",
            "steamAppID": null
        }))
        .unwrap();
        assert!(deal.app_id().is_none());
        assert_eq!(deal.parsed_sale_price(), Some(Decimal::new(499, 2)));
    }

    #[test]
    fn blank_app_id_is_treated_as_missing() {
        let deal: RawDeal = serde_json::from_value(json!({
            "gameID": "1",
            "storeID": "2",
            "salePrice": "4.99",
            "steamAppID": "  "
        }))
        .unwrap();
        assert!(deal.app_id().is_none());
    }

    #[test]
    fn bad_sale_price_parses_to_none() {
        assert!(parse_decimal("free").is_none());
        assert_eq!(parse_decimal(" 10.00 "), Some(Decimal::new(1000, 2)));
    }

    #[test]
    fn raw_store_defaults_to_active() {
        let store: RawStore =
            serde_json::from_value(json!({"storeID": "1", "storeName": "Steam"})).unwrap();
        assert_eq!(store.is_active, 1);
    }
}
