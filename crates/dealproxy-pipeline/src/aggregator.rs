//! Multi-page deal aggregation with per-game deduplication.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dealproxy_core::{Deal, MetadataSlot, StorePriority};
use dealproxy_upstream::types::parse_decimal;
use dealproxy_upstream::{DealsClient, RawDeal};
use rust_decimal::Decimal;

use crate::directory::{StoreDirectory, StoreSnapshot};
use crate::error::PipelineError;
use crate::metadata_store::MetadataStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateConfig {
    pub page_size: u32,
    /// Stop paging once this many distinct games survived filtering.
    pub target_unique_games: usize,
    /// Hard cap on page requests per aggregation.
    pub max_pages: u32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            page_size: 60,
            target_unique_games: 1000,
            max_pages: 50,
        }
    }
}

/// A filtered raw deal with its resolved store and parsed price.
#[derive(Debug)]
struct Candidate {
    raw: RawDeal,
    app_id: String,
    store_name: String,
    rank: usize,
    price: Decimal,
}

impl Candidate {
    /// Lower price wins; equal price falls back to store rank. Exact ties
    /// keep the incumbent.
    fn beats(&self, incumbent: &Candidate) -> bool {
        match self.price.cmp(&incumbent.price) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.rank < incumbent.rank,
        }
    }
}

/// One survivor per game, kept in first-seen order.
#[derive(Debug, Default)]
struct DealSet {
    slots: Vec<Candidate>,
    by_game: HashMap<String, usize>,
}

impl DealSet {
    fn offer(&mut self, candidate: Candidate) {
        match self.by_game.get(&candidate.raw.game_id) {
            Some(&idx) => {
                if candidate.beats(&self.slots[idx]) {
                    self.slots[idx] = candidate;
                }
            }
            None => {
                self.by_game
                    .insert(candidate.raw.game_id.clone(), self.slots.len());
                self.slots.push(candidate);
            }
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Turns a raw record into a candidate, or `None` if it must be dropped:
/// no app id, store unknown or not accepted, or an unparseable price.
fn to_candidate(
    raw: RawDeal,
    stores: &StoreSnapshot,
    priority: &StorePriority,
) -> Option<Candidate> {
    let app_id = raw.app_id()?.to_owned();
    let store_name = stores.name_of(&raw.store_id)?.to_owned();
    let rank = priority.rank(&store_name)?;
    let Some(price) = raw.parsed_sale_price() else {
        tracing::debug!(
            game_id = %raw.game_id,
            sale_price = %raw.sale_price,
            "dropping deal with unparseable sale price"
        );
        return None;
    };
    Some(Candidate {
        raw,
        app_id,
        store_name,
        rank,
        price,
    })
}

pub struct Aggregator {
    client: Arc<DealsClient>,
    directory: Arc<StoreDirectory>,
    metadata: Arc<MetadataStore>,
    config: AggregateConfig,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        client: Arc<DealsClient>,
        directory: Arc<StoreDirectory>,
        metadata: Arc<MetadataStore>,
        config: AggregateConfig,
    ) -> Self {
        Self {
            client,
            directory,
            metadata,
            config,
        }
    }

    /// Pages through the deal list for `currency` and returns one deal per
    /// game, each carrying whatever metadata is already known.
    ///
    /// Pages are requested in order from 0 and merged in that order. Paging
    /// stops at `target_unique_games` survivors, at `max_pages` requests, or
    /// at a short page.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyStoreSet`] if `store_ids` is empty (no request is made).
    /// - [`PipelineError::Upstream`] if any page fails; nothing gathered so far is returned.
    pub async fn aggregate(
        &self,
        currency: &str,
        store_ids: &BTreeSet<String>,
    ) -> Result<Vec<Deal>, PipelineError> {
        if store_ids.is_empty() {
            return Err(PipelineError::EmptyStoreSet {
                currency: currency.to_owned(),
            });
        }

        let stores = self.directory.snapshot().await;
        let priority = self.directory.priority();
        let ids: Vec<&str> = store_ids.iter().map(String::as_str).collect();
        let mut set = DealSet::default();
        let mut pages = 0u32;

        for page in 0..self.config.max_pages {
            let raw = self
                .client
                .fetch_deals_page(currency, &ids, page, self.config.page_size)
                .await?;
            pages += 1;
            let received = raw.len();

            for candidate in raw
                .into_iter()
                .filter_map(|r| to_candidate(r, &stores, priority))
            {
                set.offer(candidate);
            }

            tracing::debug!(currency, page, received, unique = set.len(), "deal page merged");

            if set.len() >= self.config.target_unique_games {
                break;
            }
            if received < self.config.page_size as usize {
                break;
            }
        }

        let states = self
            .metadata
            .get_many(set.slots.iter().map(|c| Some(c.app_id.as_str())))
            .await;

        let deals: Vec<Deal> = set
            .slots
            .into_iter()
            .zip(states)
            .map(|(c, state)| Deal {
                game_id: c.raw.game_id,
                external_app_id: Some(c.app_id),
                store_id: c.raw.store_id,
                store_name: c.store_name,
                sale_price: c.price,
                normal_price: c.raw.normal_price.as_deref().and_then(parse_decimal),
                savings: c.raw.savings.as_deref().and_then(parse_decimal),
                title: c.raw.title,
                deal_id: c.raw.deal_id,
                thumb: c.raw.thumb,
                metadata: MetadataSlot::new(state),
            })
            .collect();

        tracing::info!(currency, pages, deals = deals.len(), "aggregation complete");
        Ok(deals)
    }
}
