use std::collections::HashMap;

/// Accepted store names in preference order (index 0 is most preferred).
pub const DEFAULT_STORE_PRIORITY: &[&str] = &[
    "steam",
    "epic games store",
    "gog",
    "humble store",
    "fanatical",
    "greenmangaming",
    "gamesplanet",
    "gamersgate",
    "indiegala",
    "2game",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub id: String,
    /// Trimmed, lowercase store name.
    pub name: String,
    pub is_active: bool,
}

/// Normalizes a store name for comparison: trims surrounding whitespace and
/// lowercases.
#[must_use]
pub fn normalize_store_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Ranking of accepted stores. Stores not in the table are not accepted.
#[derive(Debug, Clone)]
pub struct StorePriority {
    ranks: HashMap<String, usize>,
}

impl StorePriority {
    /// Builds a table from names in preference order. Names are normalized;
    /// a repeated name keeps its first (best) rank.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranks = HashMap::new();
        for (rank, name) in names.into_iter().enumerate() {
            ranks
                .entry(normalize_store_name(name.as_ref()))
                .or_insert(rank);
        }
        Self { ranks }
    }

    /// Rank of `store_name` (lower is preferred), or `None` if not accepted.
    #[must_use]
    pub fn rank(&self, store_name: &str) -> Option<usize> {
        self.ranks.get(&normalize_store_name(store_name)).copied()
    }

    #[must_use]
    pub fn accepts(&self, store_name: &str) -> bool {
        self.rank(store_name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl Default for StorePriority {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_PRIORITY)
    }
}
