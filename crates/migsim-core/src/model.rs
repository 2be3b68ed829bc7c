use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single unit of simulated work: an SSTable-like blob with an opaque size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub key: String,
    pub size: i64,
}

impl WorkItem {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Worker tier. Declaration order doubles as the scheduling priority order
/// (`Large` < `Medium` < `Small` < `Universal`) via the derived `Ord` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Large,
    Medium,
    Small,
    Universal,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Small => "SMALL",
            Tier::Medium => "MEDIUM",
            Tier::Large => "LARGE",
            Tier::Universal => "UNIVERSAL",
        }
    }

    /// The three tiers that carry independent capacity configuration.
    /// `Universal` subsets borrow `Small`'s configuration (see design notes).
    pub fn scheduled_tiers() -> [Tier; 3] {
        [Tier::Large, Tier::Medium, Tier::Small]
    }

    /// The tier whose `TierConfig` and scheduling slot a subset of this tier
    /// actually uses. Only `Universal` differs from the identity mapping.
    pub fn config_tier(self) -> Tier {
        match self {
            Tier::Universal => Tier::Small,
            other => other,
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SMALL" => Ok(Tier::Small),
            "MEDIUM" => Ok(Tier::Medium),
            "LARGE" => Ok(Tier::Large),
            "UNIVERSAL" => Ok(Tier::Universal),
            other => Err(format!(
                "invalid tier: {other}. Must be one of: SMALL, MEDIUM, LARGE"
            )),
        }
    }
}

/// A parsed subset descriptor: a directory-tree leaf plus its work items.
///
/// Tiered and simple (universal) descriptors share every field; only `tier`
/// distinguishes them, so this stays a single struct rather than a sum type
/// over the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subset {
    pub migration_id: String,
    pub label: String,
    pub subset_id: String,
    pub tier: Tier,
    pub num_sstables: u64,
    pub data_size: i64,
    pub path: PathBuf,
    pub items: Vec<WorkItem>,
}

impl Subset {
    /// Items to feed the thread simulator: the parsed items, or a single
    /// synthetic item covering `data_size` when the subset file was empty.
    pub fn effective_items(&self) -> Vec<WorkItem> {
        if self.items.is_empty() {
            vec![WorkItem::new("SST0", self.data_size)]
        } else {
            self.items.clone()
        }
    }

    /// `subset_id` parsed as a non-negative integer, used both for the
    /// canonical ordering key and as the worker identifier.
    pub fn numeric_subset_id(&self) -> Option<u64> {
        self.subset_id.parse::<u64>().ok()
    }

    /// Sort key implementing the `(tier_order, int_subset_id)` contract.
    /// Subsets whose ID does not parse as an integer sort to the end of
    /// their tier, ordered by raw string as a final tie-break.
    pub fn sort_key(&self) -> (Tier, bool, u64, &str) {
        match self.numeric_subset_id() {
            Some(n) => (self.tier, false, n, self.subset_id.as_str()),
            None => (self.tier, true, u64::MAX, self.subset_id.as_str()),
        }
    }
}

pub fn sort_subsets(subsets: &mut [Subset]) {
    subsets.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset(tier: Tier, subset_id: &str) -> Subset {
        Subset {
            migration_id: "mig1".into(),
            label: "label".into(),
            subset_id: subset_id.into(),
            tier,
            num_sstables: 0,
            data_size: 0,
            path: PathBuf::new(),
            items: Vec::new(),
        }
    }

    #[test]
    fn tier_ordering_is_large_medium_small_universal() {
        assert!(Tier::Large < Tier::Medium);
        assert!(Tier::Medium < Tier::Small);
        assert!(Tier::Small < Tier::Universal);
    }

    #[test]
    fn sort_places_tiers_before_ids_and_unparseable_ids_last() {
        let mut subsets = vec![
            subset(Tier::Small, "2"),
            subset(Tier::Large, "10"),
            subset(Tier::Small, "abc"),
            subset(Tier::Large, "1"),
            subset(Tier::Small, "1"),
        ];
        sort_subsets(&mut subsets);
        let order: Vec<(Tier, &str)> = subsets.iter().map(|s| (s.tier, s.subset_id.as_str())).collect();
        assert_eq!(
            order,
            vec![
                (Tier::Large, "1"),
                (Tier::Large, "10"),
                (Tier::Small, "1"),
                (Tier::Small, "2"),
                (Tier::Small, "abc"),
            ]
        );
    }

    #[test]
    fn effective_items_falls_back_to_synthetic_item_when_empty() {
        let mut s = subset(Tier::Small, "1");
        s.data_size = 1000;
        let items = s.effective_items();
        assert_eq!(items, vec![WorkItem::new("SST0", 1000)]);
    }
}
