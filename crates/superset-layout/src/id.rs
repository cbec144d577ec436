//! Item identifiers and id generation.

use std::borrow::Borrow;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::item::ItemType;

/// Id of the ROOT item of every dashboard.
pub const ROOT_ID: &str = "ROOT_ID";

/// Id of the GRID item, the default entry point for placement.
pub const GRID_ID: &str = "GRID_ID";

/// Alphabet used for generated id suffixes (no look-alike characters).
pub const SHORT_ID_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of the random part of a generated id.
pub const RANDOM_ID_LENGTH: usize = 10;

/// Stable identifier of a dashboard element, unique within one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap an existing id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The well-known ROOT id.
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    /// The well-known GRID id.
    #[must_use]
    pub fn grid() -> Self {
        Self(GRID_ID.to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ItemId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ItemId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Source of fresh item ids.
///
/// The tree owns one generator and asks it for a new id whenever an item is
/// inserted without one. Implementations do not need to guarantee
/// uniqueness: the tree retries on collision.
pub trait IdGenerator: fmt::Debug + Send + Sync {
    /// Produce a candidate id for an item of the given type.
    fn next_id(&mut self, item_type: ItemType) -> ItemId;

    /// Clone into a new boxed generator.
    fn clone_box(&self) -> Box<dyn IdGenerator>;
}

impl Clone for Box<dyn IdGenerator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Random `{TYPE}-{suffix}` ids, the format the dashboard editor produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self, item_type: ItemType) -> ItemId {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..RANDOM_ID_LENGTH)
            .map(|_| {
                let idx = rng.gen_range(0..SHORT_ID_ALPHABET.len());
                char::from(SHORT_ID_ALPHABET[idx])
            })
            .collect();
        ItemId(format!("{item_type}-{suffix}"))
    }

    fn clone_box(&self) -> Box<dyn IdGenerator> {
        Box::new(*self)
    }
}

/// Deterministic ids (`ROW-0000000001`, `CHART-0000000002`, ...).
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    counter: u64,
}

impl SequentialIds {
    /// Start counting from zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, item_type: ItemType) -> ItemId {
        self.counter += 1;
        ItemId(format!("{item_type}-{:010}", self.counter))
    }

    fn clone_box(&self) -> Box<dyn IdGenerator> {
        Box::new(self.clone())
    }
}
