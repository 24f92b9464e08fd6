use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use crate::status::WatchStatus;
use crate::watchlist::{ItemKey, WatchItem};

/// All items of one identity, split into three disjoint ordered partitions.
///
/// The serialized form is `{"want_to_watch": [...], "watching": [...], "completed": [...]}`.
/// On load, each item's `status` is forced to match the list it was stored in and
/// repeated keys are dropped, so a hand-edited blob cannot break disjointness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCollection")]
pub struct Collection {
    want_to_watch: Vec<WatchItem>,
    watching: Vec<WatchItem>,
    completed: Vec<WatchItem>,
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    want_to_watch: Vec<WatchItem>,
    #[serde(default)]
    watching: Vec<WatchItem>,
    #[serde(default)]
    completed: Vec<WatchItem>,
}

impl From<RawCollection> for Collection {
    fn from(raw: RawCollection) -> Self {
        let tagged = [
            (WatchStatus::Want, raw.want_to_watch),
            (WatchStatus::Watching, raw.watching),
            (WatchStatus::Completed, raw.completed),
        ];
        Collection::from_items(tagged.into_iter().flat_map(|(status, items)| {
            items.into_iter().map(move |mut item| {
                item.status = status;
                item
            })
        }))
    }
}

impl Collection {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Partitions a flat list by status. Later items with an already seen key are dropped.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = WatchItem>,
    {
        let mut collection = Self::empty();
        let mut seen = HashSet::new();
        for item in items {
            if seen.insert(item.key()) {
                collection.partition_mut(item.status).push(item);
            }
        }
        collection
    }

    pub fn partition(&self, status: WatchStatus) -> &[WatchItem] {
        match status {
            WatchStatus::Want => &self.want_to_watch,
            WatchStatus::Watching => &self.watching,
            WatchStatus::Completed => &self.completed,
        }
    }

    fn partition_mut(&mut self, status: WatchStatus) -> &mut Vec<WatchItem> {
        match status {
            WatchStatus::Want => &mut self.want_to_watch,
            WatchStatus::Watching => &mut self.watching,
            WatchStatus::Completed => &mut self.completed,
        }
    }

    /// Finds an item in whichever partition holds it.
    pub fn find(&self, key: &ItemKey) -> Option<&WatchItem> {
        self.items().find(|item| item.key() == *key)
    }

    pub fn find_mut(&mut self, key: &ItemKey) -> Option<&mut WatchItem> {
        self.want_to_watch
            .iter_mut()
            .chain(self.watching.iter_mut())
            .chain(self.completed.iter_mut())
            .find(|item| item.key() == *key)
    }

    pub fn status_of(&self, key: &ItemKey) -> Option<WatchStatus> {
        self.find(key).map(|item| item.status)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.find(key).is_some()
    }

    /// Appends to the partition matching `item.status`.
    /// Returns false without inserting when the key already exists anywhere.
    pub fn insert(&mut self, item: WatchItem) -> bool {
        if self.contains(&item.key()) {
            return false;
        }
        self.partition_mut(item.status).push(item);
        true
    }

    pub fn remove(&mut self, key: &ItemKey) -> Option<WatchItem> {
        for status in WatchStatus::ALL {
            let partition = self.partition_mut(status);
            if let Some(pos) = partition.iter().position(|item| item.key() == *key) {
                return Some(partition.remove(pos));
            }
        }
        None
    }

    /// Moves an item to another partition, keeping every other field.
    /// Moving to the current status leaves its position untouched.
    pub fn move_to(&mut self, key: &ItemKey, status: WatchStatus) -> bool {
        match self.status_of(key) {
            None => false,
            Some(current) if current == status => true,
            Some(_) => match self.remove(key) {
                Some(mut item) => {
                    item.status = status;
                    self.partition_mut(status).push(item);
                    true
                }
                None => false,
            },
        }
    }

    /// All items, flattened in want / watching / completed order.
    pub fn items(&self) -> impl Iterator<Item = &WatchItem> {
        self.want_to_watch
            .iter()
            .chain(self.watching.iter())
            .chain(self.completed.iter())
    }

    pub fn into_items(self) -> Vec<WatchItem> {
        let mut items = self.want_to_watch;
        items.extend(self.watching);
        items.extend(self.completed);
        items
    }

    pub fn len(&self) -> usize {
        self.want_to_watch.len() + self.watching.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
