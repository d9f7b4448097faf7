use std::collections::{BTreeMap, BTreeSet};

use smeshmon_types::Identity;

use crate::item::{IdentityStatus, ItemKey, ItemStyle, TimelineItem};

/// Partial update of an existing item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub style: Option<ItemStyle>,
    pub content: Option<String>,
    pub identities: BTreeMap<Identity, IdentityStatus>,
}

impl ItemPatch {
    /// Set one identity's status and restyle the item to match
    pub fn status(id: Identity, status: IdentityStatus) -> Self {
        let mut identities = BTreeMap::new();
        let style = ItemStyle::from(status.state);
        identities.insert(id, status);
        ItemPatch {
            style: Some(style),
            content: None,
            identities,
        }
    }
}

/// Keyed collection of timeline items.
///
/// Items are only ever inserted or merged into. Identity statuses merge per
/// identity, so one identity's update never drops another's. Every write
/// records the key as dirty until the next `take_dirty`.
#[derive(Debug, Clone, Default)]
pub struct TimelineStore {
    items: BTreeMap<ItemKey, TimelineItem>,
    dirty: BTreeSet<ItemKey>,
    revision: u64,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&TimelineItem> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &TimelineItem> {
        self.items.values()
    }

    /// Insert new items, or merge into existing ones with the same key
    pub fn upsert(&mut self, items: impl IntoIterator<Item = TimelineItem>) {
        for item in items {
            let key = item.key;
            match self.items.get_mut(&key) {
                Some(existing) => {
                    let TimelineItem {
                        kind,
                        group,
                        subgroup,
                        title,
                        content,
                        start,
                        end,
                        style,
                        identities,
                        event,
                        ..
                    } = item;
                    existing.kind = kind;
                    existing.group = group;
                    existing.subgroup = subgroup;
                    existing.title = title;
                    existing.content = content;
                    existing.start = start;
                    existing.end = end;
                    existing.style = style;
                    existing.event = event;
                    existing.identities.extend(identities);
                }
                None => {
                    self.items.insert(key, item);
                }
            }
            self.touch(key);
        }
    }

    /// Merge `patch` into the item at `key`; `false` when there is no such item
    pub fn patch(&mut self, key: ItemKey, patch: ItemPatch) -> bool {
        let Some(item) = self.items.get_mut(&key) else {
            return false;
        };
        if let Some(style) = patch.style {
            item.style = style;
        }
        if let Some(content) = patch.content {
            item.content = content;
        }
        item.identities.extend(patch.identities);
        self.touch(key);
        true
    }

    fn touch(&mut self, key: ItemKey) {
        self.dirty.insert(key);
        self.revision += 1;
    }

    /// Keys written since the previous call
    pub fn take_dirty(&mut self) -> Vec<ItemKey> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    /// Monotonic write counter
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
