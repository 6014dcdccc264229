//! Grouping and ordering of roadmap items into display tiers.
//!
//! | Bucket        | Source        | Order                                   |
//! |---------------|---------------|-----------------------------------------|
//! | `in_progress` | live items    | curator (catalog) order                 |
//! | `up_next`     | live items    | curator (catalog) order                 |
//! | `future`      | live items    | votes descending, catalog order on ties |
//! | `shipped`     | shipped items | `completed_at` descending               |
//!
//! Votes decide what gets promoted editorially; they never reorder items a
//! curator has already prioritized.

use crate::catalog::ItemStore;
use crate::model::{Priority, RoadmapItem};
use serde::Serialize;
use std::cmp::Reverse;

/// Default number of `future` items shown before "show more".
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// The vote-ordered `future` tier with a "show more" window.
///
/// The full sorted list is retained, so growing the window never re-sorts or
/// re-fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FutureBucket {
    sorted: Vec<RoadmapItem>,
    page_size: usize,
    visible: usize,
}

impl FutureBucket {
    /// Sort `items` (given in catalog order) by votes, descending.
    #[must_use]
    pub fn new(mut items: Vec<RoadmapItem>, page_size: usize) -> Self {
        // `sort_by_key` is stable: equal counts keep catalog order.
        items.sort_by_key(|item| Reverse(item.votes));
        let page_size = page_size.max(1);
        Self {
            visible: page_size.min(items.len()),
            sorted: items,
            page_size,
        }
    }

    /// The top `n` items after sorting.
    #[must_use]
    pub fn take(&self, n: usize) -> &[RoadmapItem] {
        &self.sorted[..n.min(self.sorted.len())]
    }

    /// Items inside the current window.
    #[must_use]
    pub fn visible(&self) -> &[RoadmapItem] {
        self.take(self.visible)
    }

    /// Every item in the tier, sorted.
    #[must_use]
    pub fn all(&self) -> &[RoadmapItem] {
        &self.sorted
    }

    /// How many sorted items sit beyond the window.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.sorted.len() - self.visible
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.remaining() > 0
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Grow the window by one page. Returns the new visible count.
    pub fn show_more(&mut self) -> usize {
        self.visible = (self.visible + self.page_size).min(self.sorted.len());
        self.visible
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Re-sort from fresh catalog data, keeping the window size the user
    /// already expanded to.
    fn resort(&mut self, items: Vec<RoadmapItem>) {
        let visible = self.visible;
        let page_size = self.page_size;
        *self = Self::new(items, page_size);
        self.visible = visible.max(self.visible).min(self.sorted.len());
    }
}

/// The four display lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoadmapGroups {
    pub in_progress: Vec<RoadmapItem>,
    pub up_next: Vec<RoadmapItem>,
    pub future: FutureBucket,
    pub shipped: Vec<RoadmapItem>,
}

impl RoadmapGroups {
    /// Group `catalog` with the default future page size.
    #[must_use]
    pub fn from_catalog(catalog: &ItemStore) -> Self {
        group_and_sort(catalog.live(), catalog.shipped(), DEFAULT_PAGE_SIZE)
    }

    /// Reflect a changed vote count for `item_id`.
    ///
    /// `future` is re-sorted from catalog order; the curated tiers only have
    /// the displayed count patched in place.
    pub fn refresh_item(&mut self, catalog: &ItemStore, item_id: &str) {
        let Some(item) = catalog.live().iter().find(|item| item.id == item_id) else {
            return;
        };

        match item.priority {
            Priority::Future => self.future.resort(tier(catalog.live(), Priority::Future)),
            Priority::InProgress => patch_votes(&mut self.in_progress, item),
            Priority::UpNext => patch_votes(&mut self.up_next, item),
        }
    }

    /// Find a displayed item by id in any bucket.
    #[must_use]
    pub fn find(&self, item_id: &str) -> Option<&RoadmapItem> {
        self.in_progress
            .iter()
            .chain(self.up_next.iter())
            .chain(self.future.all().iter())
            .chain(self.shipped.iter())
            .find(|item| item.id == item_id)
    }
}

fn tier(live: &[RoadmapItem], priority: Priority) -> Vec<RoadmapItem> {
    live.iter()
        .filter(|item| item.priority == priority)
        .cloned()
        .collect()
}

fn patch_votes(bucket: &mut [RoadmapItem], updated: &RoadmapItem) {
    if let Some(shown) = bucket.iter_mut().find(|item| item.id == updated.id) {
        shown.votes = updated.votes;
    }
}

/// Partition `live` by priority and order each bucket; `shipped` becomes the
/// recency-ordered fourth bucket.
#[must_use]
pub fn group_and_sort(
    live: &[RoadmapItem],
    shipped: &[RoadmapItem],
    page_size: usize,
) -> RoadmapGroups {
    let mut shipped = shipped.to_vec();
    shipped.sort_by_key(|item| Reverse(item.completed_at));

    RoadmapGroups {
        in_progress: tier(live, Priority::InProgress),
        up_next: tier(live, Priority::UpNext),
        future: FutureBucket::new(tier(live, Priority::Future), page_size),
        shipped,
    }
}
