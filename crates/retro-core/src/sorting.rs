use std::cmp::Ordering;

use crate::models::item::Item;
use crate::models::user::SortBy;

/// Order items by a collector's display preference.
///
/// Title and creator compare case-insensitively, year ascends with unknown
/// years last, date added puts the newest first. The sort is stable, so
/// ties keep collection order.
pub fn sort_items(items: &mut [Item], sort_by: SortBy) {
    match sort_by {
        SortBy::Title => items.sort_by_cached_key(|i| i.title.to_lowercase()),
        SortBy::Author => items.sort_by_cached_key(|i| i.details.creator().to_lowercase()),
        SortBy::Year => items.sort_by(|a, b| match (a.year, b.year) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortBy::DateAdded => {
            items.sort_by(|a, b| b.user_specific.date_added.cmp(&a.user_specific.date_added))
        }
    }
}

/// Sum of estimated values.
pub fn total_value(items: &[Item]) -> f64 {
    items.iter().map(|i| i.market.estimated_value).sum()
}
