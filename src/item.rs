pub mod db;
pub mod models;

pub use models::{Item, ItemKind, NewItem, View};

/// Case-insensitive substring match of `query` against item names.
/// An empty query returns every item.
pub fn filter<'a>(items: &'a [Item], query: &str) -> Vec<&'a Item> {
    if query.is_empty() {
        return items.iter().collect();
    }

    let query = query.to_lowercase();

    items
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&query))
        .collect()
}
