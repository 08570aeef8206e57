use retro_core::models::collection::{Collection, CollectionId};
use retro_core::models::item::{Item, ItemId};

/// The current user's slice of the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub collections: Vec<Collection>,
    pub items: Vec<Item>,
}

impl Projection {
    pub fn collection(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.iter().find(|c| &c.id == id)
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Items listed by a collection, in membership order.
    pub fn items_of(&self, id: &CollectionId) -> Vec<Item> {
        let Some(col) = self.collection(id) else {
            return Vec::new();
        };
        col.items
            .iter()
            .filter_map(|item_id| self.item(item_id).cloned())
            .collect()
    }

    pub fn upsert_collection(&mut self, col: Collection) {
        match self.collections.iter_mut().find(|c| c.id == col.id) {
            Some(slot) => *slot = col,
            None => self.collections.push(col),
        }
    }

    pub fn upsert_item(&mut self, item: Item) {
        match self.items.iter_mut().find(|i| i.id == item.id) {
            Some(slot) => *slot = item,
            None => self.items.push(item),
        }
    }

    pub fn remove_collection(&mut self, id: &CollectionId) {
        self.collections.retain(|c| &c.id != id);
    }

    pub fn remove_item(&mut self, id: &ItemId) {
        self.items.retain(|i| &i.id != id);
    }

    pub fn clear(&mut self) {
        self.collections.clear();
        self.items.clear();
    }
}
