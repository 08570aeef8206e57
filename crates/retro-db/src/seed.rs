use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use retro_core::error::RetroError;
use retro_core::models::collection::Collection;
use retro_core::models::item::Item;
use retro_core::models::user::UserAccount;

const SEED_JSON: &str = include_str!("../seed/catalog.json");

/// The catalog every fresh store starts from: two collectors, three
/// collections, seven items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    pub users: Vec<UserAccount>,
    pub collections: Vec<Collection>,
    pub items: Vec<Item>,
}

impl Seed {
    pub fn load() -> Result<Self, RetroError> {
        Self::from_json(SEED_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, RetroError> {
        let seed: Seed = serde_json::from_str(json)?;
        seed.check_consistency()?;
        Ok(seed)
    }

    /// Verify collection membership and item back-references agree.
    ///
    /// Every id listed by a collection must name an item that points back
    /// at that collection, and every item's collection must exist and share
    /// the item's owner.
    pub fn check_consistency(&self) -> Result<(), RetroError> {
        let items: HashMap<&str, &Item> = self.items.iter().map(|i| (i.id.as_str(), i)).collect();
        let collections: HashMap<&str, &Collection> = self
            .collections
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect();

        for col in &self.collections {
            for id in &col.items {
                let item = items.get(id.as_str()).ok_or_else(|| {
                    RetroError::Other(format!("collection {} lists missing item {}", col.id, id))
                })?;
                if item.user_specific.collection_id != col.id {
                    return Err(RetroError::Other(format!(
                        "item {} is listed by {} but filed under {}",
                        id, col.id, item.user_specific.collection_id
                    )));
                }
            }
        }

        for item in &self.items {
            let col = collections
                .get(item.user_specific.collection_id.as_str())
                .ok_or_else(|| {
                    RetroError::Other(format!(
                        "item {} is filed under missing collection {}",
                        item.id, item.user_specific.collection_id
                    ))
                })?;
            if col.owner_id != item.user_specific.owner_id {
                return Err(RetroError::Other(format!(
                    "item {} and collection {} have different owners",
                    item.id, col.id
                )));
            }
        }

        Ok(())
    }
}
