use std::sync::{Mutex, MutexGuard};

use retro_core::error::RetroError;
use retro_core::models::collection::{Collection, CollectionId};
use retro_core::models::item::{Item, ItemId};
use retro_core::models::next_prefixed_id;
use retro_core::models::user::{UserAccount, UserId};
use retro_core::repository::CatalogRepository;

use crate::seed::Seed;

/// Process-local catalog backed by vectors in insertion order.
///
/// Starts from the [`Seed`] by default. State is lost when the process exits.
pub struct MemoryCatalog {
    inner: Mutex<Seed>,
}

impl MemoryCatalog {
    pub fn new(seed: Seed) -> Self {
        Self {
            inner: Mutex::new(seed),
        }
    }

    /// Catalog preloaded with the bundled seed.
    pub fn seeded() -> Result<Self, RetroError> {
        Ok(Self::new(Seed::load()?))
    }

    pub fn empty() -> Self {
        Self::new(Seed {
            users: Vec::new(),
            collections: Vec::new(),
            items: Vec::new(),
        })
    }

    /// Copy of the whole table set, for inspection.
    pub fn snapshot(&self) -> Result<Seed, RetroError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Seed>, RetroError> {
        self.inner
            .lock()
            .map_err(|_| RetroError::Database("catalog lock poisoned".into()))
    }
}

impl CatalogRepository for MemoryCatalog {
    fn get_user(&self, id: &UserId) -> Result<Option<UserAccount>, RetroError> {
        Ok(self.lock()?.users.iter().find(|u| &u.user.id == id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, RetroError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.user.email == email)
            .cloned())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<UserAccount>, RetroError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.user.username == username)
            .cloned())
    }

    fn insert_user(&self, account: &UserAccount) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        if seed.users.iter().any(|u| u.user.id == account.user.id) {
            return Err(RetroError::Database(format!(
                "duplicate user id {}",
                account.user.id
            )));
        }
        seed.users.push(account.clone());
        Ok(())
    }

    fn update_user(&self, account: &UserAccount) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        let slot = seed
            .users
            .iter_mut()
            .find(|u| u.user.id == account.user.id)
            .ok_or_else(|| RetroError::UserNotFound {
                id: account.user.id.to_string(),
            })?;
        *slot = account.clone();
        Ok(())
    }

    fn next_user_id(&self) -> Result<UserId, RetroError> {
        let seed = self.lock()?;
        Ok(UserId(next_prefixed_id(
            UserId::PREFIX,
            seed.users.iter().map(|u| u.user.id.as_str()),
        )))
    }

    fn get_collection(&self, id: &CollectionId) -> Result<Option<Collection>, RetroError> {
        Ok(self.lock()?.collections.iter().find(|c| &c.id == id).cloned())
    }

    fn list_collections_for_owner(&self, owner: &UserId) -> Result<Vec<Collection>, RetroError> {
        Ok(self
            .lock()?
            .collections
            .iter()
            .filter(|c| &c.owner_id == owner)
            .cloned()
            .collect())
    }

    fn insert_collection(&self, collection: &Collection) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        if seed.collections.iter().any(|c| c.id == collection.id) {
            return Err(RetroError::Database(format!(
                "duplicate collection id {}",
                collection.id
            )));
        }
        seed.collections.push(collection.clone());
        Ok(())
    }

    fn update_collection(&self, collection: &Collection) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        let slot = seed
            .collections
            .iter_mut()
            .find(|c| c.id == collection.id)
            .ok_or_else(|| RetroError::CollectionNotFound {
                id: collection.id.to_string(),
            })?;
        *slot = collection.clone();
        Ok(())
    }

    fn delete_collection(&self, id: &CollectionId) -> Result<(), RetroError> {
        self.lock()?.collections.retain(|c| &c.id != id);
        Ok(())
    }

    fn next_collection_id(&self) -> Result<CollectionId, RetroError> {
        let seed = self.lock()?;
        Ok(CollectionId(next_prefixed_id(
            CollectionId::PREFIX,
            seed.collections.iter().map(|c| c.id.as_str()),
        )))
    }

    fn get_item(&self, id: &ItemId) -> Result<Option<Item>, RetroError> {
        Ok(self.lock()?.items.iter().find(|i| &i.id == id).cloned())
    }

    fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, RetroError> {
        Ok(self
            .lock()?
            .items
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    fn list_items(&self) -> Result<Vec<Item>, RetroError> {
        Ok(self.lock()?.items.clone())
    }

    fn find_item_by_isbn_fragment(&self, fragment: &str) -> Result<Option<Item>, RetroError> {
        Ok(self
            .lock()?
            .items
            .iter()
            .find(|i| i.details.isbn().is_some_and(|isbn| isbn.contains(fragment)))
            .cloned())
    }

    fn insert_item(&self, item: &Item) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        if seed.items.iter().any(|i| i.id == item.id) {
            return Err(RetroError::Database(format!("duplicate item id {}", item.id)));
        }
        seed.items.push(item.clone());
        Ok(())
    }

    fn update_item(&self, item: &Item) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        let slot = seed
            .items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or_else(|| RetroError::ItemNotFound {
                id: item.id.to_string(),
            })?;
        *slot = item.clone();
        Ok(())
    }

    fn delete_item(&self, id: &ItemId) -> Result<(), RetroError> {
        self.lock()?.items.retain(|i| &i.id != id);
        Ok(())
    }

    fn next_item_id(&self) -> Result<ItemId, RetroError> {
        let seed = self.lock()?;
        Ok(ItemId(next_prefixed_id(
            ItemId::PREFIX,
            seed.items.iter().map(|i| i.id.as_str()),
        )))
    }

    fn add_item_to_collection(
        &self,
        item: &Item,
        collection: &Collection,
    ) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        if seed.items.iter().any(|i| i.id == item.id) {
            return Err(RetroError::Database(format!("duplicate item id {}", item.id)));
        }
        let slot = seed
            .collections
            .iter()
            .position(|c| c.id == collection.id)
            .ok_or_else(|| RetroError::CollectionNotFound {
                id: collection.id.to_string(),
            })?;
        seed.collections[slot] = collection.clone();
        seed.items.push(item.clone());
        Ok(())
    }

    fn remove_item_from_collection(
        &self,
        item: &ItemId,
        collection: &Collection,
    ) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        let slot = seed
            .collections
            .iter()
            .position(|c| c.id == collection.id)
            .ok_or_else(|| RetroError::CollectionNotFound {
                id: collection.id.to_string(),
            })?;
        seed.collections[slot] = collection.clone();
        seed.items.retain(|i| &i.id != item);
        Ok(())
    }

    fn delete_collection_cascade(
        &self,
        id: &CollectionId,
        items: &[ItemId],
    ) -> Result<(), RetroError> {
        let mut seed = self.lock()?;
        seed.items.retain(|i| !items.contains(&i.id));
        seed.collections.retain(|c| &c.id != id);
        Ok(())
    }
}
