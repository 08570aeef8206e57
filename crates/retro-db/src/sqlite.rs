use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use retro_core::error::RetroError;
use retro_core::models::collection::{Collection, CollectionId};
use retro_core::models::item::{Item, ItemId};
use retro_core::models::next_prefixed_id;
use retro_core::models::user::{UserAccount, UserId};
use retro_core::repository::CatalogRepository;

use crate::ops;
use crate::seed::Seed;

fn db_err(e: anyhow::Error) -> RetroError {
    RetroError::Database(e.to_string())
}

/// Catalog persisted in a SQLite file, seeded on first open.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open (or create) the catalog database and load the seed if it has no users.
    pub fn open(path: &Path) -> Result<Self, RetroError> {
        let conn = crate::open_db(path).map_err(db_err)?;
        Self::with_seed(conn, &Seed::load()?)
    }

    /// In-memory SQLite catalog with the bundled seed.
    pub fn open_memory() -> Result<Self, RetroError> {
        let conn = crate::open_memory_db().map_err(db_err)?;
        Self::with_seed(conn, &Seed::load()?)
    }

    fn with_seed(conn: Connection, seed: &Seed) -> Result<Self, RetroError> {
        ops::seed_if_empty(&conn, seed).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RetroError> {
        self.conn
            .lock()
            .map_err(|_| RetroError::Database("connection lock poisoned".into()))
    }
}

impl CatalogRepository for SqliteCatalog {
    fn get_user(&self, id: &UserId) -> Result<Option<UserAccount>, RetroError> {
        ops::get_user(&*self.lock()?, id).map_err(db_err)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, RetroError> {
        ops::get_user_by_email(&*self.lock()?, email).map_err(db_err)
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<UserAccount>, RetroError> {
        ops::get_user_by_username(&*self.lock()?, username).map_err(db_err)
    }

    fn insert_user(&self, account: &UserAccount) -> Result<(), RetroError> {
        ops::insert_user(&*self.lock()?, account).map_err(db_err)
    }

    fn update_user(&self, account: &UserAccount) -> Result<(), RetroError> {
        let changed = ops::update_user(&*self.lock()?, account).map_err(db_err)?;
        if changed == 0 {
            return Err(RetroError::UserNotFound {
                id: account.user.id.to_string(),
            });
        }
        Ok(())
    }

    fn next_user_id(&self) -> Result<UserId, RetroError> {
        let ids = ops::list_user_ids(&*self.lock()?).map_err(db_err)?;
        Ok(UserId(next_prefixed_id(
            UserId::PREFIX,
            ids.iter().map(String::as_str),
        )))
    }

    fn get_collection(&self, id: &CollectionId) -> Result<Option<Collection>, RetroError> {
        ops::get_collection(&*self.lock()?, id).map_err(db_err)
    }

    fn list_collections_for_owner(&self, owner: &UserId) -> Result<Vec<Collection>, RetroError> {
        ops::list_collections_for_owner(&*self.lock()?, owner).map_err(db_err)
    }

    fn insert_collection(&self, collection: &Collection) -> Result<(), RetroError> {
        ops::insert_collection(&*self.lock()?, collection).map_err(db_err)
    }

    fn update_collection(&self, collection: &Collection) -> Result<(), RetroError> {
        let changed = ops::update_collection(&*self.lock()?, collection).map_err(db_err)?;
        if changed == 0 {
            return Err(RetroError::CollectionNotFound {
                id: collection.id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_collection(&self, id: &CollectionId) -> Result<(), RetroError> {
        ops::delete_collection(&*self.lock()?, id).map_err(db_err)
    }

    fn next_collection_id(&self) -> Result<CollectionId, RetroError> {
        let ids = ops::list_collection_ids(&*self.lock()?).map_err(db_err)?;
        Ok(CollectionId(next_prefixed_id(
            CollectionId::PREFIX,
            ids.iter().map(String::as_str),
        )))
    }

    fn get_item(&self, id: &ItemId) -> Result<Option<Item>, RetroError> {
        ops::get_item(&*self.lock()?, id).map_err(db_err)
    }

    fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, RetroError> {
        let all = ops::list_items(&*self.lock()?).map_err(db_err)?;
        Ok(all.into_iter().filter(|i| ids.contains(&i.id)).collect())
    }

    fn list_items(&self) -> Result<Vec<Item>, RetroError> {
        ops::list_items(&*self.lock()?).map_err(db_err)
    }

    fn find_item_by_isbn_fragment(&self, fragment: &str) -> Result<Option<Item>, RetroError> {
        ops::find_item_by_isbn_fragment(&*self.lock()?, fragment).map_err(db_err)
    }

    fn insert_item(&self, item: &Item) -> Result<(), RetroError> {
        ops::insert_item(&*self.lock()?, item).map_err(db_err)
    }

    fn update_item(&self, item: &Item) -> Result<(), RetroError> {
        let changed = ops::update_item(&*self.lock()?, item).map_err(db_err)?;
        if changed == 0 {
            return Err(RetroError::ItemNotFound {
                id: item.id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_item(&self, id: &ItemId) -> Result<(), RetroError> {
        ops::delete_item(&*self.lock()?, id).map_err(db_err)
    }

    fn next_item_id(&self) -> Result<ItemId, RetroError> {
        let ids = ops::list_item_ids(&*self.lock()?).map_err(db_err)?;
        Ok(ItemId(next_prefixed_id(
            ItemId::PREFIX,
            ids.iter().map(String::as_str),
        )))
    }

    fn add_item_to_collection(
        &self,
        item: &Item,
        collection: &Collection,
    ) -> Result<(), RetroError> {
        let changed =
            ops::insert_item_into_collection(&*self.lock()?, item, collection).map_err(db_err)?;
        if changed == 0 {
            return Err(RetroError::CollectionNotFound {
                id: collection.id.to_string(),
            });
        }
        Ok(())
    }

    fn remove_item_from_collection(
        &self,
        item: &ItemId,
        collection: &Collection,
    ) -> Result<(), RetroError> {
        let changed =
            ops::delete_item_from_collection(&*self.lock()?, item, collection).map_err(db_err)?;
        if changed == 0 {
            return Err(RetroError::CollectionNotFound {
                id: collection.id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_collection_cascade(
        &self,
        id: &CollectionId,
        items: &[ItemId],
    ) -> Result<(), RetroError> {
        ops::delete_collection_with_items(&*self.lock()?, id, items).map_err(db_err)
    }
}
