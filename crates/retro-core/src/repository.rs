use crate::error::RetroError;
use crate::models::collection::{Collection, CollectionId};
use crate::models::item::{Item, ItemId};
use crate::models::user::{UserAccount, UserId};

/// Storage backend for users, collections and items.
///
/// The identity and collection stores only talk to the catalog through this
/// trait. Callers check existence and ownership before any write. Mutations
/// touching both an item and its collection go through the combined methods,
/// which either apply every row change or none.
pub trait CatalogRepository: Send + Sync {
    // ── Users ──

    fn get_user(&self, id: &UserId) -> Result<Option<UserAccount>, RetroError>;

    /// Exact, case-sensitive email match.
    fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, RetroError>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<UserAccount>, RetroError>;

    fn insert_user(&self, account: &UserAccount) -> Result<(), RetroError>;

    fn update_user(&self, account: &UserAccount) -> Result<(), RetroError>;

    fn next_user_id(&self) -> Result<UserId, RetroError>;

    // ── Collections ──

    fn get_collection(&self, id: &CollectionId) -> Result<Option<Collection>, RetroError>;

    /// Collections of one owner, in catalog order.
    fn list_collections_for_owner(&self, owner: &UserId) -> Result<Vec<Collection>, RetroError>;

    fn insert_collection(&self, collection: &Collection) -> Result<(), RetroError>;

    /// Replace the stored record, membership list included.
    fn update_collection(&self, collection: &Collection) -> Result<(), RetroError>;

    fn delete_collection(&self, id: &CollectionId) -> Result<(), RetroError>;

    fn next_collection_id(&self) -> Result<CollectionId, RetroError>;

    // ── Items ──

    fn get_item(&self, id: &ItemId) -> Result<Option<Item>, RetroError>;

    /// The items among `ids` that exist, in catalog order.
    fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, RetroError>;

    /// Every item of every user, in catalog order.
    fn list_items(&self) -> Result<Vec<Item>, RetroError>;

    /// First item, in catalog order, whose ISBN contains `fragment`.
    fn find_item_by_isbn_fragment(&self, fragment: &str) -> Result<Option<Item>, RetroError>;

    fn insert_item(&self, item: &Item) -> Result<(), RetroError>;

    fn update_item(&self, item: &Item) -> Result<(), RetroError>;

    fn delete_item(&self, id: &ItemId) -> Result<(), RetroError>;

    fn next_item_id(&self) -> Result<ItemId, RetroError>;

    // ── Membership ──

    /// Store `item` and replace `collection`, which already lists it.
    fn add_item_to_collection(
        &self,
        item: &Item,
        collection: &Collection,
    ) -> Result<(), RetroError>;

    /// Delete `item` and replace `collection`, which no longer lists it.
    fn remove_item_from_collection(
        &self,
        item: &ItemId,
        collection: &Collection,
    ) -> Result<(), RetroError>;

    /// Delete a collection together with the listed member items.
    fn delete_collection_cascade(
        &self,
        id: &CollectionId,
        items: &[ItemId],
    ) -> Result<(), RetroError>;
}
