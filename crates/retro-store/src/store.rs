use std::sync::{Arc, Mutex, MutexGuard};

use retro_auth::IdentityStore;
use retro_core::config::OrphanPolicy;
use retro_core::error::RetroError;
use retro_core::latency::{Latency, Operation};
use retro_core::models::collection::{Collection, CollectionId, CollectionPatch, NewCollection};
use retro_core::models::item::{DraftItem, Item, ItemId, ItemPatch, NewItem};
use retro_core::models::user::{SortBy, User, UserId};
use retro_core::repository::CatalogRepository;
use retro_core::{sorting, validation};
use retro_scan::{ImageInput, ScanProvider};

use crate::projection::Projection;

/// Lifecycle of the store's projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreStatus::Idle => write!(f, "idle"),
            StoreStatus::Loading => write!(f, "loading"),
            StoreStatus::Ready => write!(f, "ready"),
            StoreStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug)]
struct StoreState {
    status: StoreStatus,
    error: Option<String>,
    /// Collector the projection was built for.
    owner: Option<UserId>,
    projection: Projection,
}

impl StoreState {
    /// Projection of `user`, emptied first if it was built for someone else.
    fn projection_for(&mut self, user: &UserId) -> &mut Projection {
        if self.owner.as_ref() != Some(user) {
            self.projection.clear();
            self.owner = Some(user.clone());
        }
        &mut self.projection
    }
}

/// Collections and items of the logged-in collector.
///
/// Reads only return data while the collector it was loaded for is still
/// the current session; after a logout or a switch of user they are empty
/// until the next fetch. Every mutation checks existence and ownership
/// against the catalog before writing anything. A failed call keeps the
/// previous projection and records a single error message, replacing any
/// earlier one.
pub struct CollectionStore {
    catalog: Arc<dyn CatalogRepository>,
    identity: Arc<IdentityStore>,
    scanner: Arc<dyn ScanProvider>,
    latency: Latency,
    orphan_policy: OrphanPolicy,
    state: Mutex<StoreState>,
}

impl CollectionStore {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        identity: Arc<IdentityStore>,
        scanner: Arc<dyn ScanProvider>,
        latency: Latency,
    ) -> Self {
        Self {
            catalog,
            identity,
            scanner,
            latency,
            orphan_policy: OrphanPolicy::default(),
            state: Mutex::new(StoreState {
                status: StoreStatus::Idle,
                error: None,
                owner: None,
                projection: Projection::default(),
            }),
        }
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    // ── Accessors ──

    pub fn status(&self) -> StoreStatus {
        self.state().status
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn collections(&self) -> Vec<Collection> {
        self.visible(|p| p.collections.clone())
    }

    pub fn items(&self) -> Vec<Item> {
        self.visible(|p| p.items.clone())
    }

    pub fn get_collection_by_id(&self, id: &CollectionId) -> Option<Collection> {
        self.visible(|p| p.collection(id).cloned())
    }

    pub fn get_item_by_id(&self, id: &ItemId) -> Option<Item> {
        self.visible(|p| p.item(id).cloned())
    }

    pub fn get_items_by_collection_id(&self, id: &CollectionId) -> Vec<Item> {
        self.visible(|p| p.items_of(id))
    }

    /// Items of one collection in the requested display order.
    pub fn items_sorted(&self, id: &CollectionId, sort_by: SortBy) -> Vec<Item> {
        let mut items = self.get_items_by_collection_id(id);
        sorting::sort_items(&mut items, sort_by);
        items
    }

    /// Total estimated value of one collection.
    pub fn collection_value(&self, id: &CollectionId) -> f64 {
        sorting::total_value(&self.get_items_by_collection_id(id))
    }

    // ── Loading ──

    /// Replace the projection with the current user's collections and the
    /// items they list. Without a session the projection is emptied.
    pub async fn fetch_user_collections(&self) -> Result<(), RetroError> {
        self.begin();
        self.latency.simulate(Operation::Fetch).await;
        let result = self.load_projection();
        self.finish("Erreur lors de la récupération des collections", result)
    }

    fn load_projection(&self) -> Result<(), RetroError> {
        let Some(user) = self.identity.current_user() else {
            let mut state = self.state();
            state.projection.clear();
            state.owner = None;
            return Ok(());
        };

        let collections = self.catalog.list_collections_for_owner(&user.id)?;
        let ids: Vec<ItemId> = collections
            .iter()
            .flat_map(|c| c.items.iter().cloned())
            .collect();
        let items = self.catalog.get_items(&ids)?;
        tracing::debug!(
            user = %user.id,
            collections = collections.len(),
            items = items.len(),
            "loaded projection"
        );
        let mut state = self.state();
        state.projection = Projection { collections, items };
        state.owner = Some(user.id);
        Ok(())
    }

    // ── Collections ──

    pub async fn create_collection(&self, data: NewCollection) -> Result<Collection, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Mutate).await;
        let result = self.try_create_collection(data);
        self.finish("Erreur lors de la création de la collection", result)
    }

    fn try_create_collection(&self, data: NewCollection) -> Result<Collection, RetroError> {
        let user = self.require_user()?;
        validation::validate_collection_name(&data.name)?;

        let id = self.catalog.next_collection_id()?;
        let col = Collection::new(id, user.id.clone(), data);
        self.catalog.insert_collection(&col)?;
        tracing::info!(collection = %col.id, name = %col.name, "created collection");

        self.state()
            .projection_for(&user.id)
            .upsert_collection(col.clone());
        Ok(col)
    }

    pub async fn update_collection(
        &self,
        id: &CollectionId,
        patch: CollectionPatch,
    ) -> Result<Collection, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Mutate).await;
        let result = self.try_update_collection(id, patch);
        self.finish("Erreur lors de la mise à jour de la collection", result)
    }

    fn try_update_collection(
        &self,
        id: &CollectionId,
        patch: CollectionPatch,
    ) -> Result<Collection, RetroError> {
        let user = self.require_user()?;
        let mut col = self.owned_collection(id, &user, "modifier cette collection")?;
        if let Some(name) = &patch.name {
            validation::validate_collection_name(name)?;
        }

        col.apply(patch);
        self.catalog.update_collection(&col)?;
        tracing::info!(collection = %col.id, "updated collection");

        self.state()
            .projection_for(&user.id)
            .upsert_collection(col.clone());
        Ok(col)
    }

    pub async fn delete_collection(&self, id: &CollectionId) -> Result<(), RetroError> {
        self.begin();
        self.latency.simulate(Operation::Mutate).await;
        let result = self.try_delete_collection(id);
        self.finish("Erreur lors de la suppression de la collection", result)
    }

    fn try_delete_collection(&self, id: &CollectionId) -> Result<(), RetroError> {
        let user = self.require_user()?;
        let col = self.owned_collection(id, &user, "supprimer cette collection")?;

        match self.orphan_policy {
            OrphanPolicy::Cascade => self.catalog.delete_collection_cascade(id, &col.items)?,
            OrphanPolicy::Keep => self.catalog.delete_collection(id)?,
        }
        tracing::info!(
            collection = %id,
            members = col.items.len(),
            policy = %self.orphan_policy,
            "deleted collection"
        );

        let mut state = self.state();
        let projection = state.projection_for(&user.id);
        projection.remove_collection(id);
        // kept orphans are no longer reachable from any visible collection
        for item_id in &col.items {
            projection.remove_item(item_id);
        }
        Ok(())
    }

    // ── Items ──

    pub async fn add_item(
        &self,
        collection_id: &CollectionId,
        data: NewItem,
    ) -> Result<Item, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Mutate).await;
        let result = self.try_add_item(collection_id, data);
        self.finish("Erreur lors de l'ajout de l'item", result)
    }

    fn try_add_item(&self, collection_id: &CollectionId, data: NewItem) -> Result<Item, RetroError> {
        let user = self.require_user()?;
        let mut col = self.owned_collection(
            collection_id,
            &user,
            "ajouter des items à cette collection",
        )?;
        validation::validate_new_item(&data)?;

        let id = self.catalog.next_item_id()?;
        let item = Item::new(id, user.id.clone(), col.id.clone(), data);
        col.push_item(item.id.clone());
        self.catalog.add_item_to_collection(&item, &col)?;
        tracing::info!(item = %item.id, collection = %col.id, title = %item.title, "added item");

        let mut state = self.state();
        let projection = state.projection_for(&user.id);
        projection.upsert_item(item.clone());
        projection.upsert_collection(col);
        Ok(item)
    }

    pub async fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<Item, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Mutate).await;
        let result = self.try_update_item(id, patch);
        self.finish("Erreur lors de la mise à jour de l'item", result)
    }

    fn try_update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<Item, RetroError> {
        let user = self.require_user()?;
        let mut item = self.owned_item(id, &user, "modifier cet item")?;
        if let Some(title) = &patch.title {
            validation::validate_item_title(title)?;
        }
        if let Some(value) = patch.market.as_ref().and_then(|m| m.estimated_value) {
            validation::validate_estimated_value(value)?;
        }

        item.apply(patch);
        self.catalog.update_item(&item)?;
        tracing::info!(item = %item.id, "updated item");

        self.state().projection_for(&user.id).upsert_item(item.clone());
        Ok(item)
    }

    pub async fn delete_item(&self, id: &ItemId) -> Result<(), RetroError> {
        self.begin();
        self.latency.simulate(Operation::Mutate).await;
        let result = self.try_delete_item(id);
        self.finish("Erreur lors de la suppression de l'item", result)
    }

    fn try_delete_item(&self, id: &ItemId) -> Result<(), RetroError> {
        let user = self.require_user()?;
        let item = self.owned_item(id, &user, "supprimer cet item")?;

        let parent = self.catalog.get_collection(&item.user_specific.collection_id)?;
        let parent = match parent {
            Some(mut col) => {
                col.remove_item(id);
                self.catalog.remove_item_from_collection(id, &col)?;
                Some(col)
            }
            None => {
                self.catalog.delete_item(id)?;
                None
            }
        };
        tracing::info!(item = %id, "deleted item");

        let mut state = self.state();
        let projection = state.projection_for(&user.id);
        projection.remove_item(id);
        if let Some(col) = parent {
            projection.upsert_collection(col);
        }
        Ok(())
    }

    // ── Scanning ──

    /// Resolve a barcode into a draft. Drafts are never persisted here;
    /// confirm one with [`CollectionStore::add_item`].
    pub async fn scan_barcode(&self, code: &str) -> Result<DraftItem, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Barcode).await;
        let code = code.trim();
        let result = if code.is_empty() {
            Err(RetroError::validation("Veuillez saisir un code-barres"))
        } else {
            self.scanner.lookup_barcode(code).await.and_then(|hit| {
                hit.ok_or_else(|| RetroError::NoMatch {
                    query: code.to_string(),
                })
            })
        };
        self.finish("Erreur lors de la numérisation", result)
    }

    pub async fn scan_image(&self, image: &ImageInput) -> Result<DraftItem, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Image).await;
        let result = self.scanner.recognize_image(image).await.and_then(|hit| {
            hit.ok_or_else(|| RetroError::NoMatch {
                query: image.file_name.clone(),
            })
        });
        self.finish("Erreur lors de la reconnaissance d'image", result)
    }

    // ── Internals ──

    fn require_user(&self) -> Result<User, RetroError> {
        self.identity
            .current_user()
            .ok_or(RetroError::NotAuthenticated)
    }

    fn owned_collection(
        &self,
        id: &CollectionId,
        user: &User,
        action: &str,
    ) -> Result<Collection, RetroError> {
        let col = self
            .catalog
            .get_collection(id)?
            .ok_or_else(|| RetroError::CollectionNotFound { id: id.to_string() })?;
        if !col.is_owned_by(&user.id) {
            return Err(RetroError::forbidden(action));
        }
        Ok(col)
    }

    fn owned_item(&self, id: &ItemId, user: &User, action: &str) -> Result<Item, RetroError> {
        let item = self
            .catalog
            .get_item(id)?
            .ok_or_else(|| RetroError::ItemNotFound { id: id.to_string() })?;
        if !item.is_owned_by(&user.id) {
            return Err(RetroError::forbidden(action));
        }
        Ok(item)
    }

    /// Run `read` against the projection if it belongs to the current
    /// session, else return the empty value.
    fn visible<T: Default>(&self, read: impl FnOnce(&Projection) -> T) -> T {
        let current = self.identity.current_user().map(|u| u.id);
        let state = self.state();
        match current {
            Some(id) if state.owner.as_ref() == Some(&id) => read(&state.projection),
            _ => T::default(),
        }
    }

    fn begin(&self) {
        let mut state = self.state();
        state.status = StoreStatus::Loading;
        state.error = None;
    }

    fn finish<T>(&self, context: &str, result: Result<T, RetroError>) -> Result<T, RetroError> {
        let mut state = self.state();
        match &result {
            Ok(_) => state.status = StoreStatus::Ready,
            Err(e) => {
                tracing::debug!(error = %e, context, "store operation failed");
                state.status = StoreStatus::Failed;
                state.error = Some(format!("{context}: {e}"));
            }
        }
        result
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use retro_auth::{MemoryStore, RegistrationPolicy};
    use retro_core::models::item::{
        ItemDetails, ItemKind, MarketPatch, MetadataPatch, VinylMetadataPatch, DEFAULT_CONDITION,
        DEFAULT_ITEM_IMAGE,
    };
    use retro_core::models::user::UserAccount;
    use retro_db::MemoryCatalog;
    use retro_scan::CatalogScanner;

    struct Harness {
        catalog: Arc<MemoryCatalog>,
        identity: Arc<IdentityStore>,
        store: CollectionStore,
    }

    fn harness_with(policy: OrphanPolicy) -> Harness {
        let catalog = Arc::new(MemoryCatalog::seeded().unwrap());
        let identity = Arc::new(IdentityStore::new(
            catalog.clone(),
            Arc::new(MemoryStore::new()),
            Latency::none(),
            RegistrationPolicy::default(),
        ));
        let store = CollectionStore::new(
            catalog.clone(),
            identity.clone(),
            Arc::new(CatalogScanner::new(catalog.clone())),
            Latency::none(),
        )
        .with_orphan_policy(policy);
        Harness {
            catalog,
            identity,
            store,
        }
    }

    async fn as_martin(policy: OrphanPolicy) -> Harness {
        let h = harness_with(policy);
        h.identity
            .login("martin@example.com", "hashed_password_here")
            .await
            .unwrap();
        h.store.fetch_user_collections().await.unwrap();
        h
    }

    fn c(id: &str) -> CollectionId {
        CollectionId::from(id)
    }

    fn i(id: &str) -> ItemId {
        ItemId::from(id)
    }

    #[tokio::test]
    async fn test_fetch_scopes_to_current_user() {
        let h = as_martin(OrphanPolicy::Keep).await;
        assert_eq!(h.store.status(), StoreStatus::Ready);

        let ids: Vec<_> = h.store.collections().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c("c1"), c("c2")]);
        assert_eq!(h.store.items().len(), 5);
        assert!(h.store.get_collection_by_id(&c("c3")).is_none());
        assert!(h.store.get_item_by_id(&i("i6")).is_none());
    }

    #[tokio::test]
    async fn test_logout_hides_projection_immediately() {
        let h = as_martin(OrphanPolicy::Keep).await;
        h.identity.logout().unwrap();

        assert!(h.store.collections().is_empty());
        assert!(h.store.items().is_empty());
        assert!(h.store.get_collection_by_id(&c("c1")).is_none());
        assert!(h.store.get_item_by_id(&i("i1")).is_none());
        assert!(h.store.get_items_by_collection_id(&c("c1")).is_empty());
        assert_eq!(h.store.collection_value(&c("c1")), 0.0);

        h.store.fetch_user_collections().await.unwrap();
        assert_eq!(h.store.status(), StoreStatus::Ready);
        assert!(h.store.collections().is_empty());
    }

    #[tokio::test]
    async fn test_other_login_hides_previous_projection() {
        let h = as_martin(OrphanPolicy::Keep).await;
        h.identity.logout().unwrap();
        h.identity
            .login("sophie@example.com", "hashed_password_here")
            .await
            .unwrap();

        assert!(h.store.get_collection_by_id(&c("c1")).is_none());
        assert!(h.store.get_item_by_id(&i("i1")).is_none());
        assert!(h.store.collections().is_empty());

        h.store.fetch_user_collections().await.unwrap();
        let ids: Vec<_> = h.store.collections().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c("c3")]);
    }

    #[tokio::test]
    async fn test_mutation_after_switch_drops_previous_user_data() {
        let h = as_martin(OrphanPolicy::Keep).await;
        h.identity.logout().unwrap();
        h.identity
            .login("sophie@example.com", "hashed_password_here")
            .await
            .unwrap();

        let col = h
            .store
            .create_collection(NewCollection::named("Westerns"))
            .await
            .unwrap();
        let ids: Vec<_> = h.store.collections().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![col.id]);
        assert!(h.store.items().is_empty());
    }

    #[tokio::test]
    async fn test_same_user_back_sees_projection() {
        let h = as_martin(OrphanPolicy::Keep).await;
        h.identity.logout().unwrap();
        assert!(h.store.collections().is_empty());

        h.identity
            .login("martin@example.com", "hashed_password_here")
            .await
            .unwrap();
        assert_eq!(h.store.collections().len(), 2);
    }

    #[tokio::test]
    async fn test_items_by_collection_in_membership_order() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let ids: Vec<_> = h
            .store
            .get_items_by_collection_id(&c("c1"))
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![i("i1"), i("i2"), i("i5")]);
        assert!(h.store.get_items_by_collection_id(&c("c404")).is_empty());
    }

    #[tokio::test]
    async fn test_create_collection_defaults() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let col = h
            .store
            .create_collection(NewCollection::named("  Bandes dessinées  "))
            .await
            .unwrap();

        assert_eq!(col.id, c("c4"));
        assert_eq!(col.name, "Bandes dessinées");
        assert_eq!(col.owner_id.as_str(), "u1");
        assert!(!col.is_public);
        assert!(col.items.is_empty());
        assert_eq!(col.date_created, col.last_modified);
        assert!(h.store.get_collection_by_id(&col.id).is_some());
        assert!(h.catalog.get_collection(&col.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_collection_rejects_blank_name() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let err = h
            .store
            .create_collection(NewCollection::named("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, RetroError::Validation { .. }));
        assert_eq!(h.store.status(), StoreStatus::Failed);
        assert_eq!(
            h.store.last_error().as_deref(),
            Some("Erreur lors de la création de la collection: Le nom de la collection est obligatoire")
        );
        assert_eq!(h.store.collections().len(), 2);
    }

    #[tokio::test]
    async fn test_mutations_require_session() {
        let h = harness_with(OrphanPolicy::Keep);
        let err = h
            .store
            .create_collection(NewCollection::named("BD"))
            .await
            .unwrap_err();
        assert!(matches!(err, RetroError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_foreign_collection_is_forbidden_and_unchanged() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let before = h.catalog.snapshot().unwrap();

        let err = h
            .store
            .update_collection(
                &c("c3"),
                CollectionPatch {
                    name: Some("Piratée".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Vous n'êtes pas autorisé à modifier cette collection"
        );

        let err = h.store.delete_collection(&c("c3")).await.unwrap_err();
        assert!(matches!(err, RetroError::Forbidden { .. }));

        let after = h.catalog.snapshot().unwrap();
        assert_eq!(before.collections, after.collections);
        assert_eq!(before.items, after.items);
    }

    #[tokio::test]
    async fn test_missing_collection_not_found() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let err = h
            .store
            .update_collection(&c("c99"), CollectionPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RetroError::CollectionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_collection_touches_last_modified() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let before = h.store.get_collection_by_id(&c("c2")).unwrap();
        let after = h
            .store
            .update_collection(
                &c("c2"),
                CollectionPatch {
                    is_public: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!after.is_public);
        assert_eq!(after.name, before.name);
        assert!(after.last_modified > before.last_modified);
        assert_eq!(h.store.get_collection_by_id(&c("c2")).unwrap(), after);
    }

    #[tokio::test]
    async fn test_add_item_links_both_sides() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let before = h.store.get_collection_by_id(&c("c2")).unwrap();

        let item = h
            .store
            .add_item(
                &c("c2"),
                NewItem::new(ItemDetails::empty(ItemKind::Vinyl), "Wish You Were Here"),
            )
            .await
            .unwrap();

        assert_eq!(item.id, i("i8"));
        assert_eq!(item.images, vec![DEFAULT_ITEM_IMAGE.to_string()]);
        assert_eq!(item.market.condition, DEFAULT_CONDITION);
        assert_eq!(item.market.estimated_value, 0.0);
        assert_eq!(item.user_specific.collection_id, c("c2"));

        let listed = h.store.get_items_by_collection_id(&c("c2"));
        assert_eq!(listed.iter().filter(|x| x.id == item.id).count(), 1);

        let after = h.store.get_collection_by_id(&c("c2")).unwrap();
        assert_eq!(after.items.len(), before.items.len() + 1);
        assert!(after.last_modified > before.last_modified);

        let stored = h.catalog.get_collection(&c("c2")).unwrap().unwrap();
        assert!(stored.contains(&item.id));
    }

    #[tokio::test]
    async fn test_add_item_to_foreign_collection() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let err = h
            .store
            .add_item(&c("c3"), NewItem::new(ItemDetails::empty(ItemKind::Film), "Vertigo"))
            .await
            .unwrap_err();
        assert!(matches!(err, RetroError::Forbidden { .. }));
        assert!(h.catalog.get_item(&i("i8")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_item_market_merge() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let before = h.store.get_item_by_id(&i("i3")).unwrap();

        let after = h
            .store
            .update_item(
                &i("i3"),
                ItemPatch {
                    market: Some(MarketPatch {
                        estimated_value: Some(50.0),
                        condition: None,
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(after.market.estimated_value, 50.0);
        assert_eq!(after.market.condition, before.market.condition);
        assert!(after.market.last_updated > before.market.last_updated);
        assert_eq!(after.user_specific, before.user_specific);
    }

    #[tokio::test]
    async fn test_update_item_metadata_merges_keys() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let before = h.store.get_item_by_id(&i("i3")).unwrap();

        let after = h
            .store
            .update_item(
                &i("i3"),
                ItemPatch {
                    metadata: Some(MetadataPatch::Vinyl(VinylMetadataPatch {
                        label: Some("Harvest".into()),
                        ..Default::default()
                    })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(after.kind(), ItemKind::Vinyl);
        assert_eq!(after.details.creator(), before.details.creator());
        assert_eq!(after.title, before.title);
    }

    #[tokio::test]
    async fn test_update_item_rejects_negative_value() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let err = h
            .store
            .update_item(
                &i("i1"),
                ItemPatch {
                    market: Some(MarketPatch {
                        estimated_value: Some(-1.0),
                        condition: None,
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RetroError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_foreign_item_forbidden() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let err = h.store.delete_item(&i("i6")).await.unwrap_err();
        assert_eq!(err.to_string(), "Vous n'êtes pas autorisé à supprimer cet item");
        assert!(h.catalog.get_item(&i("i6")).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_item_unlinks_parent() {
        let h = as_martin(OrphanPolicy::Keep).await;
        h.store.delete_item(&i("i2")).await.unwrap();

        assert!(h.store.get_item_by_id(&i("i2")).is_none());
        let col = h.store.get_collection_by_id(&c("c1")).unwrap();
        assert_eq!(col.items, vec![i("i1"), i("i5")]);
        assert!(h.catalog.get_item(&i("i2")).unwrap().is_none());
        assert!(!h.catalog.get_collection(&c("c1")).unwrap().unwrap().contains(&i("i2")));
    }

    #[tokio::test]
    async fn test_delete_collection_keeps_orphans_by_default() {
        let h = as_martin(OrphanPolicy::Keep).await;
        h.store.delete_collection(&c("c2")).await.unwrap();

        assert!(h.store.get_collection_by_id(&c("c2")).is_none());
        assert!(h.store.get_item_by_id(&i("i3")).is_none());
        assert!(h.catalog.get_item(&i("i3")).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_collection_cascade() {
        let h = as_martin(OrphanPolicy::Cascade).await;
        h.store.delete_collection(&c("c2")).await.unwrap();

        assert!(h.catalog.get_collection(&c("c2")).unwrap().is_none());
        assert!(h.catalog.get_item(&i("i3")).unwrap().is_none());
        assert!(h.catalog.get_item(&i("i4")).unwrap().is_none());
        assert_eq!(h.catalog.list_items().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_scan_barcode_returns_detached_draft() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let draft = h.store.scan_barcode(" 2070360536 ").await.unwrap();
        assert_eq!(draft.title, "Fondation");
        assert!(draft.tags.is_empty());
        assert_eq!(h.catalog.list_items().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_scan_barcode_errors() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let err = h.store.scan_barcode("   ").await.unwrap_err();
        assert!(matches!(err, RetroError::Validation { .. }));

        let err = h.store.scan_barcode("123456789").await.unwrap_err();
        assert!(matches!(err, RetroError::NoMatch { .. }));
        assert!(h
            .store
            .last_error()
            .unwrap()
            .starts_with("Erreur lors de la numérisation: "));
    }

    #[tokio::test]
    async fn test_scan_then_confirm() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let draft = h.store.scan_barcode("2070360536").await.unwrap();
        let item = h
            .store
            .add_item(&c("c2"), draft.into_new_item())
            .await
            .unwrap();
        assert_eq!(item.title, "Fondation");
        assert_eq!(item.market.condition, "À définir");
        assert!(item.is_owned_by(&retro_core::models::user::UserId::from("u1")));
    }

    /// Catalog whose combined item/collection writes always fail.
    struct Contended(MemoryCatalog);

    fn contended() -> RetroError {
        RetroError::Database("database is locked".into())
    }

    impl CatalogRepository for Contended {
        fn get_user(&self, id: &UserId) -> Result<Option<UserAccount>, RetroError> {
            self.0.get_user(id)
        }
        fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, RetroError> {
            self.0.find_user_by_email(email)
        }
        fn find_user_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserAccount>, RetroError> {
            self.0.find_user_by_username(username)
        }
        fn insert_user(&self, account: &UserAccount) -> Result<(), RetroError> {
            self.0.insert_user(account)
        }
        fn update_user(&self, account: &UserAccount) -> Result<(), RetroError> {
            self.0.update_user(account)
        }
        fn next_user_id(&self) -> Result<UserId, RetroError> {
            self.0.next_user_id()
        }
        fn get_collection(&self, id: &CollectionId) -> Result<Option<Collection>, RetroError> {
            self.0.get_collection(id)
        }
        fn list_collections_for_owner(
            &self,
            owner: &UserId,
        ) -> Result<Vec<Collection>, RetroError> {
            self.0.list_collections_for_owner(owner)
        }
        fn insert_collection(&self, collection: &Collection) -> Result<(), RetroError> {
            self.0.insert_collection(collection)
        }
        fn update_collection(&self, _collection: &Collection) -> Result<(), RetroError> {
            Err(contended())
        }
        fn delete_collection(&self, id: &CollectionId) -> Result<(), RetroError> {
            self.0.delete_collection(id)
        }
        fn next_collection_id(&self) -> Result<CollectionId, RetroError> {
            self.0.next_collection_id()
        }
        fn get_item(&self, id: &ItemId) -> Result<Option<Item>, RetroError> {
            self.0.get_item(id)
        }
        fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, RetroError> {
            self.0.get_items(ids)
        }
        fn list_items(&self) -> Result<Vec<Item>, RetroError> {
            self.0.list_items()
        }
        fn find_item_by_isbn_fragment(
            &self,
            fragment: &str,
        ) -> Result<Option<Item>, RetroError> {
            self.0.find_item_by_isbn_fragment(fragment)
        }
        fn insert_item(&self, item: &Item) -> Result<(), RetroError> {
            self.0.insert_item(item)
        }
        fn update_item(&self, item: &Item) -> Result<(), RetroError> {
            self.0.update_item(item)
        }
        fn delete_item(&self, id: &ItemId) -> Result<(), RetroError> {
            self.0.delete_item(id)
        }
        fn next_item_id(&self) -> Result<ItemId, RetroError> {
            self.0.next_item_id()
        }
        fn add_item_to_collection(
            &self,
            _item: &Item,
            _collection: &Collection,
        ) -> Result<(), RetroError> {
            Err(contended())
        }
        fn remove_item_from_collection(
            &self,
            _item: &ItemId,
            _collection: &Collection,
        ) -> Result<(), RetroError> {
            Err(contended())
        }
        fn delete_collection_cascade(
            &self,
            _id: &CollectionId,
            _items: &[ItemId],
        ) -> Result<(), RetroError> {
            Err(contended())
        }
    }

    #[tokio::test]
    async fn test_failed_collection_write_leaves_catalog_consistent() {
        let catalog = Arc::new(Contended(MemoryCatalog::seeded().unwrap()));
        let identity = Arc::new(IdentityStore::new(
            catalog.clone(),
            Arc::new(MemoryStore::new()),
            Latency::none(),
            RegistrationPolicy::default(),
        ));
        let store = CollectionStore::new(
            catalog.clone(),
            identity.clone(),
            Arc::new(Blind),
            Latency::none(),
        )
        .with_orphan_policy(OrphanPolicy::Cascade);
        identity
            .login("martin@example.com", "hashed_password_here")
            .await
            .unwrap();
        store.fetch_user_collections().await.unwrap();
        let before = catalog.0.snapshot().unwrap();

        let err = store
            .add_item(&c("c2"), NewItem::new(ItemDetails::empty(ItemKind::Vinyl), "Animals"))
            .await
            .unwrap_err();
        assert!(matches!(err, RetroError::Database(_)));
        assert!(store.get_item_by_id(&i("i8")).is_none());
        assert_eq!(store.get_collection_by_id(&c("c2")).unwrap().items.len(), 2);

        assert!(store.delete_item(&i("i2")).await.is_err());
        assert!(store.get_item_by_id(&i("i2")).is_some());

        assert!(store.delete_collection(&c("c2")).await.is_err());
        assert!(store.get_collection_by_id(&c("c2")).is_some());

        let after = catalog.0.snapshot().unwrap();
        assert_eq!(before.collections, after.collections);
        assert_eq!(before.items, after.items);
    }

    struct Blind;

    #[async_trait]
    impl ScanProvider for Blind {
        async fn lookup_barcode(&self, _code: &str) -> Result<Option<DraftItem>, RetroError> {
            Ok(None)
        }

        async fn recognize_image(
            &self,
            _image: &ImageInput,
        ) -> Result<Option<DraftItem>, RetroError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_scan_image_no_match() {
        let catalog = Arc::new(MemoryCatalog::seeded().unwrap());
        let identity = Arc::new(IdentityStore::new(
            catalog.clone(),
            Arc::new(MemoryStore::new()),
            Latency::none(),
            RegistrationPolicy::default(),
        ));
        let store = CollectionStore::new(catalog, identity, Arc::new(Blind), Latency::none());
        let image = ImageInput {
            file_name: "flou.jpg".into(),
            bytes: Vec::new(),
        };
        let err = store.scan_image(&image).await.unwrap_err();
        assert!(matches!(err, RetroError::NoMatch { ref query } if query == "flou.jpg"));
        assert_eq!(store.status(), StoreStatus::Failed);
    }

    #[tokio::test]
    async fn test_sorted_and_value() {
        let h = as_martin(OrphanPolicy::Keep).await;
        let titles: Vec<_> = h
            .store
            .items_sorted(&c("c1"), SortBy::Title)
            .into_iter()
            .map(|i| i.title.to_lowercase())
            .collect();
        let mut expected = titles.clone();
        expected.sort();
        assert_eq!(titles, expected);

        let sum: f64 = h
            .store
            .get_items_by_collection_id(&c("c1"))
            .iter()
            .map(|i| i.market.estimated_value)
            .sum();
        assert_eq!(h.store.collection_value(&c("c1")), sum);
    }
}
