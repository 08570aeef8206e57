use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::ItemId;
use super::user::UserId;

/// Unique identifier for a collection (`c1`, `c2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub String);

impl CollectionId {
    pub const PREFIX: char = 'c';

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

pub const DEFAULT_COVER_IMAGE: &str = "/images/collections/default.jpg";

/// The cover images a collection may use, with their display labels.
pub const COVER_IMAGES: &[(&str, &str)] = &[
    (DEFAULT_COVER_IMAGE, "Défaut"),
    ("/images/collections/scifi.jpg", "Science-Fiction"),
    ("/images/collections/vinyles.jpg", "Vinyles"),
    ("/images/collections/films.jpg", "Films"),
];

pub fn is_known_cover(path: &str) -> bool {
    COVER_IMAGES.iter().any(|(p, _)| *p == path)
}

/// A user-owned grouping of items.
///
/// `items` lists member ids in insertion order. Each listed item must point
/// back at this collection through `user_specific.collection_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cover_image: String,
    #[serde(default)]
    pub is_public: bool,
    pub date_created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<ItemId>,
}

impl Collection {
    pub fn new(id: CollectionId, owner_id: UserId, data: NewCollection) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id,
            name: data.name.trim().to_string(),
            description: data.description.unwrap_or_default(),
            cover_image: data
                .cover_image
                .unwrap_or_else(|| DEFAULT_COVER_IMAGE.to_string()),
            is_public: data.is_public.unwrap_or(false),
            date_created: now,
            last_modified: now,
            items: Vec::new(),
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.items.contains(item)
    }

    /// Append a member id, keeping each id at most once.
    pub fn push_item(&mut self, item: ItemId) {
        if !self.items.contains(&item) {
            self.items.push(item);
        }
        self.touch();
    }

    pub fn remove_item(&mut self, item: &ItemId) {
        self.items.retain(|id| id != item);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn apply(&mut self, patch: CollectionPatch) {
        if let Some(v) = patch.name {
            self.name = v.trim().to_string();
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.cover_image {
            self.cover_image = v;
        }
        if let Some(v) = patch.is_public {
            self.is_public = v;
        }
        self.touch();
    }
}

/// Collection creation form data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub is_public: Option<bool>,
}

impl NewCollection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub is_public: Option<bool>,
}
