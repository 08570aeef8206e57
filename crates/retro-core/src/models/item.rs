use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collection::CollectionId;
use super::user::UserId;

/// Unique identifier for an item (`i1`, `i2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub const PREFIX: char = 'i';

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

pub const DEFAULT_ITEM_IMAGE: &str = "/images/items/default.jpg";
pub const DEFAULT_CONDITION: &str = "Bon état";
/// Condition given to scan drafts until the collector grades the copy.
pub const UNGRADED_CONDITION: &str = "À définir";

/// Conditions offered by the item form, best first.
pub const CONDITIONS: &[&str] = &[
    "Neuf",
    "Quasi neuf",
    "Très bon état",
    DEFAULT_CONDITION,
    "État correct",
    "État médiocre",
];

/// The kind of collectible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Book,
    Vinyl,
    Film,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Book => write!(f, "book"),
            ItemKind::Vinyl => write!(f, "vinyl"),
            ItemKind::Film => write!(f, "film"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "book" | "livre" => Ok(ItemKind::Book),
            "vinyl" | "vinyle" => Ok(ItemKind::Vinyl),
            "film" | "movie" => Ok(ItemKind::Film),
            _ => Err(format!("unknown item type: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookMetadata {
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub genre: String,
    pub format: String,
    pub language: String,
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VinylMetadata {
    pub artist: String,
    pub label: String,
    pub format: String,
    pub release_date: String,
    pub genre: String,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilmMetadata {
    pub director: String,
    pub studio: String,
    pub format: String,
    pub runtime: Option<u32>,
    pub genre: String,
    pub language: String,
}

/// Per-kind metadata, keyed by `type` with the fields under `metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "metadata", rename_all = "snake_case")]
pub enum ItemDetails {
    Book(BookMetadata),
    Vinyl(VinylMetadata),
    Film(FilmMetadata),
}

impl ItemDetails {
    pub fn empty(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Book => ItemDetails::Book(BookMetadata::default()),
            ItemKind::Vinyl => ItemDetails::Vinyl(VinylMetadata::default()),
            ItemKind::Film => ItemDetails::Film(FilmMetadata::default()),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemDetails::Book(_) => ItemKind::Book,
            ItemDetails::Vinyl(_) => ItemKind::Vinyl,
            ItemDetails::Film(_) => ItemKind::Film,
        }
    }

    /// Author, artist or director, depending on the kind.
    pub fn creator(&self) -> &str {
        match self {
            ItemDetails::Book(m) => &m.author,
            ItemDetails::Vinyl(m) => &m.artist,
            ItemDetails::Film(m) => &m.director,
        }
    }

    pub fn genre(&self) -> &str {
        match self {
            ItemDetails::Book(m) => &m.genre,
            ItemDetails::Vinyl(m) => &m.genre,
            ItemDetails::Film(m) => &m.genre,
        }
    }

    pub fn isbn(&self) -> Option<&str> {
        match self {
            ItemDetails::Book(m) if !m.isbn.is_empty() => Some(&m.isbn),
            _ => None,
        }
    }

    /// Merge a metadata patch key by key. A patch for another kind switches
    /// the item to that kind, starting from empty metadata.
    pub fn apply(&mut self, patch: MetadataPatch) {
        if self.kind() != patch.kind() {
            *self = ItemDetails::empty(patch.kind());
        }
        match (self, patch) {
            (ItemDetails::Book(m), MetadataPatch::Book(p)) => {
                merge(&mut m.author, p.author);
                merge(&mut m.publisher, p.publisher);
                merge(&mut m.isbn, p.isbn);
                merge(&mut m.genre, p.genre);
                merge(&mut m.format, p.format);
                merge(&mut m.language, p.language);
                if p.page_count.is_some() {
                    m.page_count = p.page_count;
                }
            }
            (ItemDetails::Vinyl(m), MetadataPatch::Vinyl(p)) => {
                merge(&mut m.artist, p.artist);
                merge(&mut m.label, p.label);
                merge(&mut m.format, p.format);
                merge(&mut m.release_date, p.release_date);
                merge(&mut m.genre, p.genre);
                merge(&mut m.condition, p.condition);
            }
            (ItemDetails::Film(m), MetadataPatch::Film(p)) => {
                merge(&mut m.director, p.director);
                merge(&mut m.studio, p.studio);
                merge(&mut m.format, p.format);
                if p.runtime.is_some() {
                    m.runtime = p.runtime;
                }
                merge(&mut m.genre, p.genre);
                merge(&mut m.language, p.language);
            }
            _ => unreachable!("kinds aligned above"),
        }
    }
}

fn merge(slot: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *slot = v;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub estimated_value: f64,
    pub last_updated: DateTime<Utc>,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpecific {
    pub owner_id: UserId,
    pub collection_id: CollectionId,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
}

impl UserSpecific {
    /// Add a tag; returns false when it is blank or already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }
}

/// Trim tags, drop blanks and duplicates, keep first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// A collectible owned by one user and filed in one of their collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(flatten)]
    pub details: ItemDetails,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub year: Option<i32>,
    pub images: Vec<String>,
    pub market: Market,
    pub user_specific: UserSpecific,
}

impl Item {
    pub fn new(id: ItemId, owner_id: UserId, collection_id: CollectionId, data: NewItem) -> Self {
        let now = Utc::now();
        let images = match data.images {
            Some(images) if !images.is_empty() => images,
            _ => vec![DEFAULT_ITEM_IMAGE.to_string()],
        };
        Self {
            id,
            details: data.details,
            title: data.title.trim().to_string(),
            description: data.description.unwrap_or_default(),
            year: data.year,
            images,
            market: Market {
                estimated_value: data.estimated_value.unwrap_or(0.0),
                last_updated: now,
                condition: data
                    .condition
                    .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
            },
            user_specific: UserSpecific {
                owner_id,
                collection_id,
                date_added: now,
                notes: data.notes.unwrap_or_default(),
                tags: normalize_tags(data.tags),
                favorite: data.favorite,
            },
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.details.kind()
    }

    pub fn primary_image(&self) -> &str {
        self.images
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_ITEM_IMAGE)
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_specific.owner_id == user
    }

    /// Merge a patch. Top-level fields are replaced; `metadata`, `market`
    /// and `user_specific` merge key by key. `market.last_updated` is
    /// refreshed on every call.
    pub fn apply(&mut self, patch: ItemPatch) {
        if let Some(v) = patch.title {
            self.title = v.trim().to_string();
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.year {
            self.year = Some(v);
        }
        if let Some(v) = patch.images {
            self.images = if v.is_empty() {
                vec![DEFAULT_ITEM_IMAGE.to_string()]
            } else {
                v
            };
        }
        if let Some(m) = patch.metadata {
            self.details.apply(m);
        }
        if let Some(m) = patch.market {
            if let Some(v) = m.estimated_value {
                self.market.estimated_value = v;
            }
            if let Some(v) = m.condition {
                self.market.condition = v;
            }
        }
        self.market.last_updated = Utc::now();
        if let Some(u) = patch.user_specific {
            if let Some(v) = u.notes {
                self.user_specific.notes = v;
            }
            if let Some(v) = u.tags {
                self.user_specific.tags = normalize_tags(v);
            }
            if let Some(v) = u.favorite {
                self.user_specific.favorite = v;
            }
        }
    }
}

/// Item creation form data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[serde(flatten)]
    pub details: ItemDetails,
    pub title: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub images: Option<Vec<String>>,
    pub estimated_value: Option<f64>,
    pub condition: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
}

impl NewItem {
    pub fn new(details: ItemDetails, title: impl Into<String>) -> Self {
        Self {
            details,
            title: title.into(),
            description: None,
            year: None,
            images: None,
            estimated_value: None,
            condition: None,
            notes: None,
            tags: Vec::new(),
            favorite: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadataPatch {
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub format: Option<String>,
    pub language: Option<String>,
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VinylMetadataPatch {
    pub artist: Option<String>,
    pub label: Option<String>,
    pub format: Option<String>,
    pub release_date: Option<String>,
    pub genre: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmMetadataPatch {
    pub director: Option<String>,
    pub studio: Option<String>,
    pub format: Option<String>,
    pub runtime: Option<u32>,
    pub genre: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "metadata", rename_all = "snake_case")]
pub enum MetadataPatch {
    Book(BookMetadataPatch),
    Vinyl(VinylMetadataPatch),
    Film(FilmMetadataPatch),
}

impl MetadataPatch {
    pub fn kind(&self) -> ItemKind {
        match self {
            MetadataPatch::Book(_) => ItemKind::Book,
            MetadataPatch::Vinyl(_) => ItemKind::Vinyl,
            MetadataPatch::Film(_) => ItemKind::Film,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPatch {
    pub estimated_value: Option<f64>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpecificPatch {
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub favorite: Option<bool>,
}

/// Item update; `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub images: Option<Vec<String>>,
    pub metadata: Option<MetadataPatch>,
    pub market: Option<MarketPatch>,
    pub user_specific: Option<UserSpecificPatch>,
}

/// A detached, unpersisted item produced by a scan.
///
/// It has no id, owner, collection or date; it becomes an [`Item`] only
/// once confirmed into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    #[serde(flatten)]
    pub details: ItemDetails,
    pub title: String,
    pub description: String,
    pub year: Option<i32>,
    pub estimated_value: f64,
    pub condition: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub favorite: bool,
}

impl DraftItem {
    /// Copy the catalog facts of `item`, dropping everything personal.
    pub fn from_item(item: &Item) -> Self {
        Self {
            details: item.details.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            year: item.year,
            estimated_value: item.market.estimated_value,
            condition: UNGRADED_CONDITION.to_string(),
            notes: String::new(),
            tags: Vec::new(),
            favorite: false,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.details.kind()
    }

    pub fn into_new_item(self) -> NewItem {
        NewItem {
            details: self.details,
            title: self.title,
            description: Some(self.description),
            year: self.year,
            images: None,
            estimated_value: Some(self.estimated_value),
            condition: Some(self.condition),
            notes: Some(self.notes),
            tags: self.tags,
            favorite: self.favorite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Item {
        let mut data = NewItem::new(
            ItemDetails::Book(BookMetadata {
                author: "Isaac Asimov".into(),
                isbn: "978-2070360536".into(),
                ..Default::default()
            }),
            "Fondation",
        );
        data.estimated_value = Some(15.99);
        data.condition = Some("Très bon état".into());
        data.tags = vec!["classique".into(), " classique ".into(), "".into(), "sf".into()];
        Item::new(
            ItemId::from("i8"),
            UserId::from("u1"),
            CollectionId::from("c1"),
            data,
        )
    }

    #[test]
    fn test_new_item_defaults() {
        let item = Item::new(
            ItemId::from("i8"),
            UserId::from("u1"),
            CollectionId::from("c1"),
            NewItem::new(ItemDetails::empty(ItemKind::Film), "Alien"),
        );
        assert_eq!(item.images, vec![DEFAULT_ITEM_IMAGE.to_string()]);
        assert_eq!(item.market.condition, DEFAULT_CONDITION);
        assert_eq!(item.market.estimated_value, 0.0);
        assert_eq!(item.user_specific.collection_id, CollectionId::from("c1"));
        assert!(!item.user_specific.favorite);
    }

    #[test]
    fn test_tags_deduplicated_in_order() {
        let item = book();
        assert_eq!(item.user_specific.tags, vec!["classique", "sf"]);
    }

    #[test]
    fn test_add_tag_rejects_duplicates() {
        let mut item = book();
        assert!(!item.user_specific.add_tag("sf"));
        assert!(!item.user_specific.add_tag("   "));
        assert!(item.user_specific.add_tag("asimov"));
        assert_eq!(item.user_specific.tags, vec!["classique", "sf", "asimov"]);
    }

    #[test]
    fn test_market_patch_keeps_condition() {
        let mut item = book();
        let before = item.market.last_updated;
        item.apply(ItemPatch {
            market: Some(MarketPatch {
                estimated_value: Some(50.0),
                condition: None,
            }),
            ..Default::default()
        });
        assert_eq!(item.market.estimated_value, 50.0);
        assert_eq!(item.market.condition, "Très bon état");
        assert!(item.market.last_updated >= before);
    }

    #[test]
    fn test_metadata_patch_merges_keys() {
        let mut item = book();
        item.apply(ItemPatch {
            metadata: Some(MetadataPatch::Book(BookMetadataPatch {
                publisher: Some("Denoël".into()),
                ..Default::default()
            })),
            ..Default::default()
        });
        match &item.details {
            ItemDetails::Book(m) => {
                assert_eq!(m.publisher, "Denoël");
                assert_eq!(m.author, "Isaac Asimov");
                assert_eq!(m.isbn, "978-2070360536");
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_metadata_patch_of_other_kind_switches_type() {
        let mut item = book();
        item.apply(ItemPatch {
            metadata: Some(MetadataPatch::Vinyl(VinylMetadataPatch {
                artist: Some("Yes".into()),
                ..Default::default()
            })),
            ..Default::default()
        });
        assert_eq!(item.kind(), ItemKind::Vinyl);
        assert_eq!(item.details.creator(), "Yes");
        assert_eq!(item.details.isbn(), None);
    }

    #[test]
    fn test_seed_shape_serialization() {
        let item = book();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "book");
        assert_eq!(json["metadata"]["isbn"], "978-2070360536");
        assert_eq!(json["userSpecific"]["ownerId"], "u1");

        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_draft_strips_personal_fields() {
        let draft = DraftItem::from_item(&book());
        assert_eq!(draft.title, "Fondation");
        assert_eq!(draft.condition, UNGRADED_CONDITION);
        assert_eq!(draft.estimated_value, 15.99);
        assert!(draft.tags.is_empty());
        assert!(draft.notes.is_empty());

        let json = serde_json::to_value(&draft).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("userSpecific").is_none());
    }
}
