use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a user (`u1`, `u2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub const PREFIX: char = 'u';

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a collection is laid out on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultView {
    #[default]
    Shelf,
    List,
}

impl std::fmt::Display for DefaultView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultView::Shelf => write!(f, "shelf"),
            DefaultView::List => write!(f, "list"),
        }
    }
}

impl std::str::FromStr for DefaultView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shelf" => Ok(DefaultView::Shelf),
            "list" => Ok(DefaultView::List),
            _ => Err(format!("unknown view: {s}")),
        }
    }
}

/// Ordering applied to the items of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Title,
    Author,
    Year,
    #[default]
    DateAdded,
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortBy::Title => write!(f, "title"),
            SortBy::Author => write!(f, "author"),
            SortBy::Year => write!(f, "year"),
            SortBy::DateAdded => write!(f, "dateAdded"),
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortBy::Title),
            "author" => Ok(SortBy::Author),
            "year" => Ok(SortBy::Year),
            "dateAdded" | "date_added" | "date-added" => Ok(SortBy::DateAdded),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub show_collection: bool,
    pub show_activity: bool,
    pub allow_messages: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            show_collection: true,
            show_activity: true,
            allow_messages: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDisplay {
    pub default_view: DefaultView,
    pub sort_by: SortBy,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub privacy_settings: PrivacySettings,
    pub collection_display: CollectionDisplay,
}

pub const DEFAULT_PROFILE_PICTURE: &str = "/images/profiles/default.jpg";

/// A collector, without credentials.
///
/// This is the only user shape handed out by the identity layer and the
/// shape persisted as the session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
    #[serde(default)]
    pub bio: String,
    pub date_joined: DateTime<Utc>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A stored user record. Only the catalog holds the password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

impl UserAccount {
    /// Build a fresh account with default profile picture and preferences.
    pub fn register(id: UserId, new_user: NewUser) -> Self {
        Self {
            user: User {
                id,
                username: new_user.username,
                email: new_user.email,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                profile_picture: DEFAULT_PROFILE_PICTURE.to_string(),
                bio: String::new(),
                date_joined: Utc::now(),
                preferences: Preferences::default(),
            },
            password: new_user.password,
        }
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    /// Shallow merge: each field present in the patch replaces the stored
    /// one. `preferences` is replaced wholesale, never deep-merged.
    pub fn apply(&mut self, patch: ProfilePatch) {
        let user = &mut self.user;
        if let Some(v) = patch.username {
            user.username = v;
        }
        if let Some(v) = patch.email {
            user.email = v;
        }
        if let Some(v) = patch.first_name {
            user.first_name = v;
        }
        if let Some(v) = patch.last_name {
            user.last_name = v;
        }
        if let Some(v) = patch.profile_picture {
            user.profile_picture = v;
        }
        if let Some(v) = patch.bio {
            user.bio = v;
        }
        if let Some(v) = patch.preferences {
            user.preferences = v;
        }
        if let Some(v) = patch.password {
            self.password = v;
        }
    }
}

/// Registration form data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<Preferences>,
    pub password: Option<String>,
}
