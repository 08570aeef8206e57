/// SQL statements for creating the RetroDigital catalog schema.

pub const CREATE_SCHEMA_VERSION: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
)";

pub const CREATE_USERS: &str = "
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    username        TEXT NOT NULL,
    email           TEXT NOT NULL UNIQUE,
    password        TEXT NOT NULL,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    profile_picture TEXT NOT NULL,
    bio             TEXT NOT NULL DEFAULT '',
    date_joined     TEXT NOT NULL,
    preferences     TEXT NOT NULL DEFAULT '{}'
)";

pub const CREATE_COLLECTIONS: &str = "
CREATE TABLE IF NOT EXISTS collections (
    id              TEXT PRIMARY KEY,
    owner_id        TEXT NOT NULL,
    name            TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    cover_image     TEXT NOT NULL,
    is_public       INTEGER NOT NULL DEFAULT 0,
    date_created    TEXT NOT NULL,
    last_modified   TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
)";

pub const CREATE_COLLECTION_ITEMS: &str = "
CREATE TABLE IF NOT EXISTS collection_items (
    collection_id   TEXT NOT NULL,
    item_id         TEXT NOT NULL,
    position        INTEGER NOT NULL,
    PRIMARY KEY (collection_id, item_id),
    FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE
)";

pub const CREATE_ITEMS: &str = "
CREATE TABLE IF NOT EXISTS items (
    id              TEXT PRIMARY KEY,
    kind            TEXT NOT NULL,
    details         TEXT NOT NULL,
    title           TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    year            INTEGER,
    images          TEXT NOT NULL DEFAULT '[]',
    estimated_value REAL NOT NULL DEFAULT 0,
    last_updated    TEXT NOT NULL,
    condition       TEXT NOT NULL,
    owner_id        TEXT NOT NULL,
    collection_id   TEXT NOT NULL,
    date_added      TEXT NOT NULL,
    notes           TEXT NOT NULL DEFAULT '',
    tags            TEXT NOT NULL DEFAULT '[]',
    favorite        INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
)";

pub const CREATE_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_collections_owner ON collections(owner_id);
CREATE INDEX IF NOT EXISTS idx_items_collection ON items(collection_id);
";

/// All table creation statements in order.
pub const ALL_TABLES: &[&str] = &[
    CREATE_SCHEMA_VERSION,
    CREATE_USERS,
    CREATE_COLLECTIONS,
    CREATE_COLLECTION_ITEMS,
    CREATE_ITEMS,
];
