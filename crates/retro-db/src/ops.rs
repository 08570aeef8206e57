use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use retro_core::models::collection::{Collection, CollectionId};
use retro_core::models::item::{Item, ItemDetails, ItemId, Market, UserSpecific};
use retro_core::models::user::{User, UserAccount, UserId};

use crate::seed::Seed;

// ── Helpers ──

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn fmt_dt(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn ids_in(conn: &Connection, sql: &str) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ── Users ──

const USER_COLUMNS: &str =
    "id, username, email, password, first_name, last_name, profile_picture, bio, date_joined, preferences";

pub fn insert_user(conn: &Connection, account: &UserAccount) -> anyhow::Result<()> {
    let u = &account.user;
    conn.execute(
        "INSERT INTO users (id, username, email, password, first_name, last_name, profile_picture, bio, date_joined, preferences)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            u.id.as_str(),
            u.username,
            u.email,
            account.password,
            u.first_name,
            u.last_name,
            u.profile_picture,
            u.bio,
            fmt_dt(&u.date_joined),
            serde_json::to_string(&u.preferences)?,
        ],
    )?;
    Ok(())
}

pub fn update_user(conn: &Connection, account: &UserAccount) -> anyhow::Result<usize> {
    let u = &account.user;
    let changed = conn.execute(
        "UPDATE users SET username = ?2, email = ?3, password = ?4, first_name = ?5, last_name = ?6,
             profile_picture = ?7, bio = ?8, preferences = ?9
         WHERE id = ?1",
        params![
            u.id.as_str(),
            u.username,
            u.email,
            account.password,
            u.first_name,
            u.last_name,
            u.profile_picture,
            u.bio,
            serde_json::to_string(&u.preferences)?,
        ],
    )?;
    Ok(changed)
}

fn query_user(conn: &Connection, filter: &str, value: &str) -> anyhow::Result<Option<UserAccount>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt.query_row(params![value], row_to_user).optional()?)
}

pub fn get_user(conn: &Connection, id: &UserId) -> anyhow::Result<Option<UserAccount>> {
    query_user(conn, "id", id.as_str())
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<UserAccount>> {
    query_user(conn, "email", email)
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> anyhow::Result<Option<UserAccount>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 ORDER BY rowid LIMIT 1");
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt.query_row(params![username], row_to_user).optional()?)
}

pub fn list_user_ids(conn: &Connection) -> anyhow::Result<Vec<String>> {
    ids_in(conn, "SELECT id FROM users")
}

pub fn count_users(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserAccount> {
    let id: String = row.get(0)?;
    let date_joined: String = row.get(8)?;
    let preferences: String = row.get(9)?;

    Ok(UserAccount {
        user: User {
            id: UserId(id),
            username: row.get(1)?,
            email: row.get(2)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            profile_picture: row.get(6)?,
            bio: row.get(7)?,
            date_joined: parse_dt(&date_joined),
            preferences: serde_json::from_str(&preferences).unwrap_or_default(),
        },
        password: row.get(3)?,
    })
}

// ── Collections ──

const COLLECTION_COLUMNS: &str =
    "id, owner_id, name, description, cover_image, is_public, date_created, last_modified";

pub fn insert_collection(conn: &Connection, col: &Collection) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_collection(&tx, col)?;
    tx.commit()?;
    Ok(())
}

fn write_collection(conn: &Connection, col: &Collection) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO collections (id, owner_id, name, description, cover_image, is_public, date_created, last_modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            col.id.as_str(),
            col.owner_id.as_str(),
            col.name,
            col.description,
            col.cover_image,
            col.is_public as i32,
            fmt_dt(&col.date_created),
            fmt_dt(&col.last_modified),
        ],
    )?;
    write_members(conn, col)
}

/// Rewrite a collection row and its ordered membership.
pub fn update_collection(conn: &Connection, col: &Collection) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let changed = rewrite_collection(&tx, col)?;
    tx.commit()?;
    Ok(changed)
}

fn rewrite_collection(conn: &Connection, col: &Collection) -> anyhow::Result<usize> {
    let changed = conn.execute(
        "UPDATE collections SET owner_id = ?2, name = ?3, description = ?4, cover_image = ?5,
             is_public = ?6, last_modified = ?7
         WHERE id = ?1",
        params![
            col.id.as_str(),
            col.owner_id.as_str(),
            col.name,
            col.description,
            col.cover_image,
            col.is_public as i32,
            fmt_dt(&col.last_modified),
        ],
    )?;
    if changed > 0 {
        conn.execute(
            "DELETE FROM collection_items WHERE collection_id = ?1",
            params![col.id.as_str()],
        )?;
        write_members(conn, col)?;
    }
    Ok(changed)
}

fn write_members(conn: &Connection, col: &Collection) -> anyhow::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO collection_items (collection_id, item_id, position) VALUES (?1, ?2, ?3)",
    )?;
    for (pos, item_id) in col.items.iter().enumerate() {
        stmt.execute(params![col.id.as_str(), item_id.as_str(), pos as i64])?;
    }
    Ok(())
}

fn members(conn: &Connection, id: &str) -> anyhow::Result<Vec<ItemId>> {
    let mut stmt = conn.prepare(
        "SELECT item_id FROM collection_items WHERE collection_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
    Ok(rows.filter_map(|r| r.ok()).map(ItemId).collect())
}

pub fn get_collection(conn: &Connection, id: &CollectionId) -> anyhow::Result<Option<Collection>> {
    let sql = format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let found = stmt.query_row(params![id.as_str()], row_to_collection).optional()?;
    match found {
        Some(mut col) => {
            col.items = members(conn, col.id.as_str())?;
            Ok(Some(col))
        }
        None => Ok(None),
    }
}

pub fn list_collections_for_owner(conn: &Connection, owner: &UserId) -> anyhow::Result<Vec<Collection>> {
    let sql = format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE owner_id = ?1 ORDER BY rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner.as_str()], row_to_collection)?;
    let mut cols: Vec<Collection> = rows.filter_map(|r| r.ok()).collect();
    for col in &mut cols {
        col.items = members(conn, col.id.as_str())?;
    }
    Ok(cols)
}

pub fn delete_collection(conn: &Connection, id: &CollectionId) -> anyhow::Result<()> {
    conn.execute(
        "DELETE FROM collections WHERE id = ?1",
        params![id.as_str()],
    )?;
    Ok(())
}

pub fn list_collection_ids(conn: &Connection) -> anyhow::Result<Vec<String>> {
    ids_in(conn, "SELECT id FROM collections")
}

fn row_to_collection(row: &rusqlite::Row) -> rusqlite::Result<Collection> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(1)?;
    let is_public: i32 = row.get(5)?;
    let created: String = row.get(6)?;
    let modified: String = row.get(7)?;

    Ok(Collection {
        id: CollectionId(id),
        owner_id: UserId(owner_id),
        name: row.get(2)?,
        description: row.get(3)?,
        cover_image: row.get(4)?,
        is_public: is_public != 0,
        date_created: parse_dt(&created),
        last_modified: parse_dt(&modified),
        items: Vec::new(),
    })
}

// ── Items ──

const ITEM_COLUMNS: &str = "id, details, title, description, year, images, estimated_value, last_updated, condition, owner_id, collection_id, date_added, notes, tags, favorite";

pub fn insert_item(conn: &Connection, item: &Item) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO items (id, kind, details, title, description, year, images, estimated_value, last_updated, condition, owner_id, collection_id, date_added, notes, tags, favorite)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            item.id.as_str(),
            item.kind().to_string(),
            serde_json::to_string(&item.details)?,
            item.title,
            item.description,
            item.year,
            serde_json::to_string(&item.images)?,
            item.market.estimated_value,
            fmt_dt(&item.market.last_updated),
            item.market.condition,
            item.user_specific.owner_id.as_str(),
            item.user_specific.collection_id.as_str(),
            fmt_dt(&item.user_specific.date_added),
            item.user_specific.notes,
            serde_json::to_string(&item.user_specific.tags)?,
            item.user_specific.favorite as i32,
        ],
    )?;
    Ok(())
}

pub fn update_item(conn: &Connection, item: &Item) -> anyhow::Result<usize> {
    let changed = conn.execute(
        "UPDATE items SET kind = ?2, details = ?3, title = ?4, description = ?5, year = ?6, images = ?7,
             estimated_value = ?8, last_updated = ?9, condition = ?10, owner_id = ?11,
             collection_id = ?12, notes = ?13, tags = ?14, favorite = ?15
         WHERE id = ?1",
        params![
            item.id.as_str(),
            item.kind().to_string(),
            serde_json::to_string(&item.details)?,
            item.title,
            item.description,
            item.year,
            serde_json::to_string(&item.images)?,
            item.market.estimated_value,
            fmt_dt(&item.market.last_updated),
            item.market.condition,
            item.user_specific.owner_id.as_str(),
            item.user_specific.collection_id.as_str(),
            item.user_specific.notes,
            serde_json::to_string(&item.user_specific.tags)?,
            item.user_specific.favorite as i32,
        ],
    )?;
    Ok(changed)
}

pub fn get_item(conn: &Connection, id: &ItemId) -> anyhow::Result<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt.query_row(params![id.as_str()], row_to_item).optional()?)
}

pub fn list_items(conn: &Connection) -> anyhow::Result<Vec<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY rowid");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_item)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// First book, in insertion order, whose ISBN contains `fragment` verbatim.
pub fn find_item_by_isbn_fragment(conn: &Connection, fragment: &str) -> anyhow::Result<Option<Item>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items
         WHERE kind = 'book'
           AND COALESCE(json_extract(details, '$.metadata.isbn'), '') <> ''
           AND instr(json_extract(details, '$.metadata.isbn'), ?1) > 0
         ORDER BY rowid LIMIT 1"
    );
    let mut stmt = conn.prepare(&sql)?;
    Ok(stmt.query_row(params![fragment], row_to_item).optional()?)
}

pub fn delete_item(conn: &Connection, id: &ItemId) -> anyhow::Result<()> {
    conn.execute("DELETE FROM items WHERE id = ?1", params![id.as_str()])?;
    Ok(())
}

// ── Membership ──

/// Insert `item` and rewrite `col` in one transaction. Returns 0, with
/// nothing written, when the collection row is missing.
pub fn insert_item_into_collection(
    conn: &Connection,
    item: &Item,
    col: &Collection,
) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    insert_item(&tx, item)?;
    let changed = rewrite_collection(&tx, col)?;
    if changed > 0 {
        tx.commit()?;
    }
    Ok(changed)
}

/// Rewrite `col` and delete item `id` in one transaction. Returns 0, with
/// nothing written, when the collection row is missing.
pub fn delete_item_from_collection(
    conn: &Connection,
    id: &ItemId,
    col: &Collection,
) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let changed = rewrite_collection(&tx, col)?;
    if changed > 0 {
        delete_item(&tx, id)?;
        tx.commit()?;
    }
    Ok(changed)
}

pub fn delete_collection_with_items(
    conn: &Connection,
    id: &CollectionId,
    items: &[ItemId],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    for item in items {
        delete_item(&tx, item)?;
    }
    delete_collection(&tx, id)?;
    tx.commit()?;
    Ok(())
}

pub fn list_item_ids(conn: &Connection) -> anyhow::Result<Vec<String>> {
    ids_in(conn, "SELECT id FROM items")
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    let id: String = row.get(0)?;
    let details_str: String = row.get(1)?;
    let images_str: String = row.get(5)?;
    let last_updated: String = row.get(7)?;
    let owner_id: String = row.get(9)?;
    let collection_id: String = row.get(10)?;
    let date_added: String = row.get(11)?;
    let tags_str: String = row.get(13)?;
    let favorite: i32 = row.get(14)?;

    let details: ItemDetails = serde_json::from_str(&details_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Item {
        id: ItemId(id),
        details,
        title: row.get(2)?,
        description: row.get(3)?,
        year: row.get(4)?,
        images: serde_json::from_str(&images_str).unwrap_or_default(),
        market: Market {
            estimated_value: row.get(6)?,
            last_updated: parse_dt(&last_updated),
            condition: row.get(8)?,
        },
        user_specific: UserSpecific {
            owner_id: UserId(owner_id),
            collection_id: CollectionId(collection_id),
            date_added: parse_dt(&date_added),
            notes: row.get(12)?,
            tags: serde_json::from_str(&tags_str).unwrap_or_default(),
            favorite: favorite != 0,
        },
    })
}

// ── Seed ──

/// Load the seed into an empty catalog. Returns false if users already exist.
pub fn seed_if_empty(conn: &Connection, seed: &Seed) -> anyhow::Result<bool> {
    if count_users(conn)? > 0 {
        return Ok(false);
    }
    let tx = conn.unchecked_transaction()?;
    for account in &seed.users {
        insert_user(&tx, account)?;
    }
    for col in &seed.collections {
        write_collection(&tx, col)?;
    }
    for item in &seed.items {
        insert_item(&tx, item)?;
    }
    tx.commit()?;
    tracing::info!(
        users = seed.users.len(),
        collections = seed.collections.len(),
        items = seed.items.len(),
        "seeded catalog"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_memory_db;
    use retro_core::models::collection::NewCollection;
    use retro_core::models::item::{ItemKind, NewItem};

    fn seeded() -> Connection {
        let conn = open_memory_db().unwrap();
        seed_if_empty(&conn, &Seed::load().unwrap()).unwrap();
        conn
    }

    #[test]
    fn test_seed_only_once() {
        let conn = seeded();
        assert!(!seed_if_empty(&conn, &Seed::load().unwrap()).unwrap());
        assert_eq!(count_users(&conn).unwrap(), 2);
    }

    #[test]
    fn test_user_roundtrip() {
        let conn = seeded();
        let found = get_user_by_email(&conn, "sophie@example.com").unwrap().unwrap();
        assert_eq!(found.user.id, UserId::from("u2"));
        assert!(!found.user.preferences.privacy_settings.show_collection);
        assert_eq!(found.password, "hashed_password_here");

        let by_name = get_user_by_username(&conn, "sophie_cin").unwrap().unwrap();
        assert_eq!(by_name.user.id, found.user.id);
    }

    #[test]
    fn test_collection_membership_order() {
        let conn = seeded();
        let col = get_collection(&conn, &CollectionId::from("c1")).unwrap().unwrap();
        let ids: Vec<_> = col.items.iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i2", "i5"]);

        let mut col = col;
        col.items.retain(|i| i.as_str() != "i2");
        col.items.push(ItemId::from("i2"));
        assert_eq!(update_collection(&conn, &col).unwrap(), 1);

        let reloaded = get_collection(&conn, &col.id).unwrap().unwrap();
        let ids: Vec<_> = reloaded.items.iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i5", "i2"]);
    }

    #[test]
    fn test_collection_delete_drops_membership_rows() {
        let conn = seeded();
        delete_collection(&conn, &CollectionId::from("c2")).unwrap();
        let left: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM collection_items WHERE collection_id = 'c2'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(left, 0);
        // items survive: deletion does not cascade to the catalog
        assert!(get_item(&conn, &ItemId::from("i3")).unwrap().is_some());
    }

    fn fresh_item(id: &str, col: &CollectionId) -> Item {
        Item::new(
            ItemId::from(id),
            UserId::from("u1"),
            col.clone(),
            NewItem::new(ItemDetails::empty(ItemKind::Vinyl), "Animals"),
        )
    }

    #[test]
    fn test_insert_into_collection_links_both_rows() {
        let conn = seeded();
        let mut col = get_collection(&conn, &CollectionId::from("c2")).unwrap().unwrap();
        let item = fresh_item("i8", &col.id);
        col.items.push(item.id.clone());

        assert_eq!(insert_item_into_collection(&conn, &item, &col).unwrap(), 1);
        assert!(get_item(&conn, &item.id).unwrap().is_some());
        let reloaded = get_collection(&conn, &col.id).unwrap().unwrap();
        assert_eq!(reloaded.items.last(), Some(&item.id));
    }

    #[test]
    fn test_insert_into_missing_collection_writes_nothing() {
        let conn = seeded();
        let mut col = get_collection(&conn, &CollectionId::from("c2")).unwrap().unwrap();
        col.id = CollectionId::from("c9");
        let item = fresh_item("i8", &col.id);
        col.items.push(item.id.clone());

        assert_eq!(insert_item_into_collection(&conn, &item, &col).unwrap(), 0);
        assert!(get_item(&conn, &item.id).unwrap().is_none());
    }

    #[test]
    fn test_failed_collection_rewrite_rolls_back_item() {
        let conn = seeded();
        conn.execute_batch(
            "CREATE TRIGGER reject_rewrite BEFORE UPDATE ON collections
             BEGIN SELECT RAISE(ABORT, 'database is locked'); END;",
        )
        .unwrap();

        let mut col = get_collection(&conn, &CollectionId::from("c2")).unwrap().unwrap();
        let item = fresh_item("i8", &col.id);
        col.items.push(item.id.clone());
        assert!(insert_item_into_collection(&conn, &item, &col).is_err());
        assert!(get_item(&conn, &item.id).unwrap().is_none());

        let mut col = get_collection(&conn, &CollectionId::from("c1")).unwrap().unwrap();
        col.items.retain(|i| i.as_str() != "i2");
        assert!(delete_item_from_collection(&conn, &ItemId::from("i2"), &col).is_err());
        assert!(get_item(&conn, &ItemId::from("i2")).unwrap().is_some());
    }

    #[test]
    fn test_delete_collection_with_items() {
        let conn = seeded();
        let members = [ItemId::from("i3"), ItemId::from("i4")];
        delete_collection_with_items(&conn, &CollectionId::from("c2"), &members).unwrap();
        assert!(get_collection(&conn, &CollectionId::from("c2")).unwrap().is_none());
        assert!(get_item(&conn, &members[0]).unwrap().is_none());
        assert_eq!(list_items(&conn).unwrap().len(), 5);
    }

    #[test]
    fn test_item_roundtrip_and_isbn_lookup() {
        let conn = seeded();
        let fondation = get_item(&conn, &ItemId::from("i1")).unwrap().unwrap();
        assert_eq!(fondation.kind(), ItemKind::Book);
        assert_eq!(fondation.user_specific.tags, vec!["classique", "série", "fondation"]);

        let hit = find_item_by_isbn_fragment(&conn, "2070360536").unwrap().unwrap();
        assert_eq!(hit.id, fondation.id);
        assert!(find_item_by_isbn_fragment(&conn, "999").unwrap().is_none());
    }

    #[test]
    fn test_new_collection_and_item() {
        let conn = seeded();
        let col = Collection::new(
            CollectionId::from("c4"),
            UserId::from("u2"),
            NewCollection::named("Séries"),
        );
        insert_collection(&conn, &col).unwrap();

        let item = Item::new(
            ItemId::from("i8"),
            UserId::from("u2"),
            col.id.clone(),
            NewItem::new(ItemDetails::empty(ItemKind::Film), "Metropolis"),
        );
        insert_item(&conn, &item).unwrap();

        let back = get_item(&conn, &item.id).unwrap().unwrap();
        assert_eq!(back.title, "Metropolis");
        assert_eq!(back.images, item.images);

        let owned = list_collections_for_owner(&conn, &UserId::from("u2")).unwrap();
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[1].id, col.id);
    }
}
