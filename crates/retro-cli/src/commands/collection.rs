use clap::Subcommand;
use comfy_table::{Cell, Color, Table};
use console::style;

use retro_core::config::OrphanPolicy;
use retro_core::models::collection::{
    is_known_cover, CollectionId, CollectionPatch, NewCollection, COVER_IMAGES,
};
use retro_core::models::user::SortBy;
use retro_core::validation::validate_collection_name;

use crate::context::App;
use crate::display::{format_date, format_price, item_type_label, spin, time_ago, truncate, yes_no};

#[derive(Subcommand)]
pub enum CollectionAction {
    /// List your collections
    List,
    /// Create a collection
    New {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Cover: default, scifi, vinyles, films (or an image path)
        #[arg(long)]
        cover: Option<String>,
        /// Make the collection public
        #[arg(long)]
        public: bool,
    },
    /// Show a collection and its items
    Show {
        id: String,
        /// title, author, year or dateAdded (defaults to your preference)
        #[arg(long)]
        sort: Option<SortBy>,
    },
    /// Edit a collection
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cover: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    /// Delete a collection
    Delete {
        id: String,
        /// Also delete the items it holds
        #[arg(long)]
        cascade: bool,
    },
}

/// Accept a cover path or the file stem of one of the known covers.
fn resolve_cover(value: &str) -> anyhow::Result<String> {
    if is_known_cover(value) {
        return Ok(value.to_string());
    }
    COVER_IMAGES
        .iter()
        .find(|(path, label)| {
            label.eq_ignore_ascii_case(value)
                || path
                    .rsplit('/')
                    .next()
                    .and_then(|f| f.strip_suffix(".jpg"))
                    .is_some_and(|stem| stem == value)
        })
        .map(|(path, _)| path.to_string())
        .ok_or_else(|| {
            let names: Vec<_> = COVER_IMAGES.iter().map(|(_, label)| *label).collect();
            anyhow::anyhow!("Couverture inconnue '{}'. Choix: {}", value, names.join(", "))
        })
}

pub async fn run(action: CollectionAction) -> anyhow::Result<()> {
    let app = App::open()?;
    let user = app.require_user()?;

    match action {
        CollectionAction::List => {
            let store = app.collections().await?;
            let collections = store.collections();
            if collections.is_empty() {
                println!("Aucune collection. Créez-en une avec `retro collection new --name ...`.");
                return Ok(());
            }

            let now = chrono::Utc::now();
            let mut table = Table::new();
            table.set_header(vec!["ID", "NOM", "ITEMS", "VALEUR", "PUBLIQUE", "MODIFIÉE"]);
            for col in &collections {
                table.add_row(vec![
                    Cell::new(&col.id).fg(Color::Cyan),
                    Cell::new(truncate(&col.name, 40)),
                    Cell::new(col.items.len()),
                    Cell::new(format_price(store.collection_value(&col.id))),
                    Cell::new(yes_no(col.is_public)),
                    Cell::new(time_ago(&col.last_modified, now)),
                ]);
            }
            println!("{table}");
            println!("\n{} collections", collections.len());
            Ok(())
        }
        CollectionAction::New {
            name,
            description,
            cover,
            public,
        } => {
            validate_collection_name(&name)?;
            let cover_image = cover.as_deref().map(resolve_cover).transpose()?;
            let store = app.collections().await?;
            let col = spin(
                "Création de la collection...",
                store.create_collection(NewCollection {
                    name,
                    description,
                    cover_image,
                    is_public: Some(public),
                }),
            )
            .await?;
            println!("Collection {} créée: {}", style(&col.id).cyan(), col.name);
            Ok(())
        }
        CollectionAction::Show { id, sort } => {
            let store = app.collections().await?;
            let id = CollectionId::new(id);
            let col = store
                .get_collection_by_id(&id)
                .ok_or_else(|| anyhow::anyhow!("Collection non trouvée: {}", id))?;
            let sort = sort.unwrap_or(user.preferences.collection_display.sort_by);

            println!("{}", style(&col.name).bold());
            if !col.description.is_empty() {
                println!("{}", col.description);
            }
            println!(
                "Créée le {} · {} · valeur estimée {}",
                format_date(&col.date_created),
                if col.is_public { "publique" } else { "privée" },
                format_price(store.collection_value(&id)),
            );

            let items = store.items_sorted(&id, sort);
            if items.is_empty() {
                println!("\nCette collection est vide.");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec!["ID", "TYPE", "TITRE", "CRÉATEUR", "ANNÉE", "VALEUR", ""]);
            for item in &items {
                table.add_row(vec![
                    Cell::new(&item.id).fg(Color::Cyan),
                    Cell::new(item_type_label(item.kind())),
                    Cell::new(truncate(&item.title, 40)),
                    Cell::new(truncate(item.details.creator(), 25)),
                    Cell::new(item.year.map(|y| y.to_string()).unwrap_or_default()),
                    Cell::new(format_price(item.market.estimated_value)),
                    if item.user_specific.favorite {
                        Cell::new("★").fg(Color::Yellow)
                    } else {
                        Cell::new("")
                    },
                ]);
            }
            println!("{table}");
            println!("\n{} items (tri: {})", items.len(), sort);
            Ok(())
        }
        CollectionAction::Edit {
            id,
            name,
            description,
            cover,
            public,
        } => {
            if let Some(name) = &name {
                validate_collection_name(name)?;
            }
            let cover_image = cover.as_deref().map(resolve_cover).transpose()?;
            let store = app.collections().await?;
            let col = spin(
                "Mise à jour de la collection...",
                store.update_collection(
                    &CollectionId::new(id),
                    CollectionPatch {
                        name,
                        description,
                        cover_image,
                        is_public: public,
                    },
                ),
            )
            .await?;
            println!("Collection {} mise à jour.", style(&col.id).cyan());
            Ok(())
        }
        CollectionAction::Delete { id, cascade } => {
            let policy = if cascade {
                OrphanPolicy::Cascade
            } else {
                app.config.orphan_policy
            };
            let store = app.collections_with(policy).await?;
            let id = CollectionId::new(id);
            spin(
                "Suppression de la collection...",
                store.delete_collection(&id),
            )
            .await?;
            println!("Collection {} supprimée.", id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cover() {
        assert_eq!(resolve_cover("scifi").unwrap(), "/images/collections/scifi.jpg");
        assert_eq!(resolve_cover("Films").unwrap(), "/images/collections/films.jpg");
        assert_eq!(
            resolve_cover("/images/collections/vinyles.jpg").unwrap(),
            "/images/collections/vinyles.jpg"
        );
        assert!(resolve_cover("jazz").is_err());
    }
}
