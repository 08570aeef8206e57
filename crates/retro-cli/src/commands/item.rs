use clap::{Args, Subcommand};
use console::style;

use retro_core::models::collection::CollectionId;
use retro_core::models::item::{
    BookMetadata, BookMetadataPatch, FilmMetadata, FilmMetadataPatch, Item, ItemDetails, ItemId,
    ItemKind, ItemPatch, MarketPatch, MetadataPatch, NewItem, UserSpecificPatch, VinylMetadata,
    VinylMetadataPatch,
};
use retro_core::validation::{validate_estimated_value, validate_item_title};

use crate::context::App;
use crate::display::{format_date, format_price, format_tags, item_type_label, spin, yes_no};

/// Per-kind metadata flags. Flags that do not apply to the chosen kind are
/// ignored.
#[derive(Args, Default)]
pub struct MetadataArgs {
    /// Book author
    #[arg(long)]
    author: Option<String>,
    /// Vinyl artist
    #[arg(long)]
    artist: Option<String>,
    /// Film director
    #[arg(long)]
    director: Option<String>,
    #[arg(long)]
    publisher: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    label: Option<String>,
    #[arg(long)]
    studio: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    format: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    page_count: Option<u32>,
    #[arg(long)]
    runtime: Option<u32>,
    #[arg(long)]
    release_date: Option<String>,
    /// Sleeve condition (vinyl)
    #[arg(long)]
    sleeve_condition: Option<String>,
}

impl MetadataArgs {
    fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.artist.is_none()
            && self.director.is_none()
            && self.publisher.is_none()
            && self.isbn.is_none()
            && self.label.is_none()
            && self.studio.is_none()
            && self.genre.is_none()
            && self.format.is_none()
            && self.language.is_none()
            && self.page_count.is_none()
            && self.runtime.is_none()
            && self.release_date.is_none()
            && self.sleeve_condition.is_none()
    }

    fn into_patch(self, kind: ItemKind) -> MetadataPatch {
        match kind {
            ItemKind::Book => MetadataPatch::Book(BookMetadataPatch {
                author: self.author,
                publisher: self.publisher,
                isbn: self.isbn,
                genre: self.genre,
                format: self.format,
                language: self.language,
                page_count: self.page_count,
            }),
            ItemKind::Vinyl => MetadataPatch::Vinyl(VinylMetadataPatch {
                artist: self.artist,
                label: self.label,
                format: self.format,
                release_date: self.release_date,
                genre: self.genre,
                condition: self.sleeve_condition,
            }),
            ItemKind::Film => MetadataPatch::Film(FilmMetadataPatch {
                director: self.director,
                studio: self.studio,
                format: self.format,
                runtime: self.runtime,
                genre: self.genre,
                language: self.language,
            }),
        }
    }

    fn into_details(self, kind: ItemKind) -> ItemDetails {
        let mut details = ItemDetails::empty(kind);
        details.apply(self.into_patch(kind));
        details
    }
}

#[derive(Subcommand)]
pub enum ItemAction {
    /// Show an item
    Show { id: String },
    /// Add an item to one of your collections
    Add {
        #[arg(long)]
        collection: String,
        /// book, vinyl or film
        #[arg(long = "type")]
        kind: ItemKind,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// Estimated value in euros
        #[arg(long)]
        value: Option<f64>,
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        favorite: bool,
        /// Image path; repeat for several
        #[arg(long = "image")]
        images: Vec<String>,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Edit an item
    Edit {
        id: String,
        /// Switch the item to another kind
        #[arg(long = "type")]
        kind: Option<ItemKind>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        value: Option<f64>,
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Replace the tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        #[arg(long)]
        favorite: Option<bool>,
        #[arg(long = "image")]
        images: Option<Vec<String>>,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Delete an item
    Delete { id: String },
}

pub async fn run(action: ItemAction) -> anyhow::Result<()> {
    let app = App::open()?;
    app.require_user()?;
    let store = app.collections().await?;

    match action {
        ItemAction::Show { id } => {
            let id = ItemId::new(id);
            let item = store
                .get_item_by_id(&id)
                .ok_or_else(|| anyhow::anyhow!("Item non trouvé: {}", id))?;
            print_item(&item);
            Ok(())
        }
        ItemAction::Add {
            collection,
            kind,
            title,
            description,
            year,
            value,
            condition,
            notes,
            tags,
            favorite,
            images,
            metadata,
        } => {
            validate_item_title(&title)?;
            if let Some(v) = value {
                validate_estimated_value(v)?;
            }
            let data = NewItem {
                details: metadata.into_details(kind),
                title,
                description,
                year,
                images: (!images.is_empty()).then_some(images),
                estimated_value: value,
                condition,
                notes,
                tags,
                favorite,
            };
            let item = spin(
                "Ajout de l'item...",
                store.add_item(&CollectionId::new(collection), data),
            )
            .await?;
            println!(
                "{} {} ajouté à {}.",
                item_type_label(item.kind()),
                style(&item.id).cyan(),
                item.user_specific.collection_id
            );
            Ok(())
        }
        ItemAction::Edit {
            id,
            kind,
            title,
            description,
            year,
            value,
            condition,
            notes,
            tags,
            favorite,
            images,
            metadata,
        } => {
            let id = ItemId::new(id);
            if let Some(t) = &title {
                validate_item_title(t)?;
            }
            if let Some(v) = value {
                validate_estimated_value(v)?;
            }

            let metadata = match kind {
                Some(kind) => Some(metadata.into_patch(kind)),
                None if metadata.is_empty() => None,
                None => {
                    let current = store
                        .get_item_by_id(&id)
                        .ok_or_else(|| anyhow::anyhow!("Item non trouvé: {}", id))?;
                    Some(metadata.into_patch(current.kind()))
                }
            };
            let market = (value.is_some() || condition.is_some()).then_some(MarketPatch {
                estimated_value: value,
                condition,
            });
            let user_specific =
                (notes.is_some() || tags.is_some() || favorite.is_some()).then_some(
                    UserSpecificPatch {
                        notes,
                        tags,
                        favorite,
                    },
                );

            let patch = ItemPatch {
                title,
                description,
                year,
                images,
                metadata,
                market,
                user_specific,
            };
            let item = spin("Mise à jour de l'item...", store.update_item(&id, patch)).await?;
            println!("Item {} mis à jour.", style(&item.id).cyan());
            print_item(&item);
            Ok(())
        }
        ItemAction::Delete { id } => {
            let id = ItemId::new(id);
            spin("Suppression de l'item...", store.delete_item(&id)).await?;
            println!("Item {} supprimé.", id);
            Ok(())
        }
    }
}

fn field(label: &str, value: &str) {
    if !value.is_empty() {
        println!("  {:<18} {}", label, value);
    }
}

fn print_metadata(details: &ItemDetails) {
    match details {
        ItemDetails::Book(BookMetadata {
            author,
            publisher,
            isbn,
            genre,
            format,
            language,
            page_count,
        }) => {
            field("Auteur:", author);
            field("Éditeur:", publisher);
            field("ISBN:", isbn);
            field("Genre:", genre);
            field("Format:", format);
            field("Langue:", language);
            if let Some(pages) = page_count {
                field("Pages:", &pages.to_string());
            }
        }
        ItemDetails::Vinyl(VinylMetadata {
            artist,
            label,
            format,
            release_date,
            genre,
            condition,
        }) => {
            field("Artiste:", artist);
            field("Label:", label);
            field("Format:", format);
            field("Sortie:", release_date);
            field("Genre:", genre);
            field("Pochette:", condition);
        }
        ItemDetails::Film(FilmMetadata {
            director,
            studio,
            format,
            runtime,
            genre,
            language,
        }) => {
            field("Réalisateur:", director);
            field("Studio:", studio);
            field("Format:", format);
            if let Some(minutes) = runtime {
                field("Durée:", &format!("{minutes} min"));
            }
            field("Genre:", genre);
            field("Langue:", language);
        }
    }
}

pub fn print_item(item: &Item) {
    let heading = match item.year {
        Some(year) => format!("{} ({})", item.title, year),
        None => item.title.clone(),
    };
    println!("{} {}", style(heading).bold(), style(&item.id).dim());
    println!("{}", item_type_label(item.kind()));
    if !item.description.is_empty() {
        println!("{}", item.description);
    }
    print_metadata(&item.details);

    println!("\nMarché:");
    field("Valeur estimée:", &format_price(item.market.estimated_value));
    field("État:", &item.market.condition);
    field("Mis à jour:", &format_date(&item.market.last_updated));

    println!("\nMa collection:");
    field("Collection:", item.user_specific.collection_id.as_str());
    field("Ajouté le:", &format_date(&item.user_specific.date_added));
    field("Notes:", &item.user_specific.notes);
    field("Tags:", &format_tags(&item.user_specific.tags));
    field("Favori:", yes_no(item.user_specific.favorite));
    field("Image:", item.primary_image());
}
