use std::path::PathBuf;

use clap::Subcommand;
use console::style;

use retro_core::models::collection::{Collection, CollectionId};
use retro_core::models::item::DraftItem;
use retro_scan::ImageInput;
use retro_store::CollectionStore;

use crate::context::App;
use crate::display::{format_price, item_type_label, spin};

#[derive(Subcommand)]
pub enum ScanAction {
    /// Look up a barcode or ISBN
    Barcode {
        code: String,
        /// Target collection (defaults to your first one)
        #[arg(long)]
        collection: Option<String>,
        /// Add the result to the collection
        #[arg(long)]
        confirm: bool,
    },
    /// Recognize an item from a picture
    Image {
        path: PathBuf,
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        confirm: bool,
    },
}

/// The requested collection when it is one of ours, else the first one.
fn target_collection(store: &CollectionStore, requested: Option<&str>) -> anyhow::Result<Collection> {
    let collections = store.collections();
    let chosen = requested
        .and_then(|id| {
            let id = CollectionId::from(id);
            collections.iter().find(|c| c.id == id)
        })
        .or_else(|| collections.first())
        .cloned();
    chosen.ok_or_else(|| {
        anyhow::anyhow!(
            "Vous n'avez aucune collection. Créez-en une avec `retro collection new --name ...`."
        )
    })
}

pub async fn run(action: ScanAction) -> anyhow::Result<()> {
    let app = App::open()?;
    app.require_user()?;
    let store = app.collections().await?;

    let (draft, target, confirm) = match action {
        ScanAction::Barcode {
            code,
            collection,
            confirm,
        } => {
            let target = target_collection(&store, collection.as_deref())?;
            let draft = spin("Recherche du code-barres...", store.scan_barcode(&code)).await?;
            (draft, target, confirm)
        }
        ScanAction::Image {
            path,
            collection,
            confirm,
        } => {
            let target = target_collection(&store, collection.as_deref())?;
            let image = ImageInput::from_path(&path)?;
            let draft = spin("Analyse de l'image...", store.scan_image(&image)).await?;
            (draft, target, confirm)
        }
    };

    print_draft(&draft);
    if !confirm {
        println!(
            "\nAjoutez-le à « {} » avec --confirm.",
            target.name
        );
        return Ok(());
    }

    let item = spin(
        "Ajout de l'item...",
        store.add_item(&target.id, draft.into_new_item()),
    )
    .await?;
    println!(
        "{} Item {} ajouté à « {} ».",
        style("✓").green(),
        style(&item.id).cyan(),
        target.name
    );
    Ok(())
}

fn print_draft(draft: &DraftItem) {
    let heading = match draft.year {
        Some(year) => format!("{} ({})", draft.title, year),
        None => draft.title.clone(),
    };
    println!("{}", style("Item trouvé").green());
    println!("{}", style(heading).bold());
    println!("{}", item_type_label(draft.kind()));
    if !draft.details.creator().is_empty() {
        println!("{}", draft.details.creator());
    }
    if !draft.description.is_empty() {
        println!("{}", draft.description);
    }
    println!(
        "Valeur estimée: {} · État: {}",
        format_price(draft.estimated_value),
        draft.condition
    );
}
