use clap::Subcommand;
use console::style;

use retro_core::models::user::{DefaultView, ProfilePatch, SortBy, User};
use retro_core::validation::{validate_password_length, validate_profile_names, MIN_PASSWORD_LEN};

use crate::context::App;
use crate::display::{format_date, spin, yes_no};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the logged-in collector
    Show,
    /// Edit profile fields and preferences
    Edit {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        profile_picture: Option<String>,
        /// New password (at least 8 characters)
        #[arg(long)]
        password: Option<String>,
        /// shelf or list
        #[arg(long)]
        default_view: Option<DefaultView>,
        /// title, author, year or dateAdded
        #[arg(long)]
        sort_by: Option<SortBy>,
        #[arg(long)]
        show_collection: Option<bool>,
        #[arg(long)]
        show_activity: Option<bool>,
        #[arg(long)]
        allow_messages: Option<bool>,
    },
}

pub async fn run(action: ProfileAction) -> anyhow::Result<()> {
    let app = App::open()?;
    let user = app.require_user()?;

    match action {
        ProfileAction::Show => {
            print_profile(&user);
            Ok(())
        }
        ProfileAction::Edit {
            first_name,
            last_name,
            username,
            email,
            bio,
            profile_picture,
            password,
            default_view,
            sort_by,
            show_collection,
            show_activity,
            allow_messages,
        } => {
            validate_profile_names(
                first_name.as_deref().unwrap_or(&user.first_name),
                last_name.as_deref().unwrap_or(&user.last_name),
            )?;
            if let Some(pw) = &password {
                validate_password_length(pw, MIN_PASSWORD_LEN)?;
            }

            // preferences are replaced as a whole, so start from the current ones
            let touches_prefs = default_view.is_some()
                || sort_by.is_some()
                || show_collection.is_some()
                || show_activity.is_some()
                || allow_messages.is_some();
            let preferences = touches_prefs.then(|| {
                let mut prefs = user.preferences.clone();
                if let Some(v) = default_view {
                    prefs.collection_display.default_view = v;
                }
                if let Some(v) = sort_by {
                    prefs.collection_display.sort_by = v;
                }
                if let Some(v) = show_collection {
                    prefs.privacy_settings.show_collection = v;
                }
                if let Some(v) = show_activity {
                    prefs.privacy_settings.show_activity = v;
                }
                if let Some(v) = allow_messages {
                    prefs.privacy_settings.allow_messages = v;
                }
                prefs
            });

            let patch = ProfilePatch {
                username,
                email,
                first_name,
                last_name,
                profile_picture,
                bio,
                preferences,
                password,
            };
            let updated = spin("Mise à jour du profil...", app.identity.update_profile(patch)).await?;
            println!("{}", style("Profil mis à jour.").green());
            print_profile(&updated);
            Ok(())
        }
    }
}

fn print_profile(user: &User) {
    let prefs = &user.preferences;
    println!("{}", style(user.full_name()).bold());
    println!("Identifiant:        {}", user.id);
    println!("Nom d'utilisateur:  {}", user.username);
    println!("Email:              {}", user.email);
    println!("Photo:              {}", user.profile_picture);
    if !user.bio.is_empty() {
        println!("Bio:                {}", user.bio);
    }
    println!("Membre depuis:      {}", format_date(&user.date_joined));
    println!("\nPréférences:");
    println!(
        "  Affichage:        {} (tri: {})",
        prefs.collection_display.default_view, prefs.collection_display.sort_by
    );
    println!(
        "  Collection visible: {}",
        yes_no(prefs.privacy_settings.show_collection)
    );
    println!(
        "  Activité visible:   {}",
        yes_no(prefs.privacy_settings.show_activity)
    );
    println!(
        "  Messages autorisés: {}",
        yes_no(prefs.privacy_settings.allow_messages)
    );
}
