use clap::Args;
use console::style;

use retro_core::models::user::NewUser;
use retro_core::validation::{
    validate_login, validate_password_confirmation, validate_registration, MIN_PASSWORD_LEN,
};

use crate::context::App;
use crate::display::spin;

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Repeat the password; checked when given
    #[arg(long)]
    confirm_password: Option<String>,
}

pub async fn login(args: LoginArgs) -> anyhow::Result<()> {
    validate_login(&args.email, &args.password)?;
    let app = App::open()?;
    let user = spin(
        "Connexion...",
        app.identity.login(args.email.trim(), &args.password),
    )
    .await?;
    println!(
        "Connecté en tant que {} ({})",
        style(user.full_name()).bold(),
        user.username
    );
    Ok(())
}

pub async fn register(args: RegisterArgs) -> anyhow::Result<()> {
    let new_user = NewUser {
        first_name: args.first_name.trim().to_string(),
        last_name: args.last_name.trim().to_string(),
        username: args.username.trim().to_string(),
        email: args.email.trim().to_string(),
        password: args.password,
    };
    validate_registration(&new_user, MIN_PASSWORD_LEN)?;
    if let Some(confirmation) = &args.confirm_password {
        validate_password_confirmation(&new_user.password, confirmation)?;
    }

    let app = App::open()?;
    let user = spin("Inscription...", app.identity.register(new_user)).await?;
    println!(
        "Bienvenue {} ! Compte {} créé.",
        style(&user.first_name).bold(),
        style(&user.id).cyan()
    );
    Ok(())
}

pub fn logout() -> anyhow::Result<()> {
    let app = App::open()?;
    match app.identity.current_user() {
        Some(user) => {
            app.identity.logout()?;
            println!("Déconnecté ({}).", user.username);
        }
        None => println!("Aucune session active."),
    }
    Ok(())
}
