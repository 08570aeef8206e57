//! Form-level checks shared by the front-end and the stores.

use crate::error::RetroError;
use crate::models::item::NewItem;
use crate::models::user::NewUser;

pub const MIN_PASSWORD_LEN: usize = 8;

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub fn validate_login(email: &str, password: &str) -> Result<(), RetroError> {
    if blank(email) || password.is_empty() {
        return Err(RetroError::validation("Veuillez remplir tous les champs"));
    }
    Ok(())
}

/// All fields are required; `min_password_len == 0` disables the length rule.
pub fn validate_registration(user: &NewUser, min_password_len: usize) -> Result<(), RetroError> {
    if blank(&user.first_name)
        || blank(&user.last_name)
        || blank(&user.username)
        || blank(&user.email)
        || user.password.is_empty()
    {
        return Err(RetroError::validation("Veuillez remplir tous les champs"));
    }
    validate_password_length(&user.password, min_password_len)
}

pub fn validate_password_length(password: &str, min_len: usize) -> Result<(), RetroError> {
    if password.chars().count() < min_len {
        return Err(RetroError::validation(format!(
            "Le mot de passe doit contenir au moins {min_len} caractères"
        )));
    }
    Ok(())
}

pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), RetroError> {
    if password != confirmation {
        return Err(RetroError::validation(
            "Les mots de passe ne correspondent pas",
        ));
    }
    Ok(())
}

pub fn validate_profile_names(first_name: &str, last_name: &str) -> Result<(), RetroError> {
    if blank(first_name) || blank(last_name) {
        return Err(RetroError::validation(
            "Le prénom et le nom sont obligatoires",
        ));
    }
    Ok(())
}

pub fn validate_collection_name(name: &str) -> Result<(), RetroError> {
    if blank(name) {
        return Err(RetroError::validation(
            "Le nom de la collection est obligatoire",
        ));
    }
    Ok(())
}

pub fn validate_item_title(title: &str) -> Result<(), RetroError> {
    if blank(title) {
        return Err(RetroError::validation("Le titre est obligatoire"));
    }
    Ok(())
}

pub fn validate_estimated_value(value: f64) -> Result<(), RetroError> {
    if !value.is_finite() || value < 0.0 {
        return Err(RetroError::validation(
            "La valeur estimée doit être un nombre positif",
        ));
    }
    Ok(())
}

pub fn validate_new_item(item: &NewItem) -> Result<(), RetroError> {
    validate_item_title(&item.title)?;
    if let Some(v) = item.estimated_value {
        validate_estimated_value(v)?;
    }
    Ok(())
}
