use std::path::PathBuf;

/// Central error type for the RetroDigital system.
///
/// Display strings are the messages shown to the collector, so the domain
/// variants carry French text.
#[derive(Debug, thiserror::Error)]
pub enum RetroError {
    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,

    #[error("Cet email est déjà utilisé")]
    DuplicateEmail { email: String },

    #[error("Ce nom d'utilisateur est déjà pris")]
    DuplicateUsername { username: String },

    #[error("Utilisateur non connecté")]
    NotAuthenticated,

    #[error("Utilisateur non trouvé")]
    UserNotFound { id: String },

    #[error("Collection non trouvée")]
    CollectionNotFound { id: String },

    #[error("Item non trouvé")]
    ItemNotFound { id: String },

    #[error("Vous n'êtes pas autorisé à {action}")]
    Forbidden { action: String },

    #[error("Aucun item correspondant trouvé pour {query}")]
    NoMatch { query: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("session storage error: {message}")]
    Session { message: String },

    #[error("{0}")]
    Other(String),
}

impl RetroError {
    pub fn validation(message: impl Into<String>) -> Self {
        RetroError::Validation {
            message: message.into(),
        }
    }

    pub fn forbidden(action: impl Into<String>) -> Self {
        RetroError::Forbidden {
            action: action.into(),
        }
    }

    /// True for the failures a collector can cause by input or ownership,
    /// as opposed to storage or configuration faults.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            RetroError::InvalidCredentials
                | RetroError::DuplicateEmail { .. }
                | RetroError::DuplicateUsername { .. }
                | RetroError::NotAuthenticated
                | RetroError::UserNotFound { .. }
                | RetroError::CollectionNotFound { .. }
                | RetroError::ItemNotFound { .. }
                | RetroError::Forbidden { .. }
                | RetroError::NoMatch { .. }
                | RetroError::Validation { .. }
        )
    }
}

impl From<serde_json::Error> for RetroError {
    fn from(e: serde_json::Error) -> Self {
        RetroError::Serialization(e.to_string())
    }
}
