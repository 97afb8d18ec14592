use crate::store::StoreError;
use thiserror::Error;

/// Errors raised by profile operations
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A profile with this name already exists
    #[error("Profile '{0}' already exists")]
    Duplicate(String),

    /// Renaming would overwrite another profile
    #[error("Cannot rename: profile '{0}' already exists")]
    RenameConflict(String),

    /// No profile with this name
    #[error("Profile '{0}' does not exist")]
    Missing(String),

    /// Profile names must be non-empty
    #[error("Profile name must not be empty")]
    InvalidName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProfileError {
    /// Short machine-readable code for command responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Duplicate(_) => "already_exists",
            Self::RenameConflict(_) => "renamed_exists",
            Self::Missing(_) => "profile_missing",
            Self::InvalidName => "invalid_name",
            Self::Store(_) => "store_error",
        }
    }
}

pub type ProfileResult<T> = Result<T, ProfileError>;
