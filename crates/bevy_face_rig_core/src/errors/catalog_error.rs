use thiserror::Error;

/// Possible errors produced while loading an [`AvatarCatalog`].
///
/// [`AvatarCatalog`]: crate::catalog::AvatarCatalog
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("catalog does not list any avatars")]
    Empty,
    #[error("avatar id {0:?} is listed more than once")]
    DuplicateId(String),
    #[error("default avatar {0:?} is not in the catalog")]
    UnknownDefault(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
