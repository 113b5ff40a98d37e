use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid date value: {0}")]
    InvalidDate(String),

    #[error("Unsafe path: {0}")]
    UnsafePath(String),

    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Post already exists: {0}")]
    Conflict(String),

    #[error("Categories without a slug mapping: {}", .0.join(", "))]
    UnmappedCategories(Vec<String>),

    #[error("Malformed frontmatter: {0}")]
    Frontmatter(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CmsError>;

impl CmsError {
    /// Errors caused by the request itself rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CmsError::Validation(_)
                | CmsError::InvalidDate(_)
                | CmsError::UnsafePath(_)
                | CmsError::UnmappedCategories(_)
        )
    }
}
