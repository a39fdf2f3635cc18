use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Board must have at least one cell")]
    EmptyBoard,

    #[error("Palette must contain at least one color")]
    EmptyPalette,

    #[error("Board has {0} cells, the maximum is {max}", max = crate::session::MAX_BOARD_SIZE)]
    BoardTooLarge(usize),

    #[error("Initial time must be at least one second, got {0}")]
    NonPositiveTime(i64),
}
