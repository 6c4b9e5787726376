use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Event {0} is already running")]
    AlreadyActive(String),
    #[error("Event {0} is not running")]
    NotActive(String),
    #[error("Women's seats are frozen while event {0} is running")]
    SeatingFrozen(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
    #[error("DB lock poisoned: {0}")]
    LockPoisoned(String),
}
