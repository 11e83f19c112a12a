use crate::config::ConfigError;
use crate::history::HistoryError;
use crate::notify::NotifyError;
use crate::source::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    #[error("live source error: {0}")]
    Source(#[from] SourceError),
    #[error("notifier error: {0}")]
    Notify(#[from] NotifyError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state lock poisoned")]
    StateLock,
}
