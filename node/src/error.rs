use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] visarun_types::CatalogError),

    #[error("store error: {0}")]
    Store(#[from] visarun_store::StoreError),

    #[error("telegram error: {0}")]
    Telegram(#[from] visarun_telegram::TelegramError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
