use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("malformed command dictionary: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("dictionary key '{key}' does not match command name '{name}'")]
    NameMismatch { key: String, name: String },
}
