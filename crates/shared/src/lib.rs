pub mod dictionary;
pub mod error;
pub mod protocol;
