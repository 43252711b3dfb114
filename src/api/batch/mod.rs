//! `$batch` support: command model, multipart encoder and response decoder

pub mod builder;
pub mod command;
pub mod parser;
pub mod transform;

pub use builder::{BatchRequest, BatchRequestBuilder};
pub use command::{BatchCommand, RequestMethod};
pub use parser::{BatchResponseItem, BatchResponseParser, ensure_success};
pub use transform::{
    Row, chunk, create_commands, delete_by_key_commands, delete_commands, single_column_commands,
    update_commands, upsert_commands,
};

/// How a chunk of commands is sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Wrap each chunk in a changeset so it commits or rolls back as a unit
    pub transactional: bool,
    /// Send `Prefer: odata.continue-on-error`
    pub continue_on_error: bool,
}

impl BatchOptions {
    pub fn transactional() -> Self {
        Self {
            transactional: true,
            continue_on_error: false,
        }
    }

    pub fn continue_on_error() -> Self {
        Self {
            transactional: false,
            continue_on_error: true,
        }
    }
}
