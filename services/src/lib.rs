mod client_utils;
mod errors;
mod gateway;
mod renderer;
mod social;
mod store;
mod text_model;
mod types;

pub mod testing;

pub use errors::*;
pub use gateway::TextGateway;
pub use renderer::{ArtifactRenderer, HttpRenderer};
pub use social::{HttpSocialArchive, SocialArchive};
pub use store::{MemoryRecordStore, RecordStore};
pub use text_model::TextModel;
pub use types::*;
