//! Queue-backed mocks for every service trait. Each mock tracks the inputs
//! it received and yields predefined results in FIFO order.

mod renderer;
mod social;
mod text_model;

pub use renderer::MockRenderer;
pub use social::MockSocialArchive;
pub use text_model::{MockTextModel, MockTextResult};
