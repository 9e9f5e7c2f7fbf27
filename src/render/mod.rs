//! Render tree, lazy builders, and the render cache protocol.

mod builders;
mod element;
mod renderer;

pub use builders::{BuilderError, BuilderRegistry, LazyBuilder};
pub use element::{Element, LazyBuilderRef};
pub use renderer::{PlaceholderSpec, RenderEntry, RenderError, Rendered, Renderer};
