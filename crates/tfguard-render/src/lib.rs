//! Rendering utilities for terminals and CI surfaces (text, Markdown, GitHub annotations).
//!
//! Every renderer is a read-only projection of a [`RenderableReport`]; none of them changes
//! counts or the exit code.

#![forbid(unsafe_code)]

mod gha;
mod markdown;
mod model;
mod text;

pub use gha::render_github_annotations;
pub use markdown::render_markdown;
pub use model::{RenderableReport, RenderableResult, RenderableTotals};
pub use text::render_text;
