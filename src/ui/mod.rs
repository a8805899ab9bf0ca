//! HTML rendering for the single-page query form.
//!
//! # Structure
//!
//! - [`page`]: Page shell, form and outcome panels
//! - [`markdown`]: Markdown rendering and HTML escaping

pub mod markdown;
pub mod page;

pub use markdown::{escape_html, render_markdown};
pub use page::{FormState, Panel, render_page};
