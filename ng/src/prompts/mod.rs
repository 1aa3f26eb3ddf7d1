//! Prompt Template System
//!
//! Renders the per-stage `.pmt` (prompt template) files.
//!
//! Template loading chain, resolved once when the loader is built:
//! 1. `{prompts.dir}/{name}.pmt` (user override)
//! 2. Embedded default compiled from `prompts/{name}.pmt`
//!
//! Templates use Handlebars syntax. Rendering is a pure function of the
//! domain data passed in.

pub mod embedded;
mod loader;

pub use loader::PromptLoader;
