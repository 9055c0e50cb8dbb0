//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for the planner and the
//! four executor agents.
//!
//! Template loading chain:
//! 1. `.planforge/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ExecutorContext, PlannerContext, PromptError, PromptLoader};
