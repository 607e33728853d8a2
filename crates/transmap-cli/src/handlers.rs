//! Command handlers for CLI subcommands
//!
//! Each submodule implements one subcommand against the core library and
//! reports through the [`OutputWriter`](crate::output::OutputWriter).

mod chain;
mod completions;
mod config;
mod execute;
mod expr;
mod graph;
mod mappings;
mod pairs;
mod suggest;
mod tree;
mod utils;
mod validate;

pub use chain::handle_chain;
pub use completions::handle_completions;
pub use config::handle_config;
pub use execute::handle_execute;
pub use expr::handle_expr;
pub use graph::handle_graph;
pub use mappings::handle_mappings;
pub use pairs::{handle_compile, handle_decompile};
pub use suggest::handle_suggest;
pub use tree::handle_tree;
pub use validate::handle_validate;
