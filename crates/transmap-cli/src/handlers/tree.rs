//! Tree command handler

use super::utils::read_document;
use crate::cli::TreeArgs;
use crate::error::Result;
use crate::output::OutputWriter;
use tracing::{info, instrument};
use transmap_core::{leaf_key_chains, schema_to_type_tree, to_tree};

/// Handle the tree command
#[instrument(skip(output), fields(schema = %args.schema.display()))]
pub async fn handle_tree(args: TreeArgs, output: &mut OutputWriter) -> Result<()> {
    let document = read_document(&args.schema)?;
    let type_tree = if args.type_tree {
        document
    } else {
        schema_to_type_tree(&document)
    };

    let prefix: Vec<String> = args.interface.into_iter().collect();
    let leaves = leaf_key_chains(&to_tree(&type_tree, &prefix));
    info!(leaves = leaves.len(), "enumerated schema leaves");

    if leaves.is_empty() {
        output.warning("Schema has no leaves")?;
        return Ok(());
    }
    output.key_chains(&leaves)
}
