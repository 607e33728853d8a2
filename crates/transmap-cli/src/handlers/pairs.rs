//! Compile and decompile command handlers

use super::utils::read_as;
use crate::cli::{CompileArgs, DecompileArgs};
use crate::error::Result;
use crate::output::OutputWriter;
use tracing::{info, instrument};
use transmap_core::{compile, decompile, first_unmapped, MappingPair, MappingTree};

/// Handle the compile command
#[instrument(skip(output), fields(pairs = %args.pairs.display()))]
pub async fn handle_compile(args: CompileArgs, output: &mut OutputWriter) -> Result<()> {
    let pairs: Vec<MappingPair> = read_as(&args.pairs, "a list of mapping pairs")?;
    if let Some(pair) = first_unmapped(&pairs) {
        output.warning(&format!("{} has no mapping code yet", pair.required_id()))?;
    }

    let tree = compile(&pairs, args.direction.into())?;
    info!(pairs = pairs.len(), leaves = tree.leaf_count(), "compiled mapping tree");
    output.data(&tree)
}

/// Handle the decompile command
#[instrument(skip(output), fields(tree = %args.tree.display()))]
pub async fn handle_decompile(args: DecompileArgs, output: &mut OutputWriter) -> Result<()> {
    let tree: MappingTree = read_as(&args.tree, "a mapping tree")?;
    let pairs = decompile(&tree, args.direction.into());
    info!(pairs = pairs.len(), "decompiled mapping tree");
    output.mapping_pairs(&pairs)
}
