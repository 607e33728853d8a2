//! Chain command handler

use super::utils::open_mappings;
use crate::cli::ChainArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use serde_json::json;
use tracing::{info, instrument};
use transmap_core::{compose_chain, MappingStore, TransitiveChainResolver};

/// Handle the chain command
#[instrument(skip(config, output), fields(source = %args.source, target = %args.target))]
pub async fn handle_chain(args: ChainArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("chain", &format!("{} -> {}", args.source, args.target));
    let resolver = TransitiveChainResolver::new(open_mappings(config, &args.stores).await?);

    let chain = resolver.find(&args.source, &args.target).await?;
    if chain.is_empty() {
        return Err(Error::MappingNotFound {
            source_id: args.source,
            target_id: args.target,
        });
    }

    let mut composed = compose_chain(&chain)?;
    composed.created_by = config.created_by.clone();
    info!(hops = chain.len(), "composed mapping chain");

    let saved_id = if args.save {
        Some(resolver.store().create(composed.clone()).await?)
    } else {
        None
    };

    if !output.is_human() {
        return output.data(&json!({
            "chain": chain.iter().map(|m| m.id.clone()).collect::<Vec<_>>(),
            "savedId": saved_id,
            "mapping": composed,
        }));
    }

    output.section("Chain")?;
    for (hop, mapping) in chain.iter().enumerate() {
        output.writeln(&format!(
            "{}. {} → {} ({})",
            hop + 1,
            mapping.source_id,
            mapping.target_ids.join(", "),
            mapping.id.as_deref().unwrap_or("unsaved")
        ))?;
    }
    output.section("Composed mapping")?;
    output.data(&composed)?;
    if let Some(id) = saved_id {
        output.success(&format!("✓ Saved composed mapping as {}", id))?;
    }
    Ok(())
}
