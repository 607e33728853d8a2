//! Validation command handler

use super::utils::{load_schemas, read_as};
use crate::cli::ValidateArgs;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use serde_json::json;
use tracing::{info, instrument, warn};
use transmap_core::{Mapping, ValidationEngine};

/// Handle the validate command
#[instrument(skip(output), fields(mapping = %args.mapping.display()))]
pub async fn handle_validate(args: ValidateArgs, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("validate_command", &args.mapping.display().to_string());

    let mapping: Mapping = read_as(&args.mapping, "a mapping")?;
    let engine = ValidationEngine::new(load_schemas(&args.schemas)?);
    output.info(&format!(
        "Validating {} mapping {} → {}",
        mapping.kind(),
        mapping.source_id,
        mapping.target_ids.join(", ")
    ))?;

    match engine.validate(&mapping).await? {
        Ok(()) => {
            info!("mapping is complete");
            if output.is_human() {
                output.success("✓ Mapping covers every required leaf")
            } else {
                output.data(&json!({ "valid": true, "missing": [] }))
            }
        }
        Err(failure) => {
            warn!(missing = failure.missing().len(), "mapping is incomplete");
            output.validation_failure(&failure)?;
            Err(Error::ValidationFailed(failure))
        }
    }
}
