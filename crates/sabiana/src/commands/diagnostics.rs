//! Coordinator diagnostics dump.

use sabiana_core::Coordinator;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Poll once and print the diagnostics. A failed poll is part of the
/// report rather than an error. Tables have no sensible shape here, so
/// table output falls back to YAML.
pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    if let Err(e) = coordinator.refresh().await {
        tracing::debug!(error = %e, "diagnostics poll failed");
    }
    let diagnostics = coordinator.diagnostics();

    let out = match global.output {
        OutputFormat::Table => output::render_yaml(&diagnostics)?,
        ref format => output::render_single(
            format,
            &diagnostics,
            |_| String::new(),
            |d| {
                format!(
                    "last_update_success={} units={} pending={}",
                    d.last_update_success,
                    d.units.len(),
                    d.pending.len()
                )
            },
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
