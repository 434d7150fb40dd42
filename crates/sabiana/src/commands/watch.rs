//! Continuous polling: print every snapshot the coordinator publishes.

use sabiana_core::{Coordinator, CoordinatorSnapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::units::UnitRow;

fn render_snapshot(
    snap: &CoordinatorSnapshot,
    session: &Session,
    global: &GlobalOpts,
    color: bool,
) -> Result<String, CliError> {
    let body = output::render_list(
        &global.output,
        &snap.units,
        |u| UnitRow::new(u, session, color),
        |u| u.identity().to_string(),
    )?;
    if !matches!(global.output, OutputFormat::Table) {
        return Ok(body);
    }
    let stamp = snap.fetched_at.map_or_else(
        || "-".into(),
        |t| t.format("%H:%M:%S").to_string(),
    );
    Ok(format!(
        "{stamp}  {} units, {} pending\n{body}",
        snap.units.len(),
        snap.pending_count()
    ))
}

pub async fn handle(
    coordinator: &Coordinator,
    session: &Session,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if session.coordinator.poll_interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "watch needs a poll interval of at least 5 seconds".into(),
        });
    }
    let color = output::should_color(&global.color);

    // First poll in the foreground so bad credentials fail fast
    coordinator.refresh().await?;
    let mut stream = coordinator.subscribe();
    output::print_output(
        &render_snapshot(stream.current(), session, global, color)?,
        global.quiet,
    );
    let mut printed = 1_usize;
    if args.count.is_some_and(|n| printed >= n) {
        return Ok(());
    }

    coordinator.spawn_polling().await?;

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(CliError::from),
            next = stream.changed() => {
                let Some(snap) = next else { break Ok(()) };
                match render_snapshot(&snap, session, global, color) {
                    Ok(out) => output::print_output(&out, global.quiet),
                    Err(e) => break Err(e),
                }
                printed += 1;
                if args.count.is_some_and(|n| printed >= n) {
                    break Ok(());
                }
            }
        }
    };

    coordinator.shutdown().await;
    result
}
