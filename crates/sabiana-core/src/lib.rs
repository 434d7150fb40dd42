// sabiana-core: Polling coordinator and optimistic command reconciliation
// between sabiana-api and consumers (CLI, home-automation hosts).

pub mod clock;
pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod pending;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use command::{Command, CommandResult};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorState, RefreshOutcome};
pub use diagnostics::Diagnostics;
pub use error::CoreError;
pub use pending::{PendingWrite, PendingWriteTracker};
pub use store::UpdateStatus;
pub use stream::{SnapshotStream, SnapshotWatchStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Alarms, CoordinatorSnapshot, DeviceIdentity, DeviceSnapshot, FanMap, HvacMode, Locks,
    Setpoints, Temperatures, VentMode, VentPatch, VentState,
};

pub use sabiana_api::{ErrorKind as ApiErrorKind, SabianaClient, VentCommand};
