// ── Domain model ──
//
// Typed, immutable projections of what the cloud reports. Presentation
// layers depend on these, never on the raw wire records.

pub mod fan;
pub mod identity;
pub mod snapshot;
pub mod vent;

pub use fan::FanMap;
pub use identity::DeviceIdentity;
pub use snapshot::{CoordinatorSnapshot, DeviceSnapshot};
pub use vent::{Alarms, HvacMode, Locks, Setpoints, Temperatures, VentMode, VentPatch, VentState};
