//! Incremental event reconciliation for CI runs.
//!
//! The provider only exposes *current* state, never a change feed. Each
//! reconciliation cycle therefore re-reads the whole visible state, turns it
//! into a flat set of timestamped [`Event`]s, and delivers only those newer
//! than a persisted watermark:
//!
//! ```text
//! SnapshotProvider -> fetch_snapshot -> extract -> select_pending -> EventSink
//!                                                        |
//!                                          CheckpointStore (watermark)
//! ```
//!
//! # Watermark semantics
//!
//! After a successful cycle the watermark moves to the wall-clock instant at
//! which that cycle *began*, not to the newest delivered event. An event the
//! provider stamps earlier than that instant but only reports later is
//! skipped. The reverse also holds: an event stamped after a cycle began but
//! already visible when its fetch returned is delivered by that cycle and
//! again by the next one, which only filters on the earlier cycle start.
//! Callers needing exactly-once delivery must account for both.
//!
//! # Seams
//!
//! - [`SnapshotProvider`]: where state comes from (see `runwatch-github`).
//! - [`EventSink`]: where delivered events go.
//! - [`runwatch_checkpoint::CheckpointStore`]: where the watermark lives.
//! - [`Clock`]: where "now" comes from.
//!
//! [`Event`]: runwatch_types::Event

mod clock;
mod extract;
mod provider;
mod reconcile;
mod sink;

pub use clock::{Clock, SystemClock};
pub use extract::{extract, select_pending};
pub use provider::{fetch_snapshot, SnapshotProvider};
pub use reconcile::{CycleReport, PollSettings, Reconciler};
pub use sink::{EventSink, MemorySink};
