//! Surface-code braid scheduler.
//!
//! Models each logical two-qubit operation as a sequence of timed mesh
//! reservations ("braids") on the corner lattice of a tiled surface-code
//! layout, and executes a gate DAG against that mesh cycle by cycle with
//! conflict detection, dimension-ordered-routing fallback, and
//! drop-and-reinject deadlock resolution.
//!
//! The flow per leaf module: build a [`Mesh`] sized for the module's qubit
//! count, expand each ready gate into its event queue ([`expand`]), then run
//! the event loop ([`BraidScheduler`]) until the dependency DAG is edgeless
//! and all queues have drained.

pub mod braid;
pub mod distance;
pub mod error;
pub mod event;
pub mod expand;
pub mod mesh;
pub mod schedule;

pub use braid::{Braid, Orientation};
pub use distance::{CodeParams, P_TH, area_physical_qubits};
pub use error::{BraidError, BraidResult};
pub use event::{Phase, gate_latency};
pub use mesh::{LinkId, Mesh, NodeId};
pub use schedule::{BraidScheduler, ModuleStats, SchedulerConfig};
