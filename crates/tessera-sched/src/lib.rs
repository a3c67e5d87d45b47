//! Two-phase module scheduler.
//!
//! Leaf basic blocks are list-scheduled under the SIMD-k width constraint
//! and the d data-parallelism constraint, producing a Pareto front of
//! (width, length) rectangles per module. Non-leaf modules are then
//! composed coarsely: each callee is admitted into the current parallel
//! group when its widest fitting rectangle and the dependency window allow,
//! repacked against the group when the width budget is tight, or committed
//! serially otherwise.

pub mod coarse;
pub mod error;
pub mod leaf;
pub mod profile;

pub use coarse::{CoarseScheduler, schedule_program};
pub use error::{SchedError, SchedResult};
pub use leaf::{LeafOp, schedule_leaf};
pub use profile::{ModuleProfile, Rect};
