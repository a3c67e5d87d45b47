//! Schedule-trace I/O.
//!
//! Parses the three line-oriented inputs a compiled benchmark ships with
//! (`.lpfs` leaf schedules, `.freq` module frequencies, `.cg` call-graph
//! schedule), the `.tr`/`.opt.tr` placement-optimiser exchange format, and
//! emits the `.kq`/`.usage`/`.ages`/`.storage` reports.

pub mod cg;
pub mod error;
pub mod freq;
pub mod lpfs;
pub mod report;
pub mod tr;

pub use cg::{CgFile, parse_cg};
pub use error::{TraceError, TraceResult};
pub use freq::parse_freq;
pub use lpfs::{LpfsFile, LpfsLeaf, parse_lpfs};
pub use report::{
    KqReport, braid_report_name, render_ages, render_storage, render_usage, route_report_name,
    smoothing_suffix,
};
pub use tr::{parse_tr, write_tr};
