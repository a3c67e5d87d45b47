//! Tiled-mesh ballistic-move simulator.
//!
//! Logical leaf schedules are lowered to physical instruction streams
//! (global-memory annotation, QEC ancilla injection, teleport/EPR
//! expansion), then executed cycle by cycle on a SIMD-K tile lattice with
//! ancilla factories. Qubits are created lazily on first touch, moves tick
//! down Manhattan-scaled countdowns, and teleports atomically swap the
//! relocated data qubit for its Bell-pair half on completion.

pub mod aggregate;
pub mod error;
pub mod expand;
pub mod layout;
pub mod metrics;
pub mod qubit;
pub mod sim;

pub use aggregate::{LEAF_SIMULATION_MAX, capped_leaf_sequence, ordered_leaf_sequence};
pub use error::{SimError, SimResult};
pub use expand::{LeafProgram, expand_leaf};
pub use layout::{FactoryModel, TileLayout, concatenation_level};
pub use metrics::Metrics;
pub use qubit::{QubitKind, QubitState, QubitTable, TileQubit};
pub use sim::{SimOutcome, SmoothingPolicy, TileSimulator};
