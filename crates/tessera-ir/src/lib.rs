//! Tessera instruction representation
//!
//! This crate provides the shared data structures for the Tessera resource
//! simulator: logical gates, tile-level instructions, and the
//! sequence-numbered dependency DAG that both the braid scheduler and the
//! tile simulator execute against.
//!
//! # Overview
//!
//! A compiled program reaches Tessera as a set of *leaf* basic blocks (flat
//! gate lists) plus a call graph of non-leaf modules. Per leaf, gates are
//! numbered in program order and a [`DepDag`] records which gate must retire
//! before which. The same DAG type serves the physical instruction stream
//! after teleport/QEC expansion, where operands are interned qubit names
//! rather than dense indices.
//!
//! # Core Components
//!
//! - **Gates**: [`GateKind`] for the intrinsic op set, [`Gate`] for a
//!   sequence-numbered gate over dense qubit indices
//! - **Instructions**: [`PhysInst`] (ballistic move / zone op) and
//!   [`LogicalInst`] (pre-expansion form), [`CgInst`] for call-graph bodies
//! - **Dependencies**: [`DepDag`] keyed by sequence number, with
//!   last-user edge construction and critical-path queries

pub mod dag;
pub mod error;
pub mod gate;
pub mod inst;

pub use dag::DepDag;
pub use error::{IrError, IrResult};
pub use gate::{Gate, GateKind};
pub use inst::{CgInst, LogicalInst, PhysInst, PhysInstKind, SubLoc};
