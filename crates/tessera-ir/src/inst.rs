//! Tile-level instructions.
//!
//! The tile simulator runs over named qubits rather than dense indices:
//! teleport expansion mints fresh ancilla names (`<q>_epr1_<n>`,
//! `<q>_zero1_<n>`, ...) and the simulator creates qubits lazily on first
//! touch, inferring their kind from the name suffix.

use serde::{Deserialize, Serialize};

use crate::gate::GateKind;

/// Sub-location of a qubit within a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubLoc {
    /// Global memory partition.
    Global,
    /// Tile compute region.
    Tile,
    /// Teleport unit on the global-memory side.
    TuGlobal,
    /// Teleport unit on the tile side.
    TuTile,
    /// Local memory.
    Local,
}

impl SubLoc {
    /// Short name as used in schedule files and reports.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            SubLoc::Global => "G",
            SubLoc::Tile => "T",
            SubLoc::TuGlobal => "TU_G",
            SubLoc::TuTile => "TU_T",
            SubLoc::Local => "L",
        }
    }

    /// The teleport unit adjacent to this memory side.
    ///
    /// Only meaningful for [`SubLoc::Global`] and [`SubLoc::Tile`]; the
    /// teleport units and local memory map to themselves.
    #[inline]
    pub fn teleport_unit(self) -> SubLoc {
        match self {
            SubLoc::Global => SubLoc::TuGlobal,
            SubLoc::Tile => SubLoc::TuTile,
            other => other,
        }
    }

    /// Check if this is one of the two teleport-unit sub-locations.
    #[inline]
    pub fn is_teleport_unit(&self) -> bool {
        matches!(self, SubLoc::TuGlobal | SubLoc::TuTile)
    }
}

impl std::fmt::Display for SubLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical instruction as parsed from a leaf schedule, before teleport
/// and QEC expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalInst {
    /// Teleportation move of one qubit between tiles.
    Tmov {
        /// Scheduled timestep.
        ts: u32,
        /// Source tile (0 = unresolved global memory).
        src: u32,
        /// Destination tile (0 = unresolved global memory).
        dst: u32,
        /// Qubit name.
        qid: String,
    },
    /// Local-memory move; never leaves the tile.
    Bmov {
        /// Scheduled timestep.
        ts: u32,
        /// Source tile.
        src: u32,
        /// Source sub-location.
        src_sub: SubLoc,
        /// Destination tile.
        dst: u32,
        /// Destination sub-location.
        dst_sub: SubLoc,
        /// Qubit name.
        qid: String,
    },
    /// Gate scheduled in a SIMD zone.
    Op {
        /// Scheduled timestep.
        ts: u32,
        /// SIMD zone the op executes in.
        zone: u32,
        /// The operation.
        op: GateKind,
        /// Operand qubit names.
        qids: Vec<String>,
    },
}

impl LogicalInst {
    /// Check if this is a gate operation.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, LogicalInst::Op { .. })
    }
}

/// Payload of a physical instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysInstKind {
    /// Ballistic move between (tile, sub-location) endpoints.
    Bmov {
        /// Source tile.
        src: u32,
        /// Source sub-location.
        src_sub: SubLoc,
        /// Destination tile.
        dst: u32,
        /// Destination sub-location.
        dst_sub: SubLoc,
    },
    /// Gate executing in a zone.
    Op {
        /// Zone the op executes in.
        zone: u32,
        /// The operation.
        op: GateKind,
    },
}

/// A physical instruction: the unit the tile simulator executes.
///
/// Dispatch in the simulator hot loop is on [`PhysInstKind`]; the common
/// fields live here rather than behind virtual calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysInst {
    /// Sequence number, unique within the expanded leaf.
    pub seq: u32,
    /// Timestep inherited from the logical schedule.
    pub ts: u32,
    /// Operand qubit names (one for moves, one or two for ops).
    pub qids: Vec<String>,
    /// The payload.
    pub kind: PhysInstKind,
    /// Set while the instruction sits in the executing set.
    pub is_executing: bool,
    /// Set when all operand qubits have gone idle.
    pub is_complete: bool,
    /// True when no later instruction uses any operand of this one; the
    /// operand qubit is deleted on completion unless a teleport tuple still
    /// references it.
    pub no_child: bool,
}

impl PhysInst {
    /// Create a ballistic move.
    pub fn bmov(
        seq: u32,
        ts: u32,
        src: u32,
        src_sub: SubLoc,
        dst: u32,
        dst_sub: SubLoc,
        qid: String,
    ) -> Self {
        Self {
            seq,
            ts,
            qids: vec![qid],
            kind: PhysInstKind::Bmov {
                src,
                src_sub,
                dst,
                dst_sub,
            },
            is_executing: false,
            is_complete: false,
            no_child: false,
        }
    }

    /// Create a zone op.
    pub fn op(seq: u32, ts: u32, zone: u32, op: GateKind, qids: Vec<String>) -> Self {
        Self {
            seq,
            ts,
            qids,
            kind: PhysInstKind::Op { zone, op },
            is_executing: false,
            is_complete: false,
            no_child: false,
        }
    }

    /// Check if this is a ballistic move.
    #[inline]
    pub fn is_bmov(&self) -> bool {
        matches!(self.kind, PhysInstKind::Bmov { .. })
    }

    /// Check if this is a zone op.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self.kind, PhysInstKind::Op { .. })
    }
}

impl std::fmt::Display for PhysInst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PhysInstKind::Bmov {
                src,
                src_sub,
                dst,
                dst_sub,
            } => write!(
                f,
                "{} BMOV {src}|{src_sub} {dst}|{dst_sub} {}",
                self.seq, self.qids[0]
            ),
            PhysInstKind::Op { zone, op } => {
                write!(f, "{} {op} {zone}", self.seq)?;
                for q in &self.qids {
                    write!(f, " {q}")?;
                }
                Ok(())
            }
        }
    }
}

/// A call-graph instruction: one callee invocation in a non-leaf body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgInst {
    /// Sequence number within the non-leaf body.
    pub seq: u32,
    /// Scheduled timestep.
    pub ts: u32,
    /// Callee module name.
    pub callee: String,
    /// Argument register names (dependency tracking only).
    pub args: Vec<String>,
    /// True when the callee is a leaf module.
    pub is_leaf: bool,
}
