//! Live qubit state for the tile simulator.

use rustc_hash::FxHashMap;
use tessera_ir::SubLoc;

use crate::error::{SimError, SimResult};

/// What a named qubit holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QubitKind {
    /// Program data.
    Data,
    /// Source-side half of a Bell pair.
    Epr1,
    /// Destination-side half of a Bell pair.
    Epr2,
    /// Logical |0⟩ ancilla.
    Zero,
    /// Magic (T) state.
    Magic,
}

impl QubitKind {
    /// Infer the kind from the id's minting suffix.
    pub fn infer(id: &str) -> Self {
        if id.contains("epr1") {
            QubitKind::Epr1
        } else if id.contains("epr2") {
            QubitKind::Epr2
        } else if id.contains("zero") {
            QubitKind::Zero
        } else if id.contains("magic") {
            QubitKind::Magic
        } else {
            QubitKind::Data
        }
    }

    /// Check if this is factory-produced ancilla state.
    #[inline]
    pub fn is_ancilla(&self) -> bool {
        !matches!(self, QubitKind::Data)
    }

    /// Name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            QubitKind::Data => "data",
            QubitKind::Epr1 => "epr1",
            QubitKind::Epr2 => "epr2",
            QubitKind::Zero => "zero",
            QubitKind::Magic => "magic",
        }
    }
}

/// Check whether a qubit name denotes factory ancilla state.
pub fn is_ancilla_name(id: &str) -> bool {
    id.contains("zero") || id.contains("epr") || id.contains("magic")
}

/// Execution state of a live qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QubitState {
    /// Parked.
    Idle,
    /// Held by an executing op.
    InOp,
    /// Ballistically moving.
    InMov,
}

/// One live qubit.
#[derive(Debug, Clone)]
pub struct TileQubit {
    /// Interned name.
    pub id: String,
    /// What the qubit holds.
    pub kind: QubitKind,
    /// Cycles since creation.
    pub age: u64,
    /// Current tile.
    pub loc: u32,
    /// Current sub-location within the tile.
    pub sub_loc: SubLoc,
    /// Execution state.
    pub state: QubitState,
    /// Remaining op cycles while `InOp`.
    pub op_time_remaining: u64,
    /// Remaining routing cycles while `InMov`.
    pub route_countdown: u64,
    /// Move destination tile.
    pub dest: u32,
    /// Move destination sub-location.
    pub dest_sub: SubLoc,
}

impl TileQubit {
    /// Create an idle qubit at a location, inferring its kind from the id.
    pub fn at(id: impl Into<String>, loc: u32, sub_loc: SubLoc) -> Self {
        let id = id.into();
        let kind = QubitKind::infer(&id);
        Self {
            id,
            kind,
            age: 0,
            loc,
            sub_loc,
            state: QubitState::Idle,
            op_time_remaining: 0,
            route_countdown: 0,
            dest: loc,
            dest_sub: sub_loc,
        }
    }
}

/// The live-qubit table for one simulation.
///
/// One entry per id; destruction records the qubit's final age for the
/// ages report.
#[derive(Debug, Default)]
pub struct QubitTable {
    map: FxHashMap<String, TileQubit>,
    ages: FxHashMap<String, u64>,
}

impl QubitTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh qubit. Creating an id twice is an expansion bug.
    pub fn create(&mut self, qubit: TileQubit) -> SimResult<()> {
        if self.map.contains_key(&qubit.id) {
            return Err(SimError::QubitExists(qubit.id));
        }
        self.map.insert(qubit.id.clone(), qubit);
        Ok(())
    }

    /// Destroy a qubit, recording its final age.
    pub fn destroy(&mut self, id: &str) -> Option<TileQubit> {
        let q = self.map.remove(id)?;
        self.ages.insert(id.to_string(), q.age);
        Some(q)
    }

    /// Look up a live qubit.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&TileQubit> {
        self.map.get(id)
    }

    /// Look up a live qubit mutably.
    #[inline]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut TileQubit> {
        self.map.get_mut(id)
    }

    /// Check liveness.
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// Number of live qubits.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if no qubits are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over live qubits.
    pub fn iter(&self) -> impl Iterator<Item = &TileQubit> {
        self.map.values()
    }

    /// Age every live qubit by one cycle.
    pub fn age_all(&mut self) {
        for q in self.map.values_mut() {
            q.age += 1;
        }
    }

    /// Recorded final ages of destroyed qubits.
    pub fn recorded_ages(&self) -> &FxHashMap<String, u64> {
        &self.ages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_inference() {
        assert_eq!(QubitKind::infer("a1"), QubitKind::Data);
        assert_eq!(QubitKind::infer("a1_epr1_7"), QubitKind::Epr1);
        assert_eq!(QubitKind::infer("a1_epr2_7"), QubitKind::Epr2);
        assert_eq!(QubitKind::infer("a1_zero2_12"), QubitKind::Zero);
        assert_eq!(QubitKind::infer("t_magic_3"), QubitKind::Magic);
        assert!(is_ancilla_name("a1_zero1_1"));
        assert!(!is_ancilla_name("a1"));
    }

    #[test]
    fn test_double_create_rejected() {
        let mut table = QubitTable::new();
        table
            .create(TileQubit::at("a1", 1, SubLoc::Tile))
            .unwrap();
        assert!(matches!(
            table.create(TileQubit::at("a1", 2, SubLoc::Tile)),
            Err(SimError::QubitExists(_))
        ));
    }

    #[test]
    fn test_destroy_records_age() {
        let mut table = QubitTable::new();
        table
            .create(TileQubit::at("a1_zero1_1", 1, SubLoc::Tile))
            .unwrap();
        table.age_all();
        table.age_all();
        table.destroy("a1_zero1_1").unwrap();
        assert_eq!(table.recorded_ages()["a1_zero1_1"], 2);
        assert!(table.is_empty());
    }
}
