//! Logical gate types.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// The intrinsic op set understood by the schedulers and simulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    /// Prepare |0⟩.
    PrepZ,
    /// Pauli-X gate.
    X,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// Controlled-NOT gate.
    Cnot,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdag,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdag,
    /// Z-basis measurement.
    MeasZ,
}

impl GateKind {
    /// All intrinsic kinds, in canonical order.
    pub const ALL: [GateKind; 10] = [
        GateKind::PrepZ,
        GateKind::X,
        GateKind::Z,
        GateKind::H,
        GateKind::Cnot,
        GateKind::T,
        GateKind::Tdag,
        GateKind::S,
        GateKind::Sdag,
        GateKind::MeasZ,
    ];

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            GateKind::PrepZ => "PrepZ",
            GateKind::X => "X",
            GateKind::Z => "Z",
            GateKind::H => "H",
            GateKind::Cnot => "CNOT",
            GateKind::T => "T",
            GateKind::Tdag => "Tdag",
            GateKind::S => "S",
            GateKind::Sdag => "Sdag",
            GateKind::MeasZ => "MeasZ",
        }
    }

    /// Parse a gate name as it appears in the schedule files.
    pub fn parse(name: &str) -> IrResult<Self> {
        match name {
            "PrepZ" => Ok(GateKind::PrepZ),
            "X" => Ok(GateKind::X),
            "Z" => Ok(GateKind::Z),
            "H" => Ok(GateKind::H),
            "CNOT" => Ok(GateKind::Cnot),
            "T" => Ok(GateKind::T),
            "Tdag" => Ok(GateKind::Tdag),
            "S" => Ok(GateKind::S),
            "Sdag" => Ok(GateKind::Sdag),
            "MeasZ" => Ok(GateKind::MeasZ),
            other => Err(IrError::UnknownGate(other.to_string())),
        }
    }

    /// Number of qubit operands this gate takes.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Cnot => 2,
            _ => 1,
        }
    }

    /// Physical latency of the transversal implementation, in cycles.
    ///
    /// These delays size the ancilla-factory pipelines and the per-op
    /// countdowns in the tile simulator.
    #[inline]
    pub fn op_delay(&self) -> u64 {
        match self {
            GateKind::Cnot | GateKind::MeasZ => 10,
            _ => 1,
        }
    }

    /// Check if this is a T or T-dagger gate (magic-state consumer).
    #[inline]
    pub fn is_t(&self) -> bool {
        matches!(self, GateKind::T | GateKind::Tdag)
    }

    /// Check if this is a measurement.
    #[inline]
    pub fn is_measure(&self) -> bool {
        matches!(self, GateKind::MeasZ)
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A sequence-numbered gate over dense per-module qubit indices.
///
/// Sequence numbers are assigned in program order and are unique within one
/// leaf module. A gate is immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Program-order sequence number, unique within the module.
    pub seq: u32,
    /// The operation.
    pub kind: GateKind,
    /// Dense qubit indices in `[0, module_qubit_count)`.
    pub qubits: Vec<u32>,
}

impl Gate {
    /// Create a gate, validating operand arity.
    pub fn new(seq: u32, kind: GateKind, qubits: Vec<u32>) -> IrResult<Self> {
        let expected = kind.num_qubits();
        let got = qubits.len() as u32;
        if expected != got {
            return Err(IrError::OperandCountMismatch {
                gate: kind.name(),
                expected,
                got,
            });
        }
        Ok(Self { seq, kind, qubits })
    }

    /// Create a single-qubit gate.
    pub fn one(seq: u32, kind: GateKind, q: u32) -> Self {
        Self {
            seq,
            kind,
            qubits: vec![q],
        }
    }

    /// Create a two-qubit gate.
    pub fn two(seq: u32, kind: GateKind, q1: u32, q2: u32) -> Self {
        Self {
            seq,
            kind,
            qubits: vec![q1, q2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for kind in GateKind::ALL {
            assert_eq!(GateKind::parse(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            GateKind::parse("Toffoli"),
            Err(IrError::UnknownGate(_))
        ));
    }

    #[test]
    fn test_arity_checked() {
        let err = Gate::new(1, GateKind::Cnot, vec![0]);
        assert!(matches!(
            err,
            Err(IrError::OperandCountMismatch {
                gate: "CNOT",
                expected: 2,
                got: 1,
            })
        ));
        assert!(Gate::new(1, GateKind::H, vec![0]).is_ok());
    }

    #[test]
    fn test_delays() {
        assert_eq!(GateKind::Cnot.op_delay(), 10);
        assert_eq!(GateKind::MeasZ.op_delay(), 10);
        assert_eq!(GateKind::H.op_delay(), 1);
        assert!(GateKind::Tdag.is_t());
        assert!(!GateKind::S.is_t());
    }
}
