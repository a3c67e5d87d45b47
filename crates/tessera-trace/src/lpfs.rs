//! Leaf-schedule (`.lpfs`) parsing.
//!
//! ```text
//! Function <name> ... k <K> d <D>
//! TMOV <ts> <dst> <src> <qid>
//! BMOV <ts> <dst> <src> <qid>     (src or dst with a trailing 0 digit = local memory)
//! <ts>,<zone> <op> <q1> [<q2>]
//! ```

use rustc_hash::FxHashMap;
use tessera_ir::{Gate, GateKind, LogicalInst, SubLoc};

use crate::error::{TraceError, TraceResult};

/// One leaf's parsed schedule.
#[derive(Debug, Clone, Default)]
pub struct LpfsLeaf {
    /// Leaf module name.
    pub name: String,
    /// All instructions in schedule order, ops unfiltered.
    pub insts: Vec<LogicalInst>,
}

impl LpfsLeaf {
    /// The tile-simulator view: software-corrected Paulis and the
    /// factory-fed T gates drop out of the physical stream.
    pub fn tile_insts(&self) -> Vec<LogicalInst> {
        self.insts
            .iter()
            .filter(|inst| match inst {
                LogicalInst::Op { op, .. } => !matches!(
                    op,
                    GateKind::X | GateKind::Z | GateKind::T | GateKind::Tdag
                ),
                _ => true,
            })
            .cloned()
            .collect()
    }

    /// The braid-scheduler view: CNOTs (and Hs unless `cnot_only`) over
    /// dense qubit indices interned per leaf. Returns the gate list and the
    /// leaf's qubit count.
    pub fn braid_gates(&self, cnot_only: bool) -> (Vec<Gate>, u64) {
        let mut interned: FxHashMap<&str, u32> = FxHashMap::default();
        let mut gates = Vec::new();
        let mut seq = 1u32;
        for inst in &self.insts {
            let LogicalInst::Op { op, qids, .. } = inst else {
                continue;
            };
            let mut dense = Vec::with_capacity(qids.len());
            for q in qids {
                let next = interned.len() as u32;
                dense.push(*interned.entry(q.as_str()).or_insert(next));
            }
            if *op == GateKind::Cnot || (!cnot_only && *op == GateKind::H) {
                gates.push(Gate {
                    seq,
                    kind: *op,
                    qubits: dense,
                });
                seq += 1;
            }
        }
        (gates, interned.len() as u64)
    }

    /// Ops surviving the tile filter; sized against the frequency profile
    /// for the logical KQ.
    pub fn logical_op_count(&self) -> u64 {
        self.tile_insts().iter().filter(|i| i.is_op()).count() as u64
    }
}

/// A parsed `.lpfs` file.
#[derive(Debug, Clone, Default)]
pub struct LpfsFile {
    /// SIMD width from the first function header.
    pub simd_k: u32,
    /// Data-parallelism constraint from the first function header.
    pub simd_d: u32,
    /// Leaves in file order.
    pub leaves: Vec<LpfsLeaf>,
}

impl LpfsFile {
    /// Look up a leaf by name.
    pub fn leaf(&self, name: &str) -> Option<&LpfsLeaf> {
        self.leaves.iter().find(|l| l.name == name)
    }
}

/// Parse an `.lpfs` schedule.
pub fn parse_lpfs(text: &str) -> TraceResult<LpfsFile> {
    let mut file = LpfsFile::default();
    let mut current: Option<LpfsLeaf> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens[0] == "Function" {
            if let Some(leaf) = current.take() {
                file.leaves.push(leaf);
            }
            let name = tokens
                .get(1)
                .ok_or_else(|| TraceError::malformed(lineno, "Function header without a name"))?;
            if file.simd_k == 0 {
                file.simd_k = header_field(&tokens, "k", lineno)?;
                file.simd_d = header_field(&tokens, "d", lineno)?;
            }
            current = Some(LpfsLeaf {
                name: (*name).to_string(),
                insts: Vec::new(),
            });
            continue;
        }

        let Some(leaf) = current.as_mut() else {
            return Err(TraceError::malformed(
                lineno,
                "instruction before any Function header",
            ));
        };

        match tokens[0] {
            "TMOV" => {
                let (ts, dst, src, qid) = mov_fields(&tokens, lineno)?;
                leaf.insts.push(LogicalInst::Tmov { ts, src, dst, qid });
            }
            "BMOV" => {
                let (ts, dst, src, qid) = mov_fields(&tokens, lineno)?;
                // A trailing 0 digit marks the local-memory side.
                let (src, src_sub, dst, dst_sub) = if src % 10 == 0 {
                    (src / 10, SubLoc::Local, dst, SubLoc::Tile)
                } else if dst % 10 == 0 {
                    (src, SubLoc::Tile, dst / 10, SubLoc::Local)
                } else {
                    return Err(TraceError::malformed(
                        lineno,
                        "local-memory move has no local endpoint",
                    ));
                };
                leaf.insts.push(LogicalInst::Bmov {
                    ts,
                    src,
                    src_sub,
                    dst,
                    dst_sub,
                    qid,
                });
            }
            head if head.contains(',') => {
                let (ts_str, zone_str) = head.split_once(',').expect("checked for comma");
                let ts = parse_num(ts_str, lineno, "timestep")?;
                let zone = parse_num(zone_str, lineno, "zone")?;
                let op_name = tokens
                    .get(1)
                    .ok_or_else(|| TraceError::malformed(lineno, "scheduled op without a gate"))?;
                let op = GateKind::parse(op_name)
                    .map_err(|source| TraceError::BadGate { line: lineno, source })?;
                let qids: Vec<String> = tokens[2..].iter().map(|s| s.to_string()).collect();
                if qids.is_empty() {
                    return Err(TraceError::malformed(lineno, "op without operands"));
                }
                leaf.insts.push(LogicalInst::Op { ts, zone, op, qids });
            }
            _ => {
                // Unrecognised annotation lines are ignored, as upstream
                // emitters intersperse comments and summaries.
                tracing::trace!(line = lineno, "skipping unrecognised lpfs line");
            }
        }
    }
    if let Some(leaf) = current.take() {
        file.leaves.push(leaf);
    }
    Ok(file)
}

fn header_field(tokens: &[&str], key: &str, lineno: usize) -> TraceResult<u32> {
    let pos = tokens
        .iter()
        .position(|&t| t == key)
        .ok_or_else(|| TraceError::malformed(lineno, format!("header missing '{key}'")))?;
    let val = tokens
        .get(pos + 1)
        .ok_or_else(|| TraceError::malformed(lineno, format!("header '{key}' without value")))?;
    parse_num(val, lineno, key)
}

fn mov_fields(tokens: &[&str], lineno: usize) -> TraceResult<(u32, u32, u32, String)> {
    if tokens.len() < 5 {
        return Err(TraceError::malformed(lineno, "move needs ts, dst, src, qid"));
    }
    // The timestep slot sometimes carries a `ts,zone` pair.
    let ts_tok = tokens[1].split(',').next().unwrap_or(tokens[1]);
    let ts = parse_num(ts_tok, lineno, "timestep")?;
    let dst = parse_num(tokens[2], lineno, "destination")?;
    let src = parse_num(tokens[3], lineno, "source")?;
    Ok((ts, dst, src, tokens[4].to_string()))
}

fn parse_num(tok: &str, lineno: usize, what: &str) -> TraceResult<u32> {
    tok.parse()
        .map_err(|_| TraceError::malformed(lineno, format!("bad {what} '{tok}'")))
}
