//! Call-graph schedule (`.cg`) parsing.
//!
//! Blocks of body lines (`<callee> <ts> <arg>…`) are terminated by a
//! summary line `SIMD k=<k> d=<d> <module> <size> <leaf_flag>`. A leaf
//! flag of 1 registers a leaf; 0 attaches the preceding body to the named
//! non-leaf.

use rustc_hash::FxHashMap;
use tessera_ir::CgInst;

use crate::error::{TraceError, TraceResult};

/// A parsed `.cg` file.
#[derive(Debug, Clone, Default)]
pub struct CgFile {
    /// Non-leaf bodies in file order.
    pub bodies: Vec<(String, Vec<CgInst>)>,
    /// Leaf module names in file order.
    pub leaves: Vec<String>,
    /// SIMD parameters from the first summary line.
    pub simd_k: u32,
    /// Data-parallelism constraint from the first summary line.
    pub simd_d: u32,
}

impl CgFile {
    /// Bodies as a map for call-graph traversal.
    pub fn body_map(&self) -> FxHashMap<String, Vec<CgInst>> {
        self.bodies.iter().cloned().collect()
    }
}

/// Parse a `.cg` schedule.
pub fn parse_cg(text: &str) -> TraceResult<CgFile> {
    let mut file = CgFile::default();
    let mut body: Vec<CgInst> = Vec::new();
    let mut seq = 0u32;

    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("SIMD") {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 6 {
                return Err(TraceError::malformed(lineno, "short SIMD summary line"));
            }
            if file.simd_k == 0 {
                file.simd_k = kv_number(tokens[1], "k", lineno)?;
                file.simd_d = kv_number(tokens[2], "d", lineno)?;
            }
            let module = tokens[3].to_string();
            let is_leaf = tokens[5]
                .parse::<u32>()
                .map_err(|_| TraceError::malformed(lineno, "bad leaf flag"))?
                != 0;
            if is_leaf {
                file.leaves.push(module);
            } else {
                if body.is_empty() {
                    return Err(TraceError::malformed(
                        lineno,
                        format!("non-leaf '{module}' has no preceding body"),
                    ));
                }
                file.bodies.push((module, std::mem::take(&mut body)));
            }
            body.clear();
            seq = 0;
            continue;
        }

        // Body line: callee, timestep, argument registers. Compiler
        // intrinsic shims (llvm.*) never reach the simulator.
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let callee = tokens[0];
        if callee.starts_with("llvm.") {
            continue;
        }
        let ts = tokens
            .get(1)
            .and_then(|t| t.parse::<u32>().ok())
            .unwrap_or(0);
        let args: Vec<String> = tokens[2..]
            .iter()
            .map(|t| t.split('(').next().unwrap_or(t).to_string())
            .collect();
        body.push(CgInst {
            seq,
            ts,
            callee: callee.to_string(),
            args,
            is_leaf: file.leaves.iter().any(|l| l == callee),
        });
        seq += 1;
    }
    Ok(file)
}

fn kv_number(token: &str, key: &str, lineno: usize) -> TraceResult<u32> {
    let val = token
        .strip_prefix(key)
        .and_then(|t| t.strip_prefix('='))
        .ok_or_else(|| TraceError::malformed(lineno, format!("expected {key}=<n>")))?;
    val.parse()
        .map_err(|_| TraceError::malformed(lineno, format!("bad {key} value '{val}'")))
}
