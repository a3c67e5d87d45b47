//! Logical → physical instruction expansion.
//!
//! Three passes per leaf: resolve distributed global memory (first-touch
//! partition tracking), inject a QEC ancilla block around each op and
//! mesh move, then rewrite every teleport move into its three ballistic
//! moves, four operations, and three return moves, consuming one Bell
//! pair. Sequence numbers are assigned once the stream is final, and the
//! dependency DAG gains the teleport fan-in edges that make the swap
//! atomic.

use rustc_hash::FxHashMap;
use tessera_ir::{DepDag, GateKind, LogicalInst, PhysInst, PhysInstKind, SubLoc};

use crate::error::{SimError, SimResult};
use crate::layout::TileLayout;

/// Counters shared across all leaves so ancilla names never collide.
#[derive(Debug, Default)]
pub struct ExpandContext {
    zero_count: u64,
    epr_count: u64,
}

/// A fully expanded leaf: the instruction stream the simulator executes.
#[derive(Debug, Clone)]
pub struct LeafProgram {
    /// Leaf module name.
    pub name: String,
    /// Physical instructions in program order; index equals sequence.
    pub insts: Vec<PhysInst>,
    /// Dependency DAG over sequence numbers.
    pub dag: DepDag,
    /// Teleport tuples: (data-move, epr1-move, epr2-move) sequences.
    pub tuples: Vec<(u32, u32, u32)>,
}

/// Expand one leaf's logical schedule.
pub fn expand_leaf(
    name: &str,
    insts: &[LogicalInst],
    layout: &TileLayout,
    ctx: &mut ExpandContext,
) -> SimResult<LeafProgram> {
    let annotated = annotate_global_memory(insts)?;
    let with_qec = add_qec(&annotated, layout, ctx);
    let (mut stream, tuples) = inject_epr(with_qec, layout, ctx)?;

    for (i, inst) in stream.iter_mut().enumerate() {
        inst.seq = i as u32;
    }
    let mut dag = DepDag::build(stream.iter().map(|i| (i.seq, i.qids.iter().cloned())));

    // A teleport retires only when all three of its final moves have; the
    // first downstream user of the relocated data also waits on the two
    // Bell-half moves.
    for &(data_seq, epr1_seq, epr2_seq) in &tuples {
        let data_qid = stream[data_seq as usize].qids[0].clone();
        if let Some(user) = stream[data_seq as usize + 1..]
            .iter()
            .find(|i| i.qids.contains(&data_qid))
        {
            dag.add_edge(epr2_seq, user.seq);
            dag.add_edge(epr1_seq, user.seq);
        }
    }

    for inst in &mut stream {
        inst.no_child = dag.out_degree(inst.seq) == 0;
    }

    tracing::debug!(
        leaf = name,
        logical = insts.len(),
        physical = stream.len(),
        teleports = tuples.len(),
        "expanded leaf"
    );
    Ok(LeafProgram {
        name: name.to_string(),
        insts: stream,
        dag,
        tuples,
    })
}

/// Resolve tile-0 (distributed global memory) endpoints by first-touch
/// partition tracking, turning every teleport move into a concrete
/// ballistic move between (tile, sub-location) endpoints.
fn annotate_global_memory(insts: &[LogicalInst]) -> SimResult<Vec<PhysInst>> {
    let mut partition: FxHashMap<&str, u32> = FxHashMap::default();
    let mut out = Vec::with_capacity(insts.len());

    for inst in insts {
        match inst {
            LogicalInst::Tmov { ts, src, dst, qid } => {
                let (mut src, mut dst) = (*src, *dst);
                let (src_sub, dst_sub);
                if src == 0 {
                    src_sub = SubLoc::Global;
                    dst_sub = SubLoc::Tile;
                    match partition.get(qid.as_str()) {
                        Some(&cur) => {
                            src = cur;
                            partition.insert(qid.as_str(), dst);
                        }
                        None => {
                            // Fresh qubit: map it to where it is first used.
                            partition.insert(qid.as_str(), dst);
                            src = dst;
                        }
                    }
                } else if dst == 0 {
                    src_sub = SubLoc::Tile;
                    dst_sub = SubLoc::Global;
                    match partition.get(qid.as_str()) {
                        Some(&cur) => dst = cur,
                        None => return Err(SimError::Untracked(qid.clone())),
                    }
                } else {
                    src_sub = SubLoc::Tile;
                    dst_sub = SubLoc::Tile;
                    match partition.get(qid.as_str()) {
                        Some(&cur) => {
                            if cur != src {
                                tracing::warn!(qid = qid.as_str(), cur, src, "qubit mis-tracked");
                            }
                            partition.insert(qid.as_str(), dst);
                        }
                        None => return Err(SimError::Untracked(qid.clone())),
                    }
                }
                out.push(PhysInst::bmov(0, *ts, src, src_sub, dst, dst_sub, qid.clone()));
            }
            LogicalInst::Bmov {
                ts,
                src,
                src_sub,
                dst,
                dst_sub,
                qid,
            } => out.push(PhysInst::bmov(
                0,
                *ts,
                *src,
                *src_sub,
                *dst,
                *dst_sub,
                qid.clone(),
            )),
            LogicalInst::Op { ts, zone, op, qids } => {
                out.push(PhysInst::op(0, *ts, *zone, *op, qids.clone()));
            }
        }
    }
    Ok(out)
}

/// Inject a QEC ancilla block after each op and each non-local move: per
/// data qubit, two fresh |0⟩ qubits fetched from a zero factory, the
/// six-op stabiliser pattern, and the return moves.
fn add_qec(insts: &[PhysInst], layout: &TileLayout, ctx: &mut ExpandContext) -> Vec<PhysInst> {
    let mut out = Vec::with_capacity(insts.len());
    for inst in insts {
        out.push(inst.clone());
        let (needed, loc, sub) = match inst.kind {
            PhysInstKind::Bmov {
                src_sub,
                dst,
                dst_sub,
                ..
            } => (
                src_sub != SubLoc::Local && dst_sub != SubLoc::Local,
                dst,
                dst_sub,
            ),
            PhysInstKind::Op { zone, .. } => (true, zone, SubLoc::Global),
        };
        if !needed {
            continue;
        }
        let ts = inst.ts;
        for i in 0..inst.qids.len() {
            ctx.zero_count += 1;
            let factory = layout.zero_factory_for(ctx.zero_count);
            let z1 = format!("{}_zero1_{}", inst.qids[0], ctx.zero_count);
            let z2 = format!("{}_zero2_{}", inst.qids[0], ctx.zero_count);

            out.push(PhysInst::bmov(0, ts, factory, SubLoc::Tile, loc, sub, z1.clone()));
            out.push(PhysInst::bmov(0, ts, factory, SubLoc::Tile, loc, sub, z2.clone()));
            out.push(PhysInst::op(0, ts, loc, GateKind::H, vec![z1.clone()]));
            out.push(PhysInst::op(
                0,
                ts,
                loc,
                GateKind::Cnot,
                vec![inst.qids[i].clone(), z1.clone()],
            ));
            out.push(PhysInst::op(0, ts, loc, GateKind::MeasZ, vec![z1.clone()]));
            out.push(PhysInst::op(0, ts, loc, GateKind::Cnot, vec![z2.clone()]));
            out.push(PhysInst::op(
                0,
                ts,
                loc,
                GateKind::H,
                vec![z2.clone(), inst.qids[i].clone()],
            ));
            out.push(PhysInst::op(0, ts, loc, GateKind::MeasZ, vec![z2.clone()]));
            out.push(PhysInst::bmov(0, ts, loc, sub, factory, SubLoc::Global, z1));
            out.push(PhysInst::bmov(0, ts, loc, sub, factory, SubLoc::Global, z2));
        }
    }
    out
}

/// Rewrite every teleport move into its physical translation, recording
/// the (data, epr1, epr2) final-move tuple for the simulator's swap scan.
fn inject_epr(
    insts: Vec<PhysInst>,
    layout: &TileLayout,
    ctx: &mut ExpandContext,
) -> SimResult<(Vec<PhysInst>, Vec<(u32, u32, u32)>)> {
    let mut out: Vec<PhysInst> = Vec::with_capacity(insts.len());
    let mut tuples = Vec::new();

    for inst in insts {
        let PhysInstKind::Bmov {
            src,
            src_sub,
            dst,
            dst_sub,
        } = inst.kind
        else {
            out.push(inst);
            continue;
        };

        // Local-memory traffic and zero/magic factory traffic moves
        // ballistically as-is.
        if src_sub == SubLoc::Local
            || dst_sub == SubLoc::Local
            || layout.is_zero_factory(src)
            || layout.is_zero_factory(dst)
            || layout.is_magic_factory(src)
            || layout.is_magic_factory(dst)
        {
            out.push(inst);
            continue;
        }

        let legal = (src_sub == SubLoc::Global && dst_sub == SubLoc::Tile)
            || (src_sub == SubLoc::Tile && dst_sub == SubLoc::Global && src == dst)
            || (src_sub == SubLoc::Tile && dst_sub == SubLoc::Tile);
        if !legal {
            return Err(SimError::IllegalTeleport(inst.qids[0].clone()));
        }

        ctx.epr_count += 1;
        let factory = layout.epr_factory_for(ctx.epr_count);
        let qid = inst.qids[0].clone();
        let e1 = format!("{qid}_epr1_{}", ctx.epr_count);
        let e2 = format!("{qid}_epr2_{}", ctx.epr_count);
        let ts = inst.ts;
        let src_tu = src_sub.teleport_unit();
        let dst_tu = dst_sub.teleport_unit();

        // Ballistic moves into the teleport units.
        out.push(PhysInst::bmov(0, ts, src, src_sub, src, src_tu, qid.clone()));
        out.push(PhysInst::bmov(0, ts, factory, SubLoc::Tile, src, src_tu, e1.clone()));
        out.push(PhysInst::bmov(0, ts, factory, SubLoc::Tile, dst, dst_tu, e2.clone()));
        // Bell measurement; the epr2 Pauli corrections happen in software.
        out.push(PhysInst::op(0, ts, src, GateKind::Cnot, vec![qid.clone(), e1.clone()]));
        out.push(PhysInst::op(0, ts, src, GateKind::H, vec![qid.clone()]));
        out.push(PhysInst::op(0, ts, src, GateKind::MeasZ, vec![qid.clone()]));
        out.push(PhysInst::op(0, ts, src, GateKind::MeasZ, vec![e1.clone()]));
        // Final moves; these three form the atomic-swap tuple.
        let epr2_seq = out.len() as u32;
        out.push(PhysInst::bmov(0, ts, dst, dst_tu, dst, dst_sub, e2));
        let epr1_seq = out.len() as u32;
        out.push(PhysInst::bmov(0, ts, src, src_tu, factory, SubLoc::Global, e1));
        let data_seq = out.len() as u32;
        out.push(PhysInst::bmov(0, ts, src, src_tu, factory, SubLoc::Global, qid));
        tuples.push((data_seq, epr1_seq, epr2_seq));
    }
    Ok((out, tuples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmov(ts: u32, src: u32, dst: u32, qid: &str) -> LogicalInst {
        LogicalInst::Tmov {
            ts,
            src,
            dst,
            qid: qid.into(),
        }
    }

    fn layout() -> TileLayout {
        TileLayout::new(4, 1024)
    }

    #[test]
    fn test_first_touch_mapping() {
        // Fresh qubit arriving from global memory maps to its first tile.
        let insts = vec![tmov(0, 0, 2, "a")];
        let out = annotate_global_memory(&insts).unwrap();
        let PhysInstKind::Bmov {
            src,
            src_sub,
            dst,
            dst_sub,
        } = out[0].kind
        else {
            panic!("expected move");
        };
        assert_eq!((src, dst), (2, 2));
        assert_eq!((src_sub, dst_sub), (SubLoc::Global, SubLoc::Tile));
    }

    #[test]
    fn test_return_to_global_uses_tracked_partition() {
        let insts = vec![tmov(0, 0, 2, "a"), tmov(1, 2, 0, "a")];
        let out = annotate_global_memory(&insts).unwrap();
        let PhysInstKind::Bmov { dst, dst_sub, .. } = out[1].kind else {
            panic!("expected move");
        };
        assert_eq!(dst, 2);
        assert_eq!(dst_sub, SubLoc::Global);
    }

    #[test]
    fn test_untracked_return_rejected() {
        let insts = vec![tmov(0, 2, 0, "a")];
        assert!(matches!(
            annotate_global_memory(&insts),
            Err(SimError::Untracked(_))
        ));
    }

    #[test]
    fn test_qec_block_shape() {
        let layout = layout();
        let mut ctx = ExpandContext::default();
        let insts = vec![PhysInst::op(0, 0, 1, GateKind::H, vec!["a".into()])];
        let out = add_qec(&insts, &layout, &mut ctx);
        // Original op + 2 fetch moves + 6 stabiliser ops + 2 return moves.
        assert_eq!(out.len(), 11);
        assert!(out[1].is_bmov());
        assert!(out[1].qids[0].contains("zero1"));
        assert!(out[2].qids[0].contains("zero2"));
        // Return moves head back to the zero factory.
        let PhysInstKind::Bmov { dst, .. } = out[9].kind else {
            panic!("expected recycle move");
        };
        assert!(layout.is_zero_factory(dst));
    }

    #[test]
    fn test_local_memory_move_gets_no_qec() {
        let layout = layout();
        let mut ctx = ExpandContext::default();
        let insts = vec![PhysInst::bmov(
            0,
            0,
            1,
            SubLoc::Tile,
            1,
            SubLoc::Local,
            "a".into(),
        )];
        let out = add_qec(&insts, &layout, &mut ctx);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_teleport_expansion_and_tuple() {
        let layout = layout();
        let mut ctx = ExpandContext::default();
        let insts = vec![PhysInst::bmov(
            0,
            0,
            1,
            SubLoc::Tile,
            3,
            SubLoc::Tile,
            "a".into(),
        )];
        let (out, tuples) = inject_epr(insts, &layout, &mut ctx).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(tuples.len(), 1);
        let (data, epr1, epr2) = tuples[0];
        assert_eq!((data, epr1, epr2), (9, 8, 7));
        assert_eq!(out[data as usize].qids[0], "a");
        assert!(out[epr1 as usize].qids[0].contains("epr1"));
        assert!(out[epr2 as usize].qids[0].contains("epr2"));
    }

    #[test]
    fn test_factory_moves_not_teleported() {
        let layout = layout();
        let mut ctx = ExpandContext::default();
        let insts = vec![PhysInst::bmov(
            0,
            0,
            layout.zero_factories[0],
            SubLoc::Tile,
            2,
            SubLoc::Tile,
            "a_zero1_1".into(),
        )];
        let (out, tuples) = inject_epr(insts, &layout, &mut ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert!(tuples.is_empty());
    }

    #[test]
    fn test_full_expansion_teleport_fan_in() {
        let layout = layout();
        let mut ctx = ExpandContext::default();
        // Teleport a into tile 3, then use it there.
        let insts = vec![
            tmov(0, 0, 3, "a"),
            LogicalInst::Op {
                ts: 1,
                zone: 3,
                op: GateKind::H,
                qids: vec!["a".into()],
            },
        ];
        let program = expand_leaf("leaf", &insts, &layout, &mut ctx).unwrap();
        let (data, epr1, epr2) = program.tuples[0];
        // The first user of the relocated data waits on all three final moves.
        let user = program.insts[data as usize + 1..]
            .iter()
            .find(|i| i.qids.contains(&"a".to_string()))
            .expect("downstream user exists")
            .seq;
        assert!(program.dag.successors(epr1).contains(&user));
        assert!(program.dag.successors(epr2).contains(&user));
        assert!(program.dag.successors(data).contains(&user));
        // The two Bell-half moves therefore have children.
        assert!(!program.insts[epr1 as usize].no_child);
        assert!(!program.insts[epr2 as usize].no_child);
    }
}
