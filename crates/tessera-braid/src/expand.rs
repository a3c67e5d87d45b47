//! Gate → event expansion.
//!
//! A CNOT opens and closes seven braids over the lifetime of the gate; an H
//! holds its qubit's two long-side links for the gate duration. The close
//! events reuse the open events' braids with small adjustments (a node kept
//! here, a link dropped there), so the whole pipeline is built up front and
//! the adjustments are applied to cloned braids.

use std::collections::VecDeque;

use tessera_ir::{Gate, GateKind};

use crate::braid::{Braid, Orientation};
use crate::event::{Event, Phase};
use crate::mesh::{Mesh, NodeId};

/// Ancilla-corner selection for a CNOT.
///
/// Adjacent qubits use the two corners of the source on the side nearest
/// the destination; otherwise the top corners when the destination is
/// below the source, the bottom corners when it is above.
pub fn cnot_ancillas(mesh: &Mesh, src: u32, dst: u32) -> (NodeId, NodeId) {
    let c = mesh.corners(src);
    if mesh.are_adjacent(src, dst) {
        if src < dst { (c.tl, c.bl) } else { (c.tr, c.br) }
    } else if src / mesh.cols() < dst / mesh.cols() {
        (c.tr, c.tl)
    } else {
        (c.bl, c.br)
    }
}

/// The two routes of a CNOT between `src` and `dst`, anchored at `anc1`.
pub fn cnot_routes(
    mesh: &Mesh,
    src: u32,
    dst: u32,
    anc1: NodeId,
    orientation: Orientation,
) -> (Braid, Braid) {
    if mesh.are_adjacent(src, dst) {
        // Long-edge adjacent qubits share a lattice column; both routes run
        // through the shared corners directly.
        let middle_near = mesh.horizontal(src, anc1);
        let middle_far = mesh.diagonal(src, anc1);
        let dst_far = mesh.horizontal(dst, middle_far);

        let l1 = mesh.link_between(anc1, mesh.vertical(src, anc1));
        let l2 = mesh.link_between(middle_near, middle_far);
        let l3 = mesh.link_between(dst_far, mesh.vertical(dst, dst_far));
        let route1 = Braid {
            nodes: vec![dst_far],
            links: vec![l1, l2, l3],
        };

        let l4 = mesh.link_between(dst_far, middle_far);
        let route2 = Braid {
            nodes: vec![middle_far, mesh.vertical(src, anc1)],
            links: vec![l4, l2, l1],
        };
        (route1, route2)
    } else {
        let diag_anc1 = mesh.diagonal(src, anc1);
        let near_dst = mesh.nearest(dst, diag_anc1);

        let route1 = Braid::s_braid(mesh, src, anc1)
            .merge(Braid::dor(mesh, diag_anc1, near_dst, orientation))
            .merge(Braid::s_braid(mesh, dst, near_dst));

        let vert_anc1 = mesh.vertical(src, anc1);
        let route2 = Braid::short_l(mesh, dst, mesh.diagonal(dst, near_dst))
            .merge(Braid::dor(mesh, near_dst, vert_anc1, orientation))
            .merge(Braid::s_braid(mesh, src, vert_anc1));
        (route1, route2)
    }
}

/// Expand a CNOT into its seven-event queue.
pub fn events_cnot(mesh: &Mesh, seq: u32, src: u32, dst: u32) -> VecDeque<Event> {
    let (anc1, anc2) = cnot_ancillas(mesh, src, dst);
    let anc_link = mesh.link_between(anc1, anc2);
    let mut anc_route = Braid {
        nodes: vec![anc1, anc2],
        links: vec![anc_link],
    };
    let (route1, route2) = cnot_routes(mesh, src, dst, anc1, Orientation::Xy);

    let mut events = VecDeque::with_capacity(7);
    // Open the ancilla corners and their link immediately.
    events.push_back(Event::new(anc_route.clone(), true, seq, Phase::Cnot1, 1));
    // Close just the ancilla link, keeping the two anchor nodes.
    anc_route.nodes.clear();
    events.push_back(Event::new(anc_route.clone(), false, seq, Phase::Cnot2, -1));
    events.push_back(Event::new(route1.clone(), true, seq, Phase::Cnot3, -1));
    // Close route 1 with its final node swapped for anc1.
    let mut r1 = route1;
    let n_last = r1.nodes.pop().expect("route 1 ends on a node");
    r1.nodes.push(anc1);
    events.push_back(Event::new(r1, false, seq, Phase::Cnot4, -1));
    // Open route 2 without its final node.
    let mut r2 = route2;
    r2.nodes.pop();
    events.push_back(Event::new(r2.clone(), true, seq, Phase::Cnot5, -1));
    // Close route 2 with route 1's final node restored and its last link
    // deferred to the ancilla close.
    r2.nodes.push(n_last);
    let l_anc = r2.links.pop().expect("route 2 ends on a link");
    events.push_back(Event::new(r2, false, seq, Phase::Cnot6, -1));
    // Close what remains of the ancillas.
    anc_route.links.clear();
    anc_route.links.push(l_anc);
    anc_route.nodes.push(anc2);
    events.push_back(Event::new(anc_route, false, seq, Phase::Cnot7, -1));
    events
}

/// Expand an H into its two-event queue.
pub fn events_h(mesh: &Mesh, seq: u32, q: u32) -> VecDeque<Event> {
    let c = mesh.corners(q);
    let braid = Braid {
        nodes: vec![],
        links: vec![mesh.link_between(c.tl, c.bl), mesh.link_between(c.tr, c.br)],
    };
    let mut events = VecDeque::with_capacity(2);
    events.push_back(Event::new(braid.clone(), true, seq, Phase::H1, 1));
    events.push_back(Event::new(braid, false, seq, Phase::H2, -1));
    events
}

/// Expand any schedulable gate.
pub fn expand_gate(mesh: &Mesh, gate: &Gate) -> VecDeque<Event> {
    match gate.kind {
        GateKind::Cnot => events_cnot(mesh, gate.seq, gate.qubits[0], gate.qubits[1]),
        GateKind::H => events_h(mesh, gate.seq, gate.qubits[0]),
        _ => VecDeque::new(),
    }
}

/// Rewrite a conflicting cnot3/cnot5 open event (and its paired close,
/// which is the current queue head) to use YX dimension ordering.
///
/// Adjacent qubits have no DOR segment to rotate and are left unchanged.
pub fn reroute_yx(mesh: &Mesh, src: u32, dst: u32, event: &mut Event, pair_close: &mut Event) {
    if mesh.are_adjacent(src, dst) {
        return;
    }
    let (anc1, _) = cnot_ancillas(mesh, src, dst);
    match event.phase {
        Phase::Cnot3 => {
            let (mut r1, _) = cnot_routes(mesh, src, dst, anc1, Orientation::Yx);
            event.braid = r1.clone();
            r1.nodes.pop();
            r1.nodes.push(anc1);
            pair_close.braid = r1;
        }
        Phase::Cnot5 => {
            let (_, mut r2) = cnot_routes(mesh, src, dst, anc1, Orientation::Yx);
            r2.nodes.pop();
            event.braid = r2.clone();
            let n_last = *pair_close
                .braid
                .nodes
                .last()
                .expect("cnot6 braid retains route 1's final node");
            r2.nodes.push(n_last);
            r2.links.pop();
            pair_close.braid = r2;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cnot_expands_to_seven_phases() {
        let mesh = Mesh::new(2, 2);
        let events = events_cnot(&mesh, 1, 0, 3);
        let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Cnot1,
                Phase::Cnot2,
                Phase::Cnot3,
                Phase::Cnot4,
                Phase::Cnot5,
                Phase::Cnot6,
                Phase::Cnot7,
            ]
        );
        // Only the head event starts ticking.
        assert_eq!(events[0].timer, 1);
        assert!(events.iter().skip(1).all(|e| e.timer == -1));
        // Open/close alternation per the pipeline.
        let opens: Vec<bool> = events.iter().map(|e| e.open).collect();
        assert_eq!(opens, vec![true, false, true, false, true, false, false]);
    }

    #[test]
    fn test_ancilla_selection() {
        let mesh = Mesh::new(2, 2);
        // 0 and 1 are row-adjacent: side corners of the source.
        let c0 = mesh.corners(0);
        assert_eq!(cnot_ancillas(&mesh, 0, 1), (c0.tl, c0.bl));
        assert_eq!(cnot_ancillas(&mesh, 1, 0), {
            let c1 = mesh.corners(1);
            (c1.tr, c1.br)
        });
        // 0 -> 3 goes down a row: top corners.
        assert_eq!(cnot_ancillas(&mesh, 0, 3), (c0.tr, c0.tl));
        // 3 -> 0 goes up: bottom corners.
        let c3 = mesh.corners(3);
        assert_eq!(cnot_ancillas(&mesh, 3, 0), (c3.bl, c3.br));
    }

    #[test]
    fn test_h_holds_long_side_links() {
        let mesh = Mesh::new(2, 2);
        let events = events_h(&mesh, 1, 0);
        assert_eq!(events.len(), 2);
        let c = mesh.corners(0);
        assert_eq!(
            events[0].braid.links,
            vec![mesh.link_between(c.tl, c.bl), mesh.link_between(c.tr, c.br)]
        );
        assert!(events[0].braid.nodes.is_empty());
        assert_eq!(events[0].braid, events[1].braid);
    }

    #[test]
    fn test_reroute_rewrites_open_and_close() {
        let mesh = Mesh::new(3, 3);
        // 0 -> 8 is far enough for a real DOR segment.
        let mut events = events_cnot(&mesh, 1, 0, 8);
        let mut cnot4 = events.remove(3).unwrap();
        let mut cnot3 = events.remove(2).unwrap();
        let before = cnot3.braid.clone();
        reroute_yx(&mesh, 0, 8, &mut cnot3, &mut cnot4);
        assert_ne!(cnot3.braid, before);
        // The close still retains anc1 in place of the final node.
        let (anc1, _) = cnot_ancillas(&mesh, 0, 8);
        assert_eq!(cnot4.braid.nodes.last(), Some(&anc1));
    }

    #[test]
    fn test_reroute_noop_for_adjacent() {
        let mesh = Mesh::new(2, 2);
        let mut events = events_cnot(&mesh, 1, 0, 1);
        let mut cnot4 = events.remove(3).unwrap();
        let mut cnot3 = events.remove(2).unwrap();
        let before = cnot3.braid.clone();
        reroute_yx(&mesh, 0, 1, &mut cnot3, &mut cnot4);
        assert_eq!(cnot3.braid, before);
    }
}
