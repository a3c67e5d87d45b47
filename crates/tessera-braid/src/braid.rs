//! Braid geometry: the node/link sets reserved by one phase of a gate.

use crate::mesh::{LinkId, Mesh, NodeId};

/// Dimension order used by the fallback router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Rows first, then columns.
    Xy,
    /// Columns first, then rows.
    Yx,
}

/// An ordered set of nodes and links forming one reserved shape.
///
/// Braids are transient: built at gate-expansion time, consumed by events.
/// They compose by concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Braid {
    /// Reserved nodes, in construction order.
    pub nodes: Vec<NodeId>,
    /// Reserved links, in construction order.
    pub links: Vec<LinkId>,
}

impl Braid {
    /// Concatenate two braids.
    pub fn merge(mut self, other: Braid) -> Braid {
        self.nodes.extend(other.nodes);
        self.links.extend(other.links);
        self
    }

    /// An 'S' through qubit `q` starting from corner `src`: the two
    /// opposite-side links plus the diagonal node.
    pub fn s_braid(mesh: &Mesh, q: u32, src: NodeId) -> Braid {
        let diag = mesh.diagonal(q, src);
        Braid {
            nodes: vec![diag],
            links: vec![
                mesh.link_between(src, mesh.vertical(q, src)),
                mesh.link_between(diag, mesh.horizontal(q, src)),
            ],
        }
    }

    /// A 'short L' around qubit `q` starting from corner `src`: short side
    /// first, then the long side, recording both traversed nodes.
    pub fn short_l(mesh: &Mesh, q: u32, src: NodeId) -> Braid {
        let horiz = mesh.horizontal(q, src);
        let diag = mesh.diagonal(q, src);
        Braid {
            nodes: vec![horiz, diag],
            links: vec![mesh.link_between(src, horiz), mesh.link_between(horiz, diag)],
        }
    }

    /// Dimension-ordered route from `src` to `dst`; records every traversed
    /// node and link but not `src` itself.
    pub fn dor(mesh: &Mesh, src: NodeId, dst: NodeId, orientation: Orientation) -> Braid {
        let cols = mesh.cols() + 1;
        let (mut row, mut col) = (src.0 / cols, src.0 % cols);
        let (dst_row, dst_col) = (dst.0 / cols, dst.0 % cols);

        let mut route = Braid::default();
        let mut cur = src;
        match orientation {
            Orientation::Yx => {
                route.walk_cols(mesh, &mut cur, row, &mut col, dst_col);
                route.walk_rows(mesh, &mut cur, &mut row, col, dst_row);
            }
            Orientation::Xy => {
                route.walk_rows(mesh, &mut cur, &mut row, col, dst_row);
                route.walk_cols(mesh, &mut cur, row, &mut col, dst_col);
            }
        }
        route
    }

    fn step(&mut self, mesh: &Mesh, cur: &mut NodeId, row: u32, col: u32) {
        let next = mesh.node_at(row, col);
        self.nodes.push(next);
        self.links.push(mesh.link_between(*cur, next));
        *cur = next;
    }

    fn walk_rows(&mut self, mesh: &Mesh, cur: &mut NodeId, row: &mut u32, col: u32, dst: u32) {
        while *row != dst {
            *row = if *row < dst { *row + 1 } else { *row - 1 };
            self.step(mesh, cur, *row, col);
        }
    }

    fn walk_cols(&mut self, mesh: &Mesh, cur: &mut NodeId, row: u32, col: &mut u32, dst: u32) {
        while *col != dst {
            *col = if *col < dst { *col + 1 } else { *col - 1 };
            self.step(mesh, cur, row, *col);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s_braid_shape() {
        let mesh = Mesh::new(2, 2);
        let c = mesh.corners(0);
        let s = Braid::s_braid(&mesh, 0, c.tl);
        assert_eq!(s.nodes, vec![c.br]);
        assert_eq!(s.links.len(), 2);
        assert_eq!(s.links[0], mesh.link_between(c.tl, c.bl));
        assert_eq!(s.links[1], mesh.link_between(c.br, c.tr));
    }

    #[test]
    fn test_short_l_shape() {
        let mesh = Mesh::new(2, 2);
        let c = mesh.corners(0);
        let l = Braid::short_l(&mesh, 0, c.tl);
        assert_eq!(l.nodes, vec![c.tr, c.br]);
        assert_eq!(l.links[0], mesh.link_between(c.tl, c.tr));
        assert_eq!(l.links[1], mesh.link_between(c.tr, c.br));
    }

    #[test]
    fn test_dor_xy_vs_yx() {
        let mesh = Mesh::new(3, 3);
        let src = mesh.node_at(0, 0);
        let dst = mesh.node_at(2, 2);

        let xy = Braid::dor(&mesh, src, dst, Orientation::Xy);
        // Rows first: (1,0), (2,0), then (2,1), (2,2).
        assert_eq!(
            xy.nodes,
            vec![
                mesh.node_at(1, 0),
                mesh.node_at(2, 0),
                mesh.node_at(2, 1),
                mesh.node_at(2, 2),
            ]
        );
        assert_eq!(xy.links.len(), 4);

        let yx = Braid::dor(&mesh, src, dst, Orientation::Yx);
        assert_eq!(
            yx.nodes,
            vec![
                mesh.node_at(0, 1),
                mesh.node_at(0, 2),
                mesh.node_at(1, 2),
                mesh.node_at(2, 2),
            ]
        );
    }

    #[test]
    fn test_dor_degenerate() {
        let mesh = Mesh::new(2, 2);
        let n = mesh.node_at(1, 1);
        let route = Braid::dor(&mesh, n, n, Orientation::Xy);
        assert!(route.nodes.is_empty());
        assert!(route.links.is_empty());
    }

    #[test]
    fn test_merge_preserves_order() {
        let mesh = Mesh::new(2, 2);
        let a = Braid::s_braid(&mesh, 0, mesh.corners(0).tl);
        let b = Braid::short_l(&mesh, 1, mesh.corners(1).tl);
        let merged = a.clone().merge(b.clone());
        assert_eq!(merged.nodes.len(), a.nodes.len() + b.nodes.len());
        assert_eq!(merged.links[..a.links.len()], a.links[..]);
    }
}
