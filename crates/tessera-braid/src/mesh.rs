//! The corner-lattice mesh and its ownership state.
//!
//! A module with `n` logical qubits is laid out on an `R × C` grid of 2×2
//! cells; the routing surface is the `(R+1) × (C+1)` lattice of cell
//! corners plus the four-neighbour links between them. Every node and link
//! carries an owner: 0 means free, otherwise the sequence number of the
//! gate holding the reservation.
//!
//! Nodes and links are flat arrays indexed arithmetically; there is no
//! graph structure to maintain.

/// A lattice node, identified by `row * (C+1) + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A lattice link between two four-neighbour nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkId {
    /// Link between `(r, c)` and `(r, c+1)`, indexed by `r * C + c`.
    Horizontal(u32),
    /// Link between `(r, c)` and `(r+1, c)`, indexed by `r * (C+1) + c`.
    Vertical(u32),
}

/// The four corner nodes of one qubit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corners {
    /// Top-left corner.
    pub tl: NodeId,
    /// Top-right corner.
    pub tr: NodeId,
    /// Bottom-left corner.
    pub bl: NodeId,
    /// Bottom-right corner.
    pub br: NodeId,
}

impl Corners {
    /// Check whether `node` is one of the four corners.
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        node == self.tl || node == self.tr || node == self.bl || node == self.br
    }
}

/// Ownership state of the corner lattice for one module.
#[derive(Debug, Clone)]
pub struct Mesh {
    rows: u32,
    cols: u32,
    nodes: Vec<u32>,
    h_links: Vec<u32>,
    v_links: Vec<u32>,
}

impl Mesh {
    /// Choose the qubit-grid dimensions for a module of `n` qubits:
    /// `R = ⌈√n⌉` and `C = R` or `R − 1`, whichever still fits `n`.
    pub fn grid_for(n: u64) -> (u32, u32) {
        let n = n.max(1);
        let rows = (n as f64).sqrt().ceil() as u32;
        let cols = if u64::from(rows) * u64::from(rows.saturating_sub(1)) < n {
            rows
        } else {
            rows - 1
        };
        (rows, cols)
    }

    /// Create a free mesh for an `R × C` qubit grid.
    pub fn new(rows: u32, cols: u32) -> Self {
        let nr = (rows + 1) as usize;
        let nc = (cols + 1) as usize;
        Self {
            rows,
            cols,
            nodes: vec![0; nr * nc],
            h_links: vec![0; nr * cols as usize],
            v_links: vec![0; rows as usize * nc],
        }
    }

    /// Qubit-grid rows.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Qubit-grid columns.
    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of qubit cells in the grid.
    #[inline]
    pub fn capacity(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }

    #[inline]
    fn node_row(&self, n: NodeId) -> u32 {
        n.0 / (self.cols + 1)
    }

    #[inline]
    fn node_col(&self, n: NodeId) -> u32 {
        n.0 % (self.cols + 1)
    }

    /// Node at lattice position `(row, col)`.
    #[inline]
    pub fn node_at(&self, row: u32, col: u32) -> NodeId {
        NodeId(row * (self.cols + 1) + col)
    }

    /// The four corner nodes of qubit cell `q`.
    pub fn corners(&self, q: u32) -> Corners {
        let tl = q + q / self.cols;
        Corners {
            tl: NodeId(tl),
            tr: NodeId(tl + 1),
            bl: NodeId(tl + self.cols + 1),
            br: NodeId(tl + self.cols + 2),
        }
    }

    /// The corner diagonally opposite `node` across qubit `q`.
    pub fn diagonal(&self, q: u32, node: NodeId) -> NodeId {
        let c = self.corners(q);
        debug_assert!(c.contains(node), "node is not a corner of qubit {q}");
        match node {
            n if n == c.tl => c.br,
            n if n == c.tr => c.bl,
            n if n == c.bl => c.tr,
            _ => c.tl,
        }
    }

    /// The corner vertically across `node` on qubit `q`.
    pub fn vertical(&self, q: u32, node: NodeId) -> NodeId {
        let c = self.corners(q);
        debug_assert!(c.contains(node), "node is not a corner of qubit {q}");
        match node {
            n if n == c.tl => c.bl,
            n if n == c.tr => c.br,
            n if n == c.bl => c.tl,
            _ => c.tr,
        }
    }

    /// The corner horizontally across `node` on qubit `q`.
    pub fn horizontal(&self, q: u32, node: NodeId) -> NodeId {
        let c = self.corners(q);
        debug_assert!(c.contains(node), "node is not a corner of qubit {q}");
        match node {
            n if n == c.tl => c.tr,
            n if n == c.tr => c.tl,
            n if n == c.bl => c.br,
            _ => c.bl,
        }
    }

    /// The corner of qubit `q` closest to `src` by row/column comparison.
    pub fn nearest(&self, q: u32, src: NodeId) -> NodeId {
        let c = self.corners(q);
        let q_row = q / self.cols;
        let q_col = q % self.cols;
        let src_row = self.node_row(src);
        let src_col = self.node_col(src);
        match (src_row <= q_row, src_col <= q_col) {
            (true, true) => c.tl,
            (true, false) => c.tr,
            (false, true) => c.bl,
            (false, false) => c.br,
        }
    }

    /// True iff the qubits share a row and sit in neighbouring columns.
    pub fn are_adjacent(&self, q1: u32, q2: u32) -> bool {
        let (r1, c1) = (q1 / self.cols, q1 % self.cols);
        let (r2, c2) = (q2 / self.cols, q2 % self.cols);
        r1 == r2 && c1.abs_diff(c2) == 1
    }

    /// Manhattan distance between two qubit cells.
    pub fn manhattan_cost(&self, q1: u32, q2: u32) -> u64 {
        let (r1, c1) = (q1 / self.cols, q1 % self.cols);
        let (r2, c2) = (q2 / self.cols, q2 % self.cols);
        u64::from(r1.abs_diff(r2)) + u64::from(c1.abs_diff(c2))
    }

    /// The link between two four-neighbour nodes.
    ///
    /// Panics if the nodes are not adjacent on the lattice; braid geometry
    /// only ever requests links between neighbours.
    pub fn link_between(&self, a: NodeId, b: NodeId) -> LinkId {
        let (ra, ca) = (self.node_row(a), self.node_col(a));
        let (rb, cb) = (self.node_row(b), self.node_col(b));
        if ra == rb && ca.abs_diff(cb) == 1 {
            LinkId::Horizontal(ra * self.cols + ca.min(cb))
        } else if ca == cb && ra.abs_diff(rb) == 1 {
            LinkId::Vertical(ra.min(rb) * (self.cols + 1) + ca)
        } else {
            panic!("nodes {a:?} and {b:?} are not lattice neighbours");
        }
    }

    /// Current owner of a node (0 = free).
    #[inline]
    pub fn node_owner(&self, n: NodeId) -> u32 {
        self.nodes[n.0 as usize]
    }

    /// Current owner of a link (0 = free).
    #[inline]
    pub fn link_owner(&self, l: LinkId) -> u32 {
        match l {
            LinkId::Horizontal(i) => self.h_links[i as usize],
            LinkId::Vertical(i) => self.v_links[i as usize],
        }
    }

    /// Set the owner of a node.
    #[inline]
    pub fn set_node_owner(&mut self, n: NodeId, owner: u32) {
        self.nodes[n.0 as usize] = owner;
    }

    /// Set the owner of a link.
    #[inline]
    pub fn set_link_owner(&mut self, l: LinkId, owner: u32) {
        match l {
            LinkId::Horizontal(i) => self.h_links[i as usize] = owner,
            LinkId::Vertical(i) => self.v_links[i as usize] = owner,
        }
    }

    /// Release every node and link held by `owner`.
    pub fn purge_owner(&mut self, owner: u32) {
        for cell in self
            .nodes
            .iter_mut()
            .chain(self.h_links.iter_mut())
            .chain(self.v_links.iter_mut())
        {
            if *cell == owner {
                *cell = 0;
            }
        }
    }

    /// Count of cells (nodes + links) currently held by `owner`.
    pub fn held_by(&self, owner: u32) -> usize {
        self.nodes
            .iter()
            .chain(self.h_links.iter())
            .chain(self.v_links.iter())
            .filter(|&&o| o == owner)
            .count()
    }

    /// Check that no cell is owned at all.
    pub fn is_free(&self) -> bool {
        self.nodes
            .iter()
            .chain(self.h_links.iter())
            .chain(self.v_links.iter())
            .all(|&o| o == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_for() {
        assert_eq!(Mesh::grid_for(1), (1, 1));
        assert_eq!(Mesh::grid_for(2), (2, 1));
        assert_eq!(Mesh::grid_for(4), (2, 2));
        assert_eq!(Mesh::grid_for(5), (3, 2));
        assert_eq!(Mesh::grid_for(7), (3, 3));
        assert_eq!(Mesh::grid_for(9), (3, 3));
    }

    #[test]
    fn test_corner_arithmetic() {
        // 2x2 qubit grid: 3x3 node lattice.
        let mesh = Mesh::new(2, 2);
        let c0 = mesh.corners(0);
        assert_eq!(c0.tl, NodeId(0));
        assert_eq!(c0.tr, NodeId(1));
        assert_eq!(c0.bl, NodeId(3));
        assert_eq!(c0.br, NodeId(4));
        let c3 = mesh.corners(3);
        assert_eq!(c3.tl, NodeId(4));
        assert_eq!(c3.br, NodeId(8));
    }

    #[test]
    fn test_direction_helpers() {
        let mesh = Mesh::new(2, 2);
        let c = mesh.corners(0);
        assert_eq!(mesh.diagonal(0, c.tl), c.br);
        assert_eq!(mesh.vertical(0, c.tr), c.br);
        assert_eq!(mesh.horizontal(0, c.bl), c.br);
        assert_eq!(mesh.horizontal(0, c.br), c.bl);
    }

    #[test]
    fn test_nearest_quadrants() {
        let mesh = Mesh::new(3, 3);
        let c = mesh.corners(5); // row 1, col 2
        assert_eq!(mesh.nearest(5, NodeId(0)), c.tl);
        assert_eq!(mesh.nearest(5, mesh.node_at(3, 3)), c.br);
        assert_eq!(mesh.nearest(5, mesh.node_at(0, 3)), c.tr);
    }

    #[test]
    fn test_adjacency_same_row_only() {
        let mesh = Mesh::new(2, 2);
        assert!(mesh.are_adjacent(0, 1));
        assert!(mesh.are_adjacent(3, 2));
        assert!(!mesh.are_adjacent(0, 2)); // vertically stacked
        assert!(!mesh.are_adjacent(1, 2)); // row wrap
        assert_eq!(mesh.manhattan_cost(0, 3), 2);
    }

    #[test]
    fn test_ownership_and_purge() {
        let mut mesh = Mesh::new(2, 2);
        let l = mesh.link_between(NodeId(0), NodeId(1));
        mesh.set_node_owner(NodeId(0), 7);
        mesh.set_link_owner(l, 7);
        mesh.set_node_owner(NodeId(4), 9);
        assert_eq!(mesh.held_by(7), 2);
        mesh.purge_owner(7);
        assert_eq!(mesh.held_by(7), 0);
        assert_eq!(mesh.node_owner(NodeId(4)), 9);
        assert!(!mesh.is_free());
    }

    #[test]
    #[should_panic(expected = "not lattice neighbours")]
    fn test_link_between_requires_adjacency() {
        let mesh = Mesh::new(2, 2);
        mesh.link_between(NodeId(0), NodeId(4));
    }
}
