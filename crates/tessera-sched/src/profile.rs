//! Module profiles: Pareto fronts of schedule rectangles.

use serde::{Deserialize, Serialize};

/// One scheduled shape of a module: `width` SIMD lanes for `length` steps,
/// plus the gate accounting the coarse scheduler aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// SIMD lanes actually used.
    pub width: u64,
    /// Schedule length in timesteps.
    pub length: u64,
    /// Serial T-gate timesteps.
    pub tgates: u64,
    /// Upper bound on serial T-gate timesteps.
    pub tgates_ub: u64,
    /// Peak T gates in one timestep.
    pub tgates_par: u64,
    /// Upper bound on peak T gates in one timestep.
    pub tgates_par_ub: u64,
    /// Total operations.
    pub ops: u64,
    /// Teleport moves.
    pub moves: u64,
    /// Move timesteps.
    pub mts: u64,
}

/// Schedule alternatives for one module, indexed by SIMD width.
///
/// Rectangles are kept in ascending width and strictly decreasing length:
/// a wider shape that fails to shorten the schedule is discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleProfile {
    /// Module name.
    pub name: String,
    /// True when this is a leaf basic block.
    pub is_leaf: bool,
    /// The Pareto front, narrowest first.
    pub rects: Vec<Rect>,
}

impl ModuleProfile {
    /// Create an empty profile.
    pub fn new(name: impl Into<String>, is_leaf: bool) -> Self {
        Self {
            name: name.into(),
            is_leaf,
            rects: Vec::new(),
        }
    }

    /// Push a rectangle if it strictly improves on the current front.
    ///
    /// Returns false (and drops the rectangle) once lengths stop
    /// improving; callers stop widening at that point.
    pub fn push_pareto(&mut self, rect: Rect) -> bool {
        match self.rects.last() {
            Some(last) if last.length <= rect.length => false,
            _ => {
                self.rects.push(rect);
                true
            }
        }
    }

    /// The widest rectangle not exceeding `k` lanes, or the narrowest one
    /// as a fallback.
    pub fn widest_fitting(&self, k: u64) -> Option<&Rect> {
        self.rects
            .iter()
            .rev()
            .find(|r| r.width <= k)
            .or_else(|| self.rects.first())
    }

    /// The summary shape: the widest (final) rectangle.
    pub fn summary(&self) -> Option<&Rect> {
        self.rects.last()
    }

    /// Check the Pareto invariant: lengths strictly decrease as widths
    /// weakly increase.
    pub fn is_pareto(&self) -> bool {
        self.rects
            .windows(2)
            .all(|w| w[0].length > w[1].length && w[0].width <= w[1].width)
    }
}
