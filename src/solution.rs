//! Solution and basis containers shared between presolve and postsolve.
//!
//! All vectors are indexed in the caller's *current* index space: the
//! reduced space before `undo`, the original space after it.

/// Sense of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RowType {
    /// `a x >= b`
    Geq,
    /// `a x <= b`
    Leq,
    /// `a x == b`
    Eq,
}

/// Basis status of a row or column at an LP vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BasisStatus {
    /// In the basis; value may sit strictly between its bounds.
    Basic,
    /// Nonbasic at the lower bound.
    AtLower,
    /// Nonbasic at the upper bound.
    AtUpper,
    /// Nonbasic without a distinguished bound (equality rows).
    Nonbasic,
    /// Nonbasic free variable pinned at zero.
    Zero,
}

/// Primal/dual iterate carried through postsolve.
///
/// Dual postsolve is requested implicitly: when `col_dual` and `row_dual`
/// are sized like their primal counterparts, `undo` reconstructs duals and
/// basis statuses as well. Leave the dual vectors empty for a primal-only
/// lift (the common case after a MIP solve).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    /// Primal column values
    pub col_value: Vec<f64>,
    /// Row activities
    pub row_value: Vec<f64>,
    /// Column duals (reduced costs)
    pub col_dual: Vec<f64>,
    /// Row duals (constraint multipliers)
    pub row_dual: Vec<f64>,
}

impl Solution {
    /// Primal-only solution over the reduced space.
    pub fn primal(col_value: Vec<f64>, row_value: Vec<f64>) -> Self {
        Self {
            col_value,
            row_value,
            col_dual: Vec::new(),
            row_dual: Vec::new(),
        }
    }

    /// Solution with duals; `undo` will also reconstruct the basis.
    pub fn with_duals(
        col_value: Vec<f64>,
        row_value: Vec<f64>,
        col_dual: Vec<f64>,
        row_dual: Vec<f64>,
    ) -> Self {
        Self {
            col_value,
            row_value,
            col_dual,
            row_dual,
        }
    }
}

/// Active-set partition accompanying a dual solution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basis {
    /// Status per column
    pub col_status: Vec<BasisStatus>,
    /// Status per row
    pub row_status: Vec<BasisStatus>,
}

impl Basis {
    pub fn new(col_status: Vec<BasisStatus>, row_status: Vec<BasisStatus>) -> Self {
        Self {
            col_status,
            row_status,
        }
    }
}
