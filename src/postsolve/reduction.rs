//! Reduction records and their inverse transforms.
//!
//! Every presolve reduction is logged as a fixed-size record plus, for some
//! kinds, nonzero slices kept separately in the arena. Replayed in reverse,
//! each record's `undo` restores the primal values of the rows/columns it
//! removed, recovers dual multipliers from the reduced-cost algebra, and
//! picks basis statuses consistent with the optimality conditions of the
//! original problem. All indices inside records and slices are
//! original-space.

use crate::error::PostsolveError;
use crate::postsolve::arena::PlainData;
use crate::solution::{Basis, BasisStatus, RowType, Solution};

/// One nonzero of a row or column slice, with its index already remapped to
/// the original space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nonzero {
    /// Original-space row or column index
    pub index: usize,
    /// Coefficient value
    pub value: f64,
}

impl Nonzero {
    pub fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

/// Tag identifying the record (and slice) layout of one logged reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum ReductionType {
    FreeColSubstitution,
    DoubletonEquation,
    EqualityRowAddition,
    SingletonRow,
    FixedCol,
    RedundantRow,
    ForcingRow,
    ForcingColumn,
    ForcingColumnRemovedRow,
    DuplicateRow,
    DuplicateColumn,
}

unsafe impl PlainData for Nonzero {}
unsafe impl PlainData for FreeColSubstitution {}
unsafe impl PlainData for DoubletonEquation {}
unsafe impl PlainData for EqualityRowAddition {}
unsafe impl PlainData for SingletonRow {}
unsafe impl PlainData for FixedCol {}
unsafe impl PlainData for RedundantRow {}
unsafe impl PlainData for ForcingRow {}
unsafe impl PlainData for ForcingColumn {}
unsafe impl PlainData for ForcingColumnRemovedRow {}
unsafe impl PlainData for DuplicateRow {}
unsafe impl PlainData for DuplicateColumn {}

fn finite_or_precondition(value: f64, what: impl FnOnce() -> String) -> Result<f64, PostsolveError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PostsolveError::Precondition(what()))
    }
}

/// A free column was eliminated by solving one row equation for it.
///
/// The row slice holds the row's nonzeros over all original columns
/// (including the eliminated column itself); the column slice holds the
/// column's nonzeros over all original rows (including the eliminated row).
#[derive(Debug, Clone, Copy)]
pub(crate) struct FreeColSubstitution {
    pub rhs: f64,
    pub col_cost: f64,
    pub row: usize,
    pub col: usize,
    pub row_type: RowType,
}

impl FreeColSubstitution {
    pub fn undo(
        &self,
        row_values: &[Nonzero],
        col_values: &[Nonzero],
        solution: &mut Solution,
        basis: &mut Basis,
        dual: bool,
    ) -> Result<(), PostsolveError> {
        let mut col_coef = 0.0;
        let mut row_activity = 0.0;
        for nz in row_values {
            if nz.index == self.col {
                col_coef = nz.value;
            } else {
                row_activity += nz.value * solution.col_value[nz.index];
            }
        }

        solution.col_value[self.col] = finite_or_precondition((self.rhs - row_activity) / col_coef, || {
            format!(
                "free column substitution of col {} in row {} hit a zero or non-finite pivot",
                self.col, self.row
            )
        })?;
        solution.row_value[self.row] = self.rhs;

        if !dual {
            return Ok(());
        }

        // pick the row dual that zeroes the eliminated column's reduced cost
        let mut dual_activity = 0.0;
        for nz in col_values {
            if nz.index != self.row {
                dual_activity += nz.value * solution.row_dual[nz.index];
            }
        }
        solution.row_dual[self.row] =
            finite_or_precondition((self.col_cost - dual_activity) / col_coef, || {
                format!(
                    "free column substitution of col {} produced a non-finite row dual",
                    self.col
                )
            })?;
        solution.col_dual[self.col] = 0.0;

        basis.col_status[self.col] = BasisStatus::Basic;
        basis.row_status[self.row] = match self.row_type {
            RowType::Geq => BasisStatus::AtLower,
            RowType::Leq => BasisStatus::AtUpper,
            RowType::Eq => BasisStatus::Nonbasic,
        };
        Ok(())
    }
}

/// Variable `col_subst` was eliminated from the equation
/// `coef * x_col + coef_subst * x_subst = rhs`.
///
/// The column slice holds `col_subst`'s nonzeros over all original rows
/// (including the removed row itself, which the dual sum skips).
#[derive(Debug, Clone, Copy)]
pub(crate) struct DoubletonEquation {
    pub coef: f64,
    pub coef_subst: f64,
    pub rhs: f64,
    pub subst_lower: f64,
    pub subst_upper: f64,
    pub subst_cost: f64,
    pub row: usize,
    pub col_subst: usize,
    pub col: usize,
    pub lower_tightened: bool,
    pub upper_tightened: bool,
}

impl DoubletonEquation {
    pub fn undo(
        &self,
        col_values: &[Nonzero],
        solution: &mut Solution,
        basis: &mut Basis,
        dual: bool,
        feastol: f64,
    ) -> Result<(), PostsolveError> {
        let subst_value = finite_or_precondition(
            (self.rhs - self.coef * solution.col_value[self.col]) / self.coef_subst,
            || {
                format!(
                    "doubleton equation row {} has a zero or non-finite substitution pivot",
                    self.row
                )
            },
        )?;
        solution.col_value[self.col_subst] = subst_value;
        solution.row_value[self.row] = self.rhs;

        if !dual {
            return Ok(());
        }

        // reduced cost of the substituted column while the restored row's
        // dual is still zero
        let mut subst_reduced_cost = self.subst_cost;
        for nz in col_values {
            if nz.index != self.row {
                subst_reduced_cost -= nz.value * solution.row_dual[nz.index];
            }
        }

        let kept_flipped = (self.lower_tightened
            && basis.col_status[self.col] == BasisStatus::AtLower)
            || (self.upper_tightened && basis.col_status[self.col] == BasisStatus::AtUpper);

        if kept_flipped {
            // The kept column sits on a bound that only existed in the
            // reduced problem. It re-enters the basis, the substituted
            // column takes the bound its value landed on, and the row dual
            // is chosen to zero the kept column's reduced cost.
            let row_dual =
                finite_or_precondition(solution.col_dual[self.col] / self.coef, || {
                    format!(
                        "doubleton equation row {} has a zero coefficient on its kept column",
                        self.row
                    )
                })?;
            basis.col_status[self.col] = BasisStatus::Basic;
            solution.col_dual[self.col] = 0.0;
            solution.row_dual[self.row] = row_dual;
            basis.row_status[self.row] = BasisStatus::Nonbasic;
            basis.col_status[self.col_subst] =
                if (subst_value - self.subst_lower).abs() <= (subst_value - self.subst_upper).abs()
                {
                    BasisStatus::AtLower
                } else {
                    BasisStatus::AtUpper
                };
            solution.col_dual[self.col_subst] = subst_reduced_cost - self.coef_subst * row_dual;
            return Ok(());
        }

        let at_lower = (subst_value - self.subst_lower).abs() <= feastol;
        let at_upper = (subst_value - self.subst_upper).abs() <= feastol;

        if at_lower && subst_reduced_cost >= 0.0 {
            basis.col_status[self.col_subst] = BasisStatus::AtLower;
            solution.col_dual[self.col_subst] = subst_reduced_cost;
            solution.row_dual[self.row] = 0.0;
            basis.row_status[self.row] = BasisStatus::Basic;
        } else if at_upper && subst_reduced_cost <= 0.0 {
            basis.col_status[self.col_subst] = BasisStatus::AtUpper;
            solution.col_dual[self.col_subst] = subst_reduced_cost;
            solution.row_dual[self.row] = 0.0;
            basis.row_status[self.row] = BasisStatus::Basic;
        } else {
            let row_dual = finite_or_precondition(subst_reduced_cost / self.coef_subst, || {
                format!(
                    "doubleton equation row {} produced a non-finite row dual",
                    self.row
                )
            })?;
            basis.col_status[self.col_subst] = BasisStatus::Basic;
            solution.col_dual[self.col_subst] = 0.0;
            solution.row_dual[self.row] = row_dual;
            basis.row_status[self.row] = BasisStatus::Nonbasic;
            solution.col_dual[self.col] -= self.coef * row_dual;
        }
        Ok(())
    }
}

/// Row `row` was modified by adding `eq_row_scale` times the equality row
/// `added_eq_row` to it. Only the duals move on undo.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EqualityRowAddition {
    pub row: usize,
    pub added_eq_row: usize,
    pub eq_row_scale: f64,
}

impl EqualityRowAddition {
    pub fn undo(&self, solution: &mut Solution, dual: bool) {
        if dual {
            solution.row_dual[self.added_eq_row] += self.eq_row_scale * solution.row_dual[self.row];
        }
    }
}

/// The row `coef * x_col >=/<=/= side` was removed, possibly after
/// tightening the column's bound.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SingletonRow {
    pub coef: f64,
    pub row: usize,
    pub col: usize,
    pub col_lower_tightened: bool,
    pub col_upper_tightened: bool,
}

impl SingletonRow {
    pub fn undo(
        &self,
        solution: &mut Solution,
        basis: &mut Basis,
        dual: bool,
    ) -> Result<(), PostsolveError> {
        solution.row_value[self.row] = self.coef * solution.col_value[self.col];

        if !dual {
            return Ok(());
        }

        let flip = (self.col_lower_tightened && basis.col_status[self.col] == BasisStatus::AtLower)
            || (self.col_upper_tightened && basis.col_status[self.col] == BasisStatus::AtUpper);

        if !flip {
            // the row is not binding at the solution
            solution.row_dual[self.row] = 0.0;
            basis.row_status[self.row] = BasisStatus::Basic;
            return Ok(());
        }

        // The column sits on a bound introduced by this row; that bound does
        // not exist in the original problem, so the column re-enters the
        // basis and the row leaves it at the side the column was forced
        // against.
        let row_dual = finite_or_precondition(solution.col_dual[self.col] / self.coef, || {
            format!("singleton row {} has a zero coefficient", self.row)
        })?;
        let was_at_lower = basis.col_status[self.col] == BasisStatus::AtLower;
        basis.col_status[self.col] = BasisStatus::Basic;
        solution.col_dual[self.col] = 0.0;
        solution.row_dual[self.row] = row_dual;
        basis.row_status[self.row] = if was_at_lower == (self.coef > 0.0) {
            BasisStatus::AtLower
        } else {
            BasisStatus::AtUpper
        };
        Ok(())
    }
}

/// A column removed after being fixed at `fix_value`. The column slice holds
/// its nonzeros over the rows that stayed in the problem.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedCol {
    pub fix_value: f64,
    pub col_cost: f64,
    pub col: usize,
    /// `AtLower`, `AtUpper`, or `Nonbasic` for a column whose bounds were
    /// equal; the latter picks its side from the sign of the reduced cost.
    pub fix_type: BasisStatus,
}

impl FixedCol {
    pub fn undo(&self, col_values: &[Nonzero], solution: &mut Solution, basis: &mut Basis, dual: bool) {
        solution.col_value[self.col] = self.fix_value;
        for nz in col_values {
            solution.row_value[nz.index] += nz.value * self.fix_value;
        }

        if !dual {
            return;
        }

        let mut reduced_cost = self.col_cost;
        for nz in col_values {
            reduced_cost -= nz.value * solution.row_dual[nz.index];
        }
        solution.col_dual[self.col] = reduced_cost;
        basis.col_status[self.col] = match self.fix_type {
            BasisStatus::AtLower => BasisStatus::AtLower,
            BasisStatus::AtUpper => BasisStatus::AtUpper,
            _ => {
                if reduced_cost >= 0.0 {
                    BasisStatus::AtLower
                } else {
                    BasisStatus::AtUpper
                }
            }
        };
    }
}

/// A row that carried no active constraint.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RedundantRow {
    pub row: usize,
}

impl RedundantRow {
    pub fn undo(&self, solution: &mut Solution, basis: &mut Basis, dual: bool) {
        if dual {
            solution.row_dual[self.row] = 0.0;
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// A row whose side forced every column in it to a bound. The row slice
/// holds the row's nonzeros over all original columns.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ForcingRow {
    pub side: f64,
    pub row: usize,
    pub row_type: RowType,
}

impl ForcingRow {
    pub fn undo(&self, row_values: &[Nonzero], solution: &mut Solution, basis: &mut Basis, dual: bool) {
        solution.row_value[self.row] = self.side;

        if !dual {
            return;
        }

        // Each fixed column constrains the row multiplier from one side:
        // a column at its lower bound needs a nonnegative reduced cost after
        // the update d_j - a_j * y, one at its upper bound a nonpositive one.
        // Collect the feasible interval and take the binding endpoint; on a
        // tie the largest-magnitude coefficient wins the basis slot.
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        let mut lo_entry: Option<Nonzero> = None;
        let mut hi_entry: Option<Nonzero> = None;
        for nz in row_values {
            if nz.value == 0.0 {
                continue;
            }
            let status = basis.col_status[nz.index];
            let at_lower = status == BasisStatus::AtLower;
            if !at_lower && status != BasisStatus::AtUpper {
                continue;
            }
            let ratio = solution.col_dual[nz.index] / nz.value;
            let bounds_above = at_lower == (nz.value > 0.0);
            if bounds_above {
                if ratio < hi
                    || (ratio == hi && hi_entry.map_or(false, |e| nz.value.abs() > e.value.abs()))
                {
                    hi = ratio;
                    hi_entry = Some(*nz);
                }
            } else if ratio > lo
                || (ratio == lo && lo_entry.map_or(false, |e| nz.value.abs() > e.value.abs()))
            {
                lo = ratio;
                lo_entry = Some(*nz);
            }
        }

        if lo > hi {
            // conflicting requirements; keep the limit backed by the
            // largest-magnitude coefficient
            let lo_mag = lo_entry.map_or(0.0, |e| e.value.abs());
            let hi_mag = hi_entry.map_or(0.0, |e| e.value.abs());
            if lo_mag >= hi_mag {
                hi = f64::INFINITY;
                hi_entry = None;
            } else {
                lo = f64::NEG_INFINITY;
                lo_entry = None;
            }
        }

        let (row_dual, entering) = match self.row_type {
            RowType::Geq => {
                if lo > 0.0 {
                    (lo, lo_entry)
                } else {
                    (0.0, None)
                }
            }
            RowType::Leq => {
                if hi < 0.0 {
                    (hi, hi_entry)
                } else {
                    (0.0, None)
                }
            }
            RowType::Eq => {
                // equality duals are sign-free; bind whichever finite
                // endpoint exists
                if hi.is_finite() && (!lo.is_finite() || hi.abs() <= lo.abs()) {
                    (hi, hi_entry)
                } else if lo.is_finite() {
                    (lo, lo_entry)
                } else {
                    (0.0, None)
                }
            }
        };

        solution.row_dual[self.row] = row_dual;
        if row_dual != 0.0 || entering.is_some() {
            for nz in row_values {
                solution.col_dual[nz.index] -= nz.value * row_dual;
            }
            if let Some(entry) = entering {
                // degenerate entering column: value at its bound, reduced
                // cost exactly zero
                solution.col_dual[entry.index] = 0.0;
                basis.col_status[entry.index] = BasisStatus::Basic;
            }
            basis.row_status[self.row] = match self.row_type {
                RowType::Geq => BasisStatus::AtLower,
                RowType::Leq => BasisStatus::AtUpper,
                RowType::Eq => BasisStatus::Nonbasic,
            };
        } else {
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// A column whose objective pushes it toward an infinite bound, removed
/// together with the rows that limit it. The column slice holds (row, coef)
/// pairs, the side slice the matching (row, side) pairs in the same order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ForcingColumn {
    pub col_cost: f64,
    pub col: usize,
    pub at_infinite_upper: bool,
}

impl ForcingColumn {
    pub fn undo(
        &self,
        col_values: &[Nonzero],
        col_sides: &[Nonzero],
        solution: &mut Solution,
        basis: &mut Basis,
        dual: bool,
    ) -> Result<(), PostsolveError> {
        if col_values.is_empty() || col_values.len() != col_sides.len() {
            return Err(PostsolveError::Precondition(format!(
                "forcing column {} logged without a consistent row slice",
                self.col
            )));
        }

        // Each removed row left its partial activity (all other columns) in
        // row_value; the side then implies a limit on this column's value.
        // The objective pushes the column until the tightest limit binds.
        let mut col_value = if self.at_infinite_upper {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        let mut binding: Option<Nonzero> = None;
        for (nz, side) in col_values.iter().zip(col_sides) {
            debug_assert_eq!(nz.index, side.index);
            let implied = finite_or_precondition(
                (side.value - solution.row_value[nz.index]) / nz.value,
                || {
                    format!(
                        "forcing column {} has a zero coefficient in row {}",
                        self.col, nz.index
                    )
                },
            )?;
            let tighter = if self.at_infinite_upper {
                implied < col_value
            } else {
                implied > col_value
            };
            if tighter {
                col_value = implied;
                binding = Some(*nz);
            }
        }
        let Some(binding) = binding else {
            return Err(PostsolveError::Precondition(format!(
                "forcing column {} found no finite limiting row",
                self.col
            )));
        };

        solution.col_value[self.col] = col_value;
        for nz in col_values {
            solution.row_value[nz.index] += nz.value * col_value;
        }

        if !dual {
            return Ok(());
        }

        // the binding row pays for the column's cost; every other removed
        // row keeps its zero dual
        let row_dual = finite_or_precondition(self.col_cost / binding.value, || {
            format!("forcing column {} produced a non-finite row dual", self.col)
        })?;
        solution.row_dual[binding.index] = row_dual;
        basis.row_status[binding.index] = if self.at_infinite_upper == (binding.value > 0.0) {
            BasisStatus::AtUpper
        } else {
            BasisStatus::AtLower
        };
        solution.col_dual[self.col] = 0.0;
        basis.col_status[self.col] = BasisStatus::Basic;
        Ok(())
    }
}

/// One of the rows removed together with a forcing column. The row slice
/// holds the row's nonzeros over the surviving columns.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ForcingColumnRemovedRow {
    pub row: usize,
}

impl ForcingColumnRemovedRow {
    pub fn undo(&self, row_values: &[Nonzero], solution: &mut Solution, basis: &mut Basis, dual: bool) {
        // partial activity; the forcing column's undo adds its own term
        let mut partial = 0.0;
        for nz in row_values {
            partial += nz.value * solution.col_value[nz.index];
        }
        solution.row_value[self.row] = partial;

        if dual {
            solution.row_dual[self.row] = 0.0;
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// Row `row` was removed as `duplicate_row_scale` times `duplicate_row`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DuplicateRow {
    pub duplicate_row_scale: f64,
    pub duplicate_row: usize,
    pub row: usize,
    pub row_lower_tightened: bool,
    pub row_upper_tightened: bool,
}

impl DuplicateRow {
    pub fn undo(
        &self,
        solution: &mut Solution,
        basis: &mut Basis,
        dual: bool,
    ) -> Result<(), PostsolveError> {
        solution.row_value[self.row] =
            self.duplicate_row_scale * solution.row_value[self.duplicate_row];

        if !dual {
            return Ok(());
        }

        if !self.row_lower_tightened && !self.row_upper_tightened {
            // the removed row never constrained the survivor
            solution.row_dual[self.row] = 0.0;
            basis.row_status[self.row] = BasisStatus::Basic;
            return Ok(());
        }

        let surviving_status = basis.row_status[self.duplicate_row];
        let binding_upper = surviving_status == BasisStatus::AtUpper;
        let binding_lower = surviving_status == BasisStatus::AtLower;
        // A bound the removed row contributed to the survivor: a positive
        // scale maps upper to upper, a negative scale swaps the sides.
        let from_removed = if binding_upper {
            if self.duplicate_row_scale > 0.0 {
                self.row_upper_tightened
            } else {
                self.row_lower_tightened
            }
        } else if binding_lower {
            if self.duplicate_row_scale > 0.0 {
                self.row_lower_tightened
            } else {
                self.row_upper_tightened
            }
        } else {
            false
        };

        if from_removed {
            // the multiplier belongs to the removed row's own bound
            let row_dual = finite_or_precondition(
                solution.row_dual[self.duplicate_row] / self.duplicate_row_scale,
                || {
                    format!(
                        "duplicate row {} logged with a zero or non-finite scale",
                        self.row
                    )
                },
            )?;
            solution.row_dual[self.row] = row_dual;
            solution.row_dual[self.duplicate_row] = 0.0;
            basis.row_status[self.duplicate_row] = BasisStatus::Basic;
            basis.row_status[self.row] = if binding_upper == (self.duplicate_row_scale > 0.0) {
                BasisStatus::AtUpper
            } else {
                BasisStatus::AtLower
            };
        } else {
            solution.row_dual[self.row] = 0.0;
            basis.row_status[self.row] = BasisStatus::Basic;
        }
        Ok(())
    }
}

/// Column `duplicate_col` was merged into `col`: the solver saw the single
/// variable `z = x_col + col_scale * x_duplicate_col`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DuplicateColumn {
    pub col_scale: f64,
    pub col_lower: f64,
    pub col_upper: f64,
    pub duplicate_col_lower: f64,
    pub duplicate_col_upper: f64,
    pub col: usize,
    pub duplicate_col: usize,
    pub col_integral: bool,
    pub duplicate_col_integral: bool,
}

impl DuplicateColumn {
    /// Splits the merged value back into the two columns. Returns `false`
    /// when no split within `feastol` exists; the minimum-violation pair is
    /// still written so the caller can inspect it.
    pub fn undo(&self, solution: &mut Solution, basis: &mut Basis, dual: bool, feastol: f64) -> bool {
        let merged = solution.col_value[self.col];

        let (col_value, dup_value, feasible) = if self.col_integral || self.duplicate_col_integral {
            self.split_integral(merged, feastol)
        } else {
            self.split_continuous(merged, feastol)
        };
        if !feasible {
            log::warn!(
                "no feasible split of merged value {merged} between col {} and duplicate col {}; \
                 keeping the minimum-violation pair ({col_value}, {dup_value})",
                self.col,
                self.duplicate_col
            );
        }

        solution.col_value[self.col] = col_value;
        solution.col_value[self.duplicate_col] = dup_value;

        if dual {
            solution.col_dual[self.duplicate_col] = self.col_scale * solution.col_dual[self.col];

            let merged_status = basis.col_status[self.col];
            let mut col_status = split_status(col_value, self.col_lower, self.col_upper, feastol);
            let mut dup_status = split_status(
                dup_value,
                self.duplicate_col_lower,
                self.duplicate_col_upper,
                feastol,
            );
            if col_status == BasisStatus::Basic && dup_status == BasisStatus::Basic {
                // only one of the pair may occupy the merged column's basis
                // slot; a free duplicate split to zero stays pinned there
                dup_status = if dup_value == 0.0 {
                    BasisStatus::Zero
                } else {
                    BasisStatus::Nonbasic
                };
            }
            if merged_status == BasisStatus::Basic
                && col_status != BasisStatus::Basic
                && dup_status != BasisStatus::Basic
            {
                // the merged variable held a basis slot; when the split puts
                // both columns on bounds the kept column keeps that slot
                // degenerately (its reduced cost is the merged one, zero for
                // a basic variable)
                col_status = BasisStatus::Basic;
            }
            basis.col_status[self.col] = col_status;
            basis.col_status[self.duplicate_col] = dup_status;
        }

        feasible
    }

    fn split_continuous(&self, merged: f64, feastol: f64) -> (f64, f64, bool) {
        // the bound of the kept column nearest the merged value, then the
        // residual to the duplicate
        let col_value = merged.clamp(self.col_lower, self.col_upper);
        let dup_value = ((merged - col_value) / self.col_scale)
            .clamp(self.duplicate_col_lower, self.duplicate_col_upper);
        let residual_ok = (merged - col_value - self.col_scale * dup_value).abs() <= feastol;

        let col_interior = strictly_inside(col_value, self.col_lower, self.col_upper, feastol);
        let dup_interior = strictly_inside(
            dup_value,
            self.duplicate_col_lower,
            self.duplicate_col_upper,
            feastol,
        );
        if residual_ok && !(col_interior && dup_interior) {
            return (col_value, dup_value, true);
        }

        // walk the endpoints of the feasible segment: any feasible split has
        // one of the two variables on a bound
        for dup_candidate in [self.duplicate_col_lower, self.duplicate_col_upper] {
            if !dup_candidate.is_finite() {
                continue;
            }
            let col_candidate = merged - self.col_scale * dup_candidate;
            if within(col_candidate, self.col_lower, self.col_upper, feastol) {
                return (col_candidate, dup_candidate, true);
            }
        }
        for col_candidate in [self.col_lower, self.col_upper] {
            if !col_candidate.is_finite() {
                continue;
            }
            let dup_candidate = (merged - col_candidate) / self.col_scale;
            if within(
                dup_candidate,
                self.duplicate_col_lower,
                self.duplicate_col_upper,
                feastol,
            ) {
                return (col_candidate, dup_candidate, true);
            }
        }

        (col_value, dup_value, residual_ok)
    }

    fn split_integral(&self, merged: f64, feastol: f64) -> (f64, f64, bool) {
        const MAX_CANDIDATES: usize = 100_000;

        // enumerate the integral member of the pair and derive its partner
        let enumerate_duplicate = self.duplicate_col_integral;
        let (enum_lower, enum_upper) = if enumerate_duplicate {
            (self.duplicate_col_lower, self.duplicate_col_upper)
        } else {
            (self.col_lower, self.col_upper)
        };
        let lo = (enum_lower - feastol).ceil();
        let hi = (enum_upper + feastol).floor();

        let count = if lo.is_finite() && hi.is_finite() {
            if hi < lo {
                0
            } else {
                ((hi - lo) as usize + 1).min(MAX_CANDIDATES)
            }
        } else {
            MAX_CANDIDATES
        };

        let mut best: Option<(f64, f64, f64)> = None;
        for step in 0..count {
            let candidate = if lo.is_finite() {
                lo + step as f64
            } else if hi.is_finite() {
                hi - step as f64
            } else {
                // free integral variable: 0, 1, -1, 2, -2, ...
                let magnitude = ((step + 1) / 2) as f64;
                if step % 2 == 1 {
                    magnitude
                } else {
                    -magnitude
                }
            };

            let (col_value, dup_value, partner, partner_lower, partner_upper, partner_integral) =
                if enumerate_duplicate {
                    let col_value = merged - self.col_scale * candidate;
                    (
                        col_value,
                        candidate,
                        col_value,
                        self.col_lower,
                        self.col_upper,
                        self.col_integral,
                    )
                } else {
                    let dup_value = (merged - candidate) / self.col_scale;
                    (
                        candidate,
                        dup_value,
                        dup_value,
                        self.duplicate_col_lower,
                        self.duplicate_col_upper,
                        self.duplicate_col_integral,
                    )
                };

            let mut violation = bound_violation(partner, partner_lower, partner_upper);
            if partner_integral {
                violation += (partner - partner.round()).abs();
            }
            if violation <= feastol {
                return (col_value, dup_value, true);
            }
            if best.map_or(true, |(_, _, best_violation)| violation < best_violation) {
                best = Some((col_value, dup_value, violation));
            }
        }

        match best {
            Some((col_value, dup_value, _)) => (col_value, dup_value, false),
            // empty integral range: fall back to the continuous clamp pair
            None => {
                let (col_value, dup_value, _) = self.split_continuous(merged, feastol);
                (col_value, dup_value, false)
            }
        }
    }
}

fn within(value: f64, lower: f64, upper: f64, feastol: f64) -> bool {
    value >= lower - feastol && value <= upper + feastol
}

fn strictly_inside(value: f64, lower: f64, upper: f64, feastol: f64) -> bool {
    value > lower + feastol && value < upper - feastol
}

fn bound_violation(value: f64, lower: f64, upper: f64) -> f64 {
    (lower - value).max(0.0) + (value - upper).max(0.0)
}

fn split_status(value: f64, lower: f64, upper: f64, feastol: f64) -> BasisStatus {
    if (value - lower).abs() <= feastol {
        BasisStatus::AtLower
    } else if (value - upper).abs() <= feastol {
        BasisStatus::AtUpper
    } else if lower.is_infinite() && upper.is_infinite() && value == 0.0 {
        BasisStatus::Zero
    } else {
        BasisStatus::Basic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duplicate_column(
        col_scale: f64,
        col_bounds: (f64, f64),
        dup_bounds: (f64, f64),
        integral: bool,
    ) -> DuplicateColumn {
        DuplicateColumn {
            col_scale,
            col_lower: col_bounds.0,
            col_upper: col_bounds.1,
            duplicate_col_lower: dup_bounds.0,
            duplicate_col_upper: dup_bounds.1,
            col: 0,
            duplicate_col: 1,
            col_integral: integral,
            duplicate_col_integral: integral,
        }
    }

    #[test]
    fn test_continuous_split_prefers_bound_near_merged_value() {
        let reduction = duplicate_column(1.0, (0.0, 5.0), (0.0, 5.0), false);
        let (col, dup, ok) = reduction.split_continuous(7.0, 1e-9);
        assert!(ok);
        assert_eq!(col, 5.0);
        assert_eq!(dup, 2.0);
    }

    #[test]
    fn test_continuous_split_negative_scale() {
        // z = x - d with x in [0, 2], d in [0, 4]; z = -3 needs x = 0, d = 3
        let reduction = duplicate_column(-1.0, (0.0, 2.0), (0.0, 4.0), false);
        let (col, dup, ok) = reduction.split_continuous(-3.0, 1e-9);
        assert!(ok);
        assert!((col - 0.0).abs() <= 1e-12);
        assert!((dup - 3.0).abs() <= 1e-12);
    }

    #[test]
    fn test_integral_split_finds_first_feasible_pair() {
        let reduction = duplicate_column(1.0, (0.0, 3.0), (0.0, 3.0), true);
        let (col, dup, ok) = reduction.split_integral(4.0, 1e-9);
        assert!(ok);
        assert_eq!(col + dup, 4.0);
        assert!((0.0..=3.0).contains(&col));
        assert!((0.0..=3.0).contains(&dup));
    }

    #[test]
    fn test_integral_split_reports_failure() {
        // z = 9 cannot be written as a sum of two values in [0, 3]
        let reduction = duplicate_column(1.0, (0.0, 3.0), (0.0, 3.0), true);
        let (col, dup, ok) = reduction.split_integral(9.0, 1e-9);
        assert!(!ok);
        // the best-effort pair pushes both columns to their upper bounds
        assert_eq!(dup, 3.0);
        assert_eq!(col, 6.0);
    }

    #[test]
    fn test_split_status() {
        assert_eq!(split_status(0.0, 0.0, 5.0, 1e-9), BasisStatus::AtLower);
        assert_eq!(split_status(5.0, 0.0, 5.0, 1e-9), BasisStatus::AtUpper);
        assert_eq!(split_status(2.5, 0.0, 5.0, 1e-9), BasisStatus::Basic);
        assert_eq!(
            split_status(0.0, f64::NEG_INFINITY, f64::INFINITY, 1e-9),
            BasisStatus::Zero
        );
    }
}
