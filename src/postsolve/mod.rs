//! The postsolve stack: reversible log of presolve reductions.
//!
//! During presolve, every transformation calls one emission entry point,
//! which remaps the incoming reduced-space indices to the original space,
//! pushes the reduction's record (and nonzero slices, where needed) onto the
//! arena, and appends a tag to the tag sequence. After the reduced problem
//! is solved, [`PostsolveStack::undo`] walks the tag sequence backward,
//! pops each payload in the exact inverse push order, and applies the
//! reduction's inverse, turning the reduced solution into a solution of the
//! original problem.

mod arena;
mod index_map;
mod reduction;

pub use reduction::Nonzero;

use sprs::CsMat;

use crate::error::PostsolveError;
use crate::solution::{Basis, BasisStatus, RowType, Solution};

use arena::DataStack;
use index_map::IndexMaps;
use reduction::{
    DoubletonEquation, DuplicateColumn, DuplicateRow, EqualityRowAddition, FixedCol,
    ForcingColumn, ForcingColumnRemovedRow, ForcingRow, FreeColSubstitution, RedundantRow,
    ReductionType, SingletonRow,
};

/// Non-fatal outcome counters of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostsolveReport {
    /// Duplicate-column splits for which no pair within `feastol` exists;
    /// the minimum-violation pair was written instead and the caller should
    /// re-verify the solution.
    pub integer_split_failures: usize,
}

impl PostsolveReport {
    pub fn is_clean(&self) -> bool {
        self.integer_split_failures == 0
    }
}

/// Reversible log of presolve reductions.
///
/// ```
/// use presolve_core::{Basis, BasisStatus, PostsolveStack, Solution};
///
/// // original LP: min x + y  s.t.  x + y >= 1,  0 <= x, y <= 2.
/// // The presolver fixes y at its lower bound, leaving min x s.t. x >= 1.
/// let mut stack = PostsolveStack::new();
/// stack.initialize_index_maps(1, 2);
/// stack.fixed_col_at_lower(1, 0.0, 1.0, [(0, 1.0)]).unwrap();
/// stack.compress_index_maps(&[Some(0)], &[Some(0), None]);
///
/// // reduced-space optimum: x = 1 on the binding row
/// let mut solution = Solution::with_duals(vec![1.0], vec![1.0], vec![0.0], vec![1.0]);
/// let mut basis = Basis::new(vec![BasisStatus::Basic], vec![BasisStatus::AtLower]);
/// stack.undo(&mut solution, &mut basis, 1e-9).unwrap();
///
/// assert_eq!(solution.col_value, vec![1.0, 0.0]);
/// assert_eq!(basis.col_status[1], BasisStatus::AtLower);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PostsolveStack {
    reduction_values: DataStack,
    reductions: Vec<ReductionType>,
    index: IndexMaps,
}

impl PostsolveStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity index maps over the original problem sizes. Must be called
    /// before the first emission.
    pub fn initialize_index_maps(&mut self, num_row: usize, num_col: usize) {
        self.index.initialize(num_row, num_col);
    }

    /// Compacts the index maps after the presolver removed rows/columns;
    /// `None` marks a removed entity, survivors carry their new index in
    /// ascending order.
    pub fn compress_index_maps(
        &mut self,
        new_row_index: &[Option<usize>],
        new_col_index: &[Option<usize>],
    ) {
        self.index.compress(new_row_index, new_col_index);
    }

    /// Original-space index of reduced row `row`.
    pub fn orig_row(&self, row: usize) -> usize {
        self.index.orig_row(row)
    }

    /// Original-space index of reduced column `col`.
    pub fn orig_col(&self, col: usize) -> usize {
        self.index.orig_col(col)
    }

    /// Number of reductions currently logged.
    pub fn num_reductions(&self) -> usize {
        self.reductions.len()
    }

    /// Discards the log and resets the index maps to identity over the
    /// original sizes.
    pub fn clear(&mut self) {
        self.reduction_values.clear();
        self.reductions.clear();
        self.index.reset_to_original();
    }

    // --- emission entry points ------------------------------------------

    /// Free column `col` was eliminated by solving row `row` for it.
    /// `row_vec` iterates the row's nonzeros over columns (including `col`),
    /// `col_vec` the column's nonzeros over rows (including `row`), both in
    /// reduced-space indices.
    pub fn free_col_substitution<R, C>(
        &mut self,
        row: usize,
        col: usize,
        rhs: f64,
        col_cost: f64,
        row_type: RowType,
        row_vec: R,
        col_vec: C,
    ) where
        R: IntoIterator<Item = (usize, f64)>,
        C: IntoIterator<Item = (usize, f64)>,
    {
        let row_values = self.remap_cols(row_vec);
        let col_values = self.remap_rows(col_vec);

        self.reduction_values.push(FreeColSubstitution {
            rhs,
            col_cost,
            row: self.index.orig_row(row),
            col: self.index.orig_col(col),
            row_type,
        });
        self.reduction_values.push_slice(&row_values);
        self.reduction_values.push_slice(&col_values);
        self.reductions.push(ReductionType::FreeColSubstitution);
    }

    /// Variable `col_subst` was eliminated from the doubleton equation
    /// `coef * x_col + coef_subst * x_subst = rhs`, tightening the kept
    /// column's bounds from `(old_lower, old_upper)` to
    /// `(new_lower, new_upper)`. `col_vec` iterates `col_subst`'s nonzeros
    /// over rows (including `row`).
    pub fn doubleton_equation<C>(
        &mut self,
        row: usize,
        col_subst: usize,
        col: usize,
        coef_subst: f64,
        coef: f64,
        rhs: f64,
        subst_lower: f64,
        subst_upper: f64,
        old_lower: f64,
        old_upper: f64,
        new_lower: f64,
        new_upper: f64,
        subst_cost: f64,
        col_vec: C,
    ) where
        C: IntoIterator<Item = (usize, f64)>,
    {
        let col_values = self.remap_rows(col_vec);

        self.reduction_values.push(DoubletonEquation {
            coef,
            coef_subst,
            rhs,
            subst_lower,
            subst_upper,
            subst_cost,
            row: self.index.orig_row(row),
            col_subst: self.index.orig_col(col_subst),
            col: self.index.orig_col(col),
            lower_tightened: old_lower < new_lower,
            upper_tightened: old_upper > new_upper,
        });
        self.reduction_values.push_slice(&col_values);
        self.reductions.push(ReductionType::DoubletonEquation);
    }

    /// Row `row` was modified by adding `eq_row_scale` times the equality
    /// row `added_eq_row` to it.
    pub fn equality_row_addition(&mut self, row: usize, added_eq_row: usize, eq_row_scale: f64) {
        self.reduction_values.push(EqualityRowAddition {
            row: self.index.orig_row(row),
            added_eq_row: self.index.orig_row(added_eq_row),
            eq_row_scale,
        });
        self.reductions.push(ReductionType::EqualityRowAddition);
    }

    /// The singleton row `coef * x_col` was removed, possibly after
    /// tightening the column's bounds.
    pub fn singleton_row(
        &mut self,
        row: usize,
        col: usize,
        coef: f64,
        tightened_col_lower: bool,
        tightened_col_upper: bool,
    ) {
        self.reduction_values.push(SingletonRow {
            coef,
            row: self.index.orig_row(row),
            col: self.index.orig_col(col),
            col_lower_tightened: tightened_col_lower,
            col_upper_tightened: tightened_col_upper,
        });
        self.reductions.push(ReductionType::SingletonRow);
    }

    /// Column fixed at its lower bound. `col_vec` iterates the column's
    /// nonzeros over the rows staying in the problem.
    pub fn fixed_col_at_lower<C>(
        &mut self,
        col: usize,
        fix_value: f64,
        col_cost: f64,
        col_vec: C,
    ) -> Result<(), PostsolveError>
    where
        C: IntoIterator<Item = (usize, f64)>,
    {
        self.fixed_col(col, fix_value, col_cost, BasisStatus::AtLower, col_vec)
    }

    /// Column fixed at its upper bound.
    pub fn fixed_col_at_upper<C>(
        &mut self,
        col: usize,
        fix_value: f64,
        col_cost: f64,
        col_vec: C,
    ) -> Result<(), PostsolveError>
    where
        C: IntoIterator<Item = (usize, f64)>,
    {
        self.fixed_col(col, fix_value, col_cost, BasisStatus::AtUpper, col_vec)
    }

    /// Column removed because both bounds coincide; the basis side is picked
    /// from the reduced-cost sign during undo.
    pub fn removed_fixed_col<C>(
        &mut self,
        col: usize,
        fix_value: f64,
        col_cost: f64,
        col_vec: C,
    ) -> Result<(), PostsolveError>
    where
        C: IntoIterator<Item = (usize, f64)>,
    {
        self.fixed_col(col, fix_value, col_cost, BasisStatus::Nonbasic, col_vec)
    }

    fn fixed_col<C>(
        &mut self,
        col: usize,
        fix_value: f64,
        col_cost: f64,
        fix_type: BasisStatus,
        col_vec: C,
    ) -> Result<(), PostsolveError>
    where
        C: IntoIterator<Item = (usize, f64)>,
    {
        if !fix_value.is_finite() {
            return Err(PostsolveError::Precondition(format!(
                "column {col} fixed at non-finite value {fix_value}"
            )));
        }
        let col_values = self.remap_rows(col_vec);

        self.reduction_values.push(FixedCol {
            fix_value,
            col_cost,
            col: self.index.orig_col(col),
            fix_type,
        });
        self.reduction_values.push_slice(&col_values);
        self.reductions.push(ReductionType::FixedCol);
        Ok(())
    }

    /// Row carrying no active constraint was removed.
    pub fn redundant_row(&mut self, row: usize) {
        self.reduction_values.push(RedundantRow {
            row: self.index.orig_row(row),
        });
        self.reductions.push(ReductionType::RedundantRow);
    }

    /// Row whose side forced every contained column to a bound. `row_vec`
    /// iterates the row's nonzeros over columns.
    pub fn forcing_row<R>(&mut self, row: usize, row_vec: R, side: f64, row_type: RowType)
    where
        R: IntoIterator<Item = (usize, f64)>,
    {
        let row_values = self.remap_cols(row_vec);

        self.reduction_values.push(ForcingRow {
            side,
            row: self.index.orig_row(row),
            row_type,
        });
        self.reduction_values.push_slice(&row_values);
        self.reductions.push(ReductionType::ForcingRow);
    }

    /// Column pushed toward an infinite bound by the objective, removed at
    /// the value where the tightest of its rows binds. `col_vec` iterates
    /// the column's nonzeros over rows, `sides` the matching binding side of
    /// each of those rows, in the same order. Emit one
    /// [`Self::forcing_column_removed_row`] per contained row afterwards.
    pub fn forcing_column<C, S>(
        &mut self,
        col: usize,
        col_vec: C,
        col_cost: f64,
        at_infinite_upper: bool,
        sides: S,
    ) where
        C: IntoIterator<Item = (usize, f64)>,
        S: IntoIterator<Item = (usize, f64)>,
    {
        let col_values = self.remap_rows(col_vec);
        let col_sides = self.remap_rows(sides);

        self.reduction_values.push(ForcingColumn {
            col_cost,
            col: self.index.orig_col(col),
            at_infinite_upper,
        });
        self.reduction_values.push_slice(&col_values);
        self.reduction_values.push_slice(&col_sides);
        self.reductions.push(ReductionType::ForcingColumn);
    }

    /// One row removed together with a forcing column. `row_vec` iterates
    /// the row's nonzeros over the columns staying in the problem.
    pub fn forcing_column_removed_row<R>(&mut self, row: usize, row_vec: R)
    where
        R: IntoIterator<Item = (usize, f64)>,
    {
        let row_values = self.remap_cols(row_vec);

        self.reduction_values.push(ForcingColumnRemovedRow {
            row: self.index.orig_row(row),
        });
        self.reduction_values.push_slice(&row_values);
        self.reductions.push(ReductionType::ForcingColumnRemovedRow);
    }

    /// Row `row` was removed as `duplicate_row_scale` times `duplicate_row`.
    pub fn duplicate_row(
        &mut self,
        row: usize,
        row_upper_tightened: bool,
        row_lower_tightened: bool,
        duplicate_row: usize,
        duplicate_row_scale: f64,
    ) {
        self.reduction_values.push(DuplicateRow {
            duplicate_row_scale,
            duplicate_row: self.index.orig_row(duplicate_row),
            row: self.index.orig_row(row),
            row_lower_tightened,
            row_upper_tightened,
        });
        self.reductions.push(ReductionType::DuplicateRow);
    }

    /// Column `duplicate_col` was merged into `col` with scale `col_scale`.
    pub fn duplicate_column(
        &mut self,
        col_scale: f64,
        col_lower: f64,
        col_upper: f64,
        duplicate_col_lower: f64,
        duplicate_col_upper: f64,
        col: usize,
        duplicate_col: usize,
        col_integral: bool,
        duplicate_col_integral: bool,
    ) {
        self.reduction_values.push(DuplicateColumn {
            col_scale,
            col_lower,
            col_upper,
            duplicate_col_lower,
            duplicate_col_upper,
            col: self.index.orig_col(col),
            duplicate_col: self.index.orig_col(duplicate_col),
            col_integral,
            duplicate_col_integral,
        });
        self.reductions.push(ReductionType::DuplicateColumn);
    }

    fn remap_rows<I>(&self, pairs: I) -> Vec<Nonzero>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        pairs
            .into_iter()
            .map(|(index, value)| Nonzero::new(self.index.orig_row(index), value))
            .collect()
    }

    fn remap_cols<I>(&self, pairs: I) -> Vec<Nonzero>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        pairs
            .into_iter()
            .map(|(index, value)| Nonzero::new(self.index.orig_col(index), value))
            .collect()
    }

    // --- replay ----------------------------------------------------------

    /// Replays the whole log backward, lifting `solution` (and, when its
    /// dual vectors are sized like the primal ones, the duals and `basis`)
    /// from the reduced space to the original space.
    pub fn undo(
        &mut self,
        solution: &mut Solution,
        basis: &mut Basis,
        feastol: f64,
    ) -> Result<PostsolveReport, PostsolveError> {
        self.undo_until(solution, basis, feastol, 0)
    }

    /// Replays the log backward down to (and excluding) record
    /// `num_reductions`, leaving the earlier records and their arena content
    /// in place. After a staged call the solution lives in the original
    /// index space and the maps are identity, so a later
    /// `undo_until(j <= num_reductions)` continues where this one stopped.
    pub fn undo_until(
        &mut self,
        solution: &mut Solution,
        basis: &mut Basis,
        feastol: f64,
        num_reductions: usize,
    ) -> Result<PostsolveReport, PostsolveError> {
        self.reduction_values.reset_position();

        if num_reductions > self.reductions.len() {
            return Err(PostsolveError::Precondition(format!(
                "asked to keep {num_reductions} reductions but only {} are logged",
                self.reductions.len()
            )));
        }

        let reduced_rows = self.index.num_reduced_row();
        let reduced_cols = self.index.num_reduced_col();
        if solution.row_value.len() != reduced_rows || solution.col_value.len() != reduced_cols {
            return Err(PostsolveError::SizeMismatch {
                expected_rows: reduced_rows,
                expected_cols: reduced_cols,
                rows: solution.row_value.len(),
                cols: solution.col_value.len(),
            });
        }

        let dual_postsolve = solution.col_dual.len() == solution.col_value.len()
            && solution.row_dual.len() == solution.row_value.len();
        if dual_postsolve
            && (basis.row_status.len() != reduced_rows || basis.col_status.len() != reduced_cols)
        {
            return Err(PostsolveError::SizeMismatch {
                expected_rows: reduced_rows,
                expected_cols: reduced_cols,
                rows: basis.row_status.len(),
                cols: basis.col_status.len(),
            });
        }

        // expand to the original index space; orig_*[i] >= i makes the
        // backward pass aliasing-safe
        let orig_num_row = self.index.orig_num_row();
        let orig_num_col = self.index.orig_num_col();
        expand_backward(&mut solution.col_value, self.index.col_map(), orig_num_col, 0.0);
        expand_backward(&mut solution.row_value, self.index.row_map(), orig_num_row, 0.0);
        if dual_postsolve {
            expand_backward(&mut solution.col_dual, self.index.col_map(), orig_num_col, 0.0);
            expand_backward(&mut solution.row_dual, self.index.row_map(), orig_num_row, 0.0);
            expand_backward(
                &mut basis.col_status,
                self.index.col_map(),
                orig_num_col,
                BasisStatus::Nonbasic,
            );
            expand_backward(
                &mut basis.row_status,
                self.index.row_map(),
                orig_num_row,
                BasisStatus::Nonbasic,
            );
        }

        let mut report = PostsolveReport::default();
        let mut row_values: Vec<Nonzero> = Vec::new();
        let mut col_values: Vec<Nonzero> = Vec::new();

        for i in (num_reductions..self.reductions.len()).rev() {
            match self.reductions[i] {
                ReductionType::FreeColSubstitution => {
                    self.reduction_values.pop_slice(&mut col_values)?;
                    self.reduction_values.pop_slice(&mut row_values)?;
                    let reduction: FreeColSubstitution = self.reduction_values.pop()?;
                    reduction.undo(&row_values, &col_values, solution, basis, dual_postsolve)?;
                }
                ReductionType::DoubletonEquation => {
                    self.reduction_values.pop_slice(&mut col_values)?;
                    let reduction: DoubletonEquation = self.reduction_values.pop()?;
                    reduction.undo(&col_values, solution, basis, dual_postsolve, feastol)?;
                }
                ReductionType::EqualityRowAddition => {
                    let reduction: EqualityRowAddition = self.reduction_values.pop()?;
                    reduction.undo(solution, dual_postsolve);
                }
                ReductionType::SingletonRow => {
                    let reduction: SingletonRow = self.reduction_values.pop()?;
                    reduction.undo(solution, basis, dual_postsolve)?;
                }
                ReductionType::FixedCol => {
                    self.reduction_values.pop_slice(&mut col_values)?;
                    let reduction: FixedCol = self.reduction_values.pop()?;
                    reduction.undo(&col_values, solution, basis, dual_postsolve);
                }
                ReductionType::RedundantRow => {
                    let reduction: RedundantRow = self.reduction_values.pop()?;
                    reduction.undo(solution, basis, dual_postsolve);
                }
                ReductionType::ForcingRow => {
                    self.reduction_values.pop_slice(&mut row_values)?;
                    let reduction: ForcingRow = self.reduction_values.pop()?;
                    reduction.undo(&row_values, solution, basis, dual_postsolve);
                }
                ReductionType::ForcingColumn => {
                    // the side slice was pushed last
                    let mut col_sides: Vec<Nonzero> = Vec::new();
                    self.reduction_values.pop_slice(&mut col_sides)?;
                    self.reduction_values.pop_slice(&mut col_values)?;
                    let reduction: ForcingColumn = self.reduction_values.pop()?;
                    reduction.undo(&col_values, &col_sides, solution, basis, dual_postsolve)?;
                }
                ReductionType::ForcingColumnRemovedRow => {
                    self.reduction_values.pop_slice(&mut row_values)?;
                    let reduction: ForcingColumnRemovedRow = self.reduction_values.pop()?;
                    reduction.undo(&row_values, solution, basis, dual_postsolve);
                }
                ReductionType::DuplicateRow => {
                    let reduction: DuplicateRow = self.reduction_values.pop()?;
                    reduction.undo(solution, basis, dual_postsolve)?;
                }
                ReductionType::DuplicateColumn => {
                    let reduction: DuplicateColumn = self.reduction_values.pop()?;
                    if !reduction.undo(solution, basis, dual_postsolve, feastol) {
                        report.integer_split_failures += 1;
                    }
                }
            }
        }

        // keep only the residual prefix so a later staged call replays from
        // a consistent cursor
        self.reductions.truncate(num_reductions);
        self.reduction_values.truncate_to_position();
        self.index.reset_to_original();

        Ok(report)
    }
}

/// Expands `values` from the reduced to the original space in place. The map
/// invariant `map[i] >= i` guarantees a backward pass never overwrites an
/// entry it still has to read.
fn expand_backward<T: Copy>(values: &mut Vec<T>, map: &[usize], orig_len: usize, fill: T) {
    debug_assert_eq!(values.len(), map.len());
    values.resize(orig_len, fill);
    for i in (0..map.len()).rev() {
        debug_assert!(map[i] >= i);
        values[map[i]] = values[i];
    }
}

/// Nonzeros of one outer dimension of a sparse matrix as `(index, value)`
/// pairs: a column of a CSC matrix or a row of a CSR matrix, the shape
/// every emission entry point accepts.
pub fn outer_nonzeros(matrix: &CsMat<f64>, outer: usize) -> Vec<(usize, f64)> {
    match matrix.outer_view(outer) {
        Some(view) => view.iter().map(|(index, &value)| (index, value)).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_backward_aliasing() {
        // reduced entries 0..3 map to original slots 0, 2, 4
        let mut values = vec![10.0, 20.0, 30.0];
        expand_backward(&mut values, &[0, 2, 4], 5, 0.0);
        assert_eq!(values[0], 10.0);
        assert_eq!(values[2], 20.0);
        assert_eq!(values[4], 30.0);
    }

    #[test]
    fn test_emission_remaps_indices() {
        let mut stack = PostsolveStack::new();
        stack.initialize_index_maps(4, 4);
        // rows 0 and 2 were removed earlier
        stack.compress_index_maps(
            &[None, Some(0), None, Some(1)],
            &[Some(0), Some(1), Some(2), Some(3)],
        );

        assert_eq!(stack.orig_row(0), 1);
        assert_eq!(stack.orig_row(1), 3);

        // fixing a column referencing reduced row 1 must log original row 3
        stack
            .fixed_col_at_lower(2, 0.0, 1.0, [(1, 5.0)])
            .unwrap();
        stack.compress_index_maps(
            &[Some(0), Some(1)],
            &[Some(0), Some(1), None, Some(2)],
        );

        let mut solution = Solution::with_duals(
            vec![1.0, 1.0, 1.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![0.0, 0.0],
        );
        let mut basis = Basis::new(
            vec![BasisStatus::Basic; 3],
            vec![BasisStatus::Basic; 2],
        );
        stack.undo(&mut solution, &mut basis, 1e-9).unwrap();

        assert_eq!(solution.col_value.len(), 4);
        assert_eq!(solution.row_value.len(), 4);
        // the fixed column landed at original index 2 with value 0
        assert_eq!(solution.col_value[2], 0.0);
        assert_eq!(basis.col_status[2], BasisStatus::AtLower);
    }

    #[test]
    fn test_non_finite_fix_value_is_rejected() {
        let mut stack = PostsolveStack::new();
        stack.initialize_index_maps(1, 1);
        let err = stack
            .fixed_col_at_lower(0, f64::INFINITY, 1.0, std::iter::empty::<(usize, f64)>())
            .unwrap_err();
        assert!(matches!(err, PostsolveError::Precondition(_)));
        assert_eq!(stack.num_reductions(), 0);
    }

    #[test]
    fn test_undo_size_mismatch() {
        let mut stack = PostsolveStack::new();
        stack.initialize_index_maps(2, 2);

        let mut solution = Solution::primal(vec![0.0], vec![0.0, 0.0]);
        let mut basis = Basis::default();
        let err = stack.undo(&mut solution, &mut basis, 1e-9).unwrap_err();
        assert!(matches!(err, PostsolveError::SizeMismatch { .. }));
    }

    #[test]
    fn test_outer_nonzeros() {
        let mut tri = sprs::TriMat::new((3, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(2, 0, -2.0);
        tri.add_triplet(1, 1, 3.0);
        let matrix = tri.to_csc();

        assert_eq!(outer_nonzeros(&matrix, 0), vec![(0, 1.0), (2, -2.0)]);
        assert_eq!(outer_nonzeros(&matrix, 1), vec![(1, 3.0)]);
    }
}
