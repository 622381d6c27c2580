//! Reversible reduction log and postsolve transforms for LP/MIP presolving.
//!
//! A presolver shrinks a linear or mixed-integer program by eliminating
//! variables, tightening bounds, and removing redundant rows. Each
//! transformation is recorded on a [`PostsolveStack`]; once the reduced
//! problem is solved, replaying the stack backward lifts the reduced
//! solution (primal values, and optionally duals and a basis) onto the
//! original problem.
//!
//! # Example
//!
//! ```
//! use presolve_core::{Basis, BasisStatus, PostsolveStack, RowType, Solution};
//!
//! // original LP: min x + y  s.t.  2x + 3y = 6,  0 <= x, y <= 10.
//! // The presolver substitutes y = (6 - 2x) / 3 out of the equation.
//! let mut stack = PostsolveStack::new();
//! stack.initialize_index_maps(1, 2);
//! stack.doubleton_equation(
//!     0, 1, 0,       // row, substituted col, kept col
//!     3.0, 2.0, 6.0, // coef_subst, coef, rhs
//!     0.0, 10.0,     // substituted bounds
//!     0.0, 10.0, 0.0, 3.0, // kept bounds: old, then tightened
//!     1.0,           // substituted cost
//!     [(0, 3.0)],
//! );
//! stack.compress_index_maps(&[None], &[Some(0), None]);
//!
//! // the reduced problem min (1/3) x over 0 <= x <= 3 is solved at x = 0
//! let mut solution = Solution::with_duals(vec![0.0], vec![], vec![1.0], vec![]);
//! let mut basis = Basis::new(vec![BasisStatus::AtLower], vec![]);
//! stack.undo(&mut solution, &mut basis, 1e-9).unwrap();
//!
//! assert_eq!(solution.col_value, vec![0.0, 2.0]); // y = 2 restored
//! assert_eq!(solution.row_value, vec![6.0]);
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // emission entry points mirror the reduction record fields

pub mod error;
pub mod postsolve;
pub mod solution;

pub use error::{PostsolveError, PostsolveResult};
pub use postsolve::{outer_nonzeros, Nonzero, PostsolveReport, PostsolveStack};
pub use solution::{Basis, BasisStatus, RowType, Solution};
