use calib_core::nalgebra::{self, DMatrix, RealField};
use log::*;

/// A row to column assignment produced by [`Munkres::solve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    row_matches: Vec<usize>,
    columns: usize,
}

impl Assignment {
    /// The matched column of every row. Unmatched rows hold [`Assignment::columns`], which is
    /// out of range for the cost matrix.
    pub fn row_match_list(&self) -> &[usize] {
        &self.row_matches
    }

    /// The matched column of `row`, if any.
    pub fn column(&self, row: usize) -> Option<usize> {
        self.row_matches
            .get(row)
            .copied()
            .filter(|&column| column < self.columns)
    }

    /// Matched `(row, column)` pairs in row order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_matches
            .iter()
            .enumerate()
            .filter(move |&(_, &column)| column < self.columns)
            .map(|(row, &column)| (row, column))
    }

    pub fn rows(&self) -> usize {
        self.row_matches.len()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// The number of matched rows, which is `min(rows, columns)`.
    pub fn len(&self) -> usize {
        self.pairs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The summed cost of the matched cells.
    pub fn total_cost<T: RealField + Copy>(&self, costs: &DMatrix<T>) -> T {
        self.pairs()
            .fold(T::zero(), |total, (row, column)| total + costs[(row, column)])
    }
}

/// Minimum cost assignment between the rows and columns of a cost matrix (the Hungarian
/// method of Kuhn and Munkres).
///
/// Every row is matched to a distinct column, or every column to a distinct row when there
/// are more rows than columns, such that the summed cost of the matched cells is minimal.
/// Cells that are not finite are treated as more expensive than any combination of finite
/// cells, so they are only used if nothing else is possible.
#[derive(Debug, Clone)]
pub struct Munkres<T: RealField + Copy> {
    costs: DMatrix<T>,
}

impl<T: RealField + Copy> Munkres<T> {
    pub fn new(costs: DMatrix<T>) -> Self {
        Self { costs }
    }

    pub fn costs(&self) -> &DMatrix<T> {
        &self.costs
    }

    pub fn solve(&self) -> Assignment {
        let (rows, columns) = self.costs.shape();
        let mut row_matches = vec![columns; rows];
        if rows == 0 || columns == 0 {
            return Assignment {
                row_matches,
                columns,
            };
        }

        let costs = sanitize(&self.costs);
        if rows <= columns {
            for (row, column) in assign(&costs) {
                row_matches[row] = column;
            }
        } else {
            for (column, row) in assign(&costs.transpose()) {
                row_matches[row] = column;
            }
        }
        debug!(
            "assigned {} of {} rows to {} columns",
            row_matches.iter().filter(|&&c| c < columns).count(),
            rows,
            columns
        );
        Assignment {
            row_matches,
            columns,
        }
    }
}

/// Replaces cells that are not finite by a cost above the sum of all finite cells.
fn sanitize<T: RealField + Copy>(costs: &DMatrix<T>) -> DMatrix<T> {
    let finite_total = costs
        .iter()
        .filter(|c| c.is_finite())
        .fold(T::zero(), |total, &c| total + c.abs());
    let prohibitive = finite_total + T::one();
    costs.map(|c| if c.is_finite() { c } else { prohibitive })
}

/// Shortest augmenting path assignment with dual potentials, for `rows <= columns`.
///
/// Returns the matched `(row, column)` pairs; every row is matched.
fn assign<T: RealField + Copy>(costs: &DMatrix<T>) -> Vec<(usize, usize)> {
    let (n, m) = costs.shape();
    debug_assert!(n <= m);
    let total = costs.iter().fold(T::zero(), |total, &c| total + c.abs());
    let infinity = (total + T::one()) * nalgebra::convert::<f64, T>((n + m + 2) as f64);

    // Index 0 is a virtual row and column, so rows and columns are one based below.
    let mut u = vec![T::zero(); n + 1];
    let mut v = vec![T::zero(); m + 1];
    let mut matched_row = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        matched_row[0] = row;
        let mut column = 0;
        let mut min_reduced = vec![infinity; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[column] = true;
            let current_row = matched_row[column];
            let mut delta = infinity;
            let mut next_column = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = costs[(current_row - 1, j - 1)] - u[current_row] - v[j];
                if reduced < min_reduced[j] {
                    min_reduced[j] = reduced;
                    way[j] = column;
                }
                if min_reduced[j] < delta {
                    delta = min_reduced[j];
                    next_column = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[matched_row[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_reduced[j] -= delta;
                }
            }
            column = next_column;
            if matched_row[column] == 0 {
                break;
            }
        }
        // Flip the augmenting path.
        while column != 0 {
            let previous = way[column];
            matched_row[column] = matched_row[previous];
            column = previous;
        }
    }

    (1..=m)
        .filter(|&j| matched_row[j] != 0)
        .map(|j| (matched_row[j] - 1, j - 1))
        .collect()
}
