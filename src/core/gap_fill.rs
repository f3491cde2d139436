use crate::types::{BandStack, PollutionError, PollutionResult};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use num_traits::Float;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Nearest-neighbour gap filler for missing (NaN) grid cells
pub struct GapFiller;

impl GapFiller {
    /// Replace every NaN cell with the value of the nearest non-NaN cell.
    ///
    /// Distance is Euclidean in grid indices. Equidistant candidates resolve
    /// to the lowest row, then the lowest column. A grid without any valid
    /// cell is returned unchanged.
    pub fn fill<F: Float>(grid: &ArrayView2<F>) -> Array2<F> {
        let missing = grid.iter().filter(|v| v.is_nan()).count();
        if missing == 0 {
            return grid.to_owned();
        }

        let (height, width) = grid.dim();
        if missing == height * width {
            log::warn!("Grid {}x{} has no valid cells, leaving it unfilled", height, width);
            return grid.to_owned();
        }

        let nearest_rows = column_pass(grid);
        let mut filled = grid.to_owned();

        for (row, mut out) in filled.outer_iter_mut().enumerate() {
            let sites = row_pass(nearest_rows.row(row), row, width);
            for (col, value) in out.iter_mut().enumerate() {
                if value.is_nan() {
                    let (r, c) = sites[col];
                    *value = grid[[r, c]];
                }
            }
        }

        log::debug!(
            "Filled {} missing cells ({:.2}%)",
            missing,
            missing as f64 / (height * width) as f64 * 100.0
        );
        filled
    }

    /// Fill each channel of a (band, row, col) stack independently
    pub fn fill_channels(stack: &BandStack) -> PollutionResult<BandStack> {
        let channels: Vec<ArrayView2<f64>> = stack.axis_iter(Axis(0)).collect();

        #[cfg(feature = "parallel")]
        let filled: Vec<Array2<f64>> = channels.par_iter().map(|c| Self::fill(c)).collect();
        #[cfg(not(feature = "parallel"))]
        let filled: Vec<Array2<f64>> = channels.iter().map(|c| Self::fill(c)).collect();

        let views: Vec<ArrayView2<f64>> = filled.iter().map(|a| a.view()).collect();
        ndarray::stack(Axis(0), &views)
            .map_err(|e| PollutionError::Processing(format!("Failed to restack channels: {}", e)))
    }
}

/// Nearest valid row in each cell's own column, ties going to the upper row
fn column_pass<F: Float>(grid: &ArrayView2<F>) -> Array2<Option<usize>> {
    let (height, width) = grid.dim();
    let mut nearest = Array2::from_elem((height, width), None);

    for col in 0..width {
        let mut above = None;
        for row in 0..height {
            if !grid[[row, col]].is_nan() {
                above = Some(row);
            }
            nearest[[row, col]] = above;
        }

        let mut below = None;
        for row in (0..height).rev() {
            if !grid[[row, col]].is_nan() {
                below = Some(row);
            }
            if let Some(b) = below {
                let closer = match nearest[[row, col]] {
                    Some(a) => b - row < row - a,
                    None => true,
                };
                if closer {
                    nearest[[row, col]] = Some(b);
                }
            }
        }
    }

    nearest
}

/// Column candidate `dy² + (x - col)²` in the lower envelope of one row
struct Parabola {
    col: i64,
    dy2: i64,
    site_row: usize,
    /// First column at which this candidate wins
    start: i64,
}

impl Parabola {
    /// First column `x` where `self` (to the right of `other`) beats `other`
    /// under (d², row, col) ordering
    fn first_win(&self, other: &Parabola) -> i64 {
        let num = (self.dy2 + self.col * self.col) - (other.dy2 + other.col * other.col);
        let den = 2 * (self.col - other.col);

        if (self.site_row, self.col) < (other.site_row, other.col) {
            -(-num).div_euclid(den)
        } else {
            num.div_euclid(den) + 1
        }
    }
}

/// Nearest valid (row, col) for every column of `row`, given the per-column
/// nearest rows. Lower envelope of parabolas, linear in `width`.
fn row_pass(nearest_rows: ArrayView1<Option<usize>>, row: usize, width: usize) -> Vec<(usize, usize)> {
    let mut hull: Vec<Parabola> = Vec::with_capacity(width);

    for (col, site) in nearest_rows.iter().enumerate() {
        let site_row = match site {
            Some(r) => *r,
            None => continue,
        };
        let dy = site_row as i64 - row as i64;
        let mut candidate = Parabola { col: col as i64, dy2: dy * dy, site_row, start: i64::MIN };

        while let Some(top) = hull.last() {
            let start = candidate.first_win(top);
            if start <= top.start {
                hull.pop();
            } else {
                candidate.start = start;
                break;
            }
        }
        hull.push(candidate);
    }

    let mut sites = Vec::with_capacity(width);
    let mut k = 0;
    for x in 0..width as i64 {
        while k + 1 < hull.len() && hull[k + 1].start <= x {
            k += 1;
        }
        sites.push(hull.get(k).map_or((row, x as usize), |p| (p.site_row, p.col as usize)));
    }
    sites
}
