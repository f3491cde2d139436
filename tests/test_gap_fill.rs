use ndarray::Array2;
use pollusat::GapFiller;
use std::time::{Duration, Instant};

/// Small deterministic generator so grids are reproducible without extra deps
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn random_grid(rng: &mut Lcg, height: usize, width: usize, missing_fraction: f64) -> Array2<f64> {
    Array2::from_shape_fn((height, width), |_| {
        let keep = rng.next() >= missing_fraction;
        let value = rng.next() * 100.0;
        if keep { value } else { f64::NAN }
    })
}

/// Exhaustive nearest valid cell with (dist², row, col) ordering
fn brute_force_nearest(grid: &Array2<f64>, row: usize, col: usize) -> Option<f64> {
    grid.indexed_iter()
        .filter(|(_, v)| !v.is_nan())
        .map(|((r, c), v)| {
            let dr = r as i64 - row as i64;
            let dc = c as i64 - col as i64;
            ((dr * dr + dc * dc, r, c), *v)
        })
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, v)| v)
}

#[test]
fn test_matches_exhaustive_search() {
    let mut rng = Lcg(42);

    for &(h, w, frac) in &[(8, 8, 0.3), (13, 7, 0.8), (1, 25, 0.5), (30, 30, 0.97), (5, 5, 0.0)] {
        let grid = random_grid(&mut rng, h, w, frac);
        let filled = GapFiller::fill(&grid.view());

        for ((r, c), v) in grid.indexed_iter() {
            if v.is_nan() {
                match brute_force_nearest(&grid, r, c) {
                    Some(expected) => assert_eq!(filled[[r, c]], expected, "cell ({}, {}) of {}x{}", r, c, h, w),
                    None => assert!(filled[[r, c]].is_nan()),
                }
            } else {
                assert_eq!(filled[[r, c]], *v);
            }
        }
    }
}

#[test]
fn test_complete_whenever_any_cell_is_valid() {
    let mut rng = Lcg(7);

    for _ in 0..20 {
        let mut grid = random_grid(&mut rng, 16, 11, 0.9);
        grid[[15, 0]] = 1.0;

        let filled = GapFiller::fill(&grid.view());
        assert!(filled.iter().all(|v| !v.is_nan()));
    }
}

#[test]
fn test_idempotent_on_complete_grid() {
    let mut rng = Lcg(99);
    let grid = random_grid(&mut rng, 9, 12, 0.0);

    let once = GapFiller::fill(&grid.view());
    assert_eq!(once, grid);
    assert_eq!(GapFiller::fill(&once.view()), once);
}

#[test]
fn test_boundary_gaps() {
    let mut grid = Array2::from_elem((6, 6), f64::NAN);
    grid[[2, 3]] = 4.0;

    let filled = GapFiller::fill(&grid.view());
    assert!(filled.iter().all(|v| *v == 4.0));
}

#[test]
fn test_lattice_ties_match_exhaustive_search() {
    // valid cells on a regular lattice put many gaps at equal distance from several of them
    for &(h, w, step) in &[(13, 13, 4), (10, 17, 3), (9, 9, 2), (16, 5, 5)] {
        let grid = Array2::from_shape_fn((h, w), |(r, c)| {
            if r % step == 0 && c % step == 1 { (r * w + c) as f64 } else { f64::NAN }
        });
        let filled = GapFiller::fill(&grid.view());

        for ((r, c), v) in grid.indexed_iter() {
            if v.is_nan() {
                assert_eq!(Some(filled[[r, c]]), brute_force_nearest(&grid, r, c), "cell ({}, {})", r, c);
            }
        }
    }
}

#[test]
fn test_large_grid_with_single_valid_corner() {
    let mut grid = Array2::from_elem((600, 600), f64::NAN);
    grid[[0, 0]] = 1.0;

    let start = Instant::now();
    let filled = GapFiller::fill(&grid.view());
    let elapsed = start.elapsed();

    assert!(filled.iter().all(|v| *v == 1.0));
    assert!(elapsed < Duration::from_secs(5), "filling took {:?}", elapsed);
}

#[test]
fn test_large_grid_split_between_opposite_corners() {
    let n = 512;
    let mut grid = Array2::from_elem((n, n), f64::NAN);
    grid[[0, 0]] = 1.0;
    grid[[n - 1, n - 1]] = 2.0;

    let filled = GapFiller::fill(&grid.view());

    for ((r, c), v) in filled.indexed_iter() {
        let to_origin = r * r + c * c;
        let to_far = (n - 1 - r).pow(2) + (n - 1 - c).pow(2);
        // equal distances go to the lower row, which is the origin
        let expected = if to_origin <= to_far { 1.0 } else { 2.0 };
        assert_eq!(*v, expected, "cell ({}, {})", r, c);
    }
}
