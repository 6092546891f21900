use crate::im::{BinIm, Im, Lum8Im, BACKGROUND, LINE};
use crate::point::PointSet;

fn grid_rows(grid: &str) -> Vec<&str> {
    let rows: Vec<&str> = grid
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let h = rows.len();
    assert!(h > 0, "grid must have at least one non-empty row");
    let w = rows[0].len();
    assert!(w > 0, "grid rows must be non-empty");
    for r in &rows {
        assert_eq!(r.len(), w, "all rows must have equal length");
    }
    rows
}

/// '#' becomes white foreground (255), '.' background (0). For border-trace
/// inputs, where the traced regions are the bright ones.
pub fn bin_im_from_ascii(grid: &str) -> BinIm {
    let rows = grid_rows(grid);
    let mut im = BinIm::new(rows[0].len(), rows.len());
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            im.arr[y * im.s + x] = match ch {
                '#' => 255,
                '.' => 0,
                _ => panic!("invalid binary char '{ch}', expected '#' or '.'"),
            };
        }
    }
    im
}

/// '#' becomes line ink (0) on a white background (255). For thinning
/// inputs, where the lines are the dark strokes.
pub fn line_im_from_ascii(grid: &str) -> BinIm {
    let rows = grid_rows(grid);
    let mut im = BinIm::new(rows[0].len(), rows.len());
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            im.arr[y * im.s + x] = match ch {
                '#' => LINE,
                '.' => BACKGROUND,
                _ => panic!("invalid line char '{ch}', expected '#' or '.'"),
            };
        }
    }
    im
}

/// Digits become raw intensities 0..=9.
pub fn lum_im_from_ascii(grid: &str) -> Lum8Im {
    let rows = grid_rows(grid);
    let mut im = Im::<u8>::new(rows[0].len(), rows.len());
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let v = ch
                .to_digit(10)
                .unwrap_or_else(|| panic!("invalid intensity char '{ch}', expected digit"))
                as u8;
            im.arr[y * im.s + x] = v;
        }
    }
    im
}

pub fn points_to_ascii(points: &PointSet, w: usize, h: usize) -> String {
    let mut out = String::new();
    for y in 0..h {
        for x in 0..w {
            let hit = points.contains(crate::point::Point::new(x as i32, y as i32));
            out.push(if hit { '#' } else { '.' });
        }
        out.push('\n');
    }
    out
}
