use std::collections::VecDeque;

use log::debug;

use crate::im::{BinIm, Lum8Im, BACKGROUND, LINE};
use crate::point::{Point, PointSet};

/// Offsets of the eight neighbours in the cyclic order the connectivity guard
/// walks them: N, NE, E, SE, S, SW, W, NW.
const RING: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Edge-sharing neighbour offsets.
const ORTHO: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

// Border trace
// -----------------------------------------------------------------------------

/// Collect the inner one-pixel boundary of the white regions of a binary
/// image: every nonzero pixel with at least one background 4-neighbour.
/// Out-of-bounds neighbours count as background. Discovery order is
/// column-major (x outer, y inner).
pub fn points_by_border_trace(im: &BinIm) -> PointSet {
    let mut out = PointSet::new();
    for x in 0..im.w as i32 {
        for y in 0..im.h as i32 {
            if im.get_or(x, y, 0) == 0 {
                continue;
            }
            let on_border = ORTHO
                .iter()
                .any(|&(dx, dy)| im.get_or(x + dx, y + dy, 0) == 0);
            if on_border {
                out.push(Point::new(x, y));
            }
        }
    }
    out
}

// Colour-edge trace
// -----------------------------------------------------------------------------

/// Collect every pixel of a grayscale image that has a strictly darker
/// in-bounds 4-neighbour. This puts the boundary on the brighter side of a
/// transition; two regions of identical intensity produce no edge.
pub fn points_by_color_edge(im: &Lum8Im) -> PointSet {
    let mut out = PointSet::new();
    for x in 0..im.w as i32 {
        for y in 0..im.h as i32 {
            let c = im.get_or(x, y, 0);
            let brighter_than_neighbor = ORTHO
                .iter()
                .any(|&(dx, dy)| im.get(x + dx, y + dy).is_some_and(|n| n < c));
            if brighter_than_neighbor {
                out.push(Point::new(x, y));
            }
        }
    }
    out
}

// Thinning
// -----------------------------------------------------------------------------

/// True when removing the line pixel at (x, y) keeps the skeleton intact:
///
///   * line-end guard: at least two line 8-neighbours, so endpoints and
///     isolated pixels survive;
///   * interior guard: at least two background 8-neighbours, so fully
///     surrounded pixels wait for the wave to expose them;
///   * connectivity guard: at most one line-to-background transition around
///     the neighbour ring, so locally distinct segments stay connected.
///
/// Out-of-bounds neighbours read as background.
pub fn removable(im: &BinIm, x: i32, y: i32) -> bool {
    let ring = RING.map(|(dx, dy)| im.get_or(x + dx, y + dy, BACKGROUND) == LINE);

    let n_line = ring.iter().filter(|&&v| v).count();
    if n_line < 2 {
        return false;
    }
    if 8 - n_line < 2 {
        return false;
    }

    let mut transitions = 0;
    for i in 0..8 {
        if ring[i] && !ring[(i + 1) % 8] {
            transitions += 1;
        }
    }
    transitions <= 1
}

/// Thin the line work of a binary image (0 = line, 255 = background) to a
/// one-pixel-wide skeleton and collect the surviving line pixels in
/// column-major order.
///
/// The queue is seeded with every removable pixel, then drained FIFO. A pixel
/// is re-tested on dequeue because the image mutates while it waits; after a
/// removal, line neighbours that just became removable are enqueued. The
/// `queued` bitmap mirrors queue membership exactly so no pixel is enqueued
/// twice per wave.
pub fn points_by_thinning(im: &BinIm) -> PointSet {
    let mut work = im.clone();
    let w = work.w;

    let mut queue: VecDeque<(i32, i32)> = VecDeque::new();
    let mut queued = vec![false; work.w * work.h];

    for x in 0..work.w as i32 {
        for y in 0..work.h as i32 {
            if work.get_or(x, y, BACKGROUND) == LINE && removable(&work, x, y) {
                queue.push_back((x, y));
                queued[y as usize * w + x as usize] = true;
            }
        }
    }

    let mut n_removed = 0usize;
    while let Some((x, y)) = queue.pop_front() {
        queued[y as usize * w + x as usize] = false;
        if !removable(&work, x, y) {
            continue;
        }

        work.set(x, y, BACKGROUND);
        n_removed += 1;

        for &(dx, dy) in &RING {
            let (nx, ny) = (x + dx, y + dy);
            if work.get_or(nx, ny, BACKGROUND) != LINE {
                continue;
            }
            let qi = ny as usize * w + nx as usize;
            if queued[qi] || !removable(&work, nx, ny) {
                continue;
            }
            queue.push_back((nx, ny));
            queued[qi] = true;
        }
    }

    let mut out = PointSet::new();
    for x in 0..work.w as i32 {
        for y in 0..work.h as i32 {
            if work.get_or(x, y, BACKGROUND) == LINE {
                out.push(Point::new(x, y));
            }
        }
    }
    debug!(
        "thinning removed {} pixels, {} skeleton pixels remain",
        n_removed,
        out.len()
    );
    out
}
