use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::error::{Error, Result};
use crate::point::{Point, PointSet};

/// Ordered run of points in which consecutive vertices are 8-neighbours.
/// A closed path repeats its head as the final vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    points: Vec<Point>,
}

impl Path {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.points.contains(&p)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// Do `a` and `b` sit within `max_stride` positions of each other on this
    /// path? Index arithmetic wraps modulo the length so the closing edge of a
    /// loop counts like any other.
    pub fn has_connection(&self, a: Point, b: Point, max_stride: usize) -> bool {
        let n = self.points.len();
        for i in 0..n {
            let p = self.points[i];
            if p != a && p != b {
                continue;
            }
            for j in 1..=max_stride {
                let q = self.points[(i + j) % n];
                if (p == a && q == b) || (p == b && q == a) {
                    return true;
                }
            }
        }
        false
    }

    /// Remove interior vertices that stay within `max_dist` of the straight
    /// segment spanning their retained neighbours.
    ///
    /// Greedy windowed fit: while every vertex buffered so far fits the chord
    /// through the current retained neighbours, the cursor vertex is deleted
    /// and the window keeps growing; on the first miss the cursor advances and
    /// the window resets. Never increases the vertex count.
    pub fn compress(&mut self, max_dist: f64) {
        let max_d2 = max_dist * max_dist;
        let mut i = 1usize;
        let mut window: Vec<Point> = Vec::new();

        while i + 1 < self.points.len() {
            window.push(self.points[i]);
            let before = self.points[i - 1];
            let after = self.points[i + 1];

            // Standard form a*x + b*y + c = 0 through the retained neighbours.
            let a = (before.y - after.y) as i64;
            let b = (after.x - before.x) as i64;
            let c = -(a * before.x as i64 + b * before.y as i64);

            let fits = window.iter().all(|p| {
                let d2 = if a == 0 && b == 0 {
                    // The retained neighbours coincide; fall back to the
                    // distance from that single point.
                    let dx = (before.x - p.x) as i64;
                    let dy = (before.y - p.y) as i64;
                    (dx * dx + dy * dy) as f64
                } else {
                    let num = a * p.x as i64 + b * p.y as i64 + c;
                    (num * num) as f64 / (a * a + b * b) as f64
                };
                d2 <= max_d2
            });

            if fits {
                self.points.remove(i);
            } else {
                i += 1;
                window.clear();
            }
        }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Ordered collection of paths built over one point set.
#[derive(Debug, Clone, Default)]
pub struct Paths {
    list: Vec<Path>,
}

/// Result of one walk: the traced path plus the affected-point report. A
/// vertex is expandable when it still had untaken candidates as the walk
/// moved past it; the terminal vertex is always unexpandable. The report is a
/// heuristic used only to prune and seed further walks.
struct Walk {
    path: Vec<Point>,
    expandable: Vec<Point>,
    unexpandable: Vec<Point>,
}

impl Paths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cover `points` with paths through neighbouring points.
    ///
    /// Walks start at each not-yet-exhausted point in set order; branch
    /// points reported expandable seed follow-up walks before the outer scan
    /// moves on. Paths shorter than `min_path_length` are discarded only
    /// after all walks finish, so a short path still blocks re-discovery of
    /// its edges while building. An empty point set yields an empty
    /// collection.
    pub fn from_points(points: &PointSet, min_path_length: usize) -> Result<Paths> {
        if min_path_length < 2 {
            return Err(Error::InvalidArgument(
                "min_path_length must be at least 2".to_string(),
            ));
        }

        let mut paths = Paths::new();
        let mut unexpandable: HashSet<Point> = HashSet::new();

        for &point in points.iter() {
            if unexpandable.contains(&point) {
                continue;
            }

            let walk = walk_from(points, point, &paths);
            if walk.path.len() > 1 {
                paths.push(Path::new(walk.path));
            }
            unexpandable.extend(walk.unexpandable);

            // Follow any branches off that walk before moving on.
            let mut branches: VecDeque<Point> = walk
                .expandable
                .into_iter()
                .filter(|p| !unexpandable.contains(p))
                .collect();
            while let Some(seed) = branches.pop_front() {
                let walk = walk_from(points, seed, &paths);
                if walk.path.len() > 1 {
                    paths.push(Path::new(walk.path));
                }
                unexpandable.extend(walk.unexpandable);
                for p in walk.expandable {
                    if !branches.contains(&p) {
                        branches.push_back(p);
                    }
                }
                branches.retain(|p| !unexpandable.contains(p));
            }
        }

        let n_built = paths.list.len();
        paths.list.retain(|p| p.len() >= min_path_length);
        debug!(
            "built {} paths ({} below minimum length)",
            paths.list.len(),
            n_built - paths.list.len()
        );
        Ok(paths)
    }

    pub fn push(&mut self, path: Path) {
        self.list.push(path);
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.list.iter()
    }

    pub fn has_connection(&self, a: Point, b: Point, max_stride: usize) -> bool {
        self.list
            .iter()
            .any(|path| path.has_connection(a, b, max_stride))
    }

    pub fn compress(&mut self, max_dist: f64) {
        for path in &mut self.list {
            path.compress(max_dist);
        }
    }
}

impl<'a> IntoIterator for &'a Paths {
    type Item = &'a Path;
    type IntoIter = std::slice::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

/// Walk outward from `start`, repeatedly extending by an untraced neighbour
/// of the tail. Edge-sharing neighbours win over diagonals so the walk cannot
/// skip a pixel whose only partner is orthogonal; among equals the last one
/// discovered wins. Connections already present in `explored` are skipped
/// with a stride of 2, which keeps a corner's diagonal and its orthogonal "L"
/// from both being used. When the walk stalls next to its start, the start is
/// re-appended to close the loop.
fn walk_from(points: &PointSet, start: Point, explored: &Paths) -> Walk {
    let mut path = vec![start];
    let mut expandable = Vec::new();
    let mut unexpandable = Vec::new();

    loop {
        let tail = path[path.len() - 1];
        let mut adjacents: Vec<Point> = Vec::new();
        let mut diagonals: Vec<Point> = Vec::new();
        for &cand in points.iter() {
            if !tail.is_neighbor(cand) || path.contains(&cand) {
                continue;
            }
            if explored.has_connection(tail, cand, 2) {
                continue;
            }
            if tail.is_adjacent(cand) {
                adjacents.push(cand);
            } else {
                diagonals.push(cand);
            }
        }

        match adjacents.pop().or_else(|| diagonals.pop()) {
            Some(next) => {
                path.push(next);
                let prev = path[path.len() - 2];
                if adjacents.is_empty() && diagonals.is_empty() {
                    unexpandable.push(prev);
                } else {
                    expandable.push(prev);
                }
            }
            None => {
                unexpandable.push(tail);
                if tail.is_neighbor(start) {
                    path.push(start);
                }
                break;
            }
        }
    }

    Walk {
        path,
        expandable,
        unexpandable,
    }
}
