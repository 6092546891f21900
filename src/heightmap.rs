use crate::error::{Error, Result};
use crate::im::Lum8Im;

/// Dense rectangular grid of normalized heights in [0, 1], immutable after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    w: usize,
    h: usize,
    arr: Vec<f64>,
}

impl Heightmap {
    /// Build a heightmap from an 8-bit grayscale image, intensity 255
    /// mapping to height 1.0.
    pub fn from_lum8(im: &Lum8Im) -> Result<Self> {
        if im.w == 0 || im.h == 0 {
            return Err(Error::InvalidArgument("zero-sized image".to_string()));
        }

        let mut arr = Vec::with_capacity(im.w * im.h);
        for y in 0..im.h {
            for x in 0..im.w {
                arr.push(im.arr[y * im.s + x] as f64 / 255.0);
            }
        }
        Ok(Self {
            w: im.w,
            h: im.h,
            arr,
        })
    }

    pub fn w(&self) -> usize {
        self.w
    }

    pub fn h(&self) -> usize {
        self.h
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        assert!(x < self.w && y < self.h, "height ({x}, {y}) out of bounds");
        self.arr[y * self.w + x]
    }

    /// Cross-section along row `y`: `(x, height)` pairs in ascending x.
    pub fn row(&self, y: usize) -> Result<Vec<(usize, f64)>> {
        if y >= self.h {
            return Err(Error::InvalidArgument(format!(
                "row {y} out of range 0..{}",
                self.h
            )));
        }
        Ok((0..self.w).map(|x| (x, self.get(x, y))).collect())
    }

    /// Cross-section along column `x`: `(y, height)` pairs in ascending y.
    pub fn column(&self, x: usize) -> Result<Vec<(usize, f64)>> {
        if x >= self.w {
            return Err(Error::InvalidArgument(format!(
                "column {x} out of range 0..{}",
                self.w
            )));
        }
        Ok((0..self.h).map(|y| (y, self.get(x, y))).collect())
    }

    /// Collapse a band of rows to one profile: for each x, the maximum height
    /// over `ys`, in ascending x. The maximum (not any first-seen sample) is
    /// what a bit spanning the whole band can actually reach.
    pub fn max_over_rows(&self, ys: &[usize]) -> Result<Vec<(usize, f64)>> {
        self.max_over_band(ys, self.h, |x, y| self.get(x, y), self.w)
    }

    /// Collapse a band of columns to one profile: for each y, the maximum
    /// height over `xs`, in ascending y.
    pub fn max_over_cols(&self, xs: &[usize]) -> Result<Vec<(usize, f64)>> {
        self.max_over_band(xs, self.w, |y, x| self.get(x, y), self.h)
    }

    fn max_over_band<F>(
        &self,
        band: &[usize],
        band_limit: usize,
        sample: F,
        carve_len: usize,
    ) -> Result<Vec<(usize, f64)>>
    where
        F: Fn(usize, usize) -> f64,
    {
        if band.is_empty() {
            return Err(Error::InvalidArgument("empty cross-section band".to_string()));
        }
        if let Some(&bad) = band.iter().find(|&&c| c >= band_limit) {
            return Err(Error::InvalidArgument(format!(
                "band coordinate {bad} out of range 0..{band_limit}"
            )));
        }

        Ok((0..carve_len)
            .map(|i| {
                let max = band
                    .iter()
                    .map(|&c| sample(i, c))
                    .fold(f64::NEG_INFINITY, f64::max);
                (i, max)
            })
            .collect())
    }
}
