/// Dense single-channel raster.
///
/// `s` is the row stride in elements; it equals `w` for freshly constructed
/// images but is kept separate so views over wider buffers stay possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Im<T> {
    pub w: usize,
    pub h: usize,
    pub s: usize,
    pub arr: Vec<T>,
}

/// Pixel value of line ink in a binary image.
pub const LINE: u8 = 0;
/// Pixel value of the background in a binary image.
pub const BACKGROUND: u8 = 255;

// Constructor
// -----------------------------------------------------------------------------
impl<T: Copy + Default> Im<T> {
    pub fn new(w: usize, h: usize) -> Self {
        let s = w;
        let arr = vec![T::default(); s * h];
        Self { w, h, s, arr }
    }
}

impl<T: Copy> Im<T> {
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<T> {
        if self.in_bounds(x, y) {
            Some(self.arr[y as usize * self.s + x as usize])
        } else {
            None
        }
    }

    /// Read a pixel, with everything outside the image reading as `default`.
    /// The extractors use this to treat the border as background.
    #[inline]
    pub fn get_or(&self, x: i32, y: i32, default: T) -> T {
        self.get(x, y).unwrap_or(default)
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, v: T) {
        assert!(self.in_bounds(x, y), "pixel ({x}, {y}) out of bounds");
        self.arr[y as usize * self.s + x as usize] = v;
    }
}

pub type Lum8Im = Im<u8>;
pub type BinIm = Im<u8>;

// Conversions
// -----------------------------------------------------------------------------
impl Im<u8> {
    /// Binarize a grayscale image: intensities below `threshold` become line
    /// ink (0), the rest background (255).
    pub fn to_binary(&self, threshold: u8) -> BinIm {
        let mut out = BinIm::new(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let v = self.arr[y * self.s + x];
                out.arr[y * out.s + x] = if v < threshold { LINE } else { BACKGROUND };
            }
        }
        out
    }
}
