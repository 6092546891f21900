pub mod core;
#[allow(unused_imports)]
pub use core::{BinIm, Im, Lum8Im, BACKGROUND, LINE};

// Optional extras
// -----------------------------------------------------------------------------

#[cfg(feature = "im-io")]
pub mod io;
