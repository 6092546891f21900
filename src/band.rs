use crate::error::{Error, Result};

/// One bit-width window over the cross axis of a carve.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisBand {
    /// Source coordinates enclosed by the window, ascending (mm).
    pub cover: Vec<f64>,
    /// Coordinate where the bit centre rides while carving this band (mm).
    pub probe: f64,
}

/// Split a strictly increasing coordinate list into bands no wider than the
/// bit diameter, each with a probe position for the bit centre.
///
/// The probe is fixed as soon as the window grows past half the bit size, at
/// the last coordinate taken, so it sits at least half a diameter from the
/// band start whenever the band is that wide. When the window would exceed a
/// full diameter, the band is closed and its final sample seeds the next
/// cover, so successive bands always share one sample and no gap opens
/// between them. A band that never reaches half width probes at its last
/// sample.
pub fn partition_axis(coords: &[f64], bit_size: f64) -> Result<Vec<AxisBand>> {
    if coords.is_empty() {
        return Err(Error::InvalidArgument(
            "partition needs at least one coordinate".to_string(),
        ));
    }
    if bit_size <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "bit size must be positive, got {bit_size}"
        )));
    }
    if coords.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::InvalidArgument(
            "coordinates must be strictly increasing".to_string(),
        ));
    }

    let mut bands: Vec<AxisBand> = Vec::new();
    let mut start = coords[0];
    let mut cover: Vec<f64> = Vec::new();
    let mut probe: Option<f64> = None;

    for &c in coords {
        if c - start > bit_size / 2.0 && probe.is_none() {
            probe = Some(cover[cover.len() - 1]);
        }
        if c - start > bit_size {
            let last = cover[cover.len() - 1];
            bands.push(AxisBand {
                cover: std::mem::take(&mut cover),
                // The half-width check above fires before the full-width one,
                // so a probe is always chosen by the time a band closes.
                probe: probe.take().unwrap(),
            });
            start = last;
            cover.push(last);
        }
        cover.push(c);
    }

    let probe = probe.unwrap_or(cover[cover.len() - 1]);
    bands.push(AxisBand { cover, probe });
    Ok(bands)
}
