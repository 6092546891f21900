use std::fs;

use log::debug;

use crate::band::partition_axis;
use crate::desc::CarveDesc;
use crate::error::{Error, Result};
use crate::heightmap::Heightmap;
use crate::path::{Path, Paths};

/// Fractional digits kept in emitted coordinates.
const FLOAT_PRECISION: usize = 3;

/// Depth progression across repeated passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassPolicy {
    /// Straight to the target depth in one pass.
    SinglePass,
    /// Step down by half the bit diameter per pass, so no pass asks the bit
    /// to remove more than it can.
    HalfBit,
    /// Step down by a fixed increment per pass, independent of the bit.
    FixedStep(f64),
}

/// Which cross-sections a heightmap carve sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarveAxes {
    Rows,
    Columns,
    /// Rows first, then the same procedure over columns. Overlapping removal
    /// is not deduplicated.
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    Rows,
    Columns,
}

/// Accumulates a move program: a fixed prologue, the body grown by
/// successive carve calls, and a fixed epilogue. Consumed by `export`.
#[derive(Debug, Clone)]
pub struct Gcode {
    desc: CarveDesc,
    mm_per_px: f64,
    bit_mm: f64,
    min_move_sq: f64,
    prologue: String,
    epilogue: String,
    body: Vec<String>,
    reverse: bool,
}

impl Gcode {
    pub fn new(desc: CarveDesc, mm_per_px: f64, bit_mm: f64) -> Result<Self> {
        if mm_per_px <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "mm-per-pixel ratio must be positive, got {mm_per_px}"
            )));
        }
        if bit_mm <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "bit diameter must be positive, got {bit_mm}"
            )));
        }
        if desc.min_move_mm < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "minimum move distance must not be negative, got {}",
                desc.min_move_mm
            )));
        }

        let hover = fmt_trim(desc.hover_height_mm);
        let prologue = format!(
            "G21\nM3 S{}\nG90\nG0 Z{}\nG0 X0.000 Y0.000",
            desc.spindle_rpm, hover
        );
        let epilogue = format!("G0 Z{}\nG0 X0.000 Y0.000\nM5\nM30", hover);
        let min_move_sq = desc.min_move_mm * desc.min_move_mm;

        Ok(Self {
            desc,
            mm_per_px,
            bit_mm,
            min_move_sq,
            prologue,
            epilogue,
            body: Vec::new(),
            reverse: false,
        })
    }

    // Path carving
    // -------------------------------------------------------------------------

    /// Carve every path of the collection to `depth_mm`, stepping down per
    /// the pass policy.
    pub fn carve_paths(&mut self, paths: &Paths, depth_mm: f64, policy: PassPolicy) -> Result<()> {
        for path in paths.iter() {
            self.carve_path(path, depth_mm, policy)?;
        }
        Ok(())
    }

    /// Carve one path to `depth_mm`. With a multi-pass policy the depth
    /// climbs in steps, shallowest pass first.
    pub fn carve_path(&mut self, path: &Path, depth_mm: f64, policy: PassPolicy) -> Result<()> {
        if path.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot carve an empty path".to_string(),
            ));
        }
        if depth_mm <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "carve depth must be positive, got {depth_mm}"
            )));
        }

        for depth in self.pass_depths(depth_mm, policy)? {
            debug!("path pass at depth {depth} mm");
            self.carve_path_pass(path, depth);
        }
        Ok(())
    }

    fn carve_path_pass(&mut self, path: &Path, depth_mm: f64) {
        let pts = path.points();
        let (first_x, first_y) = self.to_mm(pts[0].x, pts[0].y);

        self.hover();
        self.body
            .push(format!("G0 X{} Y{}", fmt_mm(first_x), fmt_mm(first_y)));
        self.plunge(depth_mm);
        self.body.push(format!("G1 F{}", self.desc.traverse_feed));

        let (mut last_x, mut last_y) = (first_x, first_y);
        for (i, p) in pts.iter().enumerate().skip(1) {
            let (x, y) = self.to_mm(p.x, p.y);
            let d2 = (x - last_x) * (x - last_x) + (y - last_y) * (y - last_y);
            // Sub-threshold jitter is dropped, but the last vertex always
            // lands so the cut reaches the end of the stroke.
            if d2 >= self.min_move_sq || i == pts.len() - 1 {
                self.body.push(format!("G1 X{} Y{}", fmt_mm(x), fmt_mm(y)));
                (last_x, last_y) = (x, y);
            }
        }

        self.hover();
    }

    // Heightmap carving
    // -------------------------------------------------------------------------

    /// Carve a heightmap with boustrophedon sweeps. Heights 0..1 scale into
    /// [min_depth_mm, max_depth_mm]; the cross axis is split into bit-width
    /// bands, each swept at its probe coordinate against the band's maximum
    /// profile. A multi-pass policy climbs toward max_depth_mm, clamping
    /// min_depth_mm down when an early pass sits above it.
    pub fn carve_heightmap(
        &mut self,
        map: &Heightmap,
        min_depth_mm: f64,
        max_depth_mm: f64,
        policy: PassPolicy,
        axes: CarveAxes,
    ) -> Result<()> {
        if min_depth_mm < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "minimum depth must not be negative, got {min_depth_mm}"
            )));
        }
        if max_depth_mm <= 0.0 || max_depth_mm < min_depth_mm {
            return Err(Error::InvalidArgument(format!(
                "maximum depth must be positive and at least the minimum, got {max_depth_mm}"
            )));
        }

        let sweeps: &[Sweep] = match axes {
            CarveAxes::Rows => &[Sweep::Rows],
            CarveAxes::Columns => &[Sweep::Columns],
            CarveAxes::Both => &[Sweep::Rows, Sweep::Columns],
        };

        for &sweep in sweeps {
            for pass_max in self.pass_depths(max_depth_mm, policy)? {
                let pass_min = min_depth_mm.min(pass_max);
                debug!("heightmap {sweep:?} pass to depth {pass_max} mm");
                self.carve_heightmap_pass(map, sweep, pass_min, pass_max)?;
            }
        }
        Ok(())
    }

    fn carve_heightmap_pass(
        &mut self,
        map: &Heightmap,
        sweep: Sweep,
        min_depth_mm: f64,
        max_depth_mm: f64,
    ) -> Result<()> {
        let n_cross = match sweep {
            Sweep::Rows => map.h(),
            Sweep::Columns => map.w(),
        };
        let cross_mm: Vec<f64> = (0..n_cross).map(|i| i as f64 * self.mm_per_px).collect();

        for band in partition_axis(&cross_mm, self.bit_mm)? {
            let band_px: Vec<usize> = band
                .cover
                .iter()
                .map(|&mm| (mm / self.mm_per_px).round() as usize)
                .collect();
            let profile = match sweep {
                Sweep::Rows => map.max_over_rows(&band_px)?,
                Sweep::Columns => map.max_over_cols(&band_px)?,
            };
            self.emit_band(sweep, band.probe, &profile, min_depth_mm, max_depth_mm);
        }
        Ok(())
    }

    fn emit_band(
        &mut self,
        sweep: Sweep,
        probe_mm: f64,
        profile: &[(usize, f64)],
        min_depth_mm: f64,
        max_depth_mm: f64,
    ) {
        let mut samples: Vec<(f64, f64)> = profile
            .iter()
            .map(|&(px, height)| {
                let pos = px as f64 * self.mm_per_px;
                let depth = min_depth_mm + height * (max_depth_mm - min_depth_mm);
                (pos, depth)
            })
            .collect();
        if samples.is_empty() {
            return;
        }
        if self.reverse {
            samples.reverse();
        }
        // The next band runs the other way.
        self.reverse = !self.reverse;

        let (first_pos, first_depth) = samples[0];
        self.hover();
        self.body.push(match sweep {
            Sweep::Rows => format!("G0 X{} Y{}", fmt_mm(first_pos), fmt_mm(probe_mm)),
            Sweep::Columns => format!("G0 X{} Y{}", fmt_mm(probe_mm), fmt_mm(first_pos)),
        });
        self.plunge(first_depth);
        self.body.push(format!("G1 F{}", self.desc.traverse_feed));

        let mut last_pos = first_pos;
        for (i, &(pos, depth)) in samples.iter().enumerate().skip(1) {
            let step = pos - last_pos;
            if step * step >= self.min_move_sq || i == samples.len() - 1 {
                self.body.push(match sweep {
                    Sweep::Rows => format!("G1 X{} Z-{}", fmt_mm(pos), fmt_trim(depth)),
                    Sweep::Columns => format!("G1 Y{} Z-{}", fmt_mm(pos), fmt_trim(depth)),
                });
                last_pos = pos;
            }
        }

        self.hover();
    }

    // Program assembly
    // -------------------------------------------------------------------------

    /// The depth of each pass, shallowest first, ending at `target`.
    fn pass_depths(&self, target: f64, policy: PassPolicy) -> Result<Vec<f64>> {
        let step = match policy {
            PassPolicy::SinglePass => return Ok(vec![target]),
            PassPolicy::HalfBit => self.bit_mm / 2.0,
            PassPolicy::FixedStep(step) => {
                if step <= 0.0 {
                    return Err(Error::InvalidArgument(format!(
                        "depth step must be positive, got {step}"
                    )));
                }
                step
            }
        };

        let n = (target / step).ceil() as usize;
        Ok((1..=n).map(|k| target - (n - k) as f64 * step).collect())
    }

    fn to_mm(&self, x: i32, y: i32) -> (f64, f64) {
        (x as f64 * self.mm_per_px, y as f64 * self.mm_per_px)
    }

    fn hover(&mut self) {
        self.body
            .push(format!("G0 Z{}", fmt_trim(self.desc.hover_height_mm)));
    }

    fn plunge(&mut self, depth_mm: f64) {
        self.body.push(format!(
            "G1 Z-{} F{}",
            fmt_trim(depth_mm),
            self.desc.plunge_feed
        ));
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    /// Assemble prologue, body and epilogue, one command per line, every
    /// line newline-terminated.
    pub fn program(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.prologue);
        out.push('\n');
        for line in &self.body {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.epilogue);
        out.push('\n');
        out
    }

    /// Write the assembled program in a single shot, so a failed export
    /// leaves no partial file behind.
    pub fn export<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.program())?;
        Ok(())
    }
}

// Number formatting
// -----------------------------------------------------------------------------

/// Fixed three-decimal rendering for X/Y coordinates.
fn fmt_mm(v: f64) -> String {
    format!("{:.prec$}", v, prec = FLOAT_PRECISION)
}

/// Round to three decimals and trim trailing zeros: `1`, `0.5`, `0.125`.
/// Z heights and feeds are written as bare numbers.
fn fmt_trim(v: f64) -> String {
    let scale = 10f64.powi(FLOAT_PRECISION as i32);
    let r = (v * scale).round() / scale;
    format!("{r}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::Lum8Im;
    use crate::point::Point;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    fn gcode() -> Gcode {
        Gcode::new(CarveDesc::default(), 1.0, 2.0).unwrap()
    }

    fn flat_map(w: usize, h: usize, intensity: u8) -> Heightmap {
        let mut im = Lum8Im::new(w, h);
        im.arr.fill(intensity);
        Heightmap::from_lum8(&im).unwrap()
    }

    #[test]
    fn fmt_trim_drops_trailing_zeros() {
        assert_eq!(fmt_trim(1.0), "1");
        assert_eq!(fmt_trim(0.5), "0.5");
        assert_eq!(fmt_trim(0.54), "0.54");
        assert_eq!(fmt_trim(0.1 + 0.2), "0.3");
        assert_eq!(fmt_trim(1.23456), "1.235");
        assert_eq!(fmt_mm(10.0), "10.000");
    }

    #[test]
    fn new_validates_arguments() {
        assert!(Gcode::new(CarveDesc::default(), 0.0, 2.0).is_err());
        assert!(Gcode::new(CarveDesc::default(), 1.0, -1.0).is_err());

        let desc = CarveDesc {
            min_move_mm: -0.5,
            ..CarveDesc::default()
        };
        assert!(Gcode::new(desc, 1.0, 2.0).is_err());
    }

    #[test]
    fn single_pass_path_body() {
        let mut g = gcode();
        let path = Path::new(vec![p(0, 0), p(10, 0)]);
        g.carve_path(&path, 1.0, PassPolicy::SinglePass).unwrap();

        assert_eq!(
            g.body(),
            &[
                "G0 Z1".to_string(),
                "G0 X0.000 Y0.000".to_string(),
                "G1 Z-1 F250".to_string(),
                "G1 F750".to_string(),
                "G1 X10.000 Y0.000".to_string(),
                "G0 Z1".to_string(),
            ]
        );
    }

    #[test]
    fn program_wraps_body_in_prologue_and_epilogue() {
        let mut g = gcode();
        let path = Path::new(vec![p(0, 0), p(10, 0)]);
        g.carve_path(&path, 1.0, PassPolicy::SinglePass).unwrap();

        let program = g.program();
        let lines: Vec<&str> = program.lines().collect();
        assert_eq!(
            &lines[..5],
            &["G21", "M3 S10000", "G90", "G0 Z1", "G0 X0.000 Y0.000"]
        );
        assert_eq!(
            &lines[lines.len() - 4..],
            &["G0 Z1", "G0 X0.000 Y0.000", "M5", "M30"]
        );
        assert!(program.ends_with('\n'));
    }

    #[test]
    fn half_bit_policy_climbs_to_target() {
        let mut g = Gcode::new(CarveDesc::default(), 1.0, 1.0).unwrap();
        let path = Path::new(vec![p(0, 0), p(4, 0)]);
        g.carve_path(&path, 1.2, PassPolicy::HalfBit).unwrap();

        let plunges: Vec<&String> =
            g.body().iter().filter(|l| l.starts_with("G1 Z-")).collect();
        assert_eq!(
            plunges,
            &["G1 Z-0.2 F250", "G1 Z-0.7 F250", "G1 Z-1.2 F250"]
        );
    }

    #[test]
    fn half_bit_policy_is_single_pass_for_shallow_cuts() {
        let mut g = gcode();
        let path = Path::new(vec![p(0, 0), p(4, 0)]);
        // Depth equals half the bit diameter: one pass is enough.
        g.carve_path(&path, 1.0, PassPolicy::HalfBit).unwrap();

        let plunges = g.body().iter().filter(|l| l.starts_with("G1 Z-")).count();
        assert_eq!(plunges, 1);
    }

    #[test]
    fn fixed_step_policy_uses_absolute_increment() {
        let mut g = gcode();
        let path = Path::new(vec![p(0, 0), p(4, 0)]);
        g.carve_path(&path, 1.0, PassPolicy::FixedStep(0.4)).unwrap();

        let plunges: Vec<&String> =
            g.body().iter().filter(|l| l.starts_with("G1 Z-")).collect();
        assert_eq!(
            plunges,
            &["G1 Z-0.2 F250", "G1 Z-0.6 F250", "G1 Z-1 F250"]
        );

        assert!(
            g.carve_path(&path, 1.0, PassPolicy::FixedStep(0.0)).is_err(),
            "a zero step would never progress"
        );
    }

    #[test]
    fn min_move_threshold_drops_jitter_but_keeps_the_end() {
        let desc = CarveDesc {
            min_move_mm: 1.5,
            ..CarveDesc::default()
        };
        let mut g = Gcode::new(desc, 1.0, 2.0).unwrap();
        let path = Path::new(vec![p(0, 0), p(1, 0), p(2, 0), p(3, 0)]);
        g.carve_path(&path, 1.0, PassPolicy::SinglePass).unwrap();

        let moves: Vec<&String> = g
            .body()
            .iter()
            .filter(|l| l.starts_with("G1 X"))
            .collect();
        // (1,0) is within the threshold of the start and is dropped; (2,0)
        // clears it; (3,0) is within threshold of (2,0) but is final.
        assert_eq!(moves, &["G1 X2.000 Y0.000", "G1 X3.000 Y0.000"]);
    }

    #[test]
    fn carve_path_rejects_bad_input() {
        let mut g = gcode();
        assert!(g
            .carve_path(&Path::new(vec![]), 1.0, PassPolicy::SinglePass)
            .is_err());
        assert!(g
            .carve_path(
                &Path::new(vec![p(0, 0), p(1, 0)]),
                0.0,
                PassPolicy::SinglePass
            )
            .is_err());
    }

    #[test]
    fn heightmap_band_emits_combined_moves() {
        // Uniform full-height map: every sample carves at max depth.
        let map = flat_map(3, 3, 255);
        let mut g = gcode();
        g.carve_heightmap(&map, 0.0, 1.0, PassPolicy::SinglePass, CarveAxes::Rows)
            .unwrap();

        // One band (rows 0..=2, probe y=1), swept forward along x.
        assert_eq!(
            g.body(),
            &[
                "G0 Z1".to_string(),
                "G0 X0.000 Y1.000".to_string(),
                "G1 Z-1 F250".to_string(),
                "G1 F750".to_string(),
                "G1 X1.000 Z-1".to_string(),
                "G1 X2.000 Z-1".to_string(),
                "G0 Z1".to_string(),
            ]
        );
    }

    #[test]
    fn heightmap_bands_alternate_direction() {
        let map = flat_map(6, 6, 255);
        let mut g = gcode();
        g.carve_heightmap(&map, 0.0, 1.0, PassPolicy::SinglePass, CarveAxes::Rows)
            .unwrap();

        // Three bands with probes y=1,3,5; the rapid of each band shows the
        // sweep start alternating between the two ends of the carve axis.
        let rapids: Vec<&String> = g
            .body()
            .iter()
            .filter(|l| l.starts_with("G0 X"))
            .collect();
        assert_eq!(
            rapids,
            &["G0 X0.000 Y1.000", "G0 X5.000 Y3.000", "G0 X0.000 Y5.000"]
        );
    }

    #[test]
    fn heightmap_depth_scales_between_min_and_max() {
        // Intensity 51/255 = height 0.2 exactly.
        let map = flat_map(2, 1, 51);
        let mut g = gcode();
        g.carve_heightmap(&map, 1.0, 2.0, PassPolicy::SinglePass, CarveAxes::Rows)
            .unwrap();

        // depth = 1 + 0.2 * (2 - 1) = 1.2 everywhere.
        assert!(g.body().iter().any(|l| l == "G1 Z-1.2 F250"));
        assert!(g.body().iter().any(|l| l == "G1 X1.000 Z-1.2"));
    }

    #[test]
    fn heightmap_columns_sweep_y_at_probe_x() {
        let map = flat_map(3, 3, 255);
        let mut g = gcode();
        g.carve_heightmap(&map, 0.0, 1.0, PassPolicy::SinglePass, CarveAxes::Columns)
            .unwrap();

        assert!(g.body().iter().any(|l| l == "G0 X1.000 Y0.000"));
        assert!(g.body().iter().any(|l| l == "G1 Y1.000 Z-1"));
    }

    #[test]
    fn heightmap_both_axes_runs_rows_then_columns() {
        let map = flat_map(3, 3, 255);
        let mut g = gcode();
        g.carve_heightmap(&map, 0.0, 1.0, PassPolicy::SinglePass, CarveAxes::Both)
            .unwrap();

        let first_col_move = g.body().iter().position(|l| l.starts_with("G1 Y"));
        let last_row_move = g
            .body()
            .iter()
            .rposition(|l| l.starts_with("G1 X") && l.contains(" Z-"));
        assert!(first_col_move.unwrap() > last_row_move.unwrap());
    }

    #[test]
    fn heightmap_multipass_clamps_min_depth() {
        let map = flat_map(2, 1, 0);
        let mut g = Gcode::new(CarveDesc::default(), 1.0, 1.0).unwrap();
        // Height 0 everywhere: each pass plunges to its clamped minimum.
        g.carve_heightmap(&map, 0.8, 1.2, PassPolicy::HalfBit, CarveAxes::Rows)
            .unwrap();

        let plunges: Vec<&String> =
            g.body().iter().filter(|l| l.starts_with("G1 Z-")).collect();
        // Pass maxima climb 0.2, 0.7, 1.2; min 0.8 clamps to 0.2, 0.7, 0.8.
        assert_eq!(
            plunges,
            &["G1 Z-0.2 F250", "G1 Z-0.7 F250", "G1 Z-0.8 F250"]
        );
    }

    #[test]
    fn carve_heightmap_rejects_bad_depths() {
        let map = flat_map(2, 2, 128);
        let mut g = gcode();
        assert!(g
            .carve_heightmap(&map, -0.1, 1.0, PassPolicy::SinglePass, CarveAxes::Rows)
            .is_err());
        assert!(g
            .carve_heightmap(&map, 2.0, 1.0, PassPolicy::SinglePass, CarveAxes::Rows)
            .is_err());
    }

    #[test]
    fn emitted_numbers_round_trip_at_three_decimals() {
        let map = flat_map(4, 4, 200);
        let mut g = Gcode::new(CarveDesc::default(), 0.33, 0.8).unwrap();
        g.carve_heightmap(&map, 0.1, 1.7, PassPolicy::HalfBit, CarveAxes::Both)
            .unwrap();

        for line in g.program().lines() {
            for field in line.split_whitespace() {
                let number = field.trim_start_matches(|c: char| c.is_ascii_alphabetic());
                if number.is_empty() {
                    continue;
                }
                let value: f64 = number.parse().expect("numeric field");
                let rounded = (value * 1000.0).round() / 1000.0;
                assert!(
                    (value - rounded).abs() < 1e-12,
                    "field {field} carries more than three decimals"
                );
            }
        }
    }

    #[test]
    fn export_writes_the_program() {
        let dir = std::env::temp_dir().join("ncarve_gcode_test");
        std::fs::create_dir_all(&dir).unwrap();
        let out = dir.join("program.nc");

        let mut g = gcode();
        g.carve_path(
            &Path::new(vec![p(0, 0), p(5, 0)]),
            0.5,
            PassPolicy::SinglePass,
        )
        .unwrap();
        g.export(&out).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text, g.program());
    }
}
