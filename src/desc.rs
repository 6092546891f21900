use serde::Deserialize;

/// Machine and program defaults for the toolpath emitter.
///
/// One immutable record handed to the generator, never process-wide state.
/// Every field has a default so a job file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarveDesc {
    /// Spindle speed for M3, revolutions per minute.
    pub spindle_rpm: u32,
    /// Safe travel height above the workpiece, mm.
    pub hover_height_mm: f64,
    /// Feed for vertical entry moves, mm/min.
    pub plunge_feed: u32,
    /// Feed for horizontal cutting moves, mm/min.
    pub traverse_feed: u32,
    /// Depth increment of the fixed-step pass policy, mm.
    pub depth_step_mm: f64,
    /// Moves shorter than this fold into their successor, mm.
    pub min_move_mm: f64,
    /// Diameter of the dot stamped per point in overlay dumps, pixels.
    pub dot_px: u32,
}

impl Default for CarveDesc {
    fn default() -> Self {
        Self {
            spindle_rpm: 10_000,
            hover_height_mm: 1.0,
            plunge_feed: 250,
            traverse_feed: 750,
            depth_step_mm: 0.5,
            min_move_mm: 0.0,
            dot_px: 5,
        }
    }
}

pub fn parse_carve_json(json_text: &str) -> Result<CarveDesc, serde_json::Error> {
    serde_json::from_str(json_text)
}
