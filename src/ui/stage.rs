use crate::game::approach::{APPROACH_START, PROGRESS_CUTOFF};
use crate::game::ease::lerp;
use glam::Vec2;

// Normalized screen space: x and y in roughly -1..1, +y up.
pub const LANE_UNIT: f32 = 0.1;
pub const VANISH_Y: f32 = 0.6;
pub const JUDGE_Y: f32 = -0.6;

pub const PLAY_QUALITY_SCALE: f32 = 1.5;

/// Maps (lane, travel) to screen space for one consumption mode.
pub trait ScreenTransform {
    fn project(&self, lane: f32, travel: f32) -> Vec2;

    /// Multiplier on projected length when choosing subdivision counts.
    fn quality_scale(&self) -> f32;
}

/// In-play stage: lanes fan out from a vanishing point and reach full width
/// on the judge line (travel 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveStage {
    pub lane_unit: f32,
    pub vanish_y: f32,
    pub judge_y: f32,
}

impl Default for PerspectiveStage {
    fn default() -> Self {
        Self { lane_unit: LANE_UNIT, vanish_y: VANISH_Y, judge_y: JUDGE_Y }
    }
}

impl ScreenTransform for PerspectiveStage {
    #[inline(always)]
    fn project(&self, lane: f32, travel: f32) -> Vec2 {
        Vec2::new(lane * self.lane_unit * travel, lerp(self.vanish_y, self.judge_y, travel))
    }

    #[inline(always)]
    fn quality_scale(&self) -> f32 {
        PLAY_QUALITY_SCALE
    }
}

/// Static preview: no perspective, height linear in scaled time so
/// timescale changes read as note spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewColumn {
    pub lane_unit: f32,
    pub top_y: f32,
    pub judge_y: f32,
    pub quality_scale: f32,
}

impl PreviewColumn {
    pub fn new(quality_scale: f32) -> Self {
        Self { lane_unit: LANE_UNIT, top_y: VANISH_Y, judge_y: JUDGE_Y, quality_scale }
    }
}

impl ScreenTransform for PreviewColumn {
    fn project(&self, lane: f32, travel: f32) -> Vec2 {
        // Undo the exponential approach: 1 at spawn, 0 on the judge line.
        let x = travel.clamp(f32::MIN_POSITIVE, PROGRESS_CUTOFF).ln() / APPROACH_START.ln();
        Vec2::new(lane * self.lane_unit, lerp(self.judge_y, self.top_y, x))
    }

    #[inline(always)]
    fn quality_scale(&self) -> f32 {
        self.quality_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::approach::progress;

    #[test]
    fn perspective_reaches_full_width_on_judge_line() {
        let stage = PerspectiveStage::default();
        let p = stage.project(3.0, 1.0);
        assert!((p.x - 0.3).abs() <= 1e-6 && (p.y - JUDGE_Y).abs() <= 1e-6);
        let far = stage.project(3.0, 0.1);
        assert!(far.x.abs() < p.x.abs() && far.y > p.y);
    }

    #[test]
    fn preview_spacing_is_linear_in_scaled_time() {
        let column = PreviewColumn::new(1.0);
        let preempt = 2.0;
        let ys: Vec<f32> = [8.0_f32, 8.5, 9.0, 9.5, 10.0]
            .iter()
            .map(|&now| column.project(0.0, progress(10.0, now, preempt)).y)
            .collect();
        assert!((ys[0] - VANISH_Y).abs() <= 1e-4, "spawn sits at the top");
        assert!((ys[4] - JUDGE_Y).abs() <= 1e-4, "arrival sits on the judge line");
        for w in ys.windows(3) {
            assert!(((w[0] - w[1]) - (w[1] - w[2])).abs() <= 1e-4, "uneven spacing {ys:?}");
        }
    }
}
