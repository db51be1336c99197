use crate::game::ease::{lerp, remap, remap_clamped, unlerp};

/// Travel at the moment a note appears: 1.06^-45. Lower values make the
/// approach accelerate harder near the judge line.
pub const APPROACH_START: f32 = 0.072_650_2;

// Visible travel window used for clipping.
pub const PROGRESS_START: f32 = APPROACH_START;
pub const PROGRESS_CUTOFF: f32 = 2.0;

pub const MIN_NOTE_SPEED: f32 = 1.0;
pub const MAX_NOTE_SPEED: f32 = 12.0;
pub const DEFAULT_NOTE_SPEED: f32 = 10.0;

// Half width of the hidden fade ramp, in seconds of real time.
pub const HIDDEN_FADE_HALF_WINDOW_S: f32 = 0.05;

/// Seconds of scaled time a note is on screen before reaching the judge line.
#[inline(always)]
pub fn preempt_duration(note_speed: f32) -> f32 {
    let speed = note_speed.clamp(MIN_NOTE_SPEED, MAX_NOTE_SPEED);
    lerp(0.35, 4.0, unlerp(MAX_NOTE_SPEED, MIN_NOTE_SPEED, speed).powf(1.31))
}

/// Exponential travel: `APPROACH_START` when the note appears, 1 on arrival.
/// Not clamped; values past either end extrapolate.
#[inline(always)]
pub fn progress(target_scaled_time: f32, current_scaled_time: f32, preempt: f32) -> f32 {
    let x = remap(target_scaled_time - preempt, target_scaled_time, 1.0, 0.0, current_scaled_time);
    APPROACH_START.powf(x)
}

#[inline(always)]
pub fn is_visible(travel: f32) -> bool {
    (PROGRESS_START..=PROGRESS_CUTOFF).contains(&travel)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachSettings {
    pub note_speed: f32,
    /// 0 = off, 1 = notes vanish as soon as they appear.
    pub hidden: f32,
    preempt: f32,
}

impl Default for ApproachSettings {
    fn default() -> Self {
        Self::new(DEFAULT_NOTE_SPEED, 0.0)
    }
}

impl ApproachSettings {
    pub fn new(note_speed: f32, hidden: f32) -> Self {
        Self {
            note_speed,
            hidden: hidden.clamp(0.0, 1.0),
            preempt: preempt_duration(note_speed),
        }
    }

    #[inline(always)]
    pub fn preempt(&self) -> f32 {
        self.preempt
    }

    #[inline(always)]
    pub fn progress(&self, target_scaled_time: f32, current_scaled_time: f32) -> f32 {
        progress(target_scaled_time, current_scaled_time, self.preempt)
    }

    /// Opacity of something arriving at `target_time`, evaluated in real time
    /// so scroll-speed changes never move the fade.
    pub fn fade_alpha(&self, target_time: f32, now: f32) -> f32 {
        if self.hidden <= 0.0 {
            return 1.0;
        }
        let change_at = target_time - self.hidden * self.preempt;
        remap_clamped(
            change_at - HIDDEN_FADE_HALF_WINDOW_S,
            change_at + HIDDEN_FADE_HALF_WINDOW_S,
            1.0,
            0.0,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preempt_spans_configured_speed_range() {
        assert!((preempt_duration(12.0) - 0.35).abs() <= 1e-6);
        assert!((preempt_duration(1.0) - 4.0).abs() <= 1e-6);
        assert!(preempt_duration(10.0) < preempt_duration(5.0), "faster speed, shorter preempt");
        assert_eq!(preempt_duration(40.0), preempt_duration(12.0));
    }

    #[test]
    fn approach_start_is_the_documented_power() {
        assert!((APPROACH_START - 1.06_f32.powf(-45.0)).abs() <= 1e-6);
    }

    #[test]
    fn progress_runs_from_start_to_one() {
        let preempt = 2.0;
        assert!((progress(10.0, 8.0, preempt) - APPROACH_START).abs() <= 1e-6);
        assert!((progress(10.0, 10.0, preempt) - 1.0).abs() <= 1e-6);
        assert!(progress(10.0, 9.0, preempt) < progress(10.0, 9.5, preempt));
        let past = progress(10.0, 10.5, preempt);
        assert!(past > 1.0 && !is_visible(progress(10.0, 12.0, preempt)), "extrapolates past arrival");
        assert!(!is_visible(progress(10.0, 7.0, preempt)), "not yet spawned");
    }

    #[test]
    fn no_hidden_means_fully_opaque() {
        let settings = ApproachSettings::new(10.0, 0.0);
        for i in -100..100 {
            assert_eq!(settings.fade_alpha(5.0, i as f32 * 0.1), 1.0);
        }
    }

    #[test]
    fn full_hidden_fades_inside_narrow_window() {
        let settings = ApproachSettings::new(10.0, 1.0);
        let target = 5.0;
        let change = target - settings.preempt();
        assert_eq!(settings.fade_alpha(target, change - 0.051), 1.0);
        assert_eq!(settings.fade_alpha(target, change + 0.051), 0.0);
        let mut prev = 1.0_f32;
        let mut now = change - 0.06;
        while now <= change + 0.06 {
            let a = settings.fade_alpha(target, now);
            assert!((0.0..=1.0).contains(&a));
            assert!(a <= prev + 1e-6, "alpha rose at now={now}");
            prev = a;
            now += 0.001;
        }
    }
}
