use log::{info, warn};
use std::cmp::Ordering;
use std::sync::Arc;

pub const DEFAULT_BPM: f32 = 120.0;

#[derive(Debug, Clone, Default, Copy)]
struct BeatTimePoint {
    beat: f32,
    time_sec: f32,
    bpm: f32,
}

/// Beat <-> real time conversion built from an authored BPM list.
///
/// Times are chart time in seconds: beat 0 sits at `offset_sec`. Beats before
/// the first tempo point use the first BPM.
#[derive(Debug, Clone)]
pub struct TempoMap {
    beat_to_time: Arc<Vec<BeatTimePoint>>,
    offset_sec: f32,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::from_bpms(&[], 0.0)
    }
}

impl TempoMap {
    pub fn from_bpms(bpms: &[(f32, f32)], offset_sec: f32) -> Self {
        let mut parsed: Vec<(f32, f32)> = bpms
            .iter()
            .copied()
            .filter(|&(beat, bpm)| {
                let ok = beat.is_finite() && bpm.is_finite() && bpm > 0.0;
                if !ok {
                    warn!("Ignoring invalid tempo point beat={beat} bpm={bpm}");
                }
                ok
            })
            .collect();
        parsed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Less));
        if parsed.is_empty() {
            parsed.push((0.0, DEFAULT_BPM));
        }

        let mut beat_to_time = Vec::with_capacity(parsed.len());
        let first_bpm = parsed[0].1;
        // Anchor beat 0 at the offset even if the first point is later.
        let mut last_beat = 0.0_f32;
        let mut last_time = offset_sec;
        let mut last_bpm = first_bpm;
        for &(beat, bpm) in &parsed {
            let time_sec = last_time + (beat - last_beat) * (60.0 / last_bpm);
            beat_to_time.push(BeatTimePoint { beat, time_sec, bpm });
            last_beat = beat;
            last_time = time_sec;
            last_bpm = bpm;
        }
        info!("TempoMap built from {} tempo points.", beat_to_time.len());
        Self { beat_to_time: Arc::new(beat_to_time), offset_sec }
    }

    #[inline(always)]
    pub fn offset_seconds(&self) -> f32 {
        self.offset_sec
    }

    fn point_index_for_beat(&self, target_beat: f32) -> usize {
        let points = &self.beat_to_time;
        match points.binary_search_by(|p| {
            p.beat.partial_cmp(&target_beat).unwrap_or(Ordering::Less)
        }) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    fn point_index_for_time(&self, target_time: f32) -> usize {
        let points = &self.beat_to_time;
        points
            .partition_point(|p| p.time_sec <= target_time)
            .saturating_sub(1)
    }

    pub fn time_for_beat(&self, beat: f32) -> f32 {
        let p = self.beat_to_time[self.point_index_for_beat(beat)];
        p.time_sec + (beat - p.beat) * (60.0 / p.bpm)
    }

    pub fn beat_for_time(&self, time_sec: f32) -> f32 {
        let p = self.beat_to_time[self.point_index_for_time(time_sec)];
        p.beat + (time_sec - p.time_sec) * (p.bpm / 60.0)
    }

    pub fn bpm_for_beat(&self, beat: f32) -> f32 {
        self.beat_to_time[self.point_index_for_beat(beat)].bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_tempo_maps_beats_linearly() {
        let tempo = TempoMap::from_bpms(&[(0.0, 120.0)], 0.0);
        assert!((tempo.time_for_beat(6.0) - 3.0).abs() <= 1e-6);
        assert!((tempo.time_for_beat(-2.0) + 1.0).abs() <= 1e-6, "negative beats extrapolate");
        assert!((tempo.beat_for_time(3.0) - 6.0).abs() <= 1e-6);
    }

    #[test]
    fn tempo_changes_accumulate_time() {
        let tempo = TempoMap::from_bpms(&[(4.0, 60.0), (0.0, 120.0)], 0.5);
        // 4 beats at 120 => 2s, then 2 beats at 60 => 2s.
        assert!((tempo.time_for_beat(6.0) - 4.5).abs() <= 1e-5);
        assert!((tempo.beat_for_time(4.5) - 6.0).abs() <= 1e-5);
        assert_eq!(tempo.bpm_for_beat(5.0), 60.0);
        assert_eq!(tempo.bpm_for_beat(1.0), 120.0);
    }

    #[test]
    fn invalid_points_fall_back_to_default_bpm() {
        let tempo = TempoMap::from_bpms(&[(0.0, -5.0), (1.0, f32::NAN)], 0.0);
        assert_eq!(tempo.bpm_for_beat(0.0), DEFAULT_BPM);
        assert!((tempo.time_for_beat(2.0) - 1.0).abs() <= 1e-6);
    }
}
