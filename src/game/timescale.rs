use crate::game::timing::TempoMap;
use log::{debug, warn};
use std::cmp::Ordering;

/// Segments shorter than this (seconds) are instantaneous steps.
pub const SEGMENT_EPSILON: f32 = 1e-6;

/// Opaque handle of a timescale group. Group 0 is the identity mapping and
/// never owns a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GroupId(pub u32);

impl GroupId {
    pub const IDENTITY: Self = Self(0);

    #[inline(always)]
    pub const fn is_identity(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSegment {
    pub start_beat: f32,
    /// Real time of `start_beat`, resolved through the tempo map at load.
    pub start_time: f32,
    pub timescale: f32,
}

/// Position of a chain walk: the segment slope and where it started.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Walk {
    timescale: f32,
    time: f32,
    scaled_time: f32,
}

impl Walk {
    const IDENTITY: Self = Self { timescale: 1.0, time: 0.0, scaled_time: 0.0 };

    #[inline(always)]
    fn enter(self, seg: &SpeedSegment) -> Self {
        Self {
            timescale: seg.timescale,
            time: seg.start_time,
            scaled_time: self.at(seg.start_time),
        }
    }

    #[inline(always)]
    fn at(self, time: f32) -> f32 {
        self.scaled_time + (time - self.time) * self.timescale
    }
}

#[derive(Debug, Clone)]
pub struct TimescaleGroup {
    id: GroupId,
    chain: Vec<SpeedSegment>,
}

impl TimescaleGroup {
    /// Builds the chain from authored `(beat, timescale)` pairs. Pairs are
    /// sorted by beat (stable, so equal beats keep authored order).
    pub fn new(id: GroupId, points: &[(f32, f32)], tempo: &TempoMap) -> Self {
        let mut chain: Vec<SpeedSegment> = points
            .iter()
            .filter(|&&(beat, scale)| {
                let ok = beat.is_finite() && scale.is_finite();
                if !ok {
                    warn!("Group {}: dropping non-finite speed point ({beat}, {scale})", id.0);
                }
                ok
            })
            .map(|&(beat, timescale)| SpeedSegment {
                start_beat: beat,
                start_time: tempo.time_for_beat(beat),
                timescale,
            })
            .collect();
        chain.sort_by(|a, b| a.start_beat.partial_cmp(&b.start_beat).unwrap_or(Ordering::Less));
        debug!("Group {} chain has {} segments.", id.0, chain.len());
        Self { id, chain }
    }

    #[inline(always)]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Cumulative scaled time at real `time`. O(chain length).
    pub fn time_to_scaled_time(&self, time: f32) -> f32 {
        let mut walk = Walk::IDENTITY;
        for seg in &self.chain {
            if time < seg.start_time {
                break;
            }
            walk = walk.enter(seg);
        }
        walk.at(time)
    }

    /// Earliest real time at which the walked scaled time reaches
    /// `scaled_time`.
    ///
    /// When no segment crosses the value, the final segment's slope is
    /// extrapolated; a final timescale of zero yields an infinite time.
    pub fn scaled_time_to_first_time(&self, scaled_time: f32) -> f32 {
        let Some(first) = self.chain.first() else {
            return scaled_time;
        };
        // Before the first link the chart runs at identity speed.
        if scaled_time <= Walk::IDENTITY.at(first.start_time) {
            return scaled_time;
        }

        let mut walk = Walk::IDENTITY;
        for (i, seg) in self.chain.iter().enumerate() {
            walk = walk.enter(seg);
            let end_time = self.chain.get(i + 1).map(|next| next.start_time);
            if let Some(end) = end_time
                && end - walk.time < SEGMENT_EPSILON
            {
                continue;
            }
            let end_scaled = end_time.map(|end| walk.at(end));
            let k = walk.timescale;
            let crosses = if k > 0.0 {
                scaled_time >= walk.scaled_time && end_scaled.is_none_or(|e| scaled_time <= e)
            } else if k < 0.0 {
                scaled_time <= walk.scaled_time && end_scaled.is_none_or(|e| scaled_time >= e)
            } else {
                (scaled_time - walk.scaled_time).abs() <= SEGMENT_EPSILON
            };
            if crosses {
                if k == 0.0 {
                    return walk.time;
                }
                return walk.time + (scaled_time - walk.scaled_time) / k;
            }
        }
        walk.time + (scaled_time - walk.scaled_time) / walk.timescale
    }
}

/// Resumable cursor over one group's chain for monotonically increasing
/// query times. Owned by exactly one consumer.
#[derive(Debug, Clone)]
pub struct CachedState {
    group: GroupId,
    chain_origin: usize,
    cursor: usize,
    last: Walk,
}

impl CachedState {
    pub fn new(group: GroupId) -> Self {
        Self { group, chain_origin: 0, cursor: 0, last: Walk::IDENTITY }
    }

    #[inline(always)]
    pub fn last_timescale(&self) -> f32 {
        self.last.timescale
    }

    fn reset(&mut self) {
        self.cursor = self.chain_origin;
        self.last = Walk::IDENTITY;
    }

    pub fn get(&mut self, timeline: &Timeline, time: f32) -> f32 {
        match timeline.group(self.group) {
            Some(group) => self.get_in(group, time),
            None => time,
        }
    }

    pub fn get_in(&mut self, group: &TimescaleGroup, time: f32) -> f32 {
        debug_assert_eq!(group.id, self.group, "cursor used with a foreign group");
        if time < self.last.time {
            self.reset();
        }
        while let Some(seg) = group.chain.get(self.cursor) {
            if time < seg.start_time {
                break;
            }
            self.last = self.last.enter(seg);
            self.cursor += 1;
        }
        self.last.at(time)
    }
}

/// Tempo plus every authored timescale group of a chart. Immutable after
/// load and freely shared between consumers.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    tempo: TempoMap,
    // groups[i] has id i + 1.
    groups: Vec<TimescaleGroup>,
}

impl Timeline {
    pub fn new(tempo: TempoMap) -> Self {
        Self { tempo, groups: Vec::new() }
    }

    pub fn add_group(&mut self, points: &[(f32, f32)]) -> GroupId {
        let id = GroupId(self.groups.len() as u32 + 1);
        self.groups.push(TimescaleGroup::new(id, points, &self.tempo));
        id
    }

    #[inline(always)]
    pub fn tempo(&self) -> &TempoMap {
        &self.tempo
    }

    pub fn group(&self, id: GroupId) -> Option<&TimescaleGroup> {
        if id.is_identity() {
            return None;
        }
        self.groups.get(id.0 as usize - 1)
    }

    pub fn groups(&self) -> &[TimescaleGroup] {
        &self.groups
    }

    pub fn contains(&self, id: GroupId) -> bool {
        id.is_identity() || self.group(id).is_some()
    }

    #[inline(always)]
    pub fn beat_to_time(&self, beat: f32) -> f32 {
        self.tempo.time_for_beat(beat)
    }

    pub fn time_to_scaled_time(&self, id: GroupId, time: f32) -> f32 {
        self.group(id).map_or(time, |g| g.time_to_scaled_time(time))
    }

    pub fn scaled_time_to_first_time(&self, id: GroupId, scaled_time: f32) -> f32 {
        self.group(id).map_or(scaled_time, |g| g.scaled_time_to_first_time(scaled_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4
    }

    // 120 BPM: time = beat * 0.5.
    fn timeline_with(points: &[(f32, f32)]) -> (Timeline, GroupId) {
        let mut timeline = Timeline::new(TempoMap::from_bpms(&[(0.0, 120.0)], 0.0));
        let id = timeline.add_group(points);
        (timeline, id)
    }

    #[test]
    fn identity_group_returns_time_unchanged() {
        let (timeline, _) = timeline_with(&[(0.0, 3.0)]);
        for t in [-10.0, -0.25, 0.0, 1.5, 1234.5] {
            assert_eq!(timeline.time_to_scaled_time(GroupId::IDENTITY, t), t);
            assert_eq!(timeline.scaled_time_to_first_time(GroupId::IDENTITY, t), t);
        }
        let mut cached = CachedState::new(GroupId::IDENTITY);
        assert_eq!(cached.get(&timeline, -3.0), -3.0);
    }

    #[test]
    fn two_segment_chain_matches_worked_example() {
        let (timeline, id) = timeline_with(&[(0.0, 1.0), (4.0, 2.0)]);
        assert!(approx(timeline.time_to_scaled_time(id, 1.0), 1.0));
        assert!(approx(timeline.time_to_scaled_time(id, 3.0), 4.0));
        assert!(approx(timeline.scaled_time_to_first_time(id, 3.0), 2.5));
    }

    #[test]
    fn times_before_chart_are_identity_scaled() {
        let (timeline, id) = timeline_with(&[(0.0, 4.0)]);
        assert!(approx(timeline.time_to_scaled_time(id, -2.0), -2.0));
        assert!(approx(timeline.scaled_time_to_first_time(id, -2.0), -2.0));
    }

    #[test]
    fn late_first_segment_keeps_identity_until_it_starts() {
        // First link at beat 4 (t = 2s): identity before it.
        let (timeline, id) = timeline_with(&[(4.0, 0.5)]);
        assert!(approx(timeline.time_to_scaled_time(id, 1.0), 1.0));
        assert!(approx(timeline.time_to_scaled_time(id, 4.0), 3.0));
        assert!(approx(timeline.scaled_time_to_first_time(id, 1.5), 1.5));
        assert!(approx(timeline.scaled_time_to_first_time(id, 3.0), 4.0));
    }

    #[test]
    fn reversing_chain_returns_earliest_crossing() {
        // Up to scaled 2 by t=2, back down at -1 until t=4 (scaled 0), then up.
        let (timeline, id) = timeline_with(&[(0.0, 1.0), (4.0, -1.0), (8.0, 1.0)]);
        assert!(approx(timeline.time_to_scaled_time(id, 3.0), 1.0));
        assert!(approx(timeline.time_to_scaled_time(id, 5.0), 1.0));
        assert!(approx(timeline.scaled_time_to_first_time(id, 1.0), 1.0), "first pass wins");
        // Scaled 2.5 is only reached on the third segment.
        assert!(approx(timeline.scaled_time_to_first_time(id, 2.5), 6.5));
    }

    #[test]
    fn downward_segment_is_searched_for_values_below_start() {
        // Jumps into reverse immediately: 0 -> -2 over [0, 2], then flat.
        let (timeline, id) = timeline_with(&[(0.0, -1.0), (4.0, 0.0)]);
        // Negative values are served by pre-chart identity first.
        assert!(approx(timeline.scaled_time_to_first_time(id, -1.0), -1.0));
        assert!(approx(timeline.time_to_scaled_time(id, 10.0), -2.0));
    }

    #[test]
    fn zero_duration_segments_step_without_dividing() {
        // Beat 2 is t = 1s; the 5x link lasts zero seconds.
        let (timeline, id) = timeline_with(&[(0.0, 1.0), (2.0, 5.0), (2.0, 2.0)]);
        assert!(approx(timeline.time_to_scaled_time(id, 1.0 - 1e-7), 1.0));
        assert!(approx(timeline.time_to_scaled_time(id, 1.0), 1.0));
        assert!(approx(timeline.time_to_scaled_time(id, 2.0), 3.0));
        assert!(approx(timeline.time_to_scaled_time(id, 3.0), 5.0));
        let t = timeline.scaled_time_to_first_time(id, 3.0);
        assert!(t.is_finite() && approx(t, 2.0));
    }

    #[test]
    fn pausing_segment_hits_exact_value_at_its_start() {
        let (timeline, id) = timeline_with(&[(0.0, 1.0), (2.0, 0.0), (4.0, 1.0)]);
        assert!(approx(timeline.scaled_time_to_first_time(id, 1.0), 1.0));
        assert!(approx(timeline.time_to_scaled_time(id, 1.5), 1.0));
        assert!(approx(timeline.scaled_time_to_first_time(id, 1.5), 2.5));
    }

    #[test]
    fn unreachable_value_extrapolates_final_slope() {
        // Ends on a reversing segment: scaled 10 is never reached.
        let (timeline, id) = timeline_with(&[(0.0, 1.0), (2.0, -1.0)]);
        let t = timeline.scaled_time_to_first_time(id, 10.0);
        // Projected backwards from (t=1, scaled=1) with slope -1.
        assert!(approx(t, -8.0));

        let (timeline, id) = timeline_with(&[(0.0, 1.0), (2.0, 0.0)]);
        assert!(timeline.scaled_time_to_first_time(id, 10.0).is_infinite());
    }

    #[test]
    fn constant_speed_round_trips() {
        for k in [0.25_f32, 1.0, 3.5] {
            let (timeline, id) = timeline_with(&[(0.0, k)]);
            for i in 0..50 {
                let t = i as f32 * 0.37;
                let s = timeline.time_to_scaled_time(id, t);
                let back = timeline.scaled_time_to_first_time(id, s);
                assert!(approx(back, t), "k={k} t={t} came back as {back}");
            }
        }
    }

    #[test]
    fn cached_state_matches_full_walk_when_monotonic() {
        let (timeline, id) =
            timeline_with(&[(0.0, 1.0), (2.0, -0.5), (2.0, 3.0), (7.0, 0.0), (9.0, 1.25)]);
        let mut cached = CachedState::new(id);
        let mut t = -1.0_f32;
        while t < 8.0 {
            let expected = timeline.time_to_scaled_time(id, t);
            assert_eq!(cached.get(&timeline, t), expected, "diverged at t={t}");
            t += 0.013;
        }
        // Repeated equal times are fine too.
        assert_eq!(cached.get(&timeline, 8.0), cached.get(&timeline, 8.0));
    }

    #[test]
    fn cached_state_resets_after_seek_backwards() {
        let (timeline, id) = timeline_with(&[(0.0, 1.0), (4.0, 2.0), (8.0, -1.0)]);
        let mut cached = CachedState::new(id);
        let late = cached.get(&timeline, 5.0);
        let early = cached.get(&timeline, 0.5);
        assert_eq!(early, timeline.time_to_scaled_time(id, 0.5));
        assert_eq!(cached.get(&timeline, 5.0), late);
        assert_eq!(late, timeline.time_to_scaled_time(id, 5.0));
        assert_eq!(cached.get(&timeline, -2.0), -2.0);
        assert_eq!(cached.last_timescale(), 1.0);
    }

    #[test]
    fn unknown_groups_fall_back_to_identity() {
        let (timeline, _) = timeline_with(&[(0.0, 2.0)]);
        assert!(!timeline.contains(GroupId(9)));
        assert_eq!(timeline.time_to_scaled_time(GroupId(9), 1.5), 1.5);
    }
}
