use crate::game::approach::{ApproachSettings, PROGRESS_CUTOFF, PROGRESS_START};
use crate::game::ease::{EasingKind, lerp, unlerp};
use crate::ui::sprite::{GuideColor, SlideKind, SpriteId};
use crate::ui::stage::ScreenTransform;
use glam::Vec2;
use std::cmp::Ordering;
use std::f32::consts::TAU;

pub const DEFAULT_QUALITY: u32 = 10;
pub const MAX_QUALITY: u32 = 50;
pub const MIN_HALF_WIDTH: f32 = 1e-3;
pub const ACTIVE_PULSE_HZ: f32 = 2.0;

// Draw layers, back to front.
pub const Z_GUIDE: u8 = 10;
pub const Z_SLIDE_CONNECTOR: u8 = 20;
pub const Z_CRITICAL_SLIDE_CONNECTOR: u8 = 30;
pub const Z_NOTE: u8 = 40;

/// Sort key compared field by field: layer, then arrival time, then lane.
/// Later-arriving geometry draws above earlier geometry in the same layer
/// regardless of how far apart the lanes are.
#[derive(Debug, Clone, Copy)]
pub struct DrawOrder {
    pub layer: u8,
    pub time: f32,
    pub lane: f32,
}

impl Ord for DrawOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.layer
            .cmp(&other.layer)
            .then_with(|| self.time.total_cmp(&other.time))
            .then_with(|| self.lane.total_cmp(&other.lane))
    }
}

impl PartialOrd for DrawOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DrawOrder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DrawOrder {}

#[inline(always)]
pub const fn draw_order(layer: u8, time: f32, lane: f32) -> DrawOrder {
    DrawOrder { layer, time, lane }
}

/// One end of a connector or guide segment for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoint {
    pub lane: f32,
    pub half_width: f32,
    pub target_time: f32,
    pub travel: f32,
    /// Shape of the path leaving this endpoint.
    pub easing: EasingKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectorSegment {
    /// Previous-left, previous-right, current-right, current-left.
    pub quad: [Vec2; 4],
    pub z_order: DrawOrder,
    pub alpha: f32,
    pub sprite: SpriteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadePolicy {
    #[default]
    None,
    In,
    Out,
}

impl FadePolicy {
    /// Chart import code: 0=None, 1=In, 2=Out.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::In),
            2 => Some(Self::Out),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn alpha(self, lifetime_progress: f32) -> f32 {
        let p = lifetime_progress.clamp(0.0, 1.0);
        match self {
            Self::None => 1.0,
            Self::In => p,
            Self::Out => 1.0 - p,
        }
    }
}

/// Shared per-frame inputs for every connector and guide.
#[derive(Clone, Copy)]
pub struct DrawContext<'a> {
    pub transform: &'a dyn ScreenTransform,
    pub approach: &'a ApproachSettings,
    /// Real time. `f32::NEG_INFINITY` disables time-based culling.
    pub now: f32,
    pub quality: u32,
}

/// Visible part of A->B as fractions of the unclamped travel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start_frac: f32,
    pub end_frac: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    pub quad: [Vec2; 4],
    pub from_frac: f32,
    pub to_frac: f32,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    left: Vec2,
    right: Vec2,
}

pub fn clip(a: &Endpoint, b: &Endpoint, now: f32) -> Option<Span> {
    if a.travel == b.travel {
        return None;
    }
    let below = a.travel < PROGRESS_START && b.travel < PROGRESS_START;
    let above = a.travel > PROGRESS_CUTOFF && b.travel > PROGRESS_CUTOFF;
    if below || above || now > b.target_time {
        return None;
    }
    let start_travel = a.travel.clamp(PROGRESS_START, PROGRESS_CUTOFF);
    let end_travel = b.travel.clamp(PROGRESS_START, PROGRESS_CUTOFF);
    Some(Span {
        start_frac: unlerp(a.travel, b.travel, start_travel),
        end_frac: unlerp(a.travel, b.travel, end_travel),
    })
}

#[inline(always)]
fn center(transform: &dyn ScreenTransform, a: &Endpoint, b: &Endpoint, frac: f32) -> Vec2 {
    let lane = lerp(a.lane, b.lane, a.easing.apply(frac));
    transform.project(lane, lerp(a.travel, b.travel, frac))
}

#[inline(always)]
fn edge(transform: &dyn ScreenTransform, a: &Endpoint, b: &Endpoint, frac: f32) -> Edge {
    let eased = a.easing.apply(frac);
    let lane = lerp(a.lane, b.lane, eased);
    let half_width = lerp(a.half_width, b.half_width, eased).max(MIN_HALF_WIDTH);
    // Travel advances linearly; only lane and width are eased.
    let travel = lerp(a.travel, b.travel, frac);
    Edge {
        left: transform.project(lane - half_width, travel),
        right: transform.project(lane + half_width, travel),
    }
}

/// Quads for the clipped span, sized so each covers a similar on-screen
/// length. The chord between the clipped centers is a lower bound of the
/// eased path length.
pub fn segment_count(
    transform: &dyn ScreenTransform,
    a: &Endpoint,
    b: &Endpoint,
    span: Span,
    quality: u32,
) -> u32 {
    let q = quality.clamp(1, MAX_QUALITY);
    let distance = center(transform, a, b, span.start_frac)
        .distance(center(transform, a, b, span.end_frac));
    let wanted = (q as f32 * distance * transform.quality_scale()).ceil();
    if wanted.is_nan() {
        return 1;
    }
    (wanted.min(q as f32) as u32).max(1)
}

/// Culls, clips and marches A->B, handing each slice to `emit`. Returns the
/// number of slices (0 when culled).
pub fn tessellate(
    transform: &dyn ScreenTransform,
    a: &Endpoint,
    b: &Endpoint,
    now: f32,
    quality: u32,
    mut emit: impl FnMut(Slice),
) -> u32 {
    let Some(span) = clip(a, b, now) else {
        return 0;
    };
    let count = segment_count(transform, a, b, span, quality);
    let mut prev_frac = span.start_frac;
    let mut prev = edge(transform, a, b, prev_frac);
    for i in 1..=count {
        let frac = lerp(span.start_frac, span.end_frac, i as f32 / count as f32);
        let cur = edge(transform, a, b, frac);
        emit(Slice {
            quad: [prev.left, prev.right, cur.right, cur.left],
            from_frac: prev_frac,
            to_frac: frac,
        });
        prev = cur;
        prev_frac = frac;
    }
    count
}

#[inline(always)]
fn slice_time(a: &Endpoint, b: &Endpoint, slice: &Slice) -> f32 {
    lerp(a.target_time, b.target_time, (slice.from_frac + slice.to_frac) * 0.5)
}

/// 0..1 weight of the active sprite for a held slide.
#[inline(always)]
pub fn active_pulse(now: f32) -> f32 {
    ((now * TAU * ACTIVE_PULSE_HZ).sin() + 1.0) * 0.5
}

/// Slide connector between two notes of a slide. Held slides cross-fade
/// between the idle and active sprites. Returns the number of quads pushed.
pub fn draw_connector(
    ctx: &DrawContext<'_>,
    a: &Endpoint,
    b: &Endpoint,
    kind: SlideKind,
    active: bool,
    out: &mut Vec<ConnectorSegment>,
) -> usize {
    let layer = match kind {
        SlideKind::Normal => Z_SLIDE_CONNECTOR,
        SlideKind::Critical => Z_CRITICAL_SLIDE_CONNECTOR,
    };
    let z_order = draw_order(layer, a.target_time, a.lane);
    let pulse = if active { active_pulse(ctx.now) } else { 0.0 };
    let before = out.len();

    tessellate(ctx.transform, a, b, ctx.now, ctx.quality, |slice| {
        let alpha = ctx.approach.fade_alpha(slice_time(a, b, &slice), ctx.now);
        if alpha <= 0.0 {
            return;
        }
        let idle = alpha * (1.0 - pulse);
        if idle > 0.0 {
            out.push(ConnectorSegment {
                quad: slice.quad,
                z_order,
                alpha: idle,
                sprite: SpriteId::SlideConnector(kind),
            });
        }
        if active {
            out.push(ConnectorSegment {
                quad: slice.quad,
                z_order,
                alpha: alpha * pulse,
                sprite: SpriteId::SlideConnectorActive(kind),
            });
        }
    });
    out.len() - before
}

/// Guide segment. `lifetime` is the real-time span of the whole guide, used
/// by the fade policy.
#[allow(clippy::too_many_arguments)]
pub fn draw_guide(
    ctx: &DrawContext<'_>,
    a: &Endpoint,
    b: &Endpoint,
    color: GuideColor,
    fade: FadePolicy,
    lifetime: (f32, f32),
    guide_alpha: f32,
    out: &mut Vec<ConnectorSegment>,
) -> usize {
    let z_order = draw_order(Z_GUIDE, a.target_time, a.lane);
    let before = out.len();

    tessellate(ctx.transform, a, b, ctx.now, ctx.quality, |slice| {
        let time = slice_time(a, b, &slice);
        let lifetime_progress = unlerp(lifetime.0, lifetime.1, time);
        let alpha =
            guide_alpha * ctx.approach.fade_alpha(time, ctx.now) * fade.alpha(lifetime_progress);
        if alpha.is_nan() || alpha <= 0.0 {
            return;
        }
        out.push(ConnectorSegment {
            quad: slice.quad,
            z_order,
            alpha,
            sprite: SpriteId::Guide(color),
        });
    });
    out.len() - before
}
