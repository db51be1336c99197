use crate::config::Config;
use crate::game::approach::ApproachSettings;
use crate::game::ease::EasingKind;
use crate::game::timescale::{CachedState, GroupId, Timeline};
use crate::ui::batch::DrawBatch;
use crate::ui::connector::{
    ConnectorSegment, DrawContext, Endpoint, FadePolicy, draw_connector, draw_guide,
};
use crate::ui::note::{NoteHead, draw_note};
use crate::ui::sprite::{GuideColor, SlideKind};
use crate::ui::stage::{PerspectiveStage, PreviewColumn, ScreenTransform};
use log::{debug, warn};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Live play; slides are held only when the host says so.
    #[default]
    Play,
    /// Result replay; slides count as held between head and tail.
    Watch,
    /// Static snapshot on a flat column. No culling by time, no fades.
    Preview,
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(Self::Play),
            "watch" | "replay" => Ok(Self::Watch),
            "preview" => Ok(Self::Preview),
            other => Err(format!("unknown mode '{other}' (expected play, watch or preview)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteDirection {
    #[default]
    None,
    Up,
    UpLeft,
    UpRight,
    Down,
    DownLeft,
    DownRight,
}

impl NoteDirection {
    #[inline(always)]
    pub const fn is_flick(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for NoteDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "up" => Ok(Self::Up),
            "upleft" | "up_left" => Ok(Self::UpLeft),
            "upright" | "up_right" => Ok(Self::UpRight),
            "down" => Ok(Self::Down),
            "downleft" | "down_left" => Ok(Self::DownLeft),
            "downright" | "down_right" => Ok(Self::DownRight),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub target_time: f32,
    /// Forward query of `target_time` in the note's group, resolved at load.
    pub target_scaled_time: f32,
    pub lane: f32,
    pub half_width: f32,
    pub direction: NoteDirection,
    pub critical: bool,
    pub group: GroupId,
    /// Slide this note belongs to, if any.
    pub connector: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub head: usize,
    pub tail: usize,
    pub easing: EasingKind,
    pub kind: SlideKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    pub head: usize,
    pub tail: usize,
    pub easing: EasingKind,
    pub fade: FadePolicy,
    pub color: GuideColor,
    /// Real-time span the fade policy is measured over.
    pub lifetime: (f32, f32),
}

/// Everything built from a chart. Read-only while frames run.
#[derive(Debug, Clone, Default)]
pub struct Field {
    pub timeline: Timeline,
    pub notes: Vec<Note>,
    pub connectors: Vec<Connector>,
    pub guides: Vec<Guide>,
}

impl Field {
    /// Real time of the last note, or 0 for an empty chart.
    pub fn end_time(&self) -> f32 {
        self.notes.iter().map(|n| n.target_time).fold(0.0, f32::max)
    }

    pub fn start_time(&self) -> f32 {
        self.notes.iter().map(|n| n.target_time).fold(f32::INFINITY, f32::min).min(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub mode: PlayMode,
    pub approach: ApproachSettings,
    pub quality: u32,
    pub connector_animation: bool,
    pub guide_alpha: f32,
    pub preview_quality_scale: f32,
}

impl FrameSettings {
    pub fn from_config(cfg: &Config, mode: PlayMode) -> Self {
        let hidden = if mode == PlayMode::Preview { 0.0 } else { cfg.hidden };
        Self {
            mode,
            approach: ApproachSettings::new(cfg.note_speed, hidden),
            quality: cfg.connector_quality,
            connector_animation: cfg.connector_animation && mode != PlayMode::Preview,
            guide_alpha: cfg.guide_alpha,
            preview_quality_scale: cfg.preview_quality_scale,
        }
    }

    pub fn screen_transform(&self) -> Box<dyn ScreenTransform> {
        match self.mode {
            PlayMode::Play | PlayMode::Watch => Box::new(PerspectiveStage::default()),
            PlayMode::Preview => Box::new(PreviewColumn::new(self.preview_quality_scale)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub notes: usize,
    pub connector_quads: usize,
    pub guide_quads: usize,
}

/// Per-consumer frame state: one cursor per timescale group plus slide
/// hold flags.
#[derive(Debug, Clone)]
pub struct Frame {
    settings: FrameSettings,
    cursors: Vec<CachedState>,
    // [0] is the identity group, [i] is GroupId(i).
    group_times: Vec<f32>,
    held: Vec<bool>,
    last_now: Option<f32>,
}

impl Frame {
    pub fn new(field: &Field, settings: FrameSettings) -> Self {
        let groups = field.timeline.groups();
        Self {
            settings,
            cursors: groups.iter().map(|g| CachedState::new(g.id())).collect(),
            group_times: vec![0.0; groups.len() + 1],
            held: vec![false; field.connectors.len()],
            last_now: None,
        }
    }

    #[inline(always)]
    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    /// Host input for live play. Ignored in watch mode, where holds follow
    /// the chart.
    pub fn set_slide_held(&mut self, connector: usize, held: bool) {
        if let Some(slot) = self.held.get_mut(connector) {
            *slot = held;
        }
    }

    /// Refreshes every group's scaled time for `now` and returns the view
    /// notes and connectors read from.
    pub fn advance<'a>(&'a mut self, field: &'a Field, now: f32) -> FrameView<'a> {
        if let Some(prev) = self.last_now
            && now < prev
        {
            match self.settings.mode {
                PlayMode::Play => {
                    warn!("Frame time went backwards ({prev:.3}s -> {now:.3}s); resetting cursors")
                }
                PlayMode::Watch | PlayMode::Preview => debug!("Seek {prev:.3}s -> {now:.3}s"),
            }
        }
        self.last_now = Some(now);

        self.group_times[0] = now;
        let groups = field.timeline.groups();
        for ((slot, cursor), group) in
            self.group_times[1..].iter_mut().zip(&mut self.cursors).zip(groups)
        {
            *slot = cursor.get_in(group, now);
        }

        if self.settings.mode == PlayMode::Watch {
            for (held, c) in self.held.iter_mut().zip(&field.connectors) {
                let head = field.notes[c.head].target_time;
                let tail = field.notes[c.tail].target_time;
                *held = (head..=tail).contains(&now);
            }
        }

        FrameView {
            field,
            settings: &self.settings,
            group_times: &self.group_times,
            held: &self.held,
            now,
        }
    }
}

/// Read-only snapshot of one frame. Group times are final by construction.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    field: &'a Field,
    settings: &'a FrameSettings,
    group_times: &'a [f32],
    held: &'a [bool],
    now: f32,
}

impl FrameView<'_> {
    #[inline(always)]
    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn group_scaled_time(&self, group: GroupId) -> f32 {
        self.group_times.get(group.0 as usize).copied().unwrap_or(self.now)
    }

    #[inline(always)]
    pub fn target_time(&self, note: &Note) -> f32 {
        note.target_time
    }

    pub fn progress(&self, note: &Note) -> f32 {
        self.settings
            .approach
            .progress(note.target_scaled_time, self.group_scaled_time(note.group))
    }

    pub fn is_held(&self, connector: usize) -> bool {
        self.held.get(connector).copied().unwrap_or(false)
    }

    pub fn endpoint(&self, note: &Note, easing: EasingKind) -> Endpoint {
        Endpoint {
            lane: note.lane,
            half_width: note.half_width,
            target_time: note.target_time,
            travel: self.progress(note),
            easing,
        }
    }

    /// Emits guides, slide connectors and note heads into `batch`.
    pub fn draw(&self, transform: &dyn ScreenTransform, batch: &mut DrawBatch) -> FrameStats {
        let settings = self.settings;
        let cull_now = match settings.mode {
            PlayMode::Play | PlayMode::Watch => self.now,
            PlayMode::Preview => f32::NEG_INFINITY,
        };
        let ctx = DrawContext {
            transform,
            approach: &settings.approach,
            now: cull_now,
            quality: settings.quality,
        };
        let notes = &self.field.notes;
        let mut stats = FrameStats::default();
        let mut segments: Vec<ConnectorSegment> = Vec::new();

        for g in &self.field.guides {
            let a = self.endpoint(&notes[g.head], g.easing);
            let b = self.endpoint(&notes[g.tail], g.easing);
            segments.clear();
            stats.guide_quads += draw_guide(
                &ctx,
                &a,
                &b,
                g.color,
                g.fade,
                g.lifetime,
                settings.guide_alpha,
                &mut segments,
            );
            batch.extend_segments(&segments);
        }

        for (i, c) in self.field.connectors.iter().enumerate() {
            let a = self.endpoint(&notes[c.head], c.easing);
            let b = self.endpoint(&notes[c.tail], c.easing);
            let active = settings.connector_animation && self.is_held(i);
            segments.clear();
            stats.connector_quads += draw_connector(&ctx, &a, &b, c.kind, active, &mut segments);
            batch.extend_segments(&segments);
        }

        for note in notes {
            let slide_critical = note
                .connector
                .and_then(|i| self.field.connectors.get(i))
                .is_some_and(|c| c.kind == SlideKind::Critical);
            let head = NoteHead {
                lane: note.lane,
                half_width: note.half_width,
                target_time: note.target_time,
                travel: self.progress(note),
                critical: note.critical || slide_critical,
                flick: note.direction.is_flick(),
            };
            if let Some(quad) = draw_note(transform, &settings.approach, &head, cull_now) {
                batch.push(quad);
                stats.notes += 1;
            }
        }

        stats
    }
}
