use crate::game::approach::{ApproachSettings, is_visible};
use crate::ui::batch::DrawQuad;
use crate::ui::connector::{MIN_HALF_WIDTH, Z_NOTE, draw_order};
use crate::ui::sprite::SpriteId;
use crate::ui::stage::ScreenTransform;
use glam::Vec2;

// Screen-space half height of a note head on the judge line.
pub const NOTE_HALF_HEIGHT: f32 = 0.025;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteHead {
    pub lane: f32,
    pub half_width: f32,
    pub target_time: f32,
    pub travel: f32,
    pub critical: bool,
    pub flick: bool,
}

/// Single quad for a note head, or `None` when it is off screen, already
/// judged or fully faded.
pub fn draw_note(
    transform: &dyn ScreenTransform,
    approach: &ApproachSettings,
    note: &NoteHead,
    now: f32,
) -> Option<DrawQuad> {
    if !is_visible(note.travel) || now > note.target_time {
        return None;
    }
    let alpha = approach.fade_alpha(note.target_time, now);
    if alpha <= 0.0 {
        return None;
    }

    let half_width = note.half_width.max(MIN_HALF_WIDTH);
    let left = transform.project(note.lane - half_width, note.travel);
    let right = transform.project(note.lane + half_width, note.travel);
    // Heads shrink toward the vanishing point along with the lanes.
    let rise = Vec2::new(0.0, NOTE_HALF_HEIGHT * note.travel.min(1.0));

    Some(DrawQuad {
        quad: [left - rise, right - rise, right + rise, left + rise],
        z_order: draw_order(Z_NOTE, note.target_time, note.lane),
        alpha,
        sprite: SpriteId::Note { critical: note.critical, flick: note.flick },
    })
}
