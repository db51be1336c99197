// Easing curves shared by slide connectors and guides.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EasingKind {
    #[default]
    Linear,
    In,
    Out,
    InOut,
    OutIn,
}

impl EasingKind {
    /// Chart import code: 0=Linear, 1=In, 2=Out, 3=InOut, 4=OutIn.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Linear),
            1 => Some(Self::In),
            2 => Some(Self::Out),
            3 => Some(Self::InOut),
            4 => Some(Self::OutIn),
            _ => None,
        }
    }

    /// Maps `t` (expected in 0..=1) through the curve. Inputs outside the
    /// unit range are extrapolated with the same polynomial.
    #[inline(always)]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::In => ease_in_quad(t),
            Self::Out => ease_out_quad(t),
            Self::InOut => ease_in_out_quad(t),
            Self::OutIn => ease_out_in_quad(t),
        }
    }
}

#[inline(always)]
pub fn ease_in_quad(t: f32) -> f32 {
    t * t
}

#[inline(always)]
pub fn ease_out_quad(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

#[inline(always)]
pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        ease_in_quad(t * 2.0) * 0.5
    } else {
        0.5 + ease_out_quad(t * 2.0 - 1.0) * 0.5
    }
}

#[inline(always)]
pub fn ease_out_in_quad(t: f32) -> f32 {
    if t < 0.5 {
        ease_out_quad(t * 2.0) * 0.5
    } else {
        0.5 + ease_in_quad(t * 2.0 - 1.0) * 0.5
    }
}

#[inline(always)]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Inverse of `lerp`. Returns 0 for a degenerate range.
#[inline(always)]
pub fn unlerp(a: f32, b: f32, v: f32) -> f32 {
    let d = b - a;
    if d.abs() <= f32::EPSILON { 0.0 } else { (v - a) / d }
}

#[inline(always)]
pub fn remap(in0: f32, in1: f32, out0: f32, out1: f32, v: f32) -> f32 {
    lerp(out0, out1, unlerp(in0, in1, v))
}

#[inline(always)]
pub fn remap_clamped(in0: f32, in1: f32, out0: f32, out1: f32, v: f32) -> f32 {
    lerp(out0, out1, unlerp(in0, in1, v).clamp(0.0, 1.0))
}
