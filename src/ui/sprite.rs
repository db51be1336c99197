use std::str::FromStr;

/// `0xRRGGBB` to linear-ish RGBA floats, alpha 1. Usable in consts.
pub const fn rgb_hex(rgb: u32) -> [f32; 4] {
    [
        ((rgb >> 16) & 0xFF) as f32 / 255.0,
        ((rgb >> 8) & 0xFF) as f32 / 255.0,
        (rgb & 0xFF) as f32 / 255.0,
        1.0,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlideKind {
    Normal,
    Critical,
}

impl FromStr for SlideKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => Ok(Self::Normal),
            "critical" => Ok(Self::Critical),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuideColor {
    Neutral,
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Cyan,
    Black,
}

impl FromStr for GuideColor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "neutral" => Ok(Self::Neutral),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            "yellow" => Ok(Self::Yellow),
            "purple" => Ok(Self::Purple),
            "cyan" => Ok(Self::Cyan),
            "black" => Ok(Self::Black),
            _ => Err(()),
        }
    }
}

/// Sprite selection handed to the asset layer with every quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteId {
    SlideConnector(SlideKind),
    SlideConnectorActive(SlideKind),
    Guide(GuideColor),
    Note { critical: bool, flick: bool },
}

impl SpriteId {
    pub const fn texture_key(self) -> &'static str {
        match self {
            Self::SlideConnector(SlideKind::Normal) => "connector_normal",
            Self::SlideConnector(SlideKind::Critical) => "connector_critical",
            Self::SlideConnectorActive(SlideKind::Normal) => "connector_normal_active",
            Self::SlideConnectorActive(SlideKind::Critical) => "connector_critical_active",
            Self::Guide(GuideColor::Neutral) => "guide_neutral",
            Self::Guide(GuideColor::Red) => "guide_red",
            Self::Guide(GuideColor::Green) => "guide_green",
            Self::Guide(GuideColor::Blue) => "guide_blue",
            Self::Guide(GuideColor::Yellow) => "guide_yellow",
            Self::Guide(GuideColor::Purple) => "guide_purple",
            Self::Guide(GuideColor::Cyan) => "guide_cyan",
            Self::Guide(GuideColor::Black) => "guide_black",
            Self::Note { critical: false, flick: false } => "note_normal",
            Self::Note { critical: false, flick: true } => "note_flick",
            Self::Note { critical: true, flick: false } => "note_critical",
            Self::Note { critical: true, flick: true } => "note_critical_flick",
        }
    }

    /// Flat tint used when no texture is bound.
    pub const fn tint(self) -> [f32; 4] {
        match self {
            Self::SlideConnector(SlideKind::Normal) => rgb_hex(0x3ACF7E),
            Self::SlideConnectorActive(SlideKind::Normal) => rgb_hex(0x9CFFC8),
            Self::SlideConnector(SlideKind::Critical) => rgb_hex(0xF2C029),
            Self::SlideConnectorActive(SlideKind::Critical) => rgb_hex(0xFFF0A0),
            Self::Guide(color) => match color {
                GuideColor::Neutral => rgb_hex(0xE0E0E0),
                GuideColor::Red => rgb_hex(0xF05050),
                GuideColor::Green => rgb_hex(0x50E070),
                GuideColor::Blue => rgb_hex(0x5080F0),
                GuideColor::Yellow => rgb_hex(0xF0E050),
                GuideColor::Purple => rgb_hex(0xB060F0),
                GuideColor::Cyan => rgb_hex(0x50E0F0),
                GuideColor::Black => rgb_hex(0x202020),
            },
            Self::Note { critical: true, .. } => rgb_hex(0xFFD040),
            Self::Note { critical: false, flick: true } => rgb_hex(0xF06080),
            Self::Note { critical: false, flick: false } => rgb_hex(0x40D0F0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_unpack_channels() {
        assert_eq!(rgb_hex(0xFF0080), [1.0, 0.0, 128.0 / 255.0, 1.0]);
    }

    #[test]
    fn import_names_parse_case_insensitively() {
        assert_eq!("Critical".parse::<SlideKind>(), Ok(SlideKind::Critical));
        assert_eq!("".parse::<GuideColor>(), Ok(GuideColor::Neutral));
        assert_eq!(" PURPLE ".parse::<GuideColor>(), Ok(GuideColor::Purple));
        assert!("magenta".parse::<GuideColor>().is_err());
    }

    #[test]
    fn active_and_idle_slides_use_distinct_textures() {
        for kind in [SlideKind::Normal, SlideKind::Critical] {
            assert_ne!(
                SpriteId::SlideConnector(kind).texture_key(),
                SpriteId::SlideConnectorActive(kind).texture_key()
            );
        }
    }
}
