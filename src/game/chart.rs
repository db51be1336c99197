use crate::game::ease::EasingKind;
use crate::game::gameplay::{Connector, Field, Guide, Note, NoteDirection};
use crate::game::timescale::{GroupId, Timeline};
use crate::game::timing::TempoMap;
use crate::ui::connector::FadePolicy;
use crate::ui::sprite::{GuideColor, SlideKind};
use log::info;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;

fn default_half_width() -> f32 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartData {
    /// Seconds added to every beat's time.
    pub offset: f32,
    /// (beat, bpm)
    pub bpms: Vec<(f32, f32)>,
    pub groups: Vec<GroupData>,
    pub notes: Vec<NoteData>,
    pub connectors: Vec<ConnectorData>,
    pub guides: Vec<GuideData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupData {
    /// Authored id, referenced by notes. 0 is reserved for the identity group.
    pub id: u32,
    /// (beat, timescale)
    #[serde(default)]
    pub speeds: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteData {
    pub beat: f32,
    pub lane: f32,
    #[serde(default = "default_half_width")]
    pub width: f32,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub critical: bool,
    /// Index into `connectors` of the slide this note belongs to.
    #[serde(default)]
    pub connector: Option<usize>,
    #[serde(default)]
    pub group: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorData {
    pub head: usize,
    pub tail: usize,
    #[serde(default)]
    pub ease: u8,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuideData {
    pub head: usize,
    pub tail: usize,
    #[serde(default)]
    pub ease: u8,
    #[serde(default)]
    pub fade: u8,
    #[serde(default)]
    pub color: String,
    /// (start beat, end beat) of the fade; defaults to head..tail.
    #[serde(default)]
    pub lifetime: Option<(f32, f32)>,
}

#[derive(Debug)]
pub enum ChartError {
    Io(std::io::Error),
    Json(serde_json::Error),
    ReservedGroup,
    DuplicateGroup(u32),
    UnknownGroup { note: usize, group: u32 },
    NonFiniteNote(usize),
    NoteOutOfRange { what: &'static str, index: usize, note: usize },
    UnknownConnector { note: usize, connector: usize },
    BadCode { what: &'static str, index: usize, code: String },
    TailBeforeHead { what: &'static str, index: usize },
    BadLifetime(usize),
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read chart: {e}"),
            Self::Json(e) => write!(f, "malformed chart: {e}"),
            Self::ReservedGroup => write!(f, "group id 0 is reserved for the identity group"),
            Self::DuplicateGroup(id) => write!(f, "group {id} is defined twice"),
            Self::UnknownGroup { note, group } => {
                write!(f, "note {note} references unknown group {group}")
            }
            Self::NonFiniteNote(note) => write!(f, "note {note} has a non-finite beat or lane"),
            Self::NoteOutOfRange { what, index, note } => {
                write!(f, "{what} {index} references missing note {note}")
            }
            Self::UnknownConnector { note, connector } => {
                write!(f, "note {note} references missing connector {connector}")
            }
            Self::BadCode { what, index, code } => write!(f, "{what} {index} has invalid code '{code}'"),
            Self::TailBeforeHead { what, index } => write!(f, "{what} {index} ends before it starts"),
            Self::BadLifetime(index) => {
                write!(f, "guide {index} has a non-finite or reversed lifetime")
            }
        }
    }
}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChartError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl ChartData {
    pub fn from_json_str(json: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChartError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Validates every reference and builds the runtime tables.
    pub fn build(&self) -> Result<Field, ChartError> {
        let mut timeline = Timeline::new(TempoMap::from_bpms(&self.bpms, self.offset));
        let mut group_ids: FxHashMap<u32, GroupId> = FxHashMap::default();
        for g in &self.groups {
            if g.id == 0 {
                return Err(ChartError::ReservedGroup);
            }
            if group_ids.contains_key(&g.id) {
                return Err(ChartError::DuplicateGroup(g.id));
            }
            group_ids.insert(g.id, timeline.add_group(&g.speeds));
        }

        let mut notes = Vec::with_capacity(self.notes.len());
        for (i, n) in self.notes.iter().enumerate() {
            if !n.beat.is_finite() || !n.lane.is_finite() || !n.width.is_finite() {
                return Err(ChartError::NonFiniteNote(i));
            }
            let group = match n.group {
                0 => GroupId::IDENTITY,
                id => *group_ids
                    .get(&id)
                    .ok_or(ChartError::UnknownGroup { note: i, group: id })?,
            };
            if let Some(c) = n.connector
                && c >= self.connectors.len()
            {
                return Err(ChartError::UnknownConnector { note: i, connector: c });
            }
            let direction = n.direction.parse::<NoteDirection>().map_err(|()| ChartError::BadCode {
                what: "note",
                index: i,
                code: n.direction.clone(),
            })?;
            let target_time = timeline.beat_to_time(n.beat);
            notes.push(Note {
                target_time,
                target_scaled_time: timeline.time_to_scaled_time(group, target_time),
                lane: n.lane,
                half_width: n.width.abs(),
                direction,
                critical: n.critical,
                group,
                connector: n.connector,
            });
        }

        let mut connectors = Vec::with_capacity(self.connectors.len());
        for (i, c) in self.connectors.iter().enumerate() {
            let what = "connector";
            check_pair(&self.notes, what, i, c.head, c.tail)?;
            connectors.push(Connector {
                head: c.head,
                tail: c.tail,
                easing: easing(what, i, c.ease)?,
                kind: c.kind.parse::<SlideKind>().map_err(|()| ChartError::BadCode {
                    what,
                    index: i,
                    code: c.kind.clone(),
                })?,
            });
        }

        let mut guides = Vec::with_capacity(self.guides.len());
        for (i, g) in self.guides.iter().enumerate() {
            let what = "guide";
            check_pair(&self.notes, what, i, g.head, g.tail)?;
            let lifetime = match g.lifetime {
                Some((start, end)) if !start.is_finite() || !end.is_finite() || end < start => {
                    return Err(ChartError::BadLifetime(i));
                }
                Some((start, end)) => (timeline.beat_to_time(start), timeline.beat_to_time(end)),
                None => (notes[g.head].target_time, notes[g.tail].target_time),
            };
            guides.push(Guide {
                head: g.head,
                tail: g.tail,
                easing: easing(what, i, g.ease)?,
                fade: FadePolicy::from_code(g.fade).ok_or_else(|| ChartError::BadCode {
                    what,
                    index: i,
                    code: g.fade.to_string(),
                })?,
                color: g.color.parse::<GuideColor>().map_err(|()| ChartError::BadCode {
                    what,
                    index: i,
                    code: g.color.clone(),
                })?,
                lifetime,
            });
        }

        info!(
            "Chart built: {} notes, {} connectors, {} guides, {} timescale groups.",
            notes.len(),
            connectors.len(),
            guides.len(),
            timeline.groups().len()
        );
        Ok(Field { timeline, notes, connectors, guides })
    }
}

fn easing(what: &'static str, index: usize, code: u8) -> Result<EasingKind, ChartError> {
    EasingKind::from_code(code).ok_or_else(|| ChartError::BadCode {
        what,
        index,
        code: code.to_string(),
    })
}

fn check_pair(
    notes: &[NoteData],
    what: &'static str,
    index: usize,
    head: usize,
    tail: usize,
) -> Result<(), ChartError> {
    for note in [head, tail] {
        if note >= notes.len() {
            return Err(ChartError::NoteOutOfRange { what, index, note });
        }
    }
    if notes[tail].beat < notes[head].beat {
        return Err(ChartError::TailBeforeHead { what, index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "offset": 0.0,
        "bpms": [[0, 120]],
        "groups": [{ "id": 7, "speeds": [[0, 1], [4, 2]] }],
        "notes": [
            { "beat": 4, "lane": -2, "connector": 0 },
            { "beat": 6, "lane": 2, "width": 2, "connector": 0, "direction": "up" },
            { "beat": 6, "lane": 0, "group": 7, "critical": true }
        ],
        "connectors": [{ "head": 0, "tail": 1, "ease": 3, "kind": "critical" }],
        "guides": [{ "head": 0, "tail": 2, "fade": 2, "color": "cyan" }]
    }"#;

    #[test]
    fn builds_runtime_tables() {
        let field = ChartData::from_json_str(CHART).and_then(|c| c.build()).expect("valid chart");
        assert_eq!(field.notes.len(), 3);
        assert_eq!(field.notes[0].target_time, 2.0);
        assert_eq!(field.notes[0].half_width, 1.0, "width defaults to one lane");
        assert!(field.notes[1].direction.is_flick());
        assert_eq!(field.notes[2].group, GroupId(1), "authored ids map to handles");
        assert!((field.notes[2].target_scaled_time - 4.0).abs() <= 1e-4);
        assert_eq!(field.connectors[0].easing, EasingKind::InOut);
        assert_eq!(field.connectors[0].kind, SlideKind::Critical);
        assert_eq!(field.guides[0].fade, FadePolicy::Out);
        assert_eq!(field.guides[0].lifetime, (2.0, 3.0));
    }

    fn build_err(json: &str) -> ChartError {
        match ChartData::from_json_str(json).and_then(|c| c.build()) {
            Ok(_) => panic!("chart should be rejected: {json}"),
            Err(e) => e,
        }
    }

    #[test]
    fn rejects_malformed_references() {
        let e = build_err(r#"{ "notes": [{ "beat": 0, "lane": 0, "group": 3 }] }"#);
        assert!(matches!(e, ChartError::UnknownGroup { note: 0, group: 3 }), "{e}");

        let e = build_err(
            r#"{ "notes": [{ "beat": 0, "lane": 0 }], "connectors": [{ "head": 0, "tail": 4 }] }"#,
        );
        assert!(matches!(e, ChartError::NoteOutOfRange { note: 4, .. }), "{e}");

        let e = build_err(r#"{ "groups": [{ "id": 0 }] }"#);
        assert!(matches!(e, ChartError::ReservedGroup), "{e}");

        let e = build_err(r#"{ "groups": [{ "id": 2 }, { "id": 2 }] }"#);
        assert!(matches!(e, ChartError::DuplicateGroup(2)), "{e}");

        let e = build_err(r#"{ "notes": [{ "beat": 0, "lane": 0, "connector": 1 }] }"#);
        assert!(matches!(e, ChartError::UnknownConnector { note: 0, connector: 1 }), "{e}");
    }

    #[test]
    fn rejects_bad_codes_and_reversed_pairs() {
        let notes = r#""notes": [{ "beat": 0, "lane": 0 }, { "beat": 1, "lane": 0 }]"#;
        let e = build_err(&format!(r#"{{ {notes}, "connectors": [{{ "head": 0, "tail": 1, "ease": 9 }}] }}"#));
        assert!(matches!(e, ChartError::BadCode { what: "connector", .. }), "{e}");

        let e = build_err(&format!(r#"{{ {notes}, "guides": [{{ "head": 0, "tail": 1, "color": "pink" }}] }}"#));
        assert!(matches!(e, ChartError::BadCode { what: "guide", .. }), "{e}");

        let e = build_err(&format!(r#"{{ {notes}, "guides": [{{ "head": 1, "tail": 0 }}] }}"#));
        assert!(matches!(e, ChartError::TailBeforeHead { what: "guide", index: 0 }), "{e}");

        let guide = |lifetime: &str| {
            format!(r#"{{ {notes}, "guides": [{{ "head": 0, "tail": 1, "lifetime": {lifetime} }}] }}"#)
        };
        // 1e39 overflows f32 to infinity.
        let e = build_err(&guide("[1e39, 1e39]"));
        assert!(matches!(e, ChartError::BadLifetime(0)), "{e}");
        let e = build_err(&guide("[2, 1]"));
        assert!(matches!(e, ChartError::BadLifetime(0)), "{e}");
        let field = ChartData::from_json_str(&guide("[0.5, 1]"))
            .and_then(|c| c.build())
            .expect("ordered lifetime is accepted");
        assert_eq!(field.guides[0].lifetime, (0.25, 0.5));

        let e = build_err(r#"{ "notes": [{ "beat": 0 }] }"#);
        assert!(matches!(e, ChartError::Json(_)), "missing lane is a parse error: {e}");
    }
}
