use lanefield::config::{self, Config};
use lanefield::game::approach::{MAX_NOTE_SPEED, MIN_NOTE_SPEED};
use lanefield::game::chart::ChartData;
use lanefield::game::gameplay::{Frame, FrameSettings, FrameStats, PlayMode};
use lanefield::ui::batch::{DrawBatch, MeshVertex, vertex_bytes};
use lanefield::ui::connector::MAX_QUALITY;
use log::{debug, info};
use std::path::PathBuf;

const FRAME_RATE: f32 = 60.0;
// Real time simulated before the first and after the last note.
const LEAD_IN_S: f32 = 2.0;
const USAGE: &str = "usage: lanefield <chart.json> [play|watch|preview] \
[--speed N] [--hidden F] [--quality N] [--[no-]animation] [--at SECONDS] [--save]\n\
Option flags apply to this run only; --save also writes them to lanefield.ini.";

/// Option flags given on the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Overrides {
    note_speed: Option<f32>,
    hidden: Option<f32>,
    connector_quality: Option<u32>,
    connector_animation: Option<bool>,
}

impl Overrides {
    /// Applies to a copy of the loaded config, clamped like the config setters.
    fn apply(&self, cfg: &mut Config) {
        if let Some(speed) = self.note_speed {
            cfg.note_speed = speed.clamp(MIN_NOTE_SPEED, MAX_NOTE_SPEED);
        }
        if let Some(hidden) = self.hidden {
            cfg.hidden = hidden.clamp(0.0, 1.0);
        }
        if let Some(quality) = self.connector_quality {
            cfg.connector_quality = quality.clamp(1, MAX_QUALITY);
        }
        if let Some(enabled) = self.connector_animation {
            cfg.connector_animation = enabled;
        }
    }

    fn save(&self) {
        if let Some(speed) = self.note_speed {
            config::update_note_speed(speed);
        }
        if let Some(hidden) = self.hidden {
            config::update_hidden(hidden);
        }
        if let Some(quality) = self.connector_quality {
            config::update_connector_quality(quality);
        }
        if let Some(enabled) = self.connector_animation {
            config::update_connector_animation(enabled);
        }
    }
}

#[derive(Debug)]
struct Args {
    chart: PathBuf,
    mode: PlayMode,
    /// Preview position in seconds.
    at: f32,
    overrides: Overrides,
    save: bool,
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{flag} needs a value\n{USAGE}"))?;
    value.parse::<T>().map_err(|_| format!("invalid value '{value}' for {flag}"))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut chart = None;
    let mut mode = PlayMode::default();
    let mut at = 0.0;
    let mut overrides = Overrides::default();
    let mut save = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--speed" => overrides.note_speed = Some(parse_value(&arg, args.next())?),
            "--hidden" => overrides.hidden = Some(parse_value(&arg, args.next())?),
            "--quality" => overrides.connector_quality = Some(parse_value(&arg, args.next())?),
            "--no-animation" => overrides.connector_animation = Some(false),
            "--animation" => overrides.connector_animation = Some(true),
            "--at" => at = parse_value(&arg, args.next())?,
            "--save" => save = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if chart.is_none() => chart = Some(PathBuf::from(&arg)),
            _ => mode = arg.parse::<PlayMode>()?,
        }
    }

    let chart = chart.ok_or_else(|| USAGE.to_string())?;
    Ok(Args { chart, mode, at, overrides, save })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    log::set_max_level(config::get().log_level.as_level_filter());

    let args = parse_args(std::env::args().skip(1))?;
    if args.save {
        args.overrides.save();
    }
    let mut cfg = config::get();
    args.overrides.apply(&mut cfg);

    let field = ChartData::load(&args.chart)?.build()?;
    let settings = FrameSettings::from_config(&cfg, args.mode);
    let transform = settings.screen_transform();
    info!(
        "Running '{}' in {:?} mode (speed {}, preempt {:.3}s, quality {}).",
        args.chart.display(),
        settings.mode,
        settings.approach.note_speed,
        settings.approach.preempt(),
        settings.quality
    );

    let mut frame = Frame::new(&field, settings);
    let mut batch = DrawBatch::new();
    let mut vertices: Vec<MeshVertex> = Vec::new();

    if settings.mode == PlayMode::Preview {
        let stats = frame.advance(&field, args.at).draw(transform.as_ref(), &mut batch);
        batch.write_vertices(&mut vertices);
        info!(
            "Preview at {:.3}s: {stats:?}, {} vertex bytes.",
            args.at,
            vertex_bytes(&vertices).len()
        );
        return Ok(());
    }

    let start = field.start_time() - LEAD_IN_S;
    let end = field.end_time() + LEAD_IN_S;
    let frames = ((end - start) * FRAME_RATE).ceil().max(1.0) as u32;
    let mut total = FrameStats::default();
    let mut peak_quads = 0;
    for i in 0..=frames {
        let now = start + i as f32 / FRAME_RATE;
        batch.clear();
        let stats = frame.advance(&field, now).draw(transform.as_ref(), &mut batch);
        batch.write_vertices(&mut vertices);
        debug!("t={now:.3}s {stats:?} quads={}", batch.len());

        total.notes += stats.notes;
        total.connector_quads += stats.connector_quads;
        total.guide_quads += stats.guide_quads;
        peak_quads = peak_quads.max(batch.len());
    }

    let tempo = field.timeline.tempo();
    let last_beat = tempo.beat_for_time(field.end_time());
    info!(
        "Chart offset {:.3}s, last note on beat {last_beat:.2} at {} BPM.",
        tempo.offset_seconds(),
        tempo.bpm_for_beat(last_beat)
    );
    info!(
        "Simulated {} frames from {start:.2}s to {end:.2}s: {total:?}, peak {peak_quads} quads per frame.",
        frames + 1
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Result<Args, String> {
        parse_args(line.split_whitespace().map(str::to_string))
    }

    #[test]
    fn option_flags_only_touch_the_local_copy() {
        let parsed = args("song.json watch --speed 20 --hidden 0.4 --no-animation").unwrap();
        assert_eq!(parsed.mode, PlayMode::Watch);
        assert!(!parsed.save);

        let loaded = Config::default();
        let mut cfg = loaded;
        parsed.overrides.apply(&mut cfg);
        assert_eq!(cfg.note_speed, MAX_NOTE_SPEED);
        assert_eq!(cfg.hidden, 0.4);
        assert!(!cfg.connector_animation);
        assert_eq!(cfg.connector_quality, loaded.connector_quality);
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn save_is_opt_in() {
        let parsed = args("song.json --quality 0 --save").unwrap();
        assert!(parsed.save);
        let mut cfg = Config::default();
        parsed.overrides.apply(&mut cfg);
        assert_eq!(cfg.connector_quality, 1);
    }

    #[test]
    fn bad_flags_report_usage() {
        assert!(args("").unwrap_err().contains("usage"));
        assert!(args("song.json --speed").unwrap_err().contains("--speed needs a value"));
        assert!(args("song.json --speed fast").is_err());
    }
}
