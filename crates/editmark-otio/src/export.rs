//! Host sequence to interchange timeline conversion.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use editmark_timeline::{
    ItemRef, Project, Sequence, SourceClip, Tag, TimelineItem, Track as HostTrack,
    TrackKind as HostTrackKind,
};
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{OtioError, Result};
use crate::schema::{
    Clip, Effect, ExternalReference, FreezeFrame, Gap, ImageSequenceReference, LinearTimeWarp,
    Marker, MarkerColor, MediaReference, Metadata, MissingReference, RationalTime, TimeEffect, TimeRange, Timeline,
    Track, TrackChild, TrackKind,
};
use crate::utils::{
    frames_to_timecode, get_rate, padding_from_path, reformatted_path, timecode_to_frames,
};

const COPY_TAG: &str = "Copy";
const TIME_WARP: &str = "TimeWarp";
const TIME_WARP_KNOBS: [&str; 2] = ["lookup", "length"];

fn marker_icon_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"icons:Tag(?P<color>\w+)\.\w+").expect("valid marker icon regex"))
}

fn effect_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_[_0-9]+").expect("valid effect suffix regex"))
}

fn digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

/// Marker colour of a tag, read from its `icons:Tag<Colour>.png` icon.
/// Unknown colours are red.
pub fn marker_color(tag: &Tag) -> MarkerColor {
    let color = marker_icon_regex()
        .captures(&tag.icon)
        .and_then(|caps| caps.name("color"))
        .map(|m| m.as_str().to_lowercase());
    match color.as_deref() {
        Some("magenta") => MarkerColor::Magenta,
        Some("yellow") => MarkerColor::Yellow,
        Some("green") => MarkerColor::Green,
        Some("cyan") => MarkerColor::Cyan,
        Some("blue") => MarkerColor::Blue,
        _ => MarkerColor::Red,
    }
}

/// Effect class of a host effect item name: `TimeWarp1` and `TimeWarp_1_2`
/// are both `TimeWarp`.
fn effect_class_name(name: &str) -> String {
    if name.contains('_') {
        effect_suffix_regex().replace_all(name, "").into_owned()
    } else {
        digits_regex().replace_all(name, "").into_owned()
    }
}

fn string_metadata(map: &BTreeMap<String, String>) -> Metadata {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Converts one host sequence into an interchange [`Timeline`].
pub struct OtioExporter<'a> {
    sequence: &'a Sequence,
    project_settings: Option<&'a BTreeMap<String, Value>>,
    project_fps: f64,
    /// Timeline start frame, the sequence's own when unset
    start_frame: Option<i64>,
    include_tags: bool,
    image_sequences: bool,
}

impl<'a> OtioExporter<'a> {
    pub fn new(sequence: &'a Sequence) -> Self {
        Self {
            sequence,
            project_settings: None,
            project_fps: sequence.frame_rate.to_fps_f64(),
            start_frame: None,
            include_tags: true,
            image_sequences: true,
        }
    }

    /// Exporter for the project's active sequence, carrying the project's
    /// colour settings into the timeline metadata.
    pub fn for_project(project: &'a Project) -> Result<Self> {
        let sequence = project
            .active_sequence()
            .ok_or_else(|| OtioError::NotFound("active sequence".into()))?;
        Ok(Self::new(sequence).with_project_settings(&project.settings))
    }

    pub fn with_project_settings(mut self, settings: &'a BTreeMap<String, Value>) -> Self {
        self.project_settings = Some(settings);
        self
    }

    /// Start the timeline at a `HH:MM:SS:FF` timecode instead of the
    /// sequence's own start.
    pub fn with_start_timecode(mut self, timecode: &str) -> Result<Self> {
        self.start_frame = Some(timecode_to_frames(timecode, self.project_fps)?);
        Ok(self)
    }

    fn start_frame(&self) -> i64 {
        self.start_frame.unwrap_or(self.sequence.timecode_start)
    }

    /// Turn tags into markers (on by default).
    pub fn include_tags(mut self, include: bool) -> Self {
        self.include_tags = include;
        self
    }

    /// Write image sequences as sequence references. When off, every
    /// reference is a single external file with a de-padded path.
    pub fn image_sequences(mut self, enabled: bool) -> Self {
        self.image_sequences = enabled;
        self
    }

    pub fn export(&self) -> Result<Timeline> {
        let mut timeline = self.create_timeline();
        for track in self.sequence.tracks() {
            if !track.enabled {
                debug!(track = %track.name, "skipping disabled track");
                continue;
            }
            timeline.tracks.children.push(self.create_track(track));
        }
        info!(
            sequence = %self.sequence.name,
            start = %frames_to_timecode(self.start_frame(), self.project_fps).unwrap_or_default(),
            tracks = timeline.tracks.children.len(),
            "exported interchange timeline"
        );
        Ok(timeline)
    }

    // ── Timeline and tracks ─────────────────────────────────────

    fn create_timeline(&self) -> Timeline {
        let format = self.sequence.format;
        let mut metadata = string_metadata(&self.sequence.metadata);
        metadata.insert("openpype.timeline.width".into(), json!(format.width));
        metadata.insert("openpype.timeline.height".into(), json!(format.height));
        metadata.insert(
            "openpype.timeline.pixelAspect".into(),
            json!(format.pixel_aspect as i64),
        );
        if let Some(settings) = self.project_settings {
            for (key, value) in settings {
                metadata.insert(format!("openpype.project.{key}"), value.clone());
            }
        }

        let mut timeline = Timeline::new(self.sequence.name.clone());
        timeline.global_start_time = Some(RationalTime::new(
            self.start_frame() as f64,
            self.project_fps,
        ));
        timeline.metadata = metadata;
        timeline
    }

    fn create_track(&self, track: &HostTrack) -> Track {
        let kind = match track.kind {
            HostTrackKind::Video => TrackKind::Video,
            HostTrackKind::Audio => TrackKind::Audio,
        };
        let mut otio_track = Track::new(track.name.clone(), kind);

        for (index, item) in track.items.iter().enumerate() {
            let prev_out = if index == 0 {
                item.timeline_out
            } else {
                track.items[index - 1].timeline_out
            };
            if index == 0 && item.timeline_in > 0 {
                otio_track.append(TrackChild::Gap(self.create_gap(item.timeline_in, 0)));
            } else if index > 0 && item.timeline_in - prev_out != 1 {
                otio_track.append(TrackChild::Gap(self.create_gap(item.timeline_in, prev_out)));
            }
            let item = ItemRef::new(item, track);
            otio_track.append(TrackChild::Clip(self.create_clip(&item)));
        }

        if self.include_tags {
            let source_type = match track.kind {
                HostTrackKind::Video => "VideoTrack",
                HostTrackKind::Audio => "AudioTrack",
            };
            otio_track.markers = self.create_markers(&track.tags, self.project_fps, source_type);
        }
        otio_track
    }

    /// Gap filling the frames between `prev_out` and `clip_in`. A non-zero
    /// `prev_out` is itself occupied, so one frame less is left.
    fn create_gap(&self, clip_in: i64, prev_out: i64) -> Gap {
        let mut length = clip_in - prev_out;
        if prev_out != 0 {
            length -= 1;
        }
        Gap::with_duration(length as f64, self.project_fps)
    }

    // ── Clips ───────────────────────────────────────────────────

    fn create_clip(&self, item: &ItemRef<'_>) -> Clip {
        let source = item.source();
        let speed = item.playback_speed();
        let source_in = if speed > 0.0 {
            item.source_in()
        } else {
            item.source_out()
        };
        let fps = get_rate(item.framerate()).unwrap_or(self.project_fps);

        let reference = self.create_reference(source);
        let available_start = reference
            .available_range()
            .map(|range| range.start_time)
            .unwrap_or_else(|| RationalTime::new(0.0, fps));
        let src_in = available_start + RationalTime::new(source_in, available_start.rate);
        // no rounding, keeps sub-frame accuracy
        let conformed = src_in.rescaled_to(fps);
        let source_range = TimeRange::from_frames(conformed.value, item.duration() as f64, fps);

        let mut clip = Clip::new(item.name(), source_range, reference);
        if self.include_tags {
            clip.markers = self.create_markers(item.tags(), fps, "TrackItem");
            let source_fps = get_rate(source.framerate).unwrap_or(self.project_fps);
            clip.markers
                .extend(self.create_markers(&source.tags, source_fps, "Clip"));
        }
        if !source.media.has_audio {
            clip.effects = time_effects(item);
        }
        clip
    }

    fn create_reference(&self, source: &SourceClip) -> MediaReference {
        let media = &source.media;
        let fps = get_rate(source.framerate).unwrap_or(self.project_fps);
        let available_range =
            TimeRange::from_frames(media.timecode_start as f64, media.duration as f64, fps);

        let mut metadata = string_metadata(&media.metadata);
        metadata.extend(string_metadata(&source.metadata));
        if media.path.is_empty() {
            debug!(clip = %source.name, "media offline, writing missing reference");
            return MediaReference::Missing(MissingReference {
                name: source.name.clone(),
                available_range: Some(available_range),
                metadata,
            });
        }
        // snapshots without a stored padding fall back to the bracketed path
        let padding = if media.padding > 0 {
            media.padding
        } else {
            padding_from_path(&media.path).unwrap_or(0)
        };
        if media.is_sequence() {
            metadata.insert("isSequence".into(), json!(true));
            metadata.insert("padding".into(), json!(padding));
        }
        metadata.insert("ayon.source.colorspace".into(), json!(source.colorspace));
        metadata.insert("ayon.source.width".into(), json!(media.width));
        metadata.insert("ayon.source.height".into(), json!(media.height));
        metadata.insert("ayon.source.pixelAspect".into(), json!(media.pixel_aspect));

        let path = Path::new(&media.path);
        if media.is_sequence() && self.image_sequences {
            let base = path
                .parent()
                .map(|dir| format!("{}/", dir.display()))
                .unwrap_or_default();
            let suffix = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            return MediaReference::ImageSequence(ImageSequenceReference {
                name: String::new(),
                target_url_base: base,
                name_prefix: media.filename_head.clone(),
                name_suffix: suffix,
                start_frame: media.start_frame,
                frame_step: 1,
                rate: fps,
                frame_zero_padding: padding,
                missing_frame_policy: "error".to_string(),
                available_range: Some(available_range),
                metadata,
            });
        }

        MediaReference::External(ExternalReference {
            name: String::new(),
            target_url: reformatted_path(&media.path, false),
            available_range: Some(available_range),
            metadata,
        })
    }

    // ── Markers ─────────────────────────────────────────────────

    fn create_markers(&self, tags: &[Tag], rate: f64, source_type: &str) -> Vec<Marker> {
        tags.iter()
            .filter(|tag| tag.visible && tag.name != COPY_TAG)
            .map(|tag| {
                let length = tag
                    .metadata
                    .get("tag.length")
                    .and_then(|l| l.parse::<i64>().ok())
                    .unwrap_or(0);
                let mut metadata = string_metadata(&tag.stripped_metadata());
                metadata.insert("hiero_source_type".into(), json!(source_type));
                Marker {
                    name: tag.name.clone(),
                    color: marker_color(tag),
                    marked_range: TimeRange::from_frames(tag.in_time, length as f64, rate),
                    comment: String::new(),
                    metadata,
                }
            })
            .collect()
    }
}

// ── Time effects ────────────────────────────────────────────────

/// Retime effects of a clip: the item's own speed change, then every
/// enabled TimeWarp soft effect linked to it.
fn time_effects(item: &ItemRef<'_>) -> Vec<Effect> {
    let mut effects = Vec::new();
    let speed = item.playback_speed();
    if speed == 0.0 {
        effects.push(Effect::FreezeFrame(FreezeFrame::new("FreezeFrame")));
    } else if speed != 1.0 {
        effects.push(Effect::LinearTimeWarp(LinearTimeWarp::new("Speed", speed)));
    }

    for effect in &item.parent_track().sub_track_items {
        if !effect.applies_to(item.guid()) || !effect.name.contains(TIME_WARP) || !effect.enabled {
            continue;
        }
        let mut metadata = Metadata::new();
        for knob_name in TIME_WARP_KNOBS {
            let value = match effect.knobs.get(knob_name) {
                Some(knob) if knob.is_animated() => Value::Array(
                    (item.timeline_in()..=item.timeline_out())
                        .map(|frame| {
                            let value = knob.number_at(frame as f64).unwrap_or(0.0);
                            json!(value - frame as f64)
                        })
                        .collect(),
                ),
                Some(knob) => knob.value_at(item.timeline_in() as f64),
                None => Value::Null,
            };
            metadata.insert(knob_name.to_string(), value);
        }
        let name = if effect.node_name.is_empty() {
            effect.name.clone()
        } else {
            effect.node_name.clone()
        };
        effects.push(Effect::TimeEffect(TimeEffect {
            name,
            effect_name: effect_class_name(&effect.name),
            metadata,
        }));
    }
    effects
}

// ── Lookup and I/O ──────────────────────────────────────────────

/// The clip and marker whose data-tag marker records `clip_index`.
pub fn get_marker_from_clip_index<'t>(
    timeline: &'t Timeline,
    clip_index: &str,
) -> Option<(&'t Clip, &'t Marker)> {
    timeline.find_clips().find_map(|clip| {
        clip.markers
            .iter()
            .find(|marker| {
                marker
                    .metadata
                    .get("json_metadata")
                    .and_then(Value::as_str)
                    .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                    .and_then(|record| {
                        record
                            .get("clip_index")
                            .and_then(Value::as_str)
                            .map(|found| found == clip_index)
                    })
                    .unwrap_or(false)
            })
            .map(|marker| (clip, marker))
    })
}

/// Write a timeline as interchange JSON.
pub fn write_to_file(timeline: &Timeline, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(timeline)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "wrote interchange timeline");
    Ok(())
}

/// Read a timeline written by [`write_to_file`].
pub fn read_from_file(path: &Path) -> Result<Timeline> {
    let data = std::fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use editmark_core::FrameRate;
    use editmark_timeline::{Knob, KeyFrame, MediaSource, SubTrackItem, TrackItem};

    fn sequence_with(items: Vec<TrackItem>) -> Sequence {
        let mut seq = Sequence::new("edit", FrameRate::FPS_24);
        let mut track = HostTrack::new_video("V1", 0);
        for item in items {
            track.add_item(item);
        }
        seq.add_track(track);
        seq
    }

    fn children(timeline: &Timeline) -> &[TrackChild] {
        &timeline.tracks.children[0].children
    }

    #[test]
    fn test_leading_gap() {
        let seq = sequence_with(vec![TrackItem::new("a", 50, 99)]);
        let timeline = OtioExporter::new(&seq).export().unwrap();
        let children = children(&timeline);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].as_gap().unwrap().duration().value, 50.0);
        assert_eq!(children[1].as_clip().unwrap().name, "a");
    }

    #[test]
    fn test_gaps_between_items() {
        let seq = sequence_with(vec![
            TrackItem::new("a", 0, 9),
            TrackItem::new("b", 10, 19),
            TrackItem::new("c", 30, 39),
        ]);
        let timeline = OtioExporter::new(&seq).export().unwrap();
        let children = children(&timeline);
        assert_eq!(children.len(), 4);
        assert!(children[1].as_clip().is_some());
        assert_eq!(children[2].as_gap().unwrap().duration().value, 10.0);
    }

    #[test]
    fn test_disabled_track_skipped() {
        let mut seq = sequence_with(vec![TrackItem::new("a", 0, 9)]);
        seq.video_tracks[0].enabled = false;
        let timeline = OtioExporter::new(&seq).export().unwrap();
        assert!(timeline.tracks.children.is_empty());
    }

    #[test]
    fn test_freeze_frame_only() {
        let seq = sequence_with(vec![TrackItem::new("a", 0, 9).with_speed(0.0)]);
        let timeline = OtioExporter::new(&seq).export().unwrap();
        let clip = children(&timeline)[0].as_clip().unwrap();
        assert_eq!(clip.effects.len(), 1);
        assert!(matches!(clip.effects[0], Effect::FreezeFrame(_)));
    }

    #[test]
    fn test_speed_and_reverse_source() {
        let item = TrackItem::new("a", 0, 9)
            .with_source_range(5.0, 14.0)
            .with_speed(-2.0);
        let seq = sequence_with(vec![item]);
        let timeline = OtioExporter::new(&seq).export().unwrap();
        let clip = children(&timeline)[0].as_clip().unwrap();
        match &clip.effects[0] {
            Effect::LinearTimeWarp(warp) => assert_eq!(warp.time_scalar, -2.0),
            other => panic!("unexpected effect {other:?}"),
        }
        let range = clip.source_range.unwrap();
        assert_eq!(range.start_time.value, 14.0);
        assert_eq!(range.duration.value, 10.0);
    }

    #[test]
    fn test_source_range_conformed_to_item_rate() {
        let mut item = TrackItem::new("a", 0, 9).with_source_range(10.0, 19.0);
        item.source.media.timecode_start = 100;
        item.source.framerate = Some(FrameRate::FPS_25);
        item.framerate = Some(FrameRate::FPS_50);
        let seq = sequence_with(vec![item]);
        let timeline = OtioExporter::new(&seq).export().unwrap();
        let range = children(&timeline)[0].as_clip().unwrap().source_range.unwrap();
        assert_eq!(range.start_time.rate, 50.0);
        assert_eq!(range.start_time.value, 220.0);
    }

    #[test]
    fn test_image_sequence_reference_and_fallback() {
        let media = MediaSource::sequence("/plates/sh010/plate.%04d.exr", "plate.", 1001, 50, 4);
        let source = SourceClip::new("plate", media);
        let seq = sequence_with(vec![TrackItem::new("a", 0, 49).with_source(source)]);

        let timeline = OtioExporter::new(&seq).export().unwrap();
        let clip = children(&timeline)[0].as_clip().unwrap();
        match clip.media_reference().unwrap() {
            MediaReference::ImageSequence(r) => {
                assert_eq!(r.target_url_base, "/plates/sh010/");
                assert_eq!(r.name_prefix, "plate.");
                assert_eq!(r.name_suffix, ".exr");
                assert_eq!(r.start_frame, 1001);
                assert_eq!(r.target_url_for_frame(1001), "/plates/sh010/plate.1001.exr");
                assert_eq!(r.metadata["isSequence"], json!(true));
            }
            other => panic!("unexpected reference {other:?}"),
        }

        let timeline = OtioExporter::new(&seq).image_sequences(false).export().unwrap();
        let clip = children(&timeline)[0].as_clip().unwrap();
        match clip.media_reference().unwrap() {
            MediaReference::External(r) => assert_eq!(r.target_url, "/plates/sh010/plate.%d.exr"),
            other => panic!("unexpected reference {other:?}"),
        }
    }

    #[test]
    fn test_padding_read_from_bracketed_path() {
        let media = MediaSource::sequence("/plates/sh010/plate.[0001-0050].exr", "plate.", 1, 50, 0);
        let source = SourceClip::new("plate", media);
        let seq = sequence_with(vec![TrackItem::new("a", 0, 49).with_source(source)]);
        let timeline = OtioExporter::new(&seq).export().unwrap();
        match children(&timeline)[0].as_clip().unwrap().media_reference().unwrap() {
            MediaReference::ImageSequence(r) => {
                assert_eq!(r.frame_zero_padding, 4);
                assert_eq!(r.metadata["padding"], json!(4));
            }
            other => panic!("unexpected reference {other:?}"),
        }
    }

    #[test]
    fn test_offline_media_is_missing_reference() {
        let mut item = TrackItem::new("offline", 0, 9);
        item.source.media.path.clear();
        let seq = sequence_with(vec![item]);
        let timeline = OtioExporter::new(&seq).export().unwrap();
        match children(&timeline)[0].as_clip().unwrap().media_reference().unwrap() {
            MediaReference::Missing(r) => {
                assert_eq!(r.name, "offline");
                assert_eq!(r.available_range.unwrap().duration.value, 10.0);
            }
            other => panic!("unexpected reference {other:?}"),
        }
    }

    #[test]
    fn test_start_timecode_override() {
        let seq = sequence_with(vec![TrackItem::new("a", 0, 9)]);
        let timeline = OtioExporter::new(&seq)
            .with_start_timecode("01:00:00:00")
            .unwrap()
            .export()
            .unwrap();
        assert_eq!(timeline.global_start_time.unwrap().value, 86_400.0);
        assert!(OtioExporter::new(&seq).with_start_timecode("01:00").is_err());
    }

    #[test]
    fn test_markers_and_clip_index_lookup() {
        let mut item = TrackItem::new("a", 0, 9);
        let guid = item.guid.clone();
        let mut data_tag = Tag::new_data_tag();
        let mut record = serde_json::Map::new();
        record.insert("clip_index".into(), json!(guid));
        data_tag.set_json_metadata(&record).unwrap();
        item.tags.push(data_tag);
        item.tags
            .push(Tag::new("note").with_icon("icons:TagGreen.png").with_metadata("tag.length", "5"));
        item.tags.push(Tag::new(COPY_TAG));
        let mut hidden = Tag::new("hidden");
        hidden.visible = false;
        item.tags.push(hidden);
        let seq = sequence_with(vec![item]);

        let timeline = OtioExporter::new(&seq).export().unwrap();
        let clip = children(&timeline)[0].as_clip().unwrap();
        assert_eq!(clip.markers.len(), 2);
        let note = &clip.markers[1];
        assert_eq!(note.color, MarkerColor::Green);
        assert_eq!(note.marked_range.duration.value, 5.0);
        assert_eq!(note.metadata["length"], json!("5"));
        assert_eq!(note.metadata["hiero_source_type"], json!("TrackItem"));

        let (found, marker) = get_marker_from_clip_index(&timeline, &guid).unwrap();
        assert_eq!(found.name, "a");
        assert!(marker.name.starts_with("AYON_Data_"));
        assert!(get_marker_from_clip_index(&timeline, "other").is_none());
    }

    #[test]
    fn test_time_warp_effect() {
        let item = TrackItem::new("a", 10, 12);
        let mut seq = sequence_with(vec![item]);
        seq.video_tracks[0].add_effect(SubTrackItem {
            name: "TimeWarp1".into(),
            node_class: "TimeWarp".into(),
            node_name: "TimeWarp1".into(),
            enabled: true,
            timeline_in: 10,
            timeline_out: 12,
            sub_track_index: 0,
            linked_items: Vec::new(),
            knobs: BTreeMap::from([
                (
                    "lookup".to_string(),
                    Knob::Animated {
                        keys: vec![
                            KeyFrame { frame: 10.0, value: 20.0 },
                            KeyFrame { frame: 12.0, value: 24.0 },
                        ],
                    },
                ),
                ("length".to_string(), Knob::Static { value: json!(3) }),
            ]),
        });
        let timeline = OtioExporter::new(&seq).export().unwrap();
        let clip = children(&timeline)[1].as_clip().unwrap();
        match &clip.effects[..] {
            [Effect::TimeEffect(effect)] => {
                assert_eq!(effect.effect_name, "TimeWarp");
                assert_eq!(effect.metadata["lookup"], json!([10.0, 11.0, 12.0]));
                assert_eq!(effect.metadata["length"], json!(3));
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn test_effect_class_name() {
        assert_eq!(effect_class_name("TimeWarp1"), "TimeWarp");
        assert_eq!(effect_class_name("TimeWarp_1_2"), "TimeWarp");
    }

    #[test]
    fn test_timeline_metadata_and_roundtrip() {
        let mut project = Project::new("show");
        project.settings.insert("ocioConfigName".into(), json!("aces_1.2"));
        project.add_sequence(sequence_with(vec![TrackItem::new("a", 0, 9)]));
        let timeline = OtioExporter::for_project(&project).unwrap().export().unwrap();
        assert_eq!(timeline.metadata["openpype.timeline.width"], json!(1920));
        assert_eq!(timeline.metadata["openpype.project.ocioConfigName"], json!("aces_1.2"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edit.otio");
        write_to_file(&timeline, &path).unwrap();
        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["OTIO_SCHEMA"], json!("Timeline.1"));
        assert_eq!(raw["tracks"]["children"][0]["OTIO_SCHEMA"], json!("Track.1"));
        assert_eq!(
            raw["tracks"]["children"][0]["children"][0]["OTIO_SCHEMA"],
            json!("Clip.2")
        );
        assert_eq!(read_from_file(&path).unwrap(), timeline);
    }
}
