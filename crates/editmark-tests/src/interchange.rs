//! Integration tests for interchange export.
//!
//! Exports editmark-timeline projects through editmark-otio, including
//! sequences carrying instances made by editmark-publish.

use editmark_core::FrameRate;
use editmark_otio::{
    get_marker_from_clip_index, read_from_file, write_to_file, Effect, OtioExporter, TrackChild,
};
use editmark_publish::{CreateContext, CreateOptions, ProductKind, Settings, ShotClipCreator};
use editmark_timeline::{Project, Sequence, Track, TrackItem};

// ── Helpers ────────────────────────────────────────────────────

fn project_with(items: Vec<TrackItem>) -> Project {
    let mut seq = Sequence::new("edit_v001", FrameRate::FPS_24);
    let mut track = Track::new_video("Hero", 1);
    for item in items {
        track.add_item(item);
    }
    seq.add_track(track);
    let mut project = Project::new("show");
    project.add_sequence(seq);
    project
}

fn first_track(timeline: &editmark_otio::Timeline) -> &[TrackChild] {
    &timeline.tracks.children[0].children
}

// ── Gaps and effects ───────────────────────────────────────────

#[test]
fn late_first_clip_gets_leading_gap() {
    let project = project_with(vec![TrackItem::new("a", 50, 99)]);
    let timeline = OtioExporter::for_project(&project).unwrap().export().unwrap();
    let children = first_track(&timeline);
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].as_gap().unwrap().duration().value, 50.0);
    assert_eq!(children[1].as_clip().unwrap().name, "a");
}

#[test]
fn still_clip_gets_only_freeze_frame() {
    let project = project_with(vec![TrackItem::new("still", 0, 23).with_speed(0.0)]);
    let timeline = OtioExporter::for_project(&project).unwrap().export().unwrap();
    let clip = first_track(&timeline)[0].as_clip().unwrap();
    assert_eq!(clip.effects.len(), 1);
    assert!(matches!(clip.effects[0], Effect::FreezeFrame(_)));
    assert!(!clip
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::LinearTimeWarp(_))));
}

// ── Instance cross-reference ───────────────────────────────────

#[test]
fn markers_rejoin_clips_to_instances() {
    let mut project = project_with(vec![
        TrackItem::new("clipA", 1000, 1099),
        TrackItem::new("clipB", 1100, 1199),
    ]);
    let settings = Settings::default();
    let options = CreateOptions {
        use_selection: false,
        ..CreateOptions::default()
    }
    .with_hero_track("Hero");
    let created = {
        let seq = project.active_sequence_mut().unwrap();
        ShotClipCreator::new(&settings)
            .create(seq, &mut CreateContext::new(), &options)
            .unwrap()
    };

    let timeline = OtioExporter::for_project(&project).unwrap().export().unwrap();
    for shot in created.iter().filter(|i| i.kind() == Some(ProductKind::Shot)) {
        let (clip, marker) = get_marker_from_clip_index(&timeline, &shot.clip_index).unwrap();
        assert!(marker.name.starts_with("AYON_Data"));
        assert_eq!(
            format!("{}/{}", shot.hierarchy, clip.name),
            shot.folder_path.trim_start_matches('/')
        );
    }
}

#[test]
fn exported_file_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("otio/edit.otio");
    let project = project_with(vec![
        TrackItem::new("a", 10, 19),
        TrackItem::new("b", 30, 39).with_speed(2.0),
    ]);
    let timeline = OtioExporter::for_project(&project).unwrap().export().unwrap();
    write_to_file(&timeline, &path).unwrap();
    assert_eq!(read_from_file(&path).unwrap(), timeline);
}
