//! Integration tests for clip naming and vertical sync.
//!
//! Exercises editmark-template padding through the editmark-publish
//! converter on editmark-timeline sequences.

use std::collections::HashSet;

use editmark_core::{is_overlapping, FrameRange, FrameRate};
use editmark_publish::{CreateContext, CreateOptions, PublishClip, Settings, ShotClipCreator, SyncSession};
use editmark_template::{replace_hash_with_field, resolve_template, FormatContext};
use editmark_timeline::{Sequence, Track, TrackItem};
use proptest::prelude::*;

// ── Helpers ────────────────────────────────────────────────────

fn sync_options() -> CreateOptions {
    CreateOptions {
        hierarchy: "{folder}/{sequence}/{track}".into(),
        clip_name: "{shot}".into(),
        count_from: 10,
        count_steps: 10,
        ..CreateOptions::default()
    }
    .with_hero_track("Hero")
    .with_variant("Main")
}

fn stacked_sequence() -> Sequence {
    let mut seq = Sequence::new("sq01", FrameRate::FPS_24);
    let mut hero = Track::new_video("Hero", 1);
    hero.add_item(TrackItem::new("shotA", 100, 150));
    let mut bg = Track::new_video("bg", 2);
    bg.add_item(TrackItem::new("bgA", 100, 120));
    bg.add_item(TrackItem::new("bgB", 121, 150));
    seq.add_track(hero);
    seq.add_track(bg);
    seq
}

// ── Padding ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn hash_run_resolves_to_zero_padded_number(width in 1usize..7, seed in any::<u64>()) {
        let value = (seed % 10u64.pow(width as u32)) as i64;
        let template = replace_hash_with_field("shot", &format!("sh{}", "#".repeat(width)));
        let ctx = FormatContext::new().with("shot", value);
        let resolved = resolve_template(&template, &ctx).unwrap();
        prop_assert_eq!(resolved, format!("sh{:0width$}", value, width = width));
    }
}

// ── Overlap ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn strict_overlap_is_coverage_and_implies_loose(
        a in -500i64..500, len_a in 0i64..300,
        b in -500i64..500, len_b in 0i64..300,
    ) {
        let test = FrameRange::new(a, a + len_a);
        let reference = FrameRange::new(b, b + len_b);
        let strict = is_overlapping(test, reference, true);
        prop_assert_eq!(
            strict,
            test.clip_in <= reference.clip_in && test.clip_out >= reference.clip_out
        );
        if strict {
            prop_assert!(is_overlapping(test, reference, false));
        }
    }
}

// ── Hero resolution ────────────────────────────────────────────

#[test]
fn hero_clip_hierarchy_and_name() {
    let mut seq = Sequence::new("sq01", FrameRate::FPS_24);
    let mut hero = Track::new_video("Hero", 1);
    hero.add_item(TrackItem::new("shotA", 1000, 1100));
    seq.add_track(hero);
    let options = sync_options();

    let item = seq.find_item(&seq.video_tracks[0].items[0].guid).unwrap();
    let data = PublishClip::new(&item, &seq.name, &options, 0)
        .convert(&mut SyncSession::new())
        .unwrap()
        .unwrap();
    assert_eq!(data.resolved.hierarchy, "shots/sq01/Hero");
    assert_eq!(data.resolved.new_clip_name, "sh010");
    assert_eq!(data.folder_path, "/shots/sq01/Hero/sh010");
}

#[test]
fn dependent_names_under_one_hero_are_unique() {
    let seq = stacked_sequence();
    let options = sync_options();
    let mut session = SyncSession::new();

    let guids: Vec<String> = seq
        .video_tracks
        .iter()
        .flat_map(|track| track.items.iter().map(|item| item.guid.clone()))
        .collect();
    let names: Vec<String> = guids
        .iter()
        .enumerate()
        .map(|(rename_index, guid)| {
            let item = seq.find_item(guid).unwrap();
            PublishClip::new(&item, &seq.name, &options, rename_index)
                .convert(&mut session)
                .unwrap()
                .unwrap()
                .resolved
                .product_name
        })
        .collect();

    assert_eq!(names, ["plateMain", "plateMain2", "plateMain22"]);
    let unique: HashSet<_> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn dependents_share_hero_folder() {
    let seq = stacked_sequence();
    let options = sync_options();
    let mut session = SyncSession::new();

    let hero = seq.find_item(&seq.video_tracks[0].items[0].guid).unwrap();
    let hero_data = PublishClip::new(&hero, &seq.name, &options, 0)
        .convert(&mut session)
        .unwrap()
        .unwrap();
    let bg = seq.find_item(&seq.video_tracks[1].items[1].guid).unwrap();
    let bg_data = PublishClip::new(&bg, &seq.name, &options, 1)
        .convert(&mut session)
        .unwrap()
        .unwrap();

    assert!(hero_data.hero_track);
    assert!(!bg_data.hero_track);
    assert_eq!(bg_data.folder_path, hero_data.folder_path);
    assert_eq!(bg_data.resolved.hierarchy_data, hero_data.resolved.hierarchy_data);
}

#[test]
fn stacked_sequence_creates_unique_products() {
    let mut seq = stacked_sequence();
    let settings = Settings::default();
    let options = CreateOptions {
        use_selection: false,
        ..sync_options()
    };
    let created = ShotClipCreator::new(&settings)
        .create(&mut seq, &mut CreateContext::new(), &options)
        .unwrap();

    assert_eq!(created.len(), 4);
    let pairs: HashSet<_> = created
        .iter()
        .map(|i| (i.folder_path.clone(), i.product_name.clone()))
        .collect();
    assert_eq!(pairs.len(), created.len());
}

#[test]
fn case_folded_track_names_stay_unique() {
    let mut seq = Sequence::new("sq01", FrameRate::FPS_24);
    for (index, name) in [(1, "Main"), (2, "main"), (3, "Main2")] {
        let mut track = Track::new_video(name, index);
        track.add_item(TrackItem::new(format!("{name}_clip"), 100, 150));
        seq.add_track(track);
    }
    let options = CreateOptions {
        hierarchy: "{folder}/{sequence}".into(),
        clip_name: "{shot}".into(),
        use_selection: false,
        ..CreateOptions::default()
    }
    .with_hero_track("Main")
    .with_variant("<track_name>");

    let settings = Settings::default();
    let created = ShotClipCreator::new(&settings)
        .create(&mut seq, &mut CreateContext::new(), &options)
        .unwrap();
    let plates: Vec<&str> = created
        .iter()
        .filter(|i| i.creator_identifier.ends_with("plate"))
        .map(|i| i.product_name.as_str())
        .collect();
    assert_eq!(plates.len(), 3);
    assert_eq!(&plates[..2], ["plateMain", "plateMain2"]);
    let unique: HashSet<_> = plates.iter().collect();
    assert_eq!(unique.len(), plates.len());
}
