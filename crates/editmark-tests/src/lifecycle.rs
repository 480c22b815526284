//! Integration tests for the instance lifecycle.
//!
//! Create, collect, update and remove instances through the tag store of a
//! snapshot sequence, including snapshot files, project tags and legacy
//! tags.

use editmark_core::FrameRate;
use editmark_publish::{
    CreateContext, CreateOptions, EditorialPackageCreator, Instance, InstanceCreator,
    LegacyFieldMap, ProductKind, Settings, ShotClipCreator, WorkContext, WorkfileCreator,
    CONTENT_KEY,
};
use editmark_timeline::{Project, ProjectFile, Sequence, Tag, TagStore, Track, TrackItem};
use serde_json::{json, Map};

// ── Helpers ────────────────────────────────────────────────────

fn sequence() -> Sequence {
    let mut seq = Sequence::new("sq01", FrameRate::FPS_24);
    let mut hero = Track::new_video("Hero", 1);
    hero.add_item(TrackItem::new("shotA", 1000, 1100));
    hero.add_item(TrackItem::new("shotB", 1101, 1180));
    let mut bg = Track::new_video("bg", 2);
    bg.add_item(TrackItem::new("bgA", 1010, 1090));
    seq.add_track(hero);
    seq.add_track(bg);
    seq
}

fn options() -> CreateOptions {
    CreateOptions {
        use_selection: false,
        ..CreateOptions::default()
    }
    .with_hero_track("Hero")
}

fn create_all(seq: &mut Sequence, settings: &Settings) -> Vec<Instance> {
    ShotClipCreator::new(settings)
        .create(seq, &mut CreateContext::new(), &options())
        .unwrap()
}

// ── Create / collect ───────────────────────────────────────────

#[test]
fn collected_instances_equal_created() {
    let settings = Settings::default();
    let mut seq = sequence();
    let created = create_all(&mut seq, &settings);
    assert_eq!(created.len(), 5);

    let mut ctx = CreateContext::new();
    let collected = ShotClipCreator::new(&settings)
        .collect_instances(&mut seq, &mut ctx)
        .unwrap();
    assert_eq!(collected.len(), created.len());
    for instance in &created {
        let found = ctx.get(&instance.instance_id).unwrap();
        assert_eq!(found.creator_attributes, instance.creator_attributes);
        assert_eq!(found.hierarchy_data, instance.hierarchy_data);
        assert_eq!(found, instance);
    }
}

#[test]
fn instances_survive_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("show.json");
    let settings = Settings::default();

    let mut seq = sequence();
    let created = create_all(&mut seq, &settings);
    let mut project = Project::new("show");
    project.add_sequence(seq);
    ProjectFile::new(project).save_to_file(&path).unwrap();

    let mut loaded = ProjectFile::load_from_file(&path).unwrap();
    let seq = loaded.project.active_sequence_mut().unwrap();
    let collected = ShotClipCreator::new(&settings)
        .collect_instances(seq, &mut CreateContext::new())
        .unwrap();
    let mut created_ids: Vec<_> = created.iter().map(|i| i.instance_id.clone()).collect();
    let mut collected_ids: Vec<_> = collected.iter().map(|i| i.instance_id.clone()).collect();
    created_ids.sort();
    collected_ids.sort();
    assert_eq!(created_ids, collected_ids);
}

#[test]
fn dependent_clip_joins_hero_folder() {
    let settings = Settings::default();
    let mut seq = sequence();
    let created = create_all(&mut seq, &settings);
    let bg_guid = seq.video_tracks[1].items[0].guid.clone();

    let bg: Vec<_> = created.iter().filter(|i| i.clip_index == bg_guid).collect();
    assert_eq!(bg.len(), 1);
    assert_eq!(bg[0].kind(), Some(ProductKind::Plate));
    assert!(!bg[0].hero_track);
    assert_eq!(bg[0].folder_path, created[0].folder_path);
    assert_eq!(bg[0].parent_instance_id.as_deref(), Some(created[0].instance_id.as_str()));
}

#[test]
fn synced_plate_collected_with_hero_shot() {
    let settings = Settings::default();
    let mut seq = sequence();
    create_all(&mut seq, &settings);
    let bg_guid = seq.video_tracks[1].items[0].guid.clone();

    let mut ctx = CreateContext::new();
    let collected = ShotClipCreator::new(&settings)
        .collect_instances(&mut seq, &mut ctx)
        .unwrap();
    let plate = collected.iter().find(|i| i.clip_index == bg_guid).unwrap();
    let parent = plate.parent_instance_id.as_deref().unwrap();
    assert_eq!(ctx.get(parent).unwrap().kind(), Some(ProductKind::Shot));
}

// ── Update / remove ────────────────────────────────────────────

#[test]
fn update_is_visible_to_next_collect() {
    let settings = Settings::default();
    let creator = ShotClipCreator::new(&settings);
    let mut seq = sequence();
    let mut ctx = CreateContext::new();
    let created = creator.create(&mut seq, &mut ctx, &options()).unwrap();
    let plate = created
        .iter()
        .find(|i| i.kind() == Some(ProductKind::Plate))
        .unwrap();

    let mut changes = Map::new();
    changes.insert("active".into(), json!(false));
    changes.insert("creator_attributes".into(), json!({ "vSyncOn": false }));
    InstanceCreator::new(ProductKind::Plate)
        .update_instances(&mut seq, &mut ctx, &[(plate.instance_id.clone(), changes)])
        .unwrap();

    let mut fresh = CreateContext::new();
    creator.collect_instances(&mut seq, &mut fresh).unwrap();
    let updated = fresh.get(&plate.instance_id).unwrap();
    assert!(!updated.active);
    assert_eq!(updated.creator_attributes["vSyncOn"], json!(false));
    assert_eq!(
        updated.creator_attributes["parentInstance"],
        plate.creator_attributes["parentInstance"]
    );
}

#[test]
fn removing_last_instance_deletes_tag() {
    let settings = Settings::default();
    let creator = ShotClipCreator::new(&settings);
    let mut seq = sequence();
    let mut ctx = CreateContext::new();
    let created = creator.create(&mut seq, &mut ctx, &options()).unwrap();
    let clip_index = created[0].clip_index.clone();
    let ids: Vec<String> = created
        .iter()
        .filter(|i| i.clip_index == clip_index)
        .map(|i| i.instance_id.clone())
        .collect();
    assert_eq!(ids.len(), 2);

    creator.remove_instances(&mut seq, &mut ctx, &ids[1..]).unwrap();
    let record = seq.read_payload(&clip_index).unwrap().unwrap().into_record();
    assert_eq!(record[CONTENT_KEY].as_object().unwrap().len(), 1);

    creator.remove_instances(&mut seq, &mut ctx, &ids[..1]).unwrap();
    assert!(seq.data_tag(&clip_index).is_none());
    assert!(seq.item_tags(&clip_index).unwrap().is_empty());
}

// ── Project products ───────────────────────────────────────────

#[test]
fn project_products_survive_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("show.json");
    let settings = Settings::default();
    let mut project = Project::new("show");
    project.add_sequence(sequence());
    let context = WorkContext::new("/shots/sq01", Some("edit".into()));

    let mut ctx = CreateContext::new();
    let clips = ShotClipCreator::new(&settings)
        .create(project.active_sequence_mut().unwrap(), &mut ctx, &options())
        .unwrap();
    let workfile = WorkfileCreator::new(context.clone())
        .create(&mut project, &mut ctx)
        .unwrap()
        .unwrap();
    let package = EditorialPackageCreator::new(context.clone())
        .create(&mut project, &mut ctx, "Main", true)
        .unwrap();
    assert_eq!(ctx.len(), clips.len() + 2);
    ProjectFile::new(project).save_to_file(&path).unwrap();

    let mut loaded = ProjectFile::load_from_file(&path).unwrap();
    let mut ctx = CreateContext::new();
    let collected_workfile = WorkfileCreator::new(context.clone())
        .collect_instances(&loaded.project, &mut ctx)
        .unwrap()
        .unwrap();
    let packages = EditorialPackageCreator::new(context.clone())
        .collect_instances(&loaded.project, &mut ctx)
        .unwrap();
    assert_eq!(collected_workfile, workfile);
    assert_eq!(packages, vec![package]);

    // project records stay out of clip collection
    let collected = ShotClipCreator::new(&settings)
        .collect_instances(loaded.project.active_sequence_mut().unwrap(), &mut ctx)
        .unwrap();
    assert_eq!(collected.len(), clips.len());
    assert!(collected.iter().all(|i| i.kind().is_some_and(ProductKind::is_clip_product)));

    // the stored record is found again, so nothing new is made
    assert!(WorkfileCreator::new(context)
        .create(&mut loaded.project, &mut ctx)
        .unwrap()
        .is_none());
}

// ── Legacy tags ────────────────────────────────────────────────

#[test]
fn legacy_tag_upgraded_on_collect() {
    let settings = Settings {
        legacy_fields: LegacyFieldMap::V2,
        ..Settings::default()
    };
    let mut seq = Sequence::new("sq01", FrameRate::FPS_24);
    let mut track = Track::new_video("main", 1);
    let mut item = TrackItem::new("sh010", 1000, 1049);
    item.tags.push(
        Tag::new("AYON_Data")
            .with_metadata("tag.hierarchy", "shots/sq01")
            .with_metadata("tag.asset_name", "sh010")
            .with_metadata("tag.heroTrack", "True")
            .with_metadata("tag.handleStart", "5")
            .with_metadata("tag.family", "plate"),
    );
    let guid = item.guid.clone();
    track.add_item(item);
    seq.add_track(track);

    let collected = ShotClipCreator::new(&settings)
        .collect_instances(&mut seq, &mut CreateContext::new())
        .unwrap();
    assert_eq!(collected.len(), 2);
    assert!(collected.iter().all(|i| i.folder_path == "/shots/sq01/sh010"));

    let tags = seq.item_tags(&guid).unwrap();
    assert_eq!(tags.len(), 1);
    assert!(!seq.read_payload(&guid).unwrap().unwrap().is_legacy());

    // A second pass reads the upgraded record.
    let again = ShotClipCreator::new(&settings)
        .collect_instances(&mut seq, &mut CreateContext::new())
        .unwrap();
    let mut first: Vec<_> = collected.iter().map(|i| i.instance_id.clone()).collect();
    let mut second: Vec<_> = again.iter().map(|i| i.instance_id.clone()).collect();
    first.sort();
    second.sort();
    assert_eq!(first, second);
}

#[test]
fn unreadable_legacy_tag_is_skipped() {
    let settings = Settings::default();
    let mut seq = sequence();
    create_all(&mut seq, &settings);
    let guid = seq.video_tracks[0].items[1].guid.clone();
    seq.remove_data_tag(&guid).unwrap();
    // no hierarchy, cannot be upgraded
    seq.add_item_tag(&guid, Tag::new("AYON_Data").with_metadata("tag.family", "plate"))
        .unwrap();

    let collected = ShotClipCreator::new(&settings)
        .collect_instances(&mut seq, &mut CreateContext::new())
        .unwrap();
    assert_eq!(collected.len(), 3);
    assert!(collected.iter().all(|i| i.clip_index != guid));
    assert!(seq.read_payload(&guid).unwrap().unwrap().is_legacy());
}
