//! Upgrade of flat legacy data tags.
//!
//! Before the combined record existed a clip's tag held one `tag.<key>`
//! string per field. Those fields are coerced, renamed through the
//! configured [`LegacyFieldMap`] and rebuilt into instances. The legacy tag
//! is then replaced by a modern one.

use std::collections::BTreeMap;

use editmark_core::FrameRange;
use editmark_timeline::{ItemRef, Sequence, TagPayload, TagStore, TimelineItem};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::creators::{build_instances, combined_record, InstanceCreator};
use crate::error::{PublishError, Result};
use crate::instance::{Instance, Parent, ProductKind};
use crate::options::CreateOptions;
use crate::publish_clip::{ClipData, ResolvedHierarchy};
use crate::settings::{LegacyFieldMap, Settings};

/// Fields read into typed values. Every other legacy field is carried over
/// verbatim.
const CONSUMED: &[&str] = &[
    "hierarchy",
    "hierarchyData",
    "parents",
    "folderName",
    "folderPath",
    "newClipName",
    "productName",
    "productType",
    "variant",
    "heroTrack",
    "reviewTrack",
    "uuid",
    "workfileFrameStart",
    "handleStart",
    "handleEnd",
    "sourceResolution",
    "audio",
    "vSyncOn",
    "vSyncTrack",
    "json_metadata",
];

/// Extra key listing the product fields a legacy tag did not state.
pub const LEGACY_UNKNOWN_KEY: &str = "legacyUnknown";

/// Coerce and rename a flat legacy tag.
pub fn modernize_fields(
    flat: &BTreeMap<String, String>,
    fields: &LegacyFieldMap,
) -> Map<String, Value> {
    TagPayload::Legacy(flat.clone())
        .into_record()
        .into_iter()
        .map(|(key, value)| (fields.modern_key(&key), value))
        .collect()
}

fn text(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int(record: &Map<String, Value>, key: &str, default: i64) -> i64 {
    record.get(key).and_then(Value::as_i64).unwrap_or(default)
}

fn flag(record: &Map<String, Value>, key: &str, default: bool) -> bool {
    record.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Folder name from the fields that state it: `folderName`, the last
/// segment of `folderPath`, or `hierarchyData.shot`.
fn folder_name(record: &Map<String, Value>) -> Option<String> {
    text(record, "folderName")
        .or_else(|| {
            text(record, "folderPath")
                .and_then(|path| path.rsplit('/').next().map(str::to_string))
                .filter(|name| !name.is_empty())
        })
        .or_else(|| {
            record
                .get("hierarchyData")
                .and_then(|data| data.get("shot"))
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        })
}

/// Rebuild the converter output of a clip from a modernized legacy record.
pub fn clip_data_from_record(
    item: &ItemRef<'_>,
    record: &Map<String, Value>,
    settings: &Settings,
) -> Result<ClipData> {
    let hierarchy = text(record, "hierarchy")
        .ok_or_else(|| PublishError::Legacy(format!("`{}` has no hierarchy", item.name())))?;
    let folder_name = folder_name(record)
        .ok_or_else(|| PublishError::Legacy(format!("`{}` has no folder name", item.name())))?;

    let hierarchy_data: IndexMap<String, String> = match record.get("hierarchyData") {
        Some(Value::Object(data)) => data
            .iter()
            .filter(|(key, _)| key.as_str() != "shot")
            .map(|(key, value)| {
                let value = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                (key.clone(), value)
            })
            .collect(),
        _ => IndexMap::new(),
    };
    let parents: Vec<Parent> = record
        .get("parents")
        .cloned()
        .and_then(|parents| serde_json::from_value(parents).ok())
        .unwrap_or_default();

    // absent product fields stay empty, they are not inferred
    let product_type = text(record, "productType").unwrap_or_default();
    let variant = text(record, "variant")
        .or_else(|| {
            text(record, "productName")
                .filter(|_| !product_type.is_empty())
                .and_then(|name| name.strip_prefix(product_type.as_str()).map(str::to_string))
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_default();
    let product_name = text(record, "productName")
        .or_else(|| {
            (!product_type.is_empty() && !variant.is_empty())
                .then(|| format!("{product_type}{variant}"))
        })
        .unwrap_or_default();
    let folder_path =
        text(record, "folderPath").unwrap_or_else(|| format!("/{hierarchy}/{folder_name}"));

    let create = &settings.create;
    Ok(ClipData {
        clip_index: item.guid().to_string(),
        clip_name: item.name().to_string(),
        track_name: item.parent_track().name.clone(),
        track_index: item.parent_track().index,
        range: FrameRange::new(item.timeline_in(), item.timeline_out()),
        source_in: item.source_in(),
        source_out: item.source_out(),
        resolved: ResolvedHierarchy {
            new_clip_name: text(record, "newClipName").unwrap_or_else(|| folder_name.clone()),
            hierarchy,
            hierarchy_data,
            parents,
            product_name,
            product_type,
            variant,
        },
        hero_track: flag(record, "heroTrack", true),
        hero_clip: None,
        review_track: text(record, "reviewTrack"),
        uuid: text(record, "uuid").unwrap_or_else(|| Uuid::new_v4().to_string()),
        folder_name,
        folder_path,
        rename_to: None,
        workfile_frame_start: int(record, "workfileFrameStart", create.workfile_frame_start),
        handle_start: int(record, "handleStart", create.handle_start),
        handle_end: int(record, "handleEnd", create.handle_end),
        source_resolution: flag(record, "sourceResolution", create.source_resolution),
        audio: flag(record, "audio", false),
    })
}

/// Build the modern instances of a clip carrying a legacy tag.
pub fn legacy_instances(
    item: &ItemRef<'_>,
    flat: &BTreeMap<String, String>,
    settings: &Settings,
) -> Result<Vec<Instance>> {
    let record = modernize_fields(flat, &settings.legacy_fields);
    let data = clip_data_from_record(item, &record, settings)?;

    let mut options = CreateOptions::from_settings(&settings.create);
    options.export_audio = data.audio;
    options.v_sync_on = flag(&record, "vSyncOn", false);
    options.v_sync_track = text(&record, "vSyncTrack").unwrap_or_default();

    let carried: Vec<(&String, &Value)> = record
        .iter()
        .filter(|(key, _)| !CONSUMED.contains(&key.as_str()))
        .collect();
    let resolved = &data.resolved;
    let unknown: Vec<&str> = [
        ("productType", &resolved.product_type),
        ("variant", &resolved.variant),
        ("productName", &resolved.product_name),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(key, _)| key)
    .collect();
    if !unknown.is_empty() {
        warn!(clip = %data.clip_index, ?unknown, "legacy tag does not state product fields");
    }

    Ok(build_instances(&data, &options)
        .into_iter()
        .map(|mut instance| {
            for (key, value) in &carried {
                instance
                    .extra
                    .entry(key.to_string())
                    .or_insert_with(|| (*value).clone());
            }
            if !unknown.is_empty() {
                instance
                    .extra
                    .insert(LEGACY_UNKNOWN_KEY.into(), json!(unknown));
            }
            let kind = instance.kind().unwrap_or(ProductKind::Shot);
            InstanceCreator::new(kind).finish(instance)
        })
        .collect())
}

/// Replace a clip's legacy tag with a modern combined record and return
/// that record. The clip is left untouched when the upgrade fails.
pub fn migrate_legacy_tag(
    sequence: &mut Sequence,
    clip_index: &str,
    flat: &BTreeMap<String, String>,
    settings: &Settings,
) -> Result<Map<String, Value>> {
    let item = sequence
        .find_item(clip_index)
        .ok_or_else(|| PublishError::Legacy(format!("clip `{clip_index}` not found")))?;
    let instances = legacy_instances(&item, flat, settings)?;
    let record = combined_record(&instances, clip_index)?;

    sequence.remove_data_tag(clip_index)?;
    sequence.imprint(clip_index, &record)?;
    debug!(clip = %clip_index, fields = flat.len(), "replaced legacy tag");
    info!(clip = %clip_index, instances = instances.len(), "migrated legacy tag");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creators::CONTENT_KEY;
    use editmark_core::FrameRate;
    use editmark_timeline::{Tag, Track, TrackItem};
    use serde_json::json;

    fn legacy_tag() -> Tag {
        Tag::new("AYON_Data")
            .with_metadata("tag.hierarchy", "shots/sq01")
            .with_metadata("tag.asset_name", "sh010")
            .with_metadata(
                "tag.hierarchyData",
                "{'folder': 'shots', 'sequence': 'sq01', 'track': 'main'}",
            )
            .with_metadata("tag.heroTrack", "True")
            .with_metadata("tag.handleStart", "5")
            .with_metadata("tag.family", "plate")
            .with_metadata("tag.note", "keep me")
    }

    fn sequence(tag: Tag) -> (Sequence, String) {
        let mut seq = Sequence::new("sq01", FrameRate::FPS_24);
        let mut track = Track::new_video("main", 1);
        let mut item = TrackItem::new("sh010", 1000, 1049);
        item.tags.push(tag);
        let guid = item.guid.clone();
        track.add_item(item);
        seq.add_track(track);
        (seq, guid)
    }

    fn v2() -> Settings {
        Settings {
            legacy_fields: LegacyFieldMap::V2,
            ..Settings::default()
        }
    }

    #[test]
    fn test_migrate_replaces_tag() {
        let (mut seq, guid) = sequence(legacy_tag());
        let flat = match seq.read_payload(&guid).unwrap().unwrap() {
            TagPayload::Legacy(flat) => flat,
            TagPayload::Modern(_) => panic!("expected legacy tag"),
        };
        let record = migrate_legacy_tag(&mut seq, &guid, &flat, &v2()).unwrap();

        let tags = seq.item_tags(&guid).unwrap();
        assert_eq!(tags.len(), 1);
        assert!(tags[0].name.starts_with("AYON_Data_"));
        assert!(!seq.read_payload(&guid).unwrap().unwrap().is_legacy());

        let content = record[CONTENT_KEY].as_object().unwrap();
        assert_eq!(content.len(), 2);
        let shot = &content[ProductKind::Shot.identifier()];
        assert_eq!(shot["folderPath"], json!("/shots/sq01/sh010"));
        assert_eq!(shot["creator_attributes"]["handleStart"], json!(5));
        assert_eq!(shot["note"], json!("keep me"));
        let plate = &content[ProductKind::Plate.identifier()];
        assert_eq!(plate["productType"], json!("plate"));
        assert_eq!(plate["productName"], json!(""));
        assert_eq!(plate[LEGACY_UNKNOWN_KEY], json!(["variant", "productName"]));
    }

    #[test]
    fn test_missing_folder_name_fails() {
        let tag = Tag::new("AYON_Data")
            .with_metadata("tag.hierarchy", "shots/sq01")
            .with_metadata("tag.asset", "sh010");
        let (seq, guid) = sequence(tag.clone());
        let item = seq.find_item(&guid).unwrap();
        // under V2 `asset` is not a folder name
        let err = legacy_instances(&item, &tag.stripped_metadata(), &v2()).unwrap_err();
        assert!(matches!(err, PublishError::Legacy(_)));
    }

    #[test]
    fn test_v1_asset_is_product_name() {
        let tag = Tag::new("AYON_Data")
            .with_metadata("tag.hierarchy", "shots/sq01")
            .with_metadata("tag.folderPath", "/shots/sq01/sh010")
            .with_metadata("tag.family", "plate")
            .with_metadata("tag.asset", "plateFg");
        let (seq, guid) = sequence(tag.clone());
        let item = seq.find_item(&guid).unwrap();
        let instances = legacy_instances(&item, &tag.stripped_metadata(), &Settings::default()).unwrap();
        let plate = instances
            .iter()
            .find(|i| i.kind() == Some(ProductKind::Plate))
            .unwrap();
        assert_eq!(plate.product_name, "plateFg");
        assert_eq!(plate.variant, "Fg");
        assert_eq!(plate.folder_path, "/shots/sq01/sh010");
        assert!(!plate.extra.contains_key(LEGACY_UNKNOWN_KEY));
    }

    #[test]
    fn test_unstated_product_fields_left_unset() {
        let tag = Tag::new("AYON_Data")
            .with_metadata("tag.hierarchy", "shots/sq01")
            .with_metadata("tag.folderPath", "/shots/sq01/sh010");
        let (seq, guid) = sequence(tag.clone());
        let item = seq.find_item(&guid).unwrap();
        let instances = legacy_instances(&item, &tag.stripped_metadata(), &Settings::default()).unwrap();
        let plate = instances
            .iter()
            .find(|i| i.kind() == Some(ProductKind::Plate))
            .unwrap();
        assert_eq!(plate.product_type, "");
        assert_eq!(plate.variant, "");
        assert_eq!(plate.product_name, "");
        assert_eq!(
            plate.extra[LEGACY_UNKNOWN_KEY],
            json!(["productType", "variant", "productName"])
        );
    }
}
