//! Publish-time data read back from the timeline around an instance:
//! task tags, comment tags and soft effects.

use editmark_core::{effect_overlaps, FrameRange};
use editmark_template::builtins::capitalize;
use editmark_timeline::{
    Knob, Sequence, SubTrackItem, Tag, TagPayload, TimelineItem, JSON_METADATA_KEY,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{PublishError, Result};
use crate::instance::{Instance, ProductKind};
use crate::settings::CollectSettings;

/// Knobs never written into an effect record.
const IGNORED_KNOBS: &[&str] = &[
    "invert_mask",
    "help",
    "mask",
    "xpos",
    "ypos",
    "layer",
    "process_mask",
    "channel",
    "channels",
    "maskChannelMask",
    "maskChannelInput",
    "note_font",
    "note_font_size",
    "unpremult",
    "postage_stamp_frame",
    "maskChannel",
    "export_cc",
    "select_cccid",
    "mix",
    "version",
    "matrix",
];

const EFFECT_PRODUCT_TYPE: &str = "effect";
const TIME_WARP_CLASS: &str = "TimeWarp";

// ── Tasks ──────────────────────────────────────────────────────

/// A task requested through a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(rename = "type")]
    pub task_type: String,
}

/// Tasks declared by tags, keyed by task label.
///
/// Modern tags declare a task with `productType == "task"` in their JSON
/// record. Legacy tags use a `tag.productType` (or `tag.family`) containing
/// `task`.
pub fn collect_tag_tasks(tags: &[Tag]) -> IndexMap<String, TaskInfo> {
    let mut tasks = IndexMap::new();
    for tag in tags {
        let label = tag.metadata.get("tag.label").cloned().unwrap_or_default();
        if tag.metadata.contains_key(JSON_METADATA_KEY) {
            let record = match TagPayload::from_tag(tag) {
                Ok(payload) => payload.into_record(),
                Err(e) => {
                    warn!(tag = %tag.name, error = %e, "skipping unreadable tag");
                    continue;
                }
            };
            if record.get("productType").and_then(Value::as_str) == Some("task") {
                let task_type = record
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                tasks.insert(label, TaskInfo { task_type });
            }
        } else {
            let product_type = tag
                .metadata
                .get("tag.productType")
                .or_else(|| tag.metadata.get("tag.family"))
                .map(String::as_str)
                .unwrap_or_default();
            if product_type.contains("task") {
                let task_type = tag.metadata.get("tag.type").cloned().unwrap_or_default();
                tasks.insert(label, TaskInfo { task_type });
            }
        }
    }
    debug!(tasks = tasks.len(), "collected tag tasks");
    tasks
}

// ── Comments ───────────────────────────────────────────────────

fn comment_notes(tags: &[Tag]) -> impl Iterator<Item = String> + '_ {
    tags.iter()
        .filter(|tag| tag.name.to_lowercase() == "comment")
        .map(|tag| {
            tag.metadata
                .get("tag.note")
                .cloned()
                .unwrap_or_else(|| tag.note.clone())
        })
}

/// Comment notes from the item's tags, then from its source clip's tags.
pub fn collect_comments(item: &impl TimelineItem) -> Vec<String> {
    comment_notes(item.tags())
        .chain(comment_notes(&item.source().tags))
        .collect()
}

// ── Effects ────────────────────────────────────────────────────

/// Serialized soft effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectRecord {
    pub class: String,
    pub timeline_in: i64,
    pub timeline_out: i64,
    pub sub_track_index: usize,
    pub track_index: usize,
    pub track: String,
    pub node: Map<String, Value>,
}

/// One effect product derived from a plate or shot instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectProduct {
    pub product_name: String,
    pub product_type: String,
    pub folder_path: String,
    pub label: String,
    /// Product the effects are applied on
    pub assign_to: String,
    /// Effect records keyed by effect item name
    pub effects: IndexMap<String, EffectRecord>,
}

/// Collects the soft effects sitting over an instance's clip.
pub struct EffectCollector<'s> {
    settings: &'s CollectSettings,
}

impl<'s> EffectCollector<'s> {
    pub fn new(settings: &'s CollectSettings) -> Self {
        Self { settings }
    }

    /// Effect products of an instance. Empty when no effect drives the
    /// clip, and for audio instances.
    pub fn collect(&self, sequence: &Sequence, instance: &Instance) -> Result<Vec<EffectProduct>> {
        if instance.kind() == Some(ProductKind::Audio) || instance.product_type.contains("audio") {
            return Ok(Vec::new());
        }
        if instance.creator_attributes.get("publish_effects").and_then(Value::as_bool) == Some(false)
        {
            debug!(product = %instance.product_name, "effect collection disabled");
            return Ok(Vec::new());
        }
        let item = sequence.find_item(&instance.clip_index).ok_or_else(|| {
            PublishError::Creator(format!("Clip `{}` is not in the sequence", instance.clip_index))
        })?;

        let clip = item.frame_range();
        let handle_start = handle(instance, "handleStart");
        let handle_end = handle(instance, "handleEnd");
        let with_handles = clip.with_handles(handle_start, handle_end);
        let review_index = instance
            .review_track
            .as_deref()
            .and_then(|name| sequence.track_by_name(name))
            .map(|track| track.index);
        let clip_track = item.parent_track().index;

        let mut effects = IndexMap::new();
        for track in &sequence.video_tracks {
            if track.index < clip_track || Some(track.index) == review_index {
                continue;
            }
            for effect in &track.sub_track_items {
                if !effect.enabled
                    || effect.node_class.contains(TIME_WARP_CLASS)
                    || !effect.applies_to(item.guid())
                    || !effect_overlaps(effect.frame_range(), clip)
                {
                    continue;
                }
                effects.insert(
                    effect.name.clone(),
                    effect_record(effect, track.index, &track.name, with_handles),
                );
            }
        }
        if effects.is_empty() {
            return Ok(Vec::new());
        }

        let base_name = effect_product_base(&instance.product_name);
        let products: Vec<EffectProduct> = self
            .categorize(effects)
            .into_iter()
            .map(|(category, effects)| {
                let product_name = format!("{base_name}{}", capitalize(&category));
                EffectProduct {
                    label: format!("{} - {}", instance.folder_path, product_name),
                    product_name,
                    product_type: EFFECT_PRODUCT_TYPE.to_string(),
                    folder_path: instance.folder_path.clone(),
                    assign_to: instance.product_name.clone(),
                    effects,
                }
            })
            .collect();
        info!(
            product = %instance.product_name,
            products = products.len(),
            "collected clip effects"
        );
        Ok(products)
    }

    /// Split effects into categories by node class, then by track name.
    /// Everything lands in one unnamed category when nothing matches.
    fn categorize(
        &self,
        effects: IndexMap<String, EffectRecord>,
    ) -> IndexMap<String, IndexMap<String, EffectRecord>> {
        let mut categorized: IndexMap<String, IndexMap<String, EffectRecord>> = self
            .settings
            .effect_categories
            .iter()
            .map(|category| (category.name.clone(), IndexMap::new()))
            .collect();

        for (name, record) in &effects {
            // classes may carry a number suffix, e.g. Text2
            let found = self
                .settings
                .effect_categories
                .iter()
                .flat_map(|category| {
                    category
                        .effect_classes
                        .iter()
                        .map(move |class| (class, &category.name))
                })
                .filter(|(class, _)| !class.is_empty() && record.class.contains(class.as_str()))
                .last();
            if let Some((_, category)) = found {
                if let Some(bucket) = categorized.get_mut(category) {
                    bucket.insert(name.clone(), record.clone());
                }
            }
        }

        for category in &self.settings.effect_tracks {
            for (name, record) in &effects {
                if category.track_names.contains(&record.track) {
                    categorized
                        .entry(category.name.clone())
                        .or_default()
                        .insert(name.clone(), record.clone());
                }
            }
        }

        categorized.retain(|_, bucket| !bucket.is_empty());
        if categorized.is_empty() {
            categorized.insert(String::new(), effects);
        }
        categorized
    }
}

fn handle(instance: &Instance, key: &str) -> i64 {
    instance
        .creator_attributes
        .get(key)
        .or_else(|| instance.extra.get(key))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn effect_record(
    effect: &SubTrackItem,
    track_index: usize,
    track_name: &str,
    frames: FrameRange,
) -> EffectRecord {
    EffectRecord {
        class: effect.node_class.clone(),
        timeline_in: effect.timeline_in,
        timeline_out: effect.timeline_out,
        sub_track_index: effect.sub_track_index,
        track_index,
        track: track_name.to_string(),
        node: serialize_knobs(effect, frames),
    }
}

/// Knob values of an effect node. Animated knobs are sampled on every
/// frame of `frames`. The `file` knob is always read as a single value.
pub fn serialize_knobs(effect: &SubTrackItem, frames: FrameRange) -> Map<String, Value> {
    effect
        .knobs
        .iter()
        .filter(|(name, _)| !IGNORED_KNOBS.contains(&name.as_str()))
        .map(|(name, knob)| {
            let value = match knob {
                Knob::Animated { .. } if name != "file" => Value::Array(
                    (frames.clip_in..=frames.clip_out)
                        .map(|frame| knob.value_at(frame as f64))
                        .collect(),
                ),
                _ => knob.value_at(frames.clip_in as f64),
            };
            (name.clone(), value)
        })
        .collect()
}

/// `plateMain` becomes `effectPlateMain`: the lowercase root is capitalized
/// and the capitalized words after it are kept.
fn effect_product_base(product_name: &str) -> String {
    match product_name.find(|c: char| c.is_uppercase()) {
        Some(at) => {
            let (root, rest) = product_name.split_at(at);
            format!("{EFFECT_PRODUCT_TYPE}{}{rest}", capitalize(root))
        }
        None => EFFECT_PRODUCT_TYPE.to_string(),
    }
}
