//! Instance creators.
//!
//! One [`InstanceCreator`] per product kind owns that kind's entry in the
//! combined record kept in a clip's data tag:
//!
//! ```json
//! {
//!   "hiero_sub_products": {
//!     "io.ayon.creators.hiero.shot": { ...instance... },
//!     "io.ayon.creators.hiero.plate": { ...instance... }
//!   },
//!   "clip_index": "<clip guid>"
//! }
//! ```
//!
//! [`ShotClipCreator`] drives the clip converter over a selection and fans
//! out to the sub-creators. It also collects instances back from the tags.

use std::collections::{HashMap, HashSet};

use editmark_template::validate_template;
use editmark_timeline::{ItemFilter, Sequence, TagPayload, TagStore, TimelineItem};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::{PublishError, Result};
use crate::instance::{Instance, ProductKind};
use crate::legacy::migrate_legacy_tag;
use crate::options::CreateOptions;
use crate::publish_clip::{validate_hierarchy_template, ClipData, PublishClip};
use crate::session::SyncSession;
use crate::settings::Settings;

/// Key of the per-creator map inside a clip's record.
pub const CONTENT_KEY: &str = "hiero_sub_products";

/// Key of the clip GUID inside a clip's record.
pub const CLIP_INDEX_KEY: &str = "clip_index";

/// Variant of the shot and audio products.
const MAIN_VARIANT: &str = "Main";

/// Instances known to the current publisher session, by id.
#[derive(Debug, Default)]
pub struct CreateContext {
    instances: IndexMap<String, Instance>,
}

impl CreateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instance: Instance) {
        self.instances.insert(instance.instance_id.clone(), instance);
    }

    pub fn remove(&mut self, instance_id: &str) -> Option<Instance> {
        self.instances.shift_remove(instance_id)
    }

    pub fn get(&self, instance_id: &str) -> Option<&Instance> {
        self.instances.get(instance_id)
    }

    pub fn get_mut(&mut self, instance_id: &str) -> Option<&mut Instance> {
        self.instances.get_mut(instance_id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Instances made from one clip.
    pub fn by_clip<'a>(&'a self, clip_index: &'a str) -> impl Iterator<Item = &'a Instance> {
        self.instances
            .values()
            .filter(move |instance| instance.clip_index == clip_index)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

/// Read a clip's combined record. Legacy tags are read through the coerced
/// flat view, a clip without a data tag yields an empty record.
pub fn read_record(store: &impl TagStore, clip_index: &str) -> Result<Map<String, Value>> {
    Ok(store
        .read_payload(clip_index)?
        .map(TagPayload::into_record)
        .unwrap_or_default())
}

/// Combined record holding the given instances.
pub fn combined_record(instances: &[Instance], clip_index: &str) -> Result<Map<String, Value>> {
    let mut content = Map::new();
    for instance in instances {
        content.insert(
            instance.creator_identifier.clone(),
            Value::Object(instance.data_to_store()?),
        );
    }
    let mut record = Map::new();
    record.insert(CONTENT_KEY.into(), Value::Object(content));
    record.insert(CLIP_INDEX_KEY.into(), Value::String(clip_index.to_string()));
    Ok(record)
}

/// Sub-creator of one product kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceCreator {
    kind: ProductKind,
}

impl InstanceCreator {
    pub fn new(kind: ProductKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ProductKind {
        self.kind
    }

    pub fn identifier(&self) -> &'static str {
        self.kind.identifier()
    }

    /// Name an instance for this creator.
    ///
    /// Shot and audio products are named from their type and variant.
    /// Plates keep the product name the converter resolved, and are only
    /// named here when both their type and variant are known.
    pub fn finish(&self, mut instance: Instance) -> Instance {
        instance.creator_identifier = self.identifier().to_string();
        if self.kind != ProductKind::Plate {
            instance.product_type = self.kind.product_type().to_string();
            instance.product_name = format!("{}{}", instance.product_type, instance.variant);
        } else if instance.product_name.is_empty()
            && !instance.product_type.is_empty()
            && !instance.variant.is_empty()
        {
            instance.product_name = format!("{}{}", instance.product_type, instance.variant);
        }
        instance
            .extra
            .insert("newHierarchyIntegration".into(), Value::Bool(true));
        instance
    }

    /// Finish an instance and register it with the context.
    pub fn create(&self, ctx: &mut CreateContext, instance: Instance) -> Instance {
        let instance = self.finish(instance);
        ctx.add(instance.clone());
        instance
    }

    /// Apply changes to instances and store them back into their clips'
    /// tags. A record missing the per-creator map gets one.
    pub fn update_instances(
        &self,
        store: &mut impl TagStore,
        ctx: &mut CreateContext,
        updates: &[(String, Map<String, Value>)],
    ) -> Result<()> {
        for (instance_id, changes) in updates {
            let instance = ctx
                .get_mut(instance_id)
                .ok_or_else(|| PublishError::Creator(format!("Unknown instance `{instance_id}`")))?;
            instance.apply_changes(changes)?;
            let clip_index = instance.clip_index.clone();
            let stored = instance.data_to_store()?;

            let mut record = read_record(store, &clip_index)?;
            let content = record
                .entry(CONTENT_KEY)
                .or_insert_with(|| Value::Object(Map::new()));
            if !content.is_object() {
                *content = Value::Object(Map::new());
            }
            if let Value::Object(content) = content {
                content.insert(self.identifier().to_string(), Value::Object(stored));
            }
            record.insert(CLIP_INDEX_KEY.into(), Value::String(clip_index.clone()));
            store.imprint(&clip_index, &record)?;
            debug!(instance = %instance_id, clip = %clip_index, "updated instance");
        }
        Ok(())
    }

    /// Remove instances from the context and from their clips' records.
    /// A record left without instances takes its tag with it.
    pub fn remove_instances(
        &self,
        store: &mut impl TagStore,
        ctx: &mut CreateContext,
        instance_ids: &[String],
    ) -> Result<()> {
        for instance_id in instance_ids {
            let Some(instance) = ctx.remove(instance_id) else {
                warn!(instance = %instance_id, "instance not in context");
                continue;
            };
            let clip_index = instance.clip_index;
            if store.data_tag(&clip_index).is_none() {
                continue;
            }
            let mut record = read_record(store, &clip_index)?;
            let now_empty = match record.get_mut(CONTENT_KEY) {
                Some(Value::Object(content)) => {
                    content.remove(self.identifier());
                    content.is_empty()
                }
                _ => true,
            };
            if now_empty {
                store.remove_data_tag(&clip_index)?;
                debug!(clip = %clip_index, "removed data tag");
            } else {
                store.imprint(&clip_index, &record)?;
            }
        }
        Ok(())
    }
}

/// Build the instances of one converted clip that owns its shot.
///
/// A shot and a plate are made, plus an audio product when audio export is
/// on. Plate and audio point at the shot. Clips synced to a hero go through
/// [`build_synced_plate`] instead.
pub fn build_instances(data: &ClipData, options: &CreateOptions) -> Vec<Instance> {
    let base = base_instance(data, options);

    let mut shot = base.clone();
    shot.instance_id = uuid::Uuid::new_v4().to_string();
    shot.product_type = ProductKind::Shot.product_type().into();
    shot.variant = MAIN_VARIANT.into();
    shot.creator_identifier = ProductKind::Shot.identifier().into();
    shot.label = format!("{} shot", data.folder_path);
    let wfs = data.workfile_frame_start;
    shot.creator_attributes = json_object(json!({
        "fps": "from_selection",
        "workfileFrameStart": wfs,
        "handleStart": data.handle_start,
        "handleEnd": data.handle_end,
        "frameStart": wfs,
        "frameEnd": wfs + data.duration(),
        "clipIn": data.range.clip_in,
        "clipOut": data.range.clip_out,
        "clipDuration": data.duration(),
        "sourceIn": data.source_in,
        "sourceOut": data.source_out,
    }));

    let mut instances = vec![shot.clone()];
    instances.push(plate_instance(&base, data, options, &shot));

    if options.export_audio {
        let mut audio = child_instance(&base, data, ProductKind::Audio, ProductKind::Audio.product_type(), &shot);
        audio.variant = MAIN_VARIANT.into();
        instances.push(audio);
    }
    instances
}

/// Build the plate of a clip synced to a hero. It joins the hero's folder
/// and points at the shot made from the hero clip.
pub fn build_synced_plate(data: &ClipData, options: &CreateOptions, hero_shot: &Instance) -> Instance {
    let base = base_instance(data, options);
    plate_instance(&base, data, options, hero_shot)
}

fn child_instance(
    base: &Instance,
    data: &ClipData,
    kind: ProductKind,
    product_type: &str,
    shot: &Instance,
) -> Instance {
    let mut instance = base.clone();
    instance.instance_id = uuid::Uuid::new_v4().to_string();
    instance.creator_identifier = kind.identifier().into();
    instance.product_type = product_type.to_string();
    instance.parent_instance_id = Some(shot.instance_id.clone());
    instance.label = format!("{} {}", data.folder_path, product_type);
    instance.creator_attributes = json_object(json!({ "parentInstance": shot.label }));
    instance
}

fn plate_instance(base: &Instance, data: &ClipData, options: &CreateOptions, shot: &Instance) -> Instance {
    let mut plate = child_instance(base, data, ProductKind::Plate, &data.resolved.product_type, shot);
    plate
        .creator_attributes
        .insert("vSyncOn".into(), Value::Bool(options.v_sync_on));
    plate
        .creator_attributes
        .insert("vSyncTrack".into(), Value::String(options.v_sync_track.clone()));
    plate.product_name = data.resolved.product_name.clone();
    plate
}

fn base_instance(data: &ClipData, options: &CreateOptions) -> Instance {
    let mut base = Instance::new(ProductKind::Shot, data.clip_index.clone());
    base.variant = data.resolved.variant.clone();
    base.folder_path = data.folder_path.clone();
    base.hierarchy = data.resolved.hierarchy.clone();
    base.hierarchy_data = data.resolved.hierarchy_data.clone();
    base.parents = data.resolved.parents.clone();
    base.hero_track = data.hero_track;
    base.review_track = data.review_track.clone();

    let extra = json_object(json!({
        "uuid": data.uuid,
        "folderName": data.folder_name,
        "newClipName": data.resolved.new_clip_name,
        "workfileFrameStart": data.workfile_frame_start,
        "handleStart": data.handle_start,
        "handleEnd": data.handle_end,
        "sourceResolution": data.source_resolution,
        "audio": data.audio,
        "clip_variant": options.clip_variant,
        "publish": true,
    }));
    base.extra = extra;
    base
}

fn json_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Orchestrator that turns a clip selection into shot, plate and audio
/// instances and collects them back from the timeline.
pub struct ShotClipCreator<'s> {
    settings: &'s Settings,
}

impl<'s> ShotClipCreator<'s> {
    pub fn new(settings: &'s Settings) -> Self {
        Self { settings }
    }

    /// Default options for a create pass.
    pub fn default_options(&self) -> CreateOptions {
        CreateOptions::from_settings(&self.settings.create)
    }

    /// Create instances for the selected (or all) clips of a sequence.
    ///
    /// Option errors abort before any tag is written. A clip that fails to
    /// convert is skipped with a warning, unless no clip converted at all.
    pub fn create(
        &self,
        sequence: &mut Sequence,
        ctx: &mut CreateContext,
        options: &CreateOptions,
    ) -> Result<Vec<Instance>> {
        let selection = options.use_selection.then(|| sequence.selection.clone());
        let items = ItemFilter::default().select(sequence, selection.as_deref());
        if items.is_empty() {
            return Err(PublishError::Creator(
                "No clips to create instances from. Select clips in the timeline.".into(),
            ));
        }
        if options.export_audio && !sequence.has_audio() {
            return Err(PublishError::Creator(
                "You must have audio in your active timeline in order to export audio.".into(),
            ));
        }
        validate_hierarchy_template(options.hierarchy_template())?;
        validate_template(options.hierarchy_template())?;
        validate_template(options.clip_name_template())?;

        let hero_track = options.hero_track();
        let (mut ordered, rest): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|item| Some(item.parent_track().name.as_str()) == hero_track);
        ordered.extend(rest);

        let mut session = SyncSession::new();
        let mut converted = Vec::with_capacity(ordered.len());
        let mut failures = Vec::new();
        for (rename_index, item) in ordered.iter().enumerate() {
            let clip = PublishClip::new(item, &sequence.name, options, rename_index);
            match clip.convert(&mut session) {
                Ok(Some(data)) => converted.push(data),
                Ok(None) => {}
                Err(e) => {
                    warn!(clip = %item.name(), track = %clip.track_name(), error = %e, "skipping clip");
                    failures.push(format!("{}: {e}", item.name()));
                }
            }
        }
        session.reset();
        if converted.is_empty() && !failures.is_empty() {
            return Err(PublishError::Creator(format!(
                "No clips could be converted. {}",
                failures.join("; ")
            )));
        }

        // shots by the GUID of the clip they were made from
        let mut shots: HashMap<String, Instance> = HashMap::new();
        let mut created = Vec::new();
        for data in converted {
            let hero_shot = match &data.hero_clip {
                Some(hero_clip) => match shots.get(hero_clip) {
                    Some(shot) => Some(shot.clone()),
                    None => {
                        warn!(clip = %data.clip_name, hero = %hero_clip, "hero shot not created, skipping clip");
                        continue;
                    }
                },
                None => None,
            };
            if let Some(new_name) = &data.rename_to {
                sequence.rename_item(&data.clip_index, new_name)?;
            }
            self.remove_previous(sequence, ctx, &data.clip_index)?;

            let built = match &hero_shot {
                Some(shot) => vec![build_synced_plate(&data, options, shot)],
                None => build_instances(&data, options),
            };
            let instances: Vec<Instance> = built
                .into_iter()
                .map(|instance| {
                    let creator = InstanceCreator::new(instance.kind().unwrap_or(ProductKind::Shot));
                    creator.create(ctx, instance)
                })
                .collect();
            if let Some(shot) = instances.iter().find(|i| i.kind() == Some(ProductKind::Shot)) {
                shots.insert(data.clip_index.clone(), shot.clone());
            }
            let record = combined_record(&instances, &data.clip_index)?;
            sequence.imprint(&data.clip_index, &record)?;
            info!(
                clip = %data.clip_index,
                folder_path = %data.folder_path,
                instances = instances.len(),
                "created instances"
            );
            created.extend(instances);
        }
        Ok(created)
    }

    /// Drop the instances recorded in a clip's previous record from the
    /// context.
    fn remove_previous(
        &self,
        sequence: &Sequence,
        ctx: &mut CreateContext,
        clip_index: &str,
    ) -> Result<()> {
        let record = match sequence.read_payload(clip_index) {
            Ok(Some(TagPayload::Modern(record))) => record,
            Ok(_) => return Ok(()),
            Err(e) => {
                warn!(clip = %clip_index, error = %e, "ignoring unreadable previous record");
                return Ok(());
            }
        };
        if let Some(Value::Object(content)) = record.get(CONTENT_KEY) {
            for data in content.values() {
                if let Some(id) = data.get("instance_id").and_then(Value::as_str) {
                    if ctx.remove(id).is_some() {
                        debug!(instance = %id, "removed previous instance");
                    }
                }
            }
        }
        Ok(())
    }

    /// Re-hydrate instances from every clip's data tag.
    ///
    /// Legacy tags are upgraded in place. Unreadable tags and records are
    /// skipped with a warning. A plate or audio instance whose shot is not
    /// collected is dropped, or is an error when collection is restricted
    /// to the host selection.
    pub fn collect_instances(
        &self,
        sequence: &mut Sequence,
        ctx: &mut CreateContext,
    ) -> Result<Vec<Instance>> {
        let restricted = self.settings.collect.collect_selected_instances;
        let selected: HashSet<String> = sequence.selection.iter().cloned().collect();
        let guids: Vec<String> = sequence
            .video_tracks
            .iter()
            .flat_map(|track| track.items.iter().map(|item| item.guid.clone()))
            .filter(|guid| !restricted || selected.contains(guid))
            .collect();

        let mut collected = Vec::new();
        for guid in guids {
            let record = match sequence.read_payload(&guid) {
                Ok(None) => continue,
                Ok(Some(TagPayload::Modern(record))) => record,
                Ok(Some(TagPayload::Legacy(flat))) => {
                    match migrate_legacy_tag(sequence, &guid, &flat, self.settings) {
                        Ok(record) => record,
                        Err(e) => {
                            warn!(clip = %guid, error = %e, "legacy tag migration failed");
                            continue;
                        }
                    }
                }
                Err(e) => {
                    warn!(clip = %guid, error = %e, "skipping unreadable tag");
                    continue;
                }
            };
            let Some(Value::Object(content)) = record.get(CONTENT_KEY) else {
                continue;
            };
            for (creator_id, data) in content {
                if !ProductKind::from_identifier(creator_id).is_some_and(ProductKind::is_clip_product) {
                    warn!(clip = %guid, creator = %creator_id, "unknown creator in record");
                    continue;
                }
                let Value::Object(data) = data else {
                    warn!(clip = %guid, creator = %creator_id, "instance record is not an object");
                    continue;
                };
                match Instance::from_stored(data) {
                    Ok(instance) => collected.push(instance),
                    Err(e) => warn!(clip = %guid, creator = %creator_id, error = %e, "skipping instance"),
                }
            }
        }

        let ids: HashSet<String> = collected.iter().map(|i| i.instance_id.clone()).collect();
        let mut instances = Vec::with_capacity(collected.len());
        for instance in collected {
            let orphaned = instance
                .parent_instance_id
                .as_ref()
                .is_some_and(|parent| !ids.contains(parent));
            if orphaned && instance.active {
                if restricted {
                    return Err(PublishError::MissingParent(instance.label.clone()));
                }
                warn!(instance = %instance.label, "parent shot instance missing, skipping");
                continue;
            }
            ctx.add(instance.clone());
            instances.push(instance);
        }
        info!(instances = instances.len(), restricted, "collected instances");
        Ok(instances)
    }

    /// Remove instances, dispatching to each one's creator.
    pub fn remove_instances(
        &self,
        sequence: &mut Sequence,
        ctx: &mut CreateContext,
        instance_ids: &[String],
    ) -> Result<()> {
        for instance_id in instance_ids {
            let kind = ctx
                .get(instance_id)
                .and_then(Instance::kind)
                .filter(|kind| kind.is_clip_product())
                .ok_or_else(|| PublishError::Creator(format!("Unknown instance `{instance_id}`")))?;
            InstanceCreator::new(kind).remove_instances(
                sequence,
                ctx,
                std::slice::from_ref(instance_id),
            )?;
        }
        Ok(())
    }
}
