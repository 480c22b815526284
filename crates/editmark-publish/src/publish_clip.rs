//! Clip-to-instance conversion.
//!
//! [`PublishClip`] turns one timeline clip and the create options into the
//! record its instances are built from. Hierarchy tokens are resolved first
//! (with `#` padding), then the hierarchy and clip-name templates. Under
//! vertical sync hero clips register their resolved data in the
//! [`SyncSession`] and dependent clips copy it from the hero range they sit
//! in, with a product name made unique under that hero.

use std::sync::OnceLock;

use editmark_core::FrameRange;
use editmark_template::builtins::capitalize;
use editmark_template::{replace_hash_with_field, resolve_template, FormatContext};
use editmark_timeline::TimelineItem;
use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PublishError, Result};
use crate::instance::Parent;
use crate::options::{CreateOptions, HIERARCHY_TOKENS, TRACK_NAME_VARIANT};
use crate::session::SyncSession;

/// Hierarchy token to folder type.
const FOLDER_TYPES: [(&str, &str); 5] = [
    ("shot", "shot"),
    ("folder", "folder"),
    ("episode", "episode"),
    ("sequence", "sequence"),
    ("track", "sequence"),
];

fn parent_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-zA-Z0-9_]+)\}").expect("valid parent token regex"))
}

/// Folder type of a hierarchy token. Leading/trailing underscores and
/// trailing digits are ignored, so `{_track_}` and `{sequence2}` resolve.
pub fn folder_type(token: &str) -> Option<&'static str> {
    let key = token
        .trim_matches('_')
        .trim_end_matches(|c: char| c.is_ascii_digit());
    FOLDER_TYPES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, folder_type)| *folder_type)
}

/// Build the parent chain from a hierarchy template, one entry per `/`
/// segment. The last token of a segment decides its folder type.
pub fn build_parents(template: &str, ctx: &FormatContext) -> Result<Vec<Parent>> {
    template
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let token = parent_token_regex()
                .captures_iter(segment)
                .last()
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .ok_or_else(|| PublishError::MissingFolderType(segment.to_string()))?;
            let folder_type =
                folder_type(token).ok_or_else(|| PublishError::MissingFolderType(token.to_string()))?;
            Ok(Parent {
                entity_type: folder_type.to_string(),
                folder_type: folder_type.to_string(),
                entity_name: resolve_template(segment, ctx)?,
            })
        })
        .collect()
}

/// Check that every segment of a hierarchy template maps to a folder type,
/// without resolving anything.
pub fn validate_hierarchy_template(template: &str) -> Result<()> {
    for segment in template.split('/').filter(|s| !s.is_empty()) {
        let token = parent_token_regex()
            .captures_iter(segment)
            .last()
            .and_then(|caps| caps.get(1))
            .map_or(segment, |m| m.as_str());
        if folder_type(token).is_none() {
            return Err(PublishError::MissingFolderType(token.to_string()));
        }
    }
    Ok(())
}

/// The part of a clip's record shared between a hero and its dependents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedHierarchy {
    pub new_clip_name: String,
    pub hierarchy: String,
    /// Resolved hierarchy tokens, `shot` excluded
    pub hierarchy_data: IndexMap<String, String>,
    pub parents: Vec<Parent>,
    pub product_name: String,
    pub product_type: String,
    pub variant: String,
}

/// Everything the creators need to build a clip's instances.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipData {
    /// GUID of the clip
    pub clip_index: String,
    /// Clip name before any rename
    pub clip_name: String,
    pub track_name: String,
    pub track_index: usize,
    pub range: FrameRange,
    pub source_in: f64,
    pub source_out: f64,
    pub resolved: ResolvedHierarchy,
    pub hero_track: bool,
    /// GUID of the hero clip a synced dependent copied its data from
    pub hero_clip: Option<String>,
    pub review_track: Option<String>,
    pub uuid: String,
    pub folder_name: String,
    pub folder_path: String,
    /// New host name when clip renaming is on
    pub rename_to: Option<String>,
    pub workfile_frame_start: i64,
    pub handle_start: i64,
    pub handle_end: i64,
    pub source_resolution: bool,
    pub audio: bool,
}

impl ClipData {
    pub fn duration(&self) -> i64 {
        self.range.duration()
    }
}

/// Converter for one clip of a create pass.
pub struct PublishClip<'a> {
    options: &'a CreateOptions,
    rename_index: usize,
    clip_index: String,
    clip_name: String,
    event_number: u32,
    track_name: String,
    track_index: usize,
    range: FrameRange,
    source_in: f64,
    source_out: f64,
    defaults: FormatContext,
}

impl<'a> PublishClip<'a> {
    /// Capture the clip identity and the default formatting data.
    ///
    /// Spaces in sequence and track names become underscores.
    pub fn new(
        item: &impl TimelineItem,
        sequence_name: &str,
        options: &'a CreateOptions,
        rename_index: usize,
    ) -> Self {
        let track = item.parent_track();
        let sequence_name = sequence_name.replace(' ', "_");
        let track_name = track.name.replace(' ', "_");
        let defaults = FormatContext::new()
            .with("_folder_", "shots")
            .with("_sequence_", sequence_name)
            .with("_track_", track_name.clone())
            .with("_clip_", item.name())
            .with("_trackIndex_", track.index as i64)
            .with("_clipIndex_", item.event_number());
        Self {
            options,
            rename_index,
            clip_index: item.guid().to_string(),
            clip_name: item.name().to_string(),
            event_number: item.event_number(),
            track_name,
            track_index: track.index,
            range: item.frame_range(),
            source_in: item.source_in(),
            source_out: item.source_out(),
            defaults,
        }
    }

    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    pub fn range(&self) -> FrameRange {
        self.range
    }

    /// True when this clip drives vertical sync, or sync is off.
    pub fn is_hero(&self) -> bool {
        self.options
            .hero_track()
            .map_or(true, |hero| hero == self.track_name)
    }

    /// Review-only clips: on the review track while that track is not the
    /// hero track.
    pub fn is_review_only(&self) -> bool {
        self.options.review_track_name() == Some(self.track_name.as_str())
            && self.options.hero_track() != Some(self.track_name.as_str())
    }

    /// Running shot number of this clip.
    pub fn shot_number(&self) -> i64 {
        self.options.count_from + self.options.count_steps * self.rename_index as i64
    }

    /// Resolve every hierarchy token, `#` runs included.
    pub fn hierarchy_formatting_data(&self) -> Result<IndexMap<String, String>> {
        let ctx = self
            .defaults
            .clone()
            .with("shot", self.shot_number());
        HIERARCHY_TOKENS
            .iter()
            .map(|&key| {
                let raw = self.options.token(key).map(str::to_string).unwrap_or_else(|| {
                    let fallback = format!("_{key}_");
                    if self.defaults.contains_key(&fallback) {
                        format!("{{{fallback}}}")
                    } else {
                        String::new()
                    }
                });
                let template = replace_hash_with_field(key, &raw);
                Ok((key.to_string(), resolve_template(&template, &ctx)?))
            })
            .collect()
    }

    /// Resolve the templates and product naming of this clip alone.
    pub fn resolve(&self) -> Result<ResolvedHierarchy> {
        let mut formatting = self.hierarchy_formatting_data()?;
        let mut ctx = self.defaults.clone();
        for (key, value) in &formatting {
            ctx.insert(key.clone(), value.clone());
        }
        let hierarchy = resolve_template(self.options.hierarchy_template(), &ctx)?;
        let new_clip_name = resolve_template(self.options.clip_name_template(), &ctx)?;
        let parents = build_parents(self.options.hierarchy_template(), &ctx)?;
        formatting.shift_remove("shot");

        let variant_source = if self.options.clip_variant == TRACK_NAME_VARIANT {
            formatting
                .get("track")
                .cloned()
                .unwrap_or_else(|| self.track_name.clone())
        } else {
            self.options.clip_variant.clone()
        };
        let variant = capitalize(&variant_source);
        let product_type = self.options.product_type.clone();
        Ok(ResolvedHierarchy {
            new_clip_name,
            hierarchy,
            hierarchy_data: formatting,
            parents,
            product_name: format!("{product_type}{variant}"),
            product_type,
            variant,
        })
    }

    /// Convert the clip. `Ok(None)` means the clip is review-only.
    pub fn convert(&self, session: &mut SyncSession) -> Result<Option<ClipData>> {
        if self.is_review_only() {
            debug!(clip = %self.clip_name, track = %self.track_name, "skipping review track clip");
            return Ok(None);
        }

        let own = self.resolve()?;
        let hero = self.is_hero();
        let mut hero_clip = None;
        let mut resolved = if !self.options.v_sync_on {
            own
        } else if hero {
            session.register_hero(self.range, self.clip_index.clone(), own.clone());
            own
        } else {
            let found = session
                .find_hero(self.range)
                .cloned()
                .ok_or_else(|| PublishError::MissingHero {
                    clip: self.clip_name.clone(),
                    range: self.range,
                })?;
            hero_clip = Some(found.clip_index);
            let hero_data = found.resolved;
            let product_name = session.disambiguate(
                &hero_data.new_clip_name,
                &hero_data.product_name,
                &own.product_name,
                self.track_index,
                self.rename_index,
            );
            let variant = product_name
                .strip_prefix(own.product_type.as_str())
                .unwrap_or(&product_name)
                .to_string();
            ResolvedHierarchy {
                product_name,
                product_type: own.product_type,
                variant,
                ..hero_data
            }
        };

        let (folder_name, rename_to) = if self.options.clip_rename {
            (resolved.new_clip_name.clone(), Some(resolved.new_clip_name.clone()))
        } else {
            resolved
                .hierarchy_data
                .insert("shot".into(), self.clip_name.clone());
            (self.clip_name.clone(), None)
        };
        let folder_path = format!("/{}/{}", resolved.hierarchy, folder_name);

        debug!(
            clip = %self.clip_name,
            event = self.event_number,
            hero,
            folder_path = %folder_path,
            product = %resolved.product_name,
            "converted clip"
        );

        Ok(Some(ClipData {
            clip_index: self.clip_index.clone(),
            clip_name: self.clip_name.clone(),
            track_name: self.track_name.clone(),
            track_index: self.track_index,
            range: self.range,
            source_in: self.source_in,
            source_out: self.source_out,
            resolved,
            hero_track: hero,
            hero_clip,
            review_track: if hero {
                self.options.review_track_name().map(str::to_string)
            } else {
                None
            },
            uuid: Uuid::new_v4().to_string(),
            folder_name,
            folder_path,
            rename_to,
            workfile_frame_start: self.options.workfile_frame_start,
            handle_start: self.options.handle_start,
            handle_end: self.options.handle_end,
            source_resolution: self.options.source_resolution,
            audio: self.options.export_audio,
        }))
    }
}
