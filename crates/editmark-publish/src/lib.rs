//! EditMark Publish - turning timeline clips into publishable instances
//!
//! This crate handles:
//! - Create options and integration settings
//! - The clip converter with vertical sync across stacked tracks
//! - Shot, plate and audio creators persisting into clip data tags
//! - Workfile and editorial package creators persisting into project tags
//! - Collection of instances, tasks, comments and soft effects
//! - Upgrade of legacy data tags
//! - Quicktime review render parameters

pub mod collect;
pub mod creators;
pub mod editorial;
pub mod error;
pub mod instance;
pub mod legacy;
pub mod options;
pub mod publish_clip;
pub mod render;
pub mod session;
pub mod settings;
pub mod workfile;

pub use collect::{
    collect_comments, collect_tag_tasks, EffectCollector, EffectProduct, EffectRecord, TaskInfo,
};
pub use creators::{
    build_instances, build_synced_plate, combined_record, read_record, CreateContext, InstanceCreator,
    ShotClipCreator, CLIP_INDEX_KEY, CONTENT_KEY,
};
pub use editorial::EditorialPackageCreator;
pub use error::{PublishError, Result};
pub use instance::{Instance, Parent, ProductKind};
pub use legacy::{migrate_legacy_tag, LEGACY_UNKNOWN_KEY};
pub use options::CreateOptions;
pub use publish_clip::{ClipData, PublishClip, ResolvedHierarchy};
pub use render::{
    render_sequence_as_quicktime, JobFileExporter, QuicktimeExport, RenderJob, SequenceExporter,
};
pub use session::{HeroClip, SyncSession};
pub use settings::{CollectSettings, CreateSettings, LegacyFieldMap, Settings};
pub use workfile::{WorkContext, WorkfileCreator};
