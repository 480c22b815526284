//! Workfile auto-creator.
//!
//! The workfile instance belongs to the project rather than to a clip, so
//! its record lives in the [`AYON_WORKFILE_TAG_NAME`] project tag.

use editmark_template::builtins::capitalize;
use editmark_timeline::{Project, AYON_WORKFILE_TAG_NAME};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::creators::CreateContext;
use crate::error::{PublishError, Result};
use crate::instance::{Instance, ProductKind};

/// Variant given to auto-created project products.
pub const DEFAULT_VARIANT: &str = "Main";

const WORKFILE_TAG_NOTE: &str = "AYON workfile data";

/// Folder and task the artist is working in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkContext {
    pub folder_path: String,
    pub task: Option<String>,
}

impl WorkContext {
    pub fn new(folder_path: impl Into<String>, task: Option<String>) -> Self {
        Self {
            folder_path: folder_path.into(),
            task,
        }
    }

    /// Instance of a project-level product, named `<productType><Variant>`.
    pub(crate) fn instance(&self, kind: ProductKind, object_id: String, variant: &str) -> Instance {
        let mut instance = Instance::new(kind, object_id);
        instance.variant = variant.to_string();
        instance.product_name = format!("{}{}", kind.product_type(), capitalize(variant));
        instance.folder_path = self.folder_path.clone();
        instance.hierarchy = self.folder_path.trim_start_matches('/').to_string();
        instance.hero_track = false;
        instance.label = instance.product_name.clone();
        if let Some(task) = &self.task {
            instance.extra.insert("task".into(), Value::String(task.clone()));
        }
        instance
    }
}

/// Store an instance's record into a project tag.
pub(crate) fn store_in_project_tag(
    project: &mut Project,
    tag_name: &str,
    note: &str,
    instance: &Instance,
) -> Result<()> {
    project.imprint_project_tag(tag_name, note, &instance.data_to_store()?)?;
    Ok(())
}

/// Look up an instance of one kind in the context.
pub(crate) fn instance_of_kind<'c>(
    ctx: &'c mut CreateContext,
    instance_id: &str,
    kind: ProductKind,
) -> Result<&'c mut Instance> {
    ctx.get_mut(instance_id)
        .filter(|instance| instance.kind() == Some(kind))
        .ok_or_else(|| PublishError::Creator(format!("Unknown instance `{instance_id}`")))
}

/// Creator of the single workfile instance of a project.
#[derive(Debug, Clone)]
pub struct WorkfileCreator {
    context: WorkContext,
}

impl WorkfileCreator {
    pub fn new(context: WorkContext) -> Self {
        Self { context }
    }

    pub fn identifier(&self) -> &'static str {
        ProductKind::Workfile.identifier()
    }

    /// Create the workfile instance unless the project already carries one.
    pub fn create(&self, project: &mut Project, ctx: &mut CreateContext) -> Result<Option<Instance>> {
        let existing = project.read_project_tag(AYON_WORKFILE_TAG_NAME)?;
        if existing.is_some_and(|record| !record.is_empty()) {
            debug!(project = %project.name, "workfile instance already stored");
            return Ok(None);
        }
        info!(project = %project.name, "auto-creating workfile instance");
        let instance = self
            .context
            .instance(ProductKind::Workfile, project.id.to_string(), DEFAULT_VARIANT);
        store_in_project_tag(project, AYON_WORKFILE_TAG_NAME, WORKFILE_TAG_NOTE, &instance)?;
        ctx.add(instance.clone());
        Ok(Some(instance))
    }

    /// Re-hydrate the workfile instance from the project tag.
    pub fn collect_instances(&self, project: &Project, ctx: &mut CreateContext) -> Result<Option<Instance>> {
        let record = match project.read_project_tag(AYON_WORKFILE_TAG_NAME)? {
            Some(record) if !record.is_empty() => record,
            _ => return Ok(None),
        };
        let instance = Instance::from_stored(&record)?;
        ctx.add(instance.clone());
        Ok(Some(instance))
    }

    /// Apply changes and store them back into the project tag.
    pub fn update_instances(
        &self,
        project: &mut Project,
        ctx: &mut CreateContext,
        updates: &[(String, Map<String, Value>)],
    ) -> Result<()> {
        for (instance_id, changes) in updates {
            let instance = instance_of_kind(ctx, instance_id, ProductKind::Workfile)?;
            instance.apply_changes(changes)?;
            store_in_project_tag(project, AYON_WORKFILE_TAG_NAME, WORKFILE_TAG_NOTE, instance)?;
            debug!(instance = %instance_id, "updated workfile instance");
        }
        Ok(())
    }

    /// Drop the workfile instance and its project tag.
    pub fn remove_instances(
        &self,
        project: &mut Project,
        ctx: &mut CreateContext,
        instance_ids: &[String],
    ) -> Result<()> {
        for instance_id in instance_ids {
            if ctx.get(instance_id).and_then(Instance::kind) != Some(ProductKind::Workfile) {
                warn!(instance = %instance_id, "workfile instance not in context");
                continue;
            }
            ctx.remove(instance_id);
            project.remove_project_tag(AYON_WORKFILE_TAG_NAME);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creator() -> WorkfileCreator {
        WorkfileCreator::new(WorkContext::new("/shots/sq01", Some("edit".into())))
    }

    #[test]
    fn test_create_stores_project_tag() {
        let mut project = Project::new("show");
        let mut ctx = CreateContext::new();
        let instance = creator().create(&mut project, &mut ctx).unwrap().unwrap();

        assert_eq!(instance.product_type, "workfile");
        assert_eq!(instance.product_name, "workfileMain");
        assert_eq!(instance.clip_index, project.id.to_string());
        assert_eq!(instance.extra["task"], json!("edit"));
        assert_eq!(ctx.len(), 1);

        let record = project.read_project_tag(AYON_WORKFILE_TAG_NAME).unwrap().unwrap();
        assert_eq!(record["creator_identifier"], json!(creator().identifier()));
    }

    #[test]
    fn test_create_skipped_when_stored() {
        let mut project = Project::new("show");
        let mut ctx = CreateContext::new();
        creator().create(&mut project, &mut ctx).unwrap();
        assert!(creator().create(&mut project, &mut ctx).unwrap().is_none());
        assert_eq!(project.tags.len(), 1);
    }

    #[test]
    fn test_collect_update_remove() {
        let mut project = Project::new("show");
        let created = creator()
            .create(&mut project, &mut CreateContext::new())
            .unwrap()
            .unwrap();

        let mut ctx = CreateContext::new();
        let collected = creator().collect_instances(&project, &mut ctx).unwrap().unwrap();
        assert_eq!(collected.instance_id, created.instance_id);

        let mut changes = Map::new();
        changes.insert("active".into(), json!(false));
        creator()
            .update_instances(&mut project, &mut ctx, &[(created.instance_id.clone(), changes)])
            .unwrap();
        let record = project.read_project_tag(AYON_WORKFILE_TAG_NAME).unwrap().unwrap();
        assert_eq!(record["active"], json!(false));

        creator()
            .remove_instances(&mut project, &mut ctx, &[created.instance_id.clone()])
            .unwrap();
        assert!(ctx.is_empty());
        assert!(project.project_tag(AYON_WORKFILE_TAG_NAME).is_none());
        assert!(creator().collect_instances(&project, &mut ctx).unwrap().is_none());
    }

    #[test]
    fn test_update_rejects_other_kinds() {
        let mut project = Project::new("show");
        let mut ctx = CreateContext::new();
        let shot = Instance::new(ProductKind::Shot, "guid-1");
        let id = shot.instance_id.clone();
        ctx.add(shot);
        let err = creator()
            .update_instances(&mut project, &mut ctx, &[(id, Map::new())])
            .unwrap_err();
        assert!(matches!(err, PublishError::Creator(_)));
        assert!(project.tags.is_empty());
    }
}
