//! Editorial package creator.
//!
//! One instance per sequence, stored in a project tag named
//! `<sequence guid>_editorial_pkg`.

use editmark_timeline::Project;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::creators::CreateContext;
use crate::error::{PublishError, Result};
use crate::instance::{Instance, ProductKind};
use crate::workfile::{instance_of_kind, store_in_project_tag, WorkContext, DEFAULT_VARIANT};

const EDITORIAL_TAG_NOTE: &str = "AYON editorial pkg data";

fn tag_name(sequence_guid: &str) -> String {
    format!("{sequence_guid}_{}", ProductKind::EditorialPackage.product_type())
}

/// Creator of editorial package instances for the active sequence.
#[derive(Debug, Clone)]
pub struct EditorialPackageCreator {
    context: WorkContext,
}

impl EditorialPackageCreator {
    pub fn new(context: WorkContext) -> Self {
        Self { context }
    }

    pub fn identifier(&self) -> &'static str {
        ProductKind::EditorialPackage.identifier()
    }

    /// Create a package instance for the active sequence. `review` marks the
    /// intermediate media reviewable.
    pub fn create(
        &self,
        project: &mut Project,
        ctx: &mut CreateContext,
        variant: &str,
        review: bool,
    ) -> Result<Instance> {
        let sequence = project
            .active_sequence()
            .ok_or_else(|| PublishError::Creator("No active sequence.".into()))?;
        let variant = if variant.is_empty() { DEFAULT_VARIANT } else { variant };
        let guid = sequence.id.to_string();

        let mut instance = self
            .context
            .instance(ProductKind::EditorialPackage, guid.clone(), variant);
        instance.label = format!("{} ({})", instance.product_name, sequence.name);
        instance.creator_attributes.insert("review".into(), json!(review));

        store_in_project_tag(project, &tag_name(&guid), EDITORIAL_TAG_NOTE, &instance)?;
        info!(sequence = %guid, product = %instance.product_name, "created editorial package");
        ctx.add(instance.clone());
        Ok(instance)
    }

    /// Re-hydrate every package instance stored in the project tags.
    /// Unreadable records are skipped with a warning.
    pub fn collect_instances(&self, project: &Project, ctx: &mut CreateContext) -> Result<Vec<Instance>> {
        let suffix = ProductKind::EditorialPackage.product_type();
        let mut collected = Vec::new();
        for tag in project.project_tags_ending_with(suffix) {
            let record = match tag.json_metadata() {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    warn!(tag = %tag.name, error = %e, "skipping unreadable editorial package tag");
                    continue;
                }
                None => continue,
            };
            match Instance::from_stored(&record) {
                Ok(instance) => {
                    ctx.add(instance.clone());
                    collected.push(instance);
                }
                Err(e) => warn!(tag = %tag.name, error = %e, "skipping editorial package"),
            }
        }
        debug!(instances = collected.len(), "collected editorial packages");
        Ok(collected)
    }

    /// Apply changes and store them back into each sequence's tag.
    pub fn update_instances(
        &self,
        project: &mut Project,
        ctx: &mut CreateContext,
        updates: &[(String, Map<String, Value>)],
    ) -> Result<()> {
        for (instance_id, changes) in updates {
            let instance = instance_of_kind(ctx, instance_id, ProductKind::EditorialPackage)?;
            instance.apply_changes(changes)?;
            let name = tag_name(&instance.clip_index);
            store_in_project_tag(project, &name, EDITORIAL_TAG_NOTE, instance)?;
        }
        Ok(())
    }

    /// Drop package instances and their project tags.
    pub fn remove_instances(
        &self,
        project: &mut Project,
        ctx: &mut CreateContext,
        instance_ids: &[String],
    ) -> Result<()> {
        for instance_id in instance_ids {
            if ctx.get(instance_id).and_then(Instance::kind) != Some(ProductKind::EditorialPackage) {
                warn!(instance = %instance_id, "editorial package not in context");
                continue;
            }
            if let Some(instance) = ctx.remove(instance_id) {
                project.remove_project_tag(&tag_name(&instance.clip_index));
            }
        }
        Ok(())
    }
}
