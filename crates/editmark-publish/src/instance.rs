//! Publishable instance records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{PublishError, Result};

/// Kind of product a sub-creator makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Shot,
    Plate,
    Audio,
    Workfile,
    EditorialPackage,
}

impl ProductKind {
    pub const ALL: [ProductKind; 5] = [
        ProductKind::Shot,
        ProductKind::Plate,
        ProductKind::Audio,
        ProductKind::Workfile,
        ProductKind::EditorialPackage,
    ];

    /// Creator identifier, also the key of the combined tag record for
    /// clip products.
    pub fn identifier(self) -> &'static str {
        match self {
            ProductKind::Shot => "io.ayon.creators.hiero.shot",
            ProductKind::Plate => "io.ayon.creators.hiero.plate",
            ProductKind::Audio => "io.ayon.creators.hiero.audio",
            ProductKind::Workfile => "io.ayon.creators.hiero.workfile",
            ProductKind::EditorialPackage => "io.ayon.creators.hiero.editorial_pkg",
        }
    }

    pub fn product_type(self) -> &'static str {
        match self {
            ProductKind::Shot => "shot",
            ProductKind::Plate => "plate",
            ProductKind::Audio => "audio",
            ProductKind::Workfile => "workfile",
            ProductKind::EditorialPackage => "editorial_pkg",
        }
    }

    /// True for the products stored in clip data tags.
    pub fn is_clip_product(self) -> bool {
        matches!(self, ProductKind::Shot | ProductKind::Plate | ProductKind::Audio)
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.identifier() == identifier)
    }
}

/// One entry of an instance's parent chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    pub entity_type: String,
    pub folder_type: String,
    pub entity_name: String,
}

fn default_true() -> bool {
    true
}

/// A publishable product of one clip.
///
/// The named fields are the ones every creator reads. Anything else a
/// creator attaches travels in [`Instance::extra`] and is stored next to
/// them in the same flat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(rename = "instance_id")]
    pub instance_id: String,
    #[serde(rename = "creator_identifier")]
    pub creator_identifier: String,
    pub product_type: String,
    pub product_name: String,
    pub variant: String,
    pub folder_path: String,
    pub hierarchy: String,
    #[serde(default)]
    pub hierarchy_data: IndexMap<String, String>,
    #[serde(default)]
    pub parents: Vec<Parent>,
    #[serde(default)]
    pub hero_track: bool,
    #[serde(default)]
    pub review_track: Option<String>,
    #[serde(rename = "creator_attributes", default)]
    pub creator_attributes: Map<String, Value>,
    #[serde(rename = "parent_instance_id", default, skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<String>,
    /// GUID of the host object the instance was made from: the clip for
    /// clip products, the project or sequence otherwise
    #[serde(rename = "clip_index")]
    pub clip_index: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Instance {
    /// Empty instance of a product kind for a clip, with a fresh id.
    pub fn new(kind: ProductKind, clip_index: impl Into<String>) -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            creator_identifier: kind.identifier().to_string(),
            product_type: kind.product_type().to_string(),
            product_name: String::new(),
            variant: String::new(),
            folder_path: String::new(),
            hierarchy: String::new(),
            hierarchy_data: IndexMap::new(),
            parents: Vec::new(),
            hero_track: true,
            review_track: None,
            creator_attributes: Map::new(),
            parent_instance_id: None,
            clip_index: clip_index.into(),
            label: String::new(),
            active: true,
            extra: Map::new(),
        }
    }

    pub fn kind(&self) -> Option<ProductKind> {
        ProductKind::from_identifier(&self.creator_identifier)
    }

    /// Record persisted into the clip's data tag.
    pub fn data_to_store(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(PublishError::Serialization(format!(
                "instance serialized to {other} instead of an object"
            ))),
        }
    }

    /// Re-hydrate an instance from a stored record.
    pub fn from_stored(data: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(data.clone())).map_err(|e| {
            PublishError::Serialization(format!("invalid instance record: {e}"))
        })
    }

    /// Overlay changed fields, as sent by a publisher UI.
    pub fn apply_changes(&mut self, changes: &Map<String, Value>) -> Result<()> {
        let mut data = self.data_to_store()?;
        for (key, value) in changes {
            match (data.get_mut(key), value) {
                (Some(Value::Object(current)), Value::Object(patch)) => {
                    for (k, v) in patch {
                        current.insert(k.clone(), v.clone());
                    }
                }
                _ => {
                    data.insert(key.clone(), value.clone());
                }
            }
        }
        *self = Self::from_stored(&data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plate() -> Instance {
        let mut instance = Instance::new(ProductKind::Plate, "guid-1");
        instance.product_name = "plateMain".into();
        instance.variant = "Main".into();
        instance.folder_path = "/shots/sq01/sh010".into();
        instance.hierarchy = "shots/sq01".into();
        instance.hierarchy_data.insert("folder".into(), "shots".into());
        instance.parents.push(Parent {
            entity_type: "folder".into(),
            folder_type: "folder".into(),
            entity_name: "shots".into(),
        });
        instance.parent_instance_id = Some("shot-id".into());
        instance
            .creator_attributes
            .insert("parentInstance".into(), json!("/shots/sq01/sh010 shot"));
        instance.extra.insert("workfileFrameStart".into(), json!(1001));
        instance
    }

    #[test]
    fn test_store_roundtrip() {
        let instance = plate();
        let stored = instance.data_to_store().unwrap();
        assert_eq!(stored["productName"], json!("plateMain"));
        assert_eq!(stored["clip_index"], json!("guid-1"));
        assert_eq!(stored["workfileFrameStart"], json!(1001));
        assert_eq!(Instance::from_stored(&stored).unwrap(), instance);
    }

    #[test]
    fn test_kind_from_identifier() {
        assert_eq!(plate().kind(), Some(ProductKind::Plate));
        assert_eq!(
            ProductKind::from_identifier("io.ayon.creators.hiero.audio"),
            Some(ProductKind::Audio)
        );
        assert_eq!(ProductKind::from_identifier("other"), None);
        assert!(ProductKind::Audio.is_clip_product());
        assert!(!ProductKind::from_identifier("io.ayon.creators.hiero.workfile")
            .unwrap()
            .is_clip_product());
    }

    #[test]
    fn test_apply_changes_merges_attributes() {
        let mut instance = plate();
        let mut changes = Map::new();
        changes.insert("active".into(), json!(false));
        changes.insert("creator_attributes".into(), json!({"vSyncOn": true}));
        instance.apply_changes(&changes).unwrap();
        assert!(!instance.active);
        assert_eq!(instance.creator_attributes["vSyncOn"], json!(true));
        assert_eq!(
            instance.creator_attributes["parentInstance"],
            json!("/shots/sq01/sh010 shot")
        );
    }

    #[test]
    fn test_missing_required_field_is_error() {
        let mut stored = plate().data_to_store().unwrap();
        stored.remove("productName");
        assert!(Instance::from_stored(&stored).is_err());
    }
}
