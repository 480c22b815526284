//! Tags attached to host objects and the store the publish layer writes to.
//!
//! Pipeline data lives in one tag per item whose name starts with
//! [`AYON_TAG_NAME`]. Current tags keep a single JSON blob under
//! [`JSON_METADATA_KEY`]; older documents carry flat `tag.<key>` string
//! entries that are coerced back into typed values when read.

use std::collections::BTreeMap;

use editmark_core::{EditMarkError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Name prefix of the pipeline data tag.
pub const AYON_TAG_NAME: &str = "AYON_Data";

/// Name of the project tag holding the workfile record.
pub const AYON_WORKFILE_TAG_NAME: &str = "AYON_Workfile";

/// Metadata key holding the JSON-encoded record.
pub const JSON_METADATA_KEY: &str = "tag.json_metadata";

/// Prefix of every host-side tag metadata key.
pub const METADATA_PREFIX: &str = "tag.";

const DATA_TAG_NOTE: &str = "AYON data container";
const DATA_TAG_ICON: &str = "AYON_icon.png";

fn default_true() -> bool {
    true
}

/// A named metadata container on a track item, track or source clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name (also the marker name on export)
    pub name: String,
    /// Free text note
    #[serde(default)]
    pub note: String,
    /// Icon resource, e.g. `icons:TagRed.png`
    #[serde(default)]
    pub icon: String,
    /// Hidden tags are not exported as markers
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Frame the tag is placed at
    #[serde(default)]
    pub in_time: f64,
    /// Host metadata, every value is a string
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Tag {
    /// Create an empty visible tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            note: String::new(),
            icon: String::new(),
            visible: true,
            in_time: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a fresh pipeline data tag with a unique name suffix.
    pub fn new_data_tag() -> Self {
        let hash = Uuid::new_v4().simple().to_string();
        let mut tag = Self::new(format!("{}_{}", AYON_TAG_NAME, &hash[..8]));
        tag.note = DATA_TAG_NOTE.to_string();
        tag.icon = DATA_TAG_ICON.to_string();
        tag
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True for the pipeline data tag.
    pub fn is_data_tag(&self) -> bool {
        self.name.contains(AYON_TAG_NAME)
    }

    /// Decoded JSON record, if the tag carries one.
    pub fn json_metadata(&self) -> Option<Result<Map<String, Value>>> {
        self.metadata.get(JSON_METADATA_KEY).map(|raw| {
            serde_json::from_str(raw).map_err(|e| {
                EditMarkError::Tag(format!("corrupt metadata on tag '{}': {}", self.name, e))
            })
        })
    }

    /// Replace the JSON record, leaving other metadata keys alone.
    pub fn set_json_metadata(&mut self, data: &Map<String, Value>) -> Result<()> {
        let encoded = serde_json::to_string(data)
            .map_err(|e| EditMarkError::Serialization(format!("tag metadata: {}", e)))?;
        self.metadata.insert(JSON_METADATA_KEY.to_string(), encoded);
        Ok(())
    }

    /// Metadata with the `tag.` prefix removed from every key.
    pub fn stripped_metadata(&self) -> BTreeMap<String, String> {
        self.metadata
            .iter()
            .map(|(k, v)| (strip_prefix(k).to_string(), v.clone()))
            .collect()
    }
}

fn strip_prefix(key: &str) -> &str {
    key.strip_prefix(METADATA_PREFIX).unwrap_or(key)
}

/// The two on-disk layouts of a pipeline data tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagPayload {
    /// One JSON record under [`JSON_METADATA_KEY`].
    Modern(Map<String, Value>),
    /// Flat `tag.<key>` strings, keys already stripped of the prefix.
    Legacy(BTreeMap<String, String>),
}

impl TagPayload {
    /// Read the payload of a tag. A JSON blob that fails to decode is an
    /// error rather than an empty record.
    pub fn from_tag(tag: &Tag) -> Result<Self> {
        match tag.json_metadata() {
            Some(parsed) => parsed.map(TagPayload::Modern),
            None => Ok(TagPayload::Legacy(tag.stripped_metadata())),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, TagPayload::Legacy(_))
    }

    /// Resolve into one typed record. Legacy strings are coerced with
    /// [`coerce_legacy_value`].
    pub fn into_record(self) -> Map<String, Value> {
        match self {
            TagPayload::Modern(map) => map,
            TagPayload::Legacy(flat) => flat
                .into_iter()
                .map(|(k, v)| {
                    let value = coerce_legacy_value(&v);
                    (k, value)
                })
                .collect(),
        }
    }
}

/// Coerce one legacy metadata string into a typed value.
///
/// Digits become integers, `True`/`False`/`None` become booleans and null,
/// bare words stay strings, and anything else is read as a literal dict or
/// list after quote normalisation. Unparseable text is kept verbatim.
pub fn coerce_legacy_value(raw: &str) -> Value {
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::from(n);
        }
    }
    match raw {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        "None" => return Value::Null,
        _ => {}
    }
    if !raw.is_empty() && raw.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(&normalize_literal(raw)).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Rewrite a literal written with single quotes, tuples and capitalised
/// constants into JSON.
fn normalize_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                if escaped == '\'' {
                                    out.push('\'');
                                } else {
                                    out.push('\\');
                                    out.push(escaped);
                                }
                            }
                        }
                        q if q == c => break,
                        '"' => out.push_str("\\\""),
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            c if c.is_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
            }
            other => out.push(other),
        }
    }
    out
}

/// Persistence of tags on timeline items, addressed by item GUID.
pub trait TagStore {
    /// Tags of an item, `None` when the item is unknown.
    fn item_tags(&self, guid: &str) -> Option<&[Tag]>;

    /// Attach a new tag to an item.
    fn add_item_tag(&mut self, guid: &str, tag: Tag) -> Result<()>;

    /// Replace the item's tag with the same name.
    fn replace_item_tag(&mut self, guid: &str, tag: Tag) -> Result<()>;

    /// Detach the named tag from an item.
    fn remove_item_tag(&mut self, guid: &str, name: &str) -> Result<Option<Tag>>;

    /// The pipeline data tag of an item.
    fn data_tag(&self, guid: &str) -> Option<&Tag> {
        self.item_tags(guid)?.iter().find(|t| t.is_data_tag())
    }

    /// Write a record into the item's data tag, creating the tag when the
    /// item has none.
    fn imprint(&mut self, guid: &str, data: &Map<String, Value>) -> Result<Tag> {
        match self.data_tag(guid).cloned() {
            Some(mut tag) => {
                tag.set_json_metadata(data)?;
                self.replace_item_tag(guid, tag.clone())?;
                Ok(tag)
            }
            None => {
                let mut tag = Tag::new_data_tag();
                tag.set_json_metadata(data)?;
                self.add_item_tag(guid, tag.clone())?;
                Ok(tag)
            }
        }
    }

    /// Read the item's data tag payload.
    fn read_payload(&self, guid: &str) -> Result<Option<TagPayload>> {
        self.data_tag(guid).map(TagPayload::from_tag).transpose()
    }

    /// Drop the item's data tag.
    fn remove_data_tag(&mut self, guid: &str) -> Result<Option<Tag>> {
        match self.data_tag(guid).map(|t| t.name.clone()) {
            Some(name) => self.remove_item_tag(guid, &name),
            None => Ok(None),
        }
    }
}
