use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::database::store::StoreError;

/// Attribute holding the derived colour classification
pub const COLORS_FIELD: &str = "colors";

/// Key inside `colors` that carries the palette index
pub const COLOR_ID_FIELD: &str = "color_id";

/// A user document as held by the store.
///
/// `colors` is modelled as an explicit optional: `None` means the document has
/// no colour attribute at all (or an explicit `null`). Any other value, even an
/// empty object or `0`, is a colour the user already carries. Every other
/// attribute is kept verbatim in `attributes` so writes never drop fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Value>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            colors: None,
            attributes: Map::new(),
        }
    }

    /// Set a plain attribute (chainable)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key == COLORS_FIELD {
            self.colors = Some(value.into()).filter(|v| !v.is_null());
        } else {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Build a record from a stored document body. The document id lives
    /// outside the body; an `id` key inside it is ignored.
    pub fn from_document(id: impl Into<String>, document: Value) -> Result<Self, StoreError> {
        let id = id.into();
        let Value::Object(mut attributes) = document else {
            return Err(StoreError::MalformedRecord(id));
        };

        attributes.remove("id");
        let colors = match attributes.remove(COLORS_FIELD) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        };

        Ok(Self { id, colors, attributes })
    }

    /// Document body written back to the store (everything except the id)
    pub fn to_document(&self) -> Value {
        let mut body = self.attributes.clone();
        if let Some(colors) = &self.colors {
            body.insert(COLORS_FIELD.to_string(), colors.clone());
        }
        Value::Object(body)
    }

    pub fn username(&self) -> Option<&str> {
        self.attributes.get("username").and_then(Value::as_str)
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Palette index, when the colour attribute carries a numeric one
    pub fn color_id(&self) -> Option<u32> {
        self.colors
            .as_ref()?
            .get(COLOR_ID_FIELD)?
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
    }

    pub fn set_color_id(&mut self, color_id: u32) -> &mut Self {
        self.colors = Some(json!({ COLOR_ID_FIELD: color_id }));
        self
    }
}
