//! Domain model for restaurant records as served by the directory API.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A restaurant record, keyed by `id`.
///
/// Server fields are refreshed wholesale on every fetch; the only field
/// mutated locally is `is_favorite`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub neighborhood: String,
    pub cuisine_type: String,
    pub address: String,
    pub latlng: LatLng,
    /// Logical photo name without size/format suffix. Some upstream records
    /// omit it, in which case the id doubles as the photo name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photograph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub is_favorite: FavoriteFlag,
}

impl Restaurant {
    /// Origin-relative image path for this restaurant, without the
    /// `.{width}w.{format}` suffix the responsive markup appends.
    pub fn image_path(&self) -> String {
        match self.photograph {
            Some(ref name) => format!("/img/{}", name),
            None => format!("/img/{}", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Favorite marker for a restaurant.
///
/// The upstream API stores this as the literal strings `"true"` / `"false"`,
/// but some server versions hand back a real boolean. Serialization always
/// emits the string form; deserialization accepts both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FavoriteFlag(pub bool);

impl FavoriteFlag {
    pub fn is_set(self) -> bool {
        self.0
    }

    pub fn toggled(self) -> Self {
        FavoriteFlag(!self.0)
    }

    /// The wire representation, also used as the `is_favorite` query value.
    pub fn as_str(self) -> &'static str {
        if self.0 {
            "true"
        } else {
            "false"
        }
    }
}

impl fmt::Display for FavoriteFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FavoriteFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FavoriteFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FlagVisitor;

        impl Visitor<'_> for FlagVisitor {
            type Value = FavoriteFlag;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"true\", \"false\", or a boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<FavoriteFlag, E> {
                Ok(FavoriteFlag(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FavoriteFlag, E> {
                match v {
                    "true" => Ok(FavoriteFlag(true)),
                    "false" => Ok(FavoriteFlag(false)),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(FlagVisitor)
    }
}
