use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlogPost {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BlogPost {
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(&self.title),
            "content" => Some(&self.content),
            "author" => Some(&self.author),
            _ => None,
        }
    }
}

/// Body of a create request. Every field is optional here so that
/// validation can report all missing fields at once.
#[derive(Debug, Default)]
pub struct NewBlogPost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBlogPost {
    pub title: String,
    pub content: String,
    pub author: String,
}

/// Body of an update request. Unknown keys are ignored.
#[derive(Debug, Default)]
pub struct BlogPostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
}

/// Takes a post field out of a request object. `null` counts as absent;
/// any other non-string value rejects the whole body.
fn take_text(body: &mut Map<String, Value>, field: &str) -> Result<Option<String>> {
    match body.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(Error::InvalidJson),
    }
}

impl TryFrom<Map<String, Value>> for NewBlogPost {
    type Error = Error;

    /// An empty object is not a post at all.
    fn try_from(mut body: Map<String, Value>) -> Result<Self> {
        if body.is_empty() {
            return Err(Error::InvalidJson);
        }
        Ok(Self {
            title: take_text(&mut body, "title")?,
            content: take_text(&mut body, "content")?,
            author: take_text(&mut body, "author")?,
        })
    }
}

impl TryFrom<Map<String, Value>> for BlogPostPatch {
    type Error = Error;

    fn try_from(mut body: Map<String, Value>) -> Result<Self> {
        Ok(Self {
            title: take_text(&mut body, "title")?,
            content: take_text(&mut body, "content")?,
            author: take_text(&mut body, "author")?,
        })
    }
}

/// Search criteria taken from the query string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
}

impl SearchQuery {
    pub fn criteria(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("title", self.title.as_deref()),
            ("content", self.content.as_deref()),
            ("author", self.author.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|value| (field, value)))
    }
}

/// Raw `sort`/`direction` query parameters of the listing endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

/// Timestamps are written as RFC 3339. Naive ISO 8601 values without an
/// offset are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp `{raw}`"))),
                None => Ok(None),
            }
        }
    }
}
