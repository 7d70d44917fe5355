//! Envelope normalization for Strapi responses.
//!
//! Strapi payloads arrive in one of three shapes depending on the backend
//! version: a collection of records wrapped in `attributes` (v4), a flattened
//! collection (v5), or a singular record. The decode is an explicit tagged
//! union — classify the payload into one of those shapes, then run the shape
//! through its own extractor — so the renderer never touches raw JSON.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::article::{Article, Tag};

/// Normalize a raw CMS payload into a canonical [`Article`].
///
/// Returns `None` when no record matches (absent `data`, empty collection, or
/// an envelope that fits none of the known shapes). That is a designed
/// recoverable outcome, not an error: a bad article id is a normal request.
/// Pure over its input; does no I/O and no logging.
pub fn normalize(raw: Value) -> Option<Article> {
    let envelope: Envelope = serde_json::from_value(raw).ok()?;
    let record = match envelope {
        Envelope::Collection { data } => data.into_iter().next()?,
        Envelope::Single { data } => data,
    };
    Some(record.into_article())
}

/// The known envelope shapes. Wrapped (v4) and flattened (v5) collections
/// both deserialize into [`RawRecord`]; the distinction lives in whether the
/// record carries an `attributes` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Collection { data: Vec<RawRecord> },
    Single { data: RawRecord },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: i64,
    attributes: Option<RawFields>,
    #[serde(flatten)]
    inline: RawFields,
}

impl RawRecord {
    fn into_article(self) -> Article {
        // Mirrors the v4/v5 reconciliation rule: prefer the wrapped
        // `attributes` object, fall back to the record's own fields.
        let fields = self.attributes.unwrap_or(self.inline);

        Article {
            id: self.id,
            title: fields.title.unwrap_or_default(),
            content: fields.content.unwrap_or_default(),
            published_at: fields.published_at.unwrap_or_default(),
            updated_at: fields.updated_at.unwrap_or_default(),
            tags: fields.tags.map(RawTagList::into_tags).unwrap_or_default(),
            thumbnail_url: fields.thumbnail.and_then(RawThumbnail::into_url),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFields {
    title: Option<String>,
    content: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "updatedAt")]
    updated_at: Option<String>,
    tags: Option<RawTagList>,
    thumbnail: Option<RawThumbnail>,
}

/// Tag collections arrive either as a relational envelope
/// (`{data: [{id, attributes: {name}}]}`) or as a flat array
/// (`[{id, name}]`). Anything else degrades to an empty list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTagList {
    Relational { data: Vec<RawTag> },
    Flat(Vec<RawTag>),
    Malformed(Value),
}

impl RawTagList {
    fn into_tags(self) -> Vec<Tag> {
        let entries = match self {
            RawTagList::Relational { data } => data,
            RawTagList::Flat(entries) => entries,
            RawTagList::Malformed(_) => return Vec::new(),
        };

        entries
            .into_iter()
            .map(|tag| Tag {
                id: tag.id,
                name: tag
                    .attributes
                    .and_then(|attrs| attrs.name)
                    .or(tag.name)
                    .unwrap_or_default(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawTag {
    id: i64,
    #[serde(default)]
    attributes: Option<RawTagAttributes>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTagAttributes {
    #[serde(default)]
    name: Option<String>,
}

/// Thumbnail shapes observed across backends: a flat media array (v5), a
/// relational envelope holding one or many entries (v4), or a bare media
/// object. Resolution order inside an entry: medium-format nested URL first,
/// then the direct URL, then nothing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawThumbnail {
    Media(Vec<RawMediaEntry>),
    RelationalMany { data: Vec<RawMediaEntry> },
    RelationalOne { data: RawMediaEntry },
    Single(RawMediaEntry),
    Malformed(Value),
}

impl RawThumbnail {
    fn into_url(self) -> Option<String> {
        let entry = match self {
            RawThumbnail::Media(entries) | RawThumbnail::RelationalMany { data: entries } => {
                entries.into_iter().next()?
            }
            RawThumbnail::RelationalOne { data } | RawThumbnail::Single(data) => data,
            RawThumbnail::Malformed(_) => return None,
        };
        entry.into_url()
    }
}

#[derive(Debug, Deserialize)]
struct RawMediaEntry {
    #[serde(default)]
    attributes: Option<RawMedia>,
    #[serde(flatten)]
    inline: RawMedia,
}

impl RawMediaEntry {
    fn into_url(self) -> Option<String> {
        let media = self.attributes.unwrap_or(self.inline);
        media
            .formats
            .and_then(|formats| formats.medium)
            .and_then(|medium| medium.url)
            .or(media.url)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMedia {
    url: Option<String>,
    formats: Option<RawMediaFormats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMediaFormats {
    medium: Option<RawMediaFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMediaFormat {
    url: Option<String>,
}
