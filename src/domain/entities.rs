//! Content documents mirrored from the CMS.
//!
//! GROQ projections emit `null` for fields a document does not carry and for
//! dangling references, so optional and collection fields here tolerate
//! `null`; collections drop `null` entries.

use serde::{Deserialize, Deserializer};
use time::OffsetDateTime;

use super::portable_text::PortableText;
use super::slug::Slug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    pub slug: Slug,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "present_items")]
    pub categories: Vec<Category>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub body: PortableText,
    #[serde(default)]
    pub seo_description: Option<String>,
}

impl Post {
    /// Publication time, falling back to creation time for unpublished drafts.
    pub fn published_or_created(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(self.created_at)
    }

    /// SEO description when present and non-blank, otherwise the title.
    pub fn description(&self) -> &str {
        non_blank(self.seo_description.as_deref()).unwrap_or(&self.title)
    }

    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|author| non_blank(Some(author.name.as_str())))
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TekTip {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
    pub slug: Slug,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub tutorial_content: PortableText,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default, deserialize_with = "related_items")]
    pub related_teks: Vec<RelatedTekTip>,
}

impl TekTip {
    pub fn published_or_created(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(self.created_at)
    }

    pub fn description(&self) -> &str {
        non_blank(self.seo_description.as_deref()).unwrap_or(&self.question)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub slug: Option<Slug>,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedTekTip {
    pub id: String,
    pub question: String,
    pub slug: Slug,
}

#[derive(Deserialize)]
struct RawRelatedTekTip {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    question: String,
    #[serde(default, deserialize_with = "lenient_slug")]
    slug: Option<Slug>,
}

/// Reference to an image asset plus its alt text.
///
/// The asset id comes from `asset._ref`, or from `asset._id` when the query
/// dereferenced the asset document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RawImage")]
pub struct ImageRef {
    asset_ref: Option<String>,
    alt: Option<String>,
}

impl ImageRef {
    pub fn new(asset_ref: impl Into<String>) -> Self {
        Self {
            asset_ref: Some(asset_ref.into()),
            alt: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// The asset identifier, if the reference resolved to one.
    pub fn asset_ref(&self) -> Option<&str> {
        non_blank(self.asset_ref.as_deref())
    }

    pub fn alt(&self) -> Option<&str> {
        non_blank(self.alt.as_deref())
    }
}

#[derive(Deserialize)]
struct RawImage {
    #[serde(default)]
    asset: Option<RawAsset>,
    #[serde(default)]
    alt: Option<String>,
}

#[derive(Deserialize)]
struct RawAsset {
    #[serde(rename = "_ref", default)]
    reference: Option<String>,
    #[serde(rename = "_id", default)]
    id: Option<String>,
}

impl From<RawImage> for ImageRef {
    fn from(raw: RawImage) -> Self {
        let asset_ref = raw.asset.and_then(|asset| asset.reference.or(asset.id));
        Self {
            asset_ref,
            alt: raw.alt,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn present_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

/// Related tutorials without a usable slug cannot be linked and are dropped.
fn related_items<'de, D>(deserializer: D) -> Result<Vec<RelatedTekTip>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<RawRelatedTekTip> = present_items(deserializer)?;
    Ok(items
        .into_iter()
        .filter_map(|raw| {
            Some(RelatedTekTip {
                id: raw.id,
                question: raw.question,
                slug: raw.slug?,
            })
        })
        .collect())
}

fn lenient_slug<'de, D>(deserializer: D) -> Result<Option<Slug>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| Slug::deserialize(value).ok())
        .filter(|slug| !slug.as_str().trim().is_empty()))
}
