//! GROQ queries for every page kind.
//!
//! Listing projections omit rich-text fields; detail projections include
//! them. Single-document queries end in `[0]` and yield `null` when nothing
//! matches the `$slug` parameter.

pub const HOME_POSTS_QUERY: &str = r#"*[_type == "post" && defined(slug.current)] | order(publishedAt desc) {
  _id,
  _createdAt,
  title,
  slug,
  mainImage{asset->{_ref, _id}, alt},
  author->{_id, name, slug, image{asset->{_ref, _id}, alt}},
  categories[]->{_id, title},
  publishedAt,
  seoDescription
}"#;

pub const HOME_TEK_TIPS_QUERY: &str = r#"*[_type == "tekTip" && defined(slug.current)] | order(publishedAt desc) {
  _id,
  _createdAt,
  question,
  slug,
  mainImage{asset->{_ref, _id}, alt},
  publishedAt,
  seoDescription
}"#;

pub const ALL_POSTS_QUERY: &str = r#"*[_type == "post" && defined(slug.current)] | order(publishedAt desc) {
  _id,
  _createdAt,
  title,
  slug,
  mainImage{asset->{_ref, _id}, alt},
  author->{_id, name, slug},
  categories[]->{_id, title},
  publishedAt,
  seoDescription
}"#;

pub const SINGLE_POST_QUERY: &str = r#"*[_type == "post" && slug.current == $slug][0] {
  _id,
  _createdAt,
  title,
  slug,
  mainImage{asset->{_ref, _id}, alt},
  author->{_id, name, slug, image{asset->{_ref, _id}, alt}},
  categories[]->{_id, title},
  publishedAt,
  body,
  seoDescription
}"#;

pub const ALL_TEK_TIPS_QUERY: &str = r#"*[_type == "tekTip" && defined(slug.current)] | order(publishedAt desc) {
  _id,
  _createdAt,
  question,
  slug,
  publishedAt,
  seoDescription
}"#;

pub const SINGLE_TEK_TIP_QUERY: &str = r#"*[_type == "tekTip" && slug.current == $slug][0] {
  _id,
  _createdAt,
  question,
  slug,
  mainImage{asset->{_ref, _id}, alt},
  publishedAt,
  tutorialContent,
  seoDescription,
  relatedTeks[]->{_id, question, slug}
}"#;

pub const POST_SLUGS_QUERY: &str =
    r#"*[_type == "post" && defined(slug.current)][].slug.current"#;

pub const TEK_TIP_SLUGS_QUERY: &str =
    r#"*[_type == "tekTip" && defined(slug.current)][].slug.current"#;

/// Name of the parameter bound by the single-document queries.
pub const SLUG_PARAM: &str = "slug";
