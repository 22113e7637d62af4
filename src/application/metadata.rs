//! Page metadata: titles, descriptions and social images.

use crate::application::image::ImageUrlBuilder;
use crate::domain::entities::{ImageRef, Post, TekTip};
use crate::presentation::views::PageMetaView;

pub const SITE_NAME: &str = "Mycelial FunGuy";
pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;

const HOME_DESCRIPTION: &str = "Your psychedelic portal to the world of mushroom cultivation: guides, insights and tutorials from Mycelial FunGuy.";
const BLOG_TITLE: &str = "Mycelial FunGuy Blog - Latest Musings";
const BLOG_DESCRIPTION: &str =
    "Explore the latest articles and insights on mushroom cultivation from Mycelial FunGuy.";
const TEKS_TITLE: &str = "Mycelial FunGuy Teks & Tips - Cultivation Tutorials";
const TEKS_DESCRIPTION: &str =
    "Find step-by-step guides, tutorials, and essential tips for successful mushroom cultivation.";
const ABOUT_TITLE: &str = "About Your Friendly Mycelial FunGuy";
const ABOUT_DESCRIPTION: &str =
    "Meet the FunGuy behind Mycelial FunGuy and the passion for fungi that grew this site.";

fn static_meta(title: &str, description: &str) -> PageMetaView {
    PageMetaView {
        title: title.to_string(),
        description: description.to_string(),
        og_title: title.to_string(),
        og_description: description.to_string(),
        og_image: None,
        canonical: String::new(),
    }
}

pub fn home_meta() -> PageMetaView {
    static_meta(SITE_NAME, HOME_DESCRIPTION)
}

pub fn post_listing_meta() -> PageMetaView {
    static_meta(BLOG_TITLE, BLOG_DESCRIPTION)
}

pub fn tutorial_listing_meta() -> PageMetaView {
    static_meta(TEKS_TITLE, TEKS_DESCRIPTION)
}

pub fn about_meta() -> PageMetaView {
    static_meta(ABOUT_TITLE, ABOUT_DESCRIPTION)
}

pub fn not_found_meta() -> PageMetaView {
    static_meta(&format!("Page Not Found - {SITE_NAME}"), HOME_DESCRIPTION)
}

/// Metadata for a single post: `{title} - Mycelial FunGuy Blog`.
pub fn post_meta(post: &Post, images: &ImageUrlBuilder) -> PageMetaView {
    let description = post.description().to_string();
    PageMetaView {
        title: format!("{} - Mycelial FunGuy Blog", post.title),
        og_title: post.title.clone(),
        og_description: description.clone(),
        description,
        og_image: social_image(post.main_image.as_ref(), images),
        canonical: String::new(),
    }
}

/// Metadata for a single tutorial: `{question} - Mycelial FunGuy Teks & Tips`.
pub fn tutorial_meta(tip: &TekTip, images: &ImageUrlBuilder) -> PageMetaView {
    let description = tip.description().to_string();
    PageMetaView {
        title: format!("{} - Mycelial FunGuy Teks & Tips", tip.question),
        og_title: tip.question.clone(),
        og_description: description.clone(),
        description,
        og_image: social_image(tip.main_image.as_ref(), images),
        canonical: String::new(),
    }
}

fn social_image(image: Option<&ImageRef>, images: &ImageUrlBuilder) -> Option<String> {
    images
        .image(image?)
        .width(OG_IMAGE_WIDTH)
        .height(OG_IMAGE_HEIGHT)
        .url()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn post(value: serde_json::Value) -> Post {
        serde_json::from_value(value).expect("post")
    }

    #[test]
    fn post_meta_uses_seo_description_and_social_image() {
        let post = post(json!({
            "_id": "p1",
            "_createdAt": "2024-02-01T00:00:00Z",
            "title": "Monotub Basics",
            "slug": { "current": "monotub-basics" },
            "mainImage": { "asset": { "_ref": "image-abc-2000x1000-jpg" } },
            "seoDescription": "Build your first monotub"
        }));
        let meta = post_meta(&post, &ImageUrlBuilder::new("proj", "production"));

        assert_eq!(meta.title, "Monotub Basics - Mycelial FunGuy Blog");
        assert_eq!(meta.og_title, "Monotub Basics");
        assert_eq!(meta.description, "Build your first monotub");
        assert_eq!(
            meta.og_image.as_deref(),
            Some("https://cdn.sanity.io/images/proj/production/abc-2000x1000.jpg?w=1200&h=630")
        );
    }

    #[test]
    fn post_meta_falls_back_to_title_without_image() {
        let post = post(json!({
            "_id": "p1",
            "_createdAt": "2024-02-01T00:00:00Z",
            "title": "Spore Syringes",
            "slug": "spore-syringes"
        }));
        let meta = post_meta(&post, &ImageUrlBuilder::new("proj", "production"));
        assert_eq!(meta.description, "Spore Syringes");
        assert!(meta.og_image.is_none());
    }

    #[test]
    fn listing_titles_are_fixed() {
        assert_eq!(post_listing_meta().title, "Mycelial FunGuy Blog - Latest Musings");
        assert_eq!(
            tutorial_listing_meta().title,
            "Mycelial FunGuy Teks & Tips - Cultivation Tutorials"
        );
    }
}
