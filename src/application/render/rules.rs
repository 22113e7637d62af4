use tracing::debug;

use crate::application::image::{FitMode, ImageUrlBuilder};
use crate::domain::entities::ImageRef;
use crate::domain::portable_text::{BlockStyle, ListKind, Mark};

use super::escape_html;

pub const EMBED_IMAGE_WIDTH: u32 = 800;
pub const EMBED_IMAGE_HEIGHT: u32 = 500;

/// Rendering-rule table for portable text.
///
/// Each method receives already-rendered, escaped inner HTML and appends its
/// own wrapper to `out`.
pub trait RenderRules: Send + Sync {
    fn block(&self, style: BlockStyle, content: &str, out: &mut String);
    fn list(&self, kind: ListKind, items: &str, out: &mut String);
    fn list_item(&self, kind: ListKind, content: &str, out: &mut String);
    fn mark(&self, mark: &Mark, content: &str, out: &mut String);
    fn image(&self, image: &ImageRef, out: &mut String);
}

/// The site's rendering rules. Only the image alt fallback differs between
/// blog posts and tutorials.
#[derive(Debug, Clone)]
pub struct SiteRules {
    images: ImageUrlBuilder,
    image_alt_fallback: &'static str,
}

impl SiteRules {
    pub fn for_posts(images: ImageUrlBuilder) -> Self {
        Self {
            images,
            image_alt_fallback: "Post image",
        }
    }

    pub fn for_tutorials(images: ImageUrlBuilder) -> Self {
        Self {
            images,
            image_alt_fallback: "Tutorial image",
        }
    }
}

impl RenderRules for SiteRules {
    fn block(&self, style: BlockStyle, content: &str, out: &mut String) {
        let tag = match style {
            BlockStyle::H1 => "h1",
            BlockStyle::H2 => "h2",
            BlockStyle::H3 => "h3",
            BlockStyle::Blockquote => "blockquote",
            BlockStyle::Normal => "p",
        };
        wrap(tag, content, out);
    }

    fn list(&self, kind: ListKind, items: &str, out: &mut String) {
        let tag = match kind {
            ListKind::Bullet => "ul",
            ListKind::Number => "ol",
        };
        wrap(tag, items, out);
    }

    fn list_item(&self, _kind: ListKind, content: &str, out: &mut String) {
        wrap("li", content, out);
    }

    fn mark(&self, mark: &Mark, content: &str, out: &mut String) {
        match mark {
            Mark::Strong => wrap("strong", content, out),
            Mark::Em => wrap("em", content, out),
            Mark::Link { href: Some(href) } => {
                out.push_str("<a href=\"");
                out.push_str(&escape_html(href));
                out.push('"');
                if !href.starts_with('/') {
                    out.push_str(" rel=\"noreferrer noopener\"");
                }
                out.push('>');
                out.push_str(content);
                out.push_str("</a>");
            }
            Mark::Link { href: None } => out.push_str(content),
            Mark::Unknown(name) => {
                debug!(mark = %name, "Rendering unknown mark as plain content");
                out.push_str(content);
            }
        }
    }

    fn image(&self, image: &ImageRef, out: &mut String) {
        let Some(src) = self
            .images
            .image(image)
            .width(EMBED_IMAGE_WIDTH)
            .height(EMBED_IMAGE_HEIGHT)
            .fit(FitMode::Max)
            .url()
        else {
            return;
        };
        let alt = image.alt().unwrap_or(self.image_alt_fallback);
        out.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\" width=\"{EMBED_IMAGE_WIDTH}\" height=\"{EMBED_IMAGE_HEIGHT}\" loading=\"lazy\">",
            escape_html(&src),
            escape_html(alt),
        ));
    }
}

fn wrap(tag: &str, content: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(content);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
