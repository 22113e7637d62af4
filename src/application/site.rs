//! Page-level operations over the Content Client.
//!
//! Each operation issues fixed queries, decodes typed documents, renders rich
//! text and returns view models with their page metadata. Detail operations
//! return `Ok(None)` for unknown slugs.

use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use time::{
    OffsetDateTime,
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};
use tracing::{info, warn};

use crate::application::{
    content::{ContentClient, QueryParams, Revalidate},
    error::AppError,
    image::ImageUrlBuilder,
    metadata, queries,
    render::{PortableTextRenderer, SiteRules},
};
use crate::domain::entities::{ImageRef, Post, TekTip};
use crate::domain::slug::Slug;
use crate::presentation::views::{
    AboutView, HomeView, ImageView, Page, PostCardView, PostDetailView, PostListingView,
    RelatedLinkView, TekTipCardView, TekTipDetailView, TekTipListingView,
};

const SOURCE: &str = "application::site::SiteService";

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

const CARD_IMAGE_WIDTH: u32 = 500;
const CARD_IMAGE_HEIGHT: u32 = 300;
const HERO_IMAGE_WIDTH: u32 = 1000;
const HERO_IMAGE_HEIGHT: u32 = 600;

/// Site routes listed in the sitemap besides individual documents.
const STATIC_PATHS: [&str; 4] = ["/", "/blog", "/teks-tips", "/about"];

#[derive(Clone)]
pub struct SiteService {
    content: ContentClient,
    renderer: Arc<PortableTextRenderer>,
    images: ImageUrlBuilder,
    post_rules: SiteRules,
    tutorial_rules: SiteRules,
    revalidate: Revalidate,
}

/// Documents fetched by [`SiteService::warm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
    pub posts: usize,
    pub tek_tips: usize,
}

impl SiteService {
    pub fn new(content: ContentClient, images: ImageUrlBuilder, revalidate: Revalidate) -> Self {
        Self {
            content,
            renderer: Arc::new(PortableTextRenderer::new()),
            post_rules: SiteRules::for_posts(images.clone()),
            tutorial_rules: SiteRules::for_tutorials(images.clone()),
            images,
            revalidate,
        }
    }

    pub fn revalidate(&self) -> Revalidate {
        self.revalidate
    }

    /// Latest posts and tutorials, fetched concurrently.
    pub async fn home(&self) -> Result<Page<HomeView>, AppError> {
        let no_params = QueryParams::new();
        let (posts, tek_tips) = tokio::try_join!(
            self.content
                .fetch::<Vec<Post>>(queries::HOME_POSTS_QUERY, &no_params, self.revalidate),
            self.content
                .fetch::<Vec<TekTip>>(queries::HOME_TEK_TIPS_QUERY, &no_params, self.revalidate),
        )?;

        Ok(Page {
            meta: metadata::home_meta(),
            content: HomeView {
                posts: posts.iter().map(|post| self.post_card(post)).collect(),
                tek_tips: tek_tips.iter().map(tek_tip_card).collect(),
            },
        })
    }

    pub async fn posts(&self) -> Result<Vec<Post>, AppError> {
        Ok(self
            .content
            .fetch(queries::ALL_POSTS_QUERY, &QueryParams::new(), self.revalidate)
            .await?)
    }

    pub async fn post_listing(&self) -> Result<Page<PostListingView>, AppError> {
        let posts = self.posts().await?;
        Ok(Page {
            meta: metadata::post_listing_meta(),
            content: PostListingView {
                posts: posts.iter().map(|post| self.post_card(post)).collect(),
            },
        })
    }

    /// The post whose slug equals `slug`, if any.
    pub async fn post(&self, slug: &Slug) -> Result<Option<Post>, AppError> {
        let params = QueryParams::new().with(queries::SLUG_PARAM, slug.as_str());
        Ok(self
            .content
            .fetch(queries::SINGLE_POST_QUERY, &params, self.revalidate)
            .await?)
    }

    pub async fn post_detail(&self, slug: &Slug) -> Result<Option<Page<PostDetailView>>, AppError> {
        let Some(post) = self.post(slug).await? else {
            return Ok(None);
        };

        let published_at = post.published_or_created();
        let view = PostDetailView {
            title: post.title.clone(),
            author: post.author_name().to_string(),
            published: format_human_date(published_at),
            iso_date: format_iso_date(published_at),
            categories: post
                .categories
                .iter()
                .map(|category| category.title.clone())
                .filter(|title| !title.is_empty())
                .collect(),
            hero: self.image_view(
                post.main_image.as_ref(),
                &post.title,
                HERO_IMAGE_WIDTH,
                HERO_IMAGE_HEIGHT,
            ),
            body_html: self.renderer.render(&post.body, &self.post_rules),
        };

        Ok(Some(Page {
            meta: metadata::post_meta(&post, &self.images),
            content: view,
        }))
    }

    pub async fn tek_tips(&self) -> Result<Vec<TekTip>, AppError> {
        Ok(self
            .content
            .fetch(queries::ALL_TEK_TIPS_QUERY, &QueryParams::new(), self.revalidate)
            .await?)
    }

    pub async fn tutorial_listing(&self) -> Result<Page<TekTipListingView>, AppError> {
        let tek_tips = self.tek_tips().await?;
        Ok(Page {
            meta: metadata::tutorial_listing_meta(),
            content: TekTipListingView {
                tek_tips: tek_tips.iter().map(tek_tip_card).collect(),
            },
        })
    }

    /// The tutorial whose slug equals `slug`, if any.
    pub async fn tek_tip(&self, slug: &Slug) -> Result<Option<TekTip>, AppError> {
        let params = QueryParams::new().with(queries::SLUG_PARAM, slug.as_str());
        Ok(self
            .content
            .fetch(queries::SINGLE_TEK_TIP_QUERY, &params, self.revalidate)
            .await?)
    }

    pub async fn tutorial_detail(
        &self,
        slug: &Slug,
    ) -> Result<Option<Page<TekTipDetailView>>, AppError> {
        let Some(tip) = self.tek_tip(slug).await? else {
            return Ok(None);
        };

        let published_at = tip.published_or_created();
        let view = TekTipDetailView {
            question: tip.question.clone(),
            published: format_human_date(published_at),
            iso_date: format_iso_date(published_at),
            hero: self.image_view(
                tip.main_image.as_ref(),
                &tip.question,
                HERO_IMAGE_WIDTH,
                HERO_IMAGE_HEIGHT,
            ),
            content_html: self
                .renderer
                .render(&tip.tutorial_content, &self.tutorial_rules),
            related: tip
                .related_teks
                .iter()
                .map(|related| RelatedLinkView {
                    href: tek_tip_path(&related.slug),
                    label: related.question.clone(),
                })
                .collect(),
        };

        Ok(Some(Page {
            meta: metadata::tutorial_meta(&tip, &self.images),
            content: view,
        }))
    }

    pub fn about(&self) -> Page<AboutView> {
        let meta = metadata::about_meta();
        Page {
            content: AboutView {
                title: meta.title.clone(),
            },
            meta,
        }
    }

    pub async fn post_slugs(&self) -> Result<Vec<Slug>, AppError> {
        Ok(self
            .content
            .fetch(queries::POST_SLUGS_QUERY, &QueryParams::new(), self.revalidate)
            .await?)
    }

    pub async fn tek_tip_slugs(&self) -> Result<Vec<Slug>, AppError> {
        Ok(self
            .content
            .fetch(queries::TEK_TIP_SLUGS_QUERY, &QueryParams::new(), self.revalidate)
            .await?)
    }

    /// Sitemap of static routes plus every post and tutorial.
    pub async fn sitemap_xml(&self, public_site_url: &str) -> Result<String, AppError> {
        let (post_slugs, tek_tip_slugs) = tokio::try_join!(self.post_slugs(), self.tek_tip_slugs())?;

        let base = public_site_url.trim_end_matches('/');
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        let paths = STATIC_PATHS
            .iter()
            .map(|path| (*path).to_string())
            .chain(post_slugs.iter().map(post_path))
            .chain(tek_tip_slugs.iter().map(tek_tip_path));
        for path in paths {
            let loc = if path == "/" {
                format!("{base}/")
            } else {
                format!("{base}{path}")
            };
            xml.push_str(&format!(
                "  <url><loc>{}</loc></url>\n",
                crate::application::render::escape_html(&loc)
            ));
        }
        xml.push_str("</urlset>\n");
        Ok(xml)
    }

    /// Prefetch every listing and detail query so the first visitors are
    /// served from cache.
    pub async fn warm(&self) -> Result<WarmReport, AppError> {
        let (post_slugs, tek_tip_slugs) = tokio::try_join!(self.post_slugs(), self.tek_tip_slugs())?;
        tokio::try_join!(self.home(), self.post_listing(), self.tutorial_listing())?;

        let mut report = WarmReport::default();
        for slug in &post_slugs {
            match self.post(slug).await {
                Ok(Some(_)) => report.posts += 1,
                Ok(None) => {}
                Err(err) => warn!(target = SOURCE, slug = %slug, error = %err, "Failed to warm post"),
            }
        }
        for slug in &tek_tip_slugs {
            match self.tek_tip(slug).await {
                Ok(Some(_)) => report.tek_tips += 1,
                Ok(None) => {}
                Err(err) => {
                    warn!(target = SOURCE, slug = %slug, error = %err, "Failed to warm tutorial")
                }
            }
        }

        info!(
            target = SOURCE,
            posts = report.posts,
            tek_tips = report.tek_tips,
            "Content cache warmed"
        );
        Ok(report)
    }

    fn post_card(&self, post: &Post) -> PostCardView {
        let published_at = post.published_or_created();
        PostCardView {
            href: post_path(&post.slug),
            title: post.title.clone(),
            author: post.author_name().to_string(),
            published: format_human_date(published_at),
            iso_date: format_iso_date(published_at),
            description: post
                .seo_description
                .clone()
                .filter(|text| !text.trim().is_empty()),
            image: self.image_view(
                post.main_image.as_ref(),
                &post.title,
                CARD_IMAGE_WIDTH,
                CARD_IMAGE_HEIGHT,
            ),
        }
    }

    fn image_view(
        &self,
        image: Option<&ImageRef>,
        fallback_alt: &str,
        width: u32,
        height: u32,
    ) -> Option<ImageView> {
        let image = image?;
        let src = self.images.image(image).width(width).height(height).url()?;
        Some(ImageView {
            src,
            alt: image.alt().unwrap_or(fallback_alt).to_string(),
            width,
            height,
        })
    }
}

fn tek_tip_card(tip: &TekTip) -> TekTipCardView {
    TekTipCardView {
        href: tek_tip_path(&tip.slug),
        question: tip.question.clone(),
        description: tip
            .seo_description
            .clone()
            .filter(|text| !text.trim().is_empty()),
    }
}

/// Characters kept verbatim in a slug path segment (RFC 3986 unreserved).
const SLUG_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn post_path(slug: &Slug) -> String {
    format!("/blog/{}", utf8_percent_encode(slug.as_str(), SLUG_SEGMENT))
}

pub fn tek_tip_path(slug: &Slug) -> String {
    format!("/teks-tips/{}", utf8_percent_encode(slug.as_str(), SLUG_SEGMENT))
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value.date().format(HUMAN_DATE_FORMAT).unwrap_or_default()
}

pub fn format_iso_date(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_default()
}
