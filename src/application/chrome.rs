use time::OffsetDateTime;

use crate::presentation::views::{
    BrandView, FooterView, LayoutChrome, NavigationLinkView, NavigationView, PageMetaView,
};

const NAVIGATION: [(&str, &str); 3] = [
    ("Blog", "/blog"),
    ("Teks & Tips", "/teks-tips"),
    ("About", "/about"),
];

/// Builds the shared page chrome: brand, navigation, footer and canonical
/// URLs.
#[derive(Clone, Debug)]
pub struct ChromeService {
    brand_title: String,
    public_site_url: String,
}

impl ChromeService {
    pub fn new(brand_title: impl Into<String>, public_site_url: &str) -> Self {
        Self {
            brand_title: brand_title.into(),
            public_site_url: normalize_public_site_url(public_site_url),
        }
    }

    pub fn public_site_url(&self) -> &str {
        &self.public_site_url
    }

    /// Absolute URL for a site path.
    pub fn canonical_url(&self, path: &str) -> String {
        let base = self.public_site_url.trim_end_matches('/');
        if path.is_empty() || path == "/" {
            format!("{base}/")
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn layout(&self, meta: PageMetaView, path: &str) -> LayoutChrome {
        let entries = NAVIGATION
            .iter()
            .map(|(label, href)| NavigationLinkView {
                label: (*label).to_string(),
                href: (*href).to_string(),
                is_active: path == *href || path.starts_with(&format!("{href}/")),
            })
            .collect();

        LayoutChrome {
            brand: BrandView {
                title: self.brand_title.clone(),
                href: "/".to_string(),
            },
            navigation: NavigationView { entries },
            footer: FooterView {
                copy: format!(
                    "© {} {}. All rights reserved.",
                    OffsetDateTime::now_utc().year(),
                    self.brand_title
                ),
            },
            meta: meta.with_canonical(self.canonical_url(path)),
        }
    }
}

fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    format!("{trimmed}/")
}
