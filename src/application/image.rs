//! Image CDN URL construction.
//!
//! Asset references look like `image-{id}-{width}x{height}-{format}`. URLs
//! are a pure function of the reference, the requested transform and the
//! project/dataset pair.

use url::Url;

use crate::application::content::ContentStoreConfig;
use crate::domain::entities::ImageRef;

const CDN_ORIGIN: &str = "https://cdn.sanity.io/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    Clip,
    Crop,
    Fill,
    FillMax,
    Max,
    Scale,
    Min,
}

impl FitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Clip => "clip",
            FitMode::Crop => "crop",
            FitMode::Fill => "fill",
            FitMode::FillMax => "fillmax",
            FitMode::Max => "max",
            FitMode::Scale => "scale",
            FitMode::Min => "min",
        }
    }
}

/// A parsed image asset reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetId<'a> {
    pub id: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: &'a str,
}

impl<'a> AssetId<'a> {
    pub fn parse(reference: &'a str) -> Option<Self> {
        let rest = reference.strip_prefix("image-")?;
        let mut parts = rest.rsplitn(3, '-');
        let format = parts.next()?;
        let dimensions = parts.next()?;
        let id = parts.next()?;
        let (width, height) = dimensions.split_once('x')?;
        let width = width.parse().ok()?;
        let height = height.parse().ok()?;
        if id.is_empty() || format.is_empty() {
            return None;
        }
        Some(Self {
            id,
            width,
            height,
            format,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    pub fn from_config(config: &ContentStoreConfig) -> Self {
        Self::new(config.project_id.clone(), config.dataset.clone())
    }

    pub fn image<'a>(&'a self, image: &'a ImageRef) -> ImageTransform<'a> {
        ImageTransform {
            builder: self,
            asset_ref: image.asset_ref(),
            width: None,
            height: None,
            fit: None,
        }
    }
}

/// A pending URL for one image with its requested transform.
#[derive(Debug, Clone, Copy)]
pub struct ImageTransform<'a> {
    builder: &'a ImageUrlBuilder,
    asset_ref: Option<&'a str>,
    width: Option<u32>,
    height: Option<u32>,
    fit: Option<FitMode>,
}

impl ImageTransform<'_> {
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn fit(mut self, fit: FitMode) -> Self {
        self.fit = Some(fit);
        self
    }

    /// `None` when the image has no asset or the reference does not parse.
    pub fn url(&self) -> Option<String> {
        let asset = AssetId::parse(self.asset_ref?)?;
        let file = format!(
            "{}-{}x{}.{}",
            asset.id, asset.width, asset.height, asset.format
        );

        let mut url = Url::parse(CDN_ORIGIN).ok()?;
        url.path_segments_mut().ok()?.pop_if_empty().extend([
            "images",
            self.builder.project_id.as_str(),
            self.builder.dataset.as_str(),
            file.as_str(),
        ]);

        let mut transform = Vec::new();
        if let Some(width) = self.width {
            transform.push(("w", width.to_string()));
        }
        if let Some(height) = self.height {
            transform.push(("h", height.to_string()));
        }
        if let Some(fit) = self.fit {
            transform.push(("fit", fit.as_str().to_string()));
        }
        if !transform.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &transform {
                pairs.append_pair(name, value);
            }
        }
        Some(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REF: &str = "image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg";

    fn builder() -> ImageUrlBuilder {
        ImageUrlBuilder::new("proj", "production")
    }

    #[test]
    fn builds_cdn_url_with_transform() {
        let image = ImageRef::new(REF);
        let url = builder()
            .image(&image)
            .width(800)
            .height(500)
            .fit(FitMode::Max)
            .url();
        assert_eq!(
            url.as_deref(),
            Some(
                "https://cdn.sanity.io/images/proj/production/Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000.jpg?w=800&h=500&fit=max"
            )
        );
    }

    #[test]
    fn url_is_a_pure_function_of_inputs() {
        let image = ImageRef::new(REF);
        let first = builder().image(&image).width(1200).height(630).url();
        let second = builder().image(&image).width(1200).height(630).url();
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn untransformed_url_has_no_query() {
        let image = ImageRef::new("image-abc-10x20-png");
        assert_eq!(
            builder().image(&image).url().as_deref(),
            Some("https://cdn.sanity.io/images/proj/production/abc-10x20.png")
        );
    }

    #[test]
    fn unparseable_or_missing_refs_yield_none() {
        assert!(builder().image(&ImageRef::default()).url().is_none());
        assert!(builder().image(&ImageRef::new("file-abc-pdf")).url().is_none());
        assert!(builder().image(&ImageRef::new("image-abc-wide-png")).url().is_none());
        assert!(AssetId::parse("image--10x10-png").is_none());
    }

    #[test]
    fn project_and_dataset_stay_inside_their_path_segments() {
        let image = ImageRef::new("image-abc-1x1-png");
        let url = ImageUrlBuilder::new("proj", "my set?x=1")
            .image(&image)
            .width(10)
            .fit(FitMode::Max)
            .url()
            .expect("url");
        assert_eq!(
            url,
            "https://cdn.sanity.io/images/proj/my%20set%3Fx=1/abc-1x1.png?w=10&fit=max"
        );
    }

    #[test]
    fn ids_with_dashes_are_preserved() {
        let asset = AssetId::parse("image-a-b-c-4x3-webp").expect("asset id");
        assert_eq!(asset.id, "a-b-c");
        assert_eq!((asset.width, asset.height), (4, 3));
        assert_eq!(asset.format, "webp");
    }
}
