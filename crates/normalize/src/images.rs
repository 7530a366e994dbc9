//! Image fields and their responsive descriptors.
use indexmap::IndexMap;
use model::{FixedImage, FluidImage, ImageDimensions, ImageField, RawImage};

use crate::capabilities::ImageUrlBuilder;
use crate::config::{ImageParams, NormalizeConfig};

const FIXED_DENSITIES: [f64; 4] = [1.0, 1.5, 2.0, 3.0];
const FLUID_BREAKPOINTS: [f64; 6] = [0.25, 0.5, 1.0, 1.5, 2.0, 3.0];

/// Builds [`ImageField`]s from decoded raw images.
pub(crate) struct ImageBuilder<'a> {
    pub urls: &'a dyn ImageUrlBuilder,
    pub config: &'a NormalizeConfig,
}

impl ImageBuilder<'_> {
    pub fn image(&self, raw: &RawImage, thumbnails: IndexMap<String, ImageField>) -> ImageField {
        ImageField {
            url: self.urls.build_url(&raw.url, &self.config.image_params),
            alt: raw.alt.clone(),
            copyright: raw.copyright.clone(),
            dimensions: raw.dimensions,
            fixed: self.fixed(&raw.url, raw.dimensions),
            fluid: self.fluid(&raw.url, raw.dimensions),
            placeholder_url: self
                .urls
                .build_url(&raw.url, &self.config.placeholder_params),
            thumbnails,
        }
    }

    fn sized(&self, width: u32, height: u32) -> ImageParams {
        let mut params = self.config.image_params.clone();
        params.insert("w".into(), width.to_string());
        params.insert("h".into(), height.to_string());
        params
    }

    fn fixed(&self, url: &str, dims: ImageDimensions) -> FixedImage {
        let width = self.config.fixed_width.min(dims.width).max(1);
        let height = height_for(width, dims);
        let base = self.sized(width, height);

        let mut src_set = Vec::new();
        let mut src_set_webp = Vec::new();
        for density in FIXED_DENSITIES {
            if density > 1.0 && f64::from(width) * density > f64::from(dims.width) {
                continue;
            }
            let mut params = base.clone();
            params.insert("dpr".into(), density.to_string());
            src_set.push(format!("{} {density}x", self.urls.build_url(url, &params)));
            params.insert("fm".into(), "webp".into());
            src_set_webp.push(format!("{} {density}x", self.urls.build_url(url, &params)));
        }

        let mut webp = base.clone();
        webp.insert("fm".into(), "webp".into());
        FixedImage {
            width,
            height,
            src: self.urls.build_url(url, &base),
            src_set: src_set.join(", "),
            src_webp: self.urls.build_url(url, &webp),
            src_set_webp: src_set_webp.join(", "),
        }
    }

    fn fluid(&self, url: &str, dims: ImageDimensions) -> FluidImage {
        let max_width = self.config.fluid_max_width;
        let widths = fluid_widths(max_width, dims.width);

        let mut src_set = Vec::with_capacity(widths.len());
        let mut src_set_webp = Vec::with_capacity(widths.len());
        for width in &widths {
            let mut params = self.sized(*width, height_for(*width, dims));
            src_set.push(format!("{} {width}w", self.urls.build_url(url, &params)));
            params.insert("fm".into(), "webp".into());
            src_set_webp.push(format!("{} {width}w", self.urls.build_url(url, &params)));
        }

        let src_width = max_width.min(dims.width).max(1);
        let base = self.sized(src_width, height_for(src_width, dims));
        let mut webp = base.clone();
        webp.insert("fm".into(), "webp".into());
        FluidImage {
            aspect_ratio: aspect_ratio(dims),
            src: self.urls.build_url(url, &base),
            src_set: src_set.join(", "),
            src_webp: self.urls.build_url(url, &webp),
            src_set_webp: src_set_webp.join(", "),
            sizes: format!("(max-width: {max_width}px) 100vw, {max_width}px"),
        }
    }
}

fn aspect_ratio(dims: ImageDimensions) -> f64 {
    f64::from(dims.width.max(1)) / f64::from(dims.height.max(1))
}

fn height_for(width: u32, dims: ImageDimensions) -> u32 {
    (f64::from(width) / aspect_ratio(dims)).round().max(1.0) as u32
}

/// Breakpoint widths clamped to the source width. The source width itself is
/// added when any breakpoint had to be dropped.
fn fluid_widths(max_width: u32, source_width: u32) -> Vec<u32> {
    let source_width = source_width.max(1);
    let mut widths = Vec::with_capacity(FLUID_BREAKPOINTS.len() + 1);
    let mut clamped = false;
    for factor in FLUID_BREAKPOINTS {
        let width = (f64::from(max_width) * factor).round() as u32;
        if width == 0 {
            continue;
        }
        if width > source_width {
            clamped = true;
            continue;
        }
        widths.push(width);
    }
    if clamped || widths.is_empty() {
        widths.push(source_width);
    }
    widths.sort_unstable();
    widths.dedup();
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imgix::ImgixUrlBuilder;

    fn raw(width: u32, height: u32) -> RawImage {
        RawImage {
            url: "https://images.example/photo.jpg?auto=compress,format".into(),
            dimensions: ImageDimensions { width, height },
            alt: Some("A photo".into()),
            copyright: None,
        }
    }

    #[test]
    fn fluid_widths_clamp_to_source() {
        assert_eq!(fluid_widths(800, 5000), vec![200, 400, 800, 1200, 1600, 2400]);
        assert_eq!(fluid_widths(800, 1000), vec![200, 400, 800, 1000]);
        assert_eq!(fluid_widths(800, 100), vec![100]);
    }

    #[test]
    fn fixed_descriptor_keeps_aspect_ratio_and_skips_upscaled_densities() {
        let config = NormalizeConfig::default();
        let builder = ImageBuilder {
            urls: &ImgixUrlBuilder,
            config: &config,
        };
        let image = builder.image(&raw(1000, 500), IndexMap::new());

        assert_eq!(image.fixed.width, 400);
        assert_eq!(image.fixed.height, 200);
        // 3x would need 1200px from a 1000px source.
        assert_eq!(image.fixed.src_set.matches(", ").count(), 2);
        assert!(image.fixed.src_set.ends_with(" 2x"));
        assert!(image.fixed.src_webp.contains("fm=webp"));
        assert_eq!(image.fluid.aspect_ratio, 2.0);
        assert!(image.placeholder_url.contains("blur=15"));
        assert_eq!(image.alt.as_deref(), Some("A photo"));
    }

    #[test]
    fn small_source_is_never_upscaled() {
        let config = NormalizeConfig::default();
        let builder = ImageBuilder {
            urls: &ImgixUrlBuilder,
            config: &config,
        };
        let image = builder.image(&raw(300, 300), IndexMap::new());
        assert_eq!(image.fixed.width, 300);
        assert_eq!(image.fixed.src_set.split(", ").count(), 1);
        assert!(image.fluid.src.contains("w=300"));
    }
}
