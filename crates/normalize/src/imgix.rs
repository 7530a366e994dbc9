//! Default image URL builder for imgix-backed CDNs.
use url::Url;

use crate::capabilities::ImageUrlBuilder;
use crate::config::ImageParams;

/// Sets query parameters on an imgix URL. Parameters already on the URL are
/// kept unless `params` overrides them. Unparseable URLs are returned as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImgixUrlBuilder;

impl ImageUrlBuilder for ImgixUrlBuilder {
    fn build_url(&self, url: &str, params: &ImageParams) -> String {
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !params.contains_key(key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() && params.is_empty() {
            parsed.set_query(None);
            return parsed.to_string();
        }
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter())
            .extend_pairs(params.iter());
        parsed.to_string()
    }
}
