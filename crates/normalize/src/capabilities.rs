//! Caller-supplied collaborators.
//!
//! A single normalizer runs in every environment; what changes between
//! environments is this capability set.
use std::fmt;
use std::sync::Arc;

use model::LinkTarget;
use serde_json::Value;

use crate::config::ImageParams;
use crate::imgix::ImgixUrlBuilder;

/// Maps a document to the route it is served under.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, target: &LinkTarget) -> Option<String>;
}

impl<F> LinkResolver for F
where
    F: Fn(&LinkTarget) -> Option<String> + Send + Sync,
{
    fn resolve(&self, target: &LinkTarget) -> Option<String> {
        self(target)
    }
}

/// One rich-text element handed to an [`HtmlSerializer`].
#[derive(Debug, Clone, Copy)]
pub struct HtmlElement<'a> {
    /// Block type (`paragraph`, `heading2`, `group-list-item`, ...) or span
    /// type (`strong`, `hyperlink`, ...).
    pub element_type: &'a str,
    /// Raw block for blocks, span `data` for spans.
    pub data: Option<&'a Value>,
    /// Plain text covered by the element.
    pub text: &'a str,
    /// Already rendered inner HTML.
    pub children: &'a str,
}

/// Overrides rich-text rendering per element. Returning `None` falls back to
/// the default rendering for that element.
pub trait HtmlSerializer: Send + Sync {
    fn serialize(&self, element: &HtmlElement<'_>, links: &dyn LinkResolver) -> Option<String>;
}

impl<F> HtmlSerializer for F
where
    F: Fn(&HtmlElement<'_>, &dyn LinkResolver) -> Option<String> + Send + Sync,
{
    fn serialize(&self, element: &HtmlElement<'_>, links: &dyn LinkResolver) -> Option<String> {
        self(element, links)
    }
}

/// Image CDN URL builder.
pub trait ImageUrlBuilder: Send + Sync {
    fn build_url(&self, url: &str, params: &ImageParams) -> String;
}

/// The effectful collaborators one normalizer run uses.
#[derive(Clone)]
pub struct Capabilities {
    pub link_resolver: Arc<dyn LinkResolver>,
    pub html_serializer: Option<Arc<dyn HtmlSerializer>>,
    pub image_builder: Arc<dyn ImageUrlBuilder>,
}

impl Capabilities {
    pub fn new(link_resolver: impl LinkResolver + 'static) -> Self {
        Self {
            link_resolver: Arc::new(link_resolver),
            html_serializer: None,
            image_builder: Arc::new(ImgixUrlBuilder),
        }
    }

    pub fn with_html_serializer(mut self, serializer: impl HtmlSerializer + 'static) -> Self {
        self.html_serializer = Some(Arc::new(serializer));
        self
    }

    pub fn with_image_builder(mut self, builder: impl ImageUrlBuilder + 'static) -> Self {
        self.image_builder = Arc::new(builder);
        self
    }

    pub fn resolve_link(&self, target: &LinkTarget) -> Option<String> {
        self.link_resolver.resolve(target)
    }
}

impl Default for Capabilities {
    /// Resolves no links and renders rich text with the built-in serializer.
    fn default() -> Self {
        Self::new(|_: &LinkTarget| -> Option<String> { None })
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("html_serializer", &self.html_serializer.is_some())
            .finish_non_exhaustive()
    }
}
