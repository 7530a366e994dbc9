//! Route templates as a link resolver.
//!
//! Sites served from configuration rather than code describe their routes as
//! templates keyed by custom type:
//!
//! ```yaml
//! routes:
//!   page: "/:uid"
//!   blog_post: "/:lang/blog/:uid"
//! ```
//!
//! Placeholders are `:uid`, `:id`, `:type`, `:lang` and `:slug`. A template
//! whose placeholder has no value for a document (e.g. `:uid` on a document
//! without one) yields no route.
use std::collections::BTreeMap;

use model::LinkTarget;
use normalize::LinkResolver;

const PLACEHOLDERS: [&str; 5] = ["uid", "id", "type", "lang", "slug"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteLinkResolver {
    routes: BTreeMap<String, String>,
    fallback: Option<String>,
}

impl RouteLinkResolver {
    pub fn new(routes: BTreeMap<String, String>) -> Self {
        Self {
            routes,
            fallback: None,
        }
    }

    /// Template used for types without their own route.
    pub fn with_fallback(mut self, template: impl Into<String>) -> Self {
        self.fallback = Some(template.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.fallback.is_none()
    }

    /// Check that every template is absolute and only uses known
    /// placeholders.
    pub fn validate(&self) -> Result<(), String> {
        for (doc_type, template) in self
            .routes
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .chain(self.fallback.iter().map(|v| ("*", v)))
        {
            if !template.starts_with('/') {
                return Err(format!("route for '{doc_type}' must start with '/': {template}"));
            }
            for segment in template.split('/') {
                if let Some(name) = segment.strip_prefix(':') {
                    if !PLACEHOLDERS.contains(&name) {
                        return Err(format!(
                            "route for '{doc_type}' uses unknown placeholder ':{name}'"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

fn placeholder_value<'a>(target: &'a LinkTarget, name: &str) -> Option<&'a str> {
    match name {
        "uid" => target.uid.as_deref(),
        "id" => Some(target.id.as_str()),
        "type" => Some(target.doc_type.as_str()),
        "lang" => Some(target.lang.as_str()),
        "slug" => target.slug.as_deref(),
        _ => None,
    }
    .filter(|value| !value.is_empty())
}

impl LinkResolver for RouteLinkResolver {
    fn resolve(&self, target: &LinkTarget) -> Option<String> {
        if target.is_broken {
            return None;
        }
        let template = self
            .routes
            .get(&target.doc_type)
            .or(self.fallback.as_ref())?;
        let segments: Option<Vec<&str>> = template
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => placeholder_value(target, name),
                None => Some(segment),
            })
            .collect();
        let path = segments?.join("/");
        Some(if path.is_empty() { "/".to_owned() } else { path })
    }
}
