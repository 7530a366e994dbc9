//! Generated node type names.
use heck::ToUpperCamelCase;
use model::FieldPath;

/// `Prismic{Prefix}{Type}`, e.g. `PrismicBlogPost` for `blog_post`.
pub fn document_type_name(prefix: &str, doc_type: &str) -> String {
    format!("Prismic{prefix}{}", doc_type.to_upper_camel_case())
}

/// Legacy slices are named after their full path:
/// `page.data.body.text` → `PrismicPageDataBodyText`.
pub fn legacy_slice_type_name(prefix: &str, slice_path: &FieldPath) -> String {
    let joined: String = slice_path
        .segments()
        .iter()
        .map(|segment| segment.to_upper_camel_case())
        .collect();
    format!("Prismic{prefix}{joined}")
}

/// Shared slices are named after the slice and variation only, since the
/// same model is reused across custom types.
pub fn shared_slice_type_name(prefix: &str, slice_type: &str, variation: &str) -> String {
    format!(
        "Prismic{prefix}{}{}",
        slice_type.to_upper_camel_case(),
        variation.to_upper_camel_case()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_pascal_cased() {
        assert_eq!(document_type_name("", "blog_post"), "PrismicBlogPost");
        assert_eq!(document_type_name("Shop", "page"), "PrismicShopPage");
        let path = FieldPath::from_segments(["page", "data", "body", "image_gallery"]);
        assert_eq!(legacy_slice_type_name("", &path), "PrismicPageDataBodyImageGallery");
        assert_eq!(
            shared_slice_type_name("", "call_to_action", "default"),
            "PrismicCallToActionDefault"
        );
    }
}
