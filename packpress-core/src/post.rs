//! Publish request payload.
//!
//! A derived value object: the post title is the formatted content name,
//! the image list is the comma-joined upload URLs, the cover is the first
//! URL, and the remaining fields are fixed publishing defaults.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    pub summary: String,
    /// Comma-joined image URLs, in upload result order.
    pub images: String,
    /// First image URL, or empty when there are no images.
    pub cover: String,
    pub category_id: u32,
    pub downloads: Vec<String>,
    pub tag_names: Vec<String>,
    pub tag_ids: Vec<String>,
    pub status: String,
    pub require_login: bool,
    pub require_follow: bool,
    pub require_payment: bool,
    pub view_price: u32,
    #[serde(rename = "type")]
    pub post_type: String,
    pub sort: u32,
}

impl PostRequest {
    pub fn new(title: &str, image_urls: &[String]) -> Self {
        Self {
            title: title.to_string(),
            content: String::new(),
            summary: String::new(),
            images: image_urls.join(","),
            cover: image_urls.first().cloned().unwrap_or_default(),
            category_id: 2,
            downloads: Vec::new(),
            tag_names: Vec::new(),
            tag_ids: Vec::new(),
            status: "DRAFT".to_string(),
            require_login: false,
            require_follow: false,
            require_payment: false,
            view_price: 0,
            post_type: "image".to_string(),
            sort: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_is_first_url() {
        let urls = vec!["https://a/1.webp".to_string(), "https://a/2.webp".to_string()];
        let post = PostRequest::new("Demo", &urls);
        assert_eq!(post.cover, "https://a/1.webp");
        assert_eq!(post.images, "https://a/1.webp,https://a/2.webp");
        assert_eq!(post.title, "Demo");
    }

    #[test]
    fn serializes_with_expected_field_names() {
        let post = PostRequest::new("T", &[]);
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["status"], "DRAFT");
        assert_eq!(value["type"], "image");
        assert_eq!(value["categoryId"], 2);
        assert_eq!(value["requireLogin"], false);
        assert_eq!(value["viewPrice"], 0);
        assert_eq!(value["cover"], "");
    }
}
