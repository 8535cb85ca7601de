//! Request, payload and response types for topic sync.

use serde::{Deserialize, Deserializer, Serialize};

/// Header carrying the `sha256=<hex>` body signature.
pub const SIGNATURE_HEADER: &str = "x-discourse-event-signature";

/// Header carrying the event type, e.g. `post`.
pub const EVENT_TYPE_HEADER: &str = "x-discourse-event-type";

/// Header carrying the event name, e.g. `post_created`.
pub const EVENT_NAME_HEADER: &str = "x-discourse-event";

pub const MESSAGE_UPDATED: &str = "The posts have been updated.";
pub const MESSAGE_NOT_VERIFIED: &str = "The webhook was not verified.";
pub const MESSAGE_STORE_FAILED: &str = "The posts could not be updated.";

/// An inbound webhook delivery, as received.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub content_type: Option<String>,
    pub signature: Option<String>,
    pub event_type: Option<String>,
    pub event_name: Option<String>,
    /// Raw body bytes; the signature is computed over these, never over a re-encoding.
    pub body: Vec<u8>,
}

/// Outcome reported back to the webhook sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
}

impl SyncResponse {
    pub fn updated() -> Self {
        Self {
            success: true,
            message: MESSAGE_UPDATED.to_string(),
        }
    }

    pub fn not_verified() -> Self {
        Self {
            success: false,
            message: MESSAGE_NOT_VERIFIED.to_string(),
        }
    }

    pub fn store_failed() -> Self {
        Self {
            success: false,
            message: MESSAGE_STORE_FAILED.to_string(),
        }
    }
}

/// Decoded Discourse post webhook body.
///
/// Only the fields used for syncing are modelled; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePayload {
    pub post: Option<RemotePost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePost {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub topic_id: Option<u64>,
    /// Position of the post that fired the event, not the size of the topic.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub post_number: Option<u64>,
    /// Posts in the topic, opening post included.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub topic_posts_count: Option<u64>,
    #[serde(default)]
    pub topic_slug: Option<String>,
    /// Explicit count, sent by some Discourse plugins; wins over everything else.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub comments_count: Option<u64>,
}

impl RemotePost {
    /// Number of replies in the topic, excluding the opening post.
    ///
    /// `post_number` is only used when the payload lacks `topic_posts_count`,
    /// since edits of early posts would otherwise lower the count.
    pub fn derived_comments_count(&self) -> Option<u64> {
        self.comments_count
            .or_else(|| self.topic_posts_count.map(|n| n.saturating_sub(1)))
            .or_else(|| self.post_number.map(|n| n.saturating_sub(1)))
    }

    /// Path suffix of the topic's permalink, `/t/{slug}/{id}`.
    pub fn permalink_suffix(&self) -> Option<String> {
        let slug = self.topic_slug.as_deref().filter(|s| !s.is_empty())?;
        let topic_id = self.topic_id?;
        Some(format!("/t/{}/{}", slug, topic_id))
    }
}

/// Accept ids and counts sent either as JSON numbers or numeric strings.
///
/// A string that does not parse as an unsigned integer is treated as absent.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::String(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(json: &str) -> RemotePost {
        serde_json::from_str::<RemotePayload>(json)
            .unwrap()
            .post
            .unwrap()
    }

    #[test]
    fn test_derived_comments_count_from_post_number() {
        let p = post(r#"{"post":{"topic_id":7,"post_number":3}}"#);
        assert_eq!(p.derived_comments_count(), Some(2));
    }

    #[test]
    fn test_derived_comments_count_first_post() {
        let p = post(r#"{"post":{"topic_id":7,"post_number":1}}"#);
        assert_eq!(p.derived_comments_count(), Some(0));

        let p = post(r#"{"post":{"topic_id":7,"post_number":0}}"#);
        assert_eq!(p.derived_comments_count(), Some(0));
    }

    #[test]
    fn test_derived_comments_count_prefers_topic_size() {
        // An edit of post #2 in a five-post topic
        let p = post(r#"{"post":{"topic_id":7,"post_number":2,"topic_posts_count":5}}"#);
        assert_eq!(p.derived_comments_count(), Some(4));
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let p = post(r#"{"post":{"topic_id":"7","post_number":"3","topic_posts_count":null}}"#);
        assert_eq!(p.topic_id, Some(7));
        assert_eq!(p.derived_comments_count(), Some(2));

        let p = post(r#"{"post":{"topic_id":"seven","post_number":3}}"#);
        assert_eq!(p.topic_id, None);
    }

    #[test]
    fn test_derived_comments_count_explicit_wins() {
        let p = post(r#"{"post":{"topic_id":7,"post_number":3,"topic_posts_count":4,"comments_count":9}}"#);
        assert_eq!(p.derived_comments_count(), Some(9));
    }

    #[test]
    fn test_derived_comments_count_missing() {
        let p = post(r#"{"post":{"topic_id":7}}"#);
        assert_eq!(p.derived_comments_count(), None);
    }

    #[test]
    fn test_permalink_suffix() {
        let p = post(r#"{"post":{"topic_id":7,"topic_slug":"hello-world"}}"#);
        assert_eq!(p.permalink_suffix(), Some("/t/hello-world/7".to_string()));

        let p = post(r#"{"post":{"topic_id":7,"topic_slug":""}}"#);
        assert!(p.permalink_suffix().is_none());
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&SyncResponse::not_verified()).unwrap();
        assert_eq!(
            json,
            r#"{"success":false,"message":"The webhook was not verified."}"#
        );
    }
}
