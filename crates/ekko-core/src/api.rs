//! Argument and result records for the operation surface.
//!
//! The routing layer (out of scope here) decodes request bodies into these
//! records and serializes results back through [`ApiResponse`], the
//! `{ ok, data?, error? }` envelope the service has always answered with.

use ekko_types::{AudioId, Clip, ContentId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserRequest {
    pub name: String,
    pub avatar: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAudioRequest {
    pub id: AudioId,
    pub language: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentRequest {
    pub owner_id: UserId,
    pub audio_id: AudioId,
    pub clip: Clip,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: UserId,
    pub content_id: ContentId,
}

/// Outcome of a like. `liked: false` means the pair already existed and
/// nothing was mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub liked: bool,
}

/// The `{ ok, data?, error? }` wire envelope.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Wrap an operation result for the wire.
    pub fn from_result(result: CoreResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                ok: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn success_envelope() {
        let res = ApiResponse::from_result(Ok(LikeOutcome { liked: true }));
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"]["liked"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_envelope() {
        let res: ApiResponse<LikeOutcome> = ApiResponse::from_result(Err(
            CoreError::NotFound(ContentId::new("c_missing")),
        ));
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["ok"], false);
        assert!(json.get("data").is_none());
        assert!(json["error"].as_str().unwrap().contains("c_missing"));
    }

    #[test]
    fn requests_decode_from_camel_case_bodies() {
        let req: CreateContentRequest = serde_json::from_str(
            r#"{
                "ownerId": "u_1",
                "audioId": "a_1",
                "clip": {"sourceUrl": "https://x/v.mp4", "start": 0.0, "end": 15.0}
            }"#,
        )
        .unwrap();
        assert_eq!(req.owner_id.as_str(), "u_1");
        assert_eq!(req.clip.end, 15.0);
    }

    #[test]
    fn user_request_fields_default() {
        let req: CreateUserRequest = serde_json::from_str("{}").unwrap();
        assert!(req.name.is_empty());
        assert!(req.avatar.is_empty());
    }
}
