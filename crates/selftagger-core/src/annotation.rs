//! Wire format of the image-annotation service and the transport seam.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::{AnnotationResult, ImagePayload};
use crate::error::AnnotationError;

pub const MAX_LABELS: u32 = 100;
pub const MAX_LANDMARKS: u32 = 5;
pub const MAX_TEXTS: u32 = 10;

/// Sends one annotate request and returns the raw response.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, request: &AnnotateRequest) -> Result<AnnotateResponse, AnnotationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    LabelDetection,
    LandmarkDetection,
    TextDetection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Base64 of the raw image bytes.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
}

/// `{requests: [{image: {content}, features: [{type, maxResults}, ...]}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotateRequest {
    pub requests: Vec<ImageRequest>,
}

impl AnnotateRequest {
    /// Labels, landmarks and text for one image, in a single request.
    pub fn for_image(image: &ImagePayload) -> Self {
        Self {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image.as_bytes()),
                },
                features: vec![
                    Feature {
                        kind: FeatureType::LabelDetection,
                        max_results: MAX_LABELS,
                    },
                    Feature {
                        kind: FeatureType::LandmarkDetection,
                        max_results: MAX_LANDMARKS,
                    },
                    Feature {
                        kind: FeatureType::TextDetection,
                        max_results: MAX_TEXTS,
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Per-image response. Absent and `null` sequences both read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    #[serde(default)]
    pub label_annotations: Option<Vec<EntityAnnotation>>,
    #[serde(default)]
    pub landmark_annotations: Option<Vec<EntityAnnotation>>,
    #[serde(default)]
    pub text_annotations: Option<Vec<EntityAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<ImageResponse>,
}

fn descriptions(annotations: Option<Vec<EntityAnnotation>>) -> Vec<String> {
    annotations
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.description)
        .collect()
}

impl AnnotateResponse {
    /// First per-image response as plain description lists.
    pub fn into_result(self) -> Result<AnnotationResult, AnnotationError> {
        let first = self
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| AnnotationError::Malformed("response contained no results".to_string()))?;

        if let Some(status) = first.error {
            return Err(AnnotationError::Rejected {
                code: status.code,
                message: status.message,
            });
        }

        Ok(AnnotationResult {
            labels: descriptions(first.label_annotations),
            landmarks: descriptions(first.landmark_annotations),
            texts: descriptions(first.text_annotations),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = AnnotateRequest::for_image(&ImagePayload::new(b"abc".to_vec()));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "requests": [{
                    "image": { "content": "YWJj" },
                    "features": [
                        { "type": "LABEL_DETECTION", "maxResults": 100 },
                        { "type": "LANDMARK_DETECTION", "maxResults": 5 },
                        { "type": "TEXT_DETECTION", "maxResults": 10 }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_missing_and_null_sequences_are_empty() {
        let response: AnnotateResponse = serde_json::from_value(json!({
            "responses": [{
                "labelAnnotations": [
                    { "description": "cat", "score": 0.98 },
                    { "description": "whiskers" }
                ],
                "landmarkAnnotations": null
            }]
        }))
        .unwrap();

        let result = response.into_result().unwrap();
        assert_eq!(result.labels, vec!["cat", "whiskers"]);
        assert!(result.landmarks.is_empty());
        assert!(result.texts.is_empty());
    }

    #[test]
    fn test_empty_responses_is_malformed() {
        let response: AnnotateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            response.into_result(),
            Err(AnnotationError::Malformed(_))
        ));
    }

    #[test]
    fn test_per_image_error_is_rejected() {
        let response: AnnotateResponse = serde_json::from_value(json!({
            "responses": [{ "error": { "code": 3, "message": "Bad image data." } }]
        }))
        .unwrap();
        match response.into_result() {
            Err(AnnotationError::Rejected { code, message }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "Bad image data.");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
