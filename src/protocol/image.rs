use serde::Deserialize;

use crate::error::ChatError;

/// Caption used when the reply carries no text.
pub const DEFAULT_IMAGE_CAPTION: &str = "Here's your generated image:";

#[derive(Debug, Default, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    choices: Option<Vec<ImageChoice>>,
}

/// Any valid JSON document; only the recognised shape carries a reply.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseShape {
    Reply(ImageResponse),
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Default, Deserialize)]
struct ImageChoice {
    #[serde(default)]
    message: Option<ImageMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Option<Vec<ImagePart>>,
}

#[derive(Debug, Deserialize)]
struct ImagePart {
    #[serde(default)]
    image_url: Option<ImageUrl>,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    #[serde(default)]
    url: Option<String>,
}

/// Assistant reply extracted from a single-shot response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReply {
    pub caption: String,
    pub image_url: Option<String>,
}

/// Decode a buffered image-generation response.
///
/// Missing or `null` fields are normal: an absent or empty caption becomes
/// [`DEFAULT_IMAGE_CAPTION`], an absent image leaves `image_url` empty. Valid
/// JSON of any other shape decodes to the default caption.
///
/// # Errors
///
/// Returns [`ChatError::Decode`] when the body is not a JSON document.
pub fn decode_image_response(body: &[u8]) -> Result<ImageReply, ChatError> {
    let response = match serde_json::from_slice::<ResponseShape>(body)
        .map_err(|err| ChatError::Decode(format!("invalid image response: {err}")))?
    {
        ResponseShape::Reply(response) => response,
        ResponseShape::Other(_) => ImageResponse::default(),
    };

    let message = response
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .unwrap_or_default();

    let image_url = message
        .images
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|part| part.image_url)
        .and_then(|image| image.url);
    let caption = message
        .content
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_CAPTION.to_string());

    Ok(ImageReply { caption, image_url })
}
