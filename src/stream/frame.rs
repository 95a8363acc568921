use serde::Deserialize;

/// Prefix of a data frame. The trailing space is part of the match.
pub const DATA_PREFIX: &str = "data: ";
/// Payload that terminates the stream.
pub const DONE_TOKEN: &str = "[DONE]";

/// What a single line of the stream means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    /// Blank line, comment, non-data field, or a data frame without text.
    Skip,
    /// `data: [DONE]`.
    Done,
    /// Non-empty incremental text.
    Delta(String),
    /// Data frame whose payload is not valid JSON. Carries the trimmed payload.
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Any valid JSON document; only the recognised shape carries text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PayloadShape {
    Chunk(ChunkPayload),
    Other(serde::de::IgnoredAny),
}

/// Classify one line of the stream.
#[must_use]
pub fn interpret_line(line: &str) -> FrameAction {
    if line.starts_with(':') || line.trim().is_empty() {
        return FrameAction::Skip;
    }
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return FrameAction::Skip;
    };

    let payload = rest.trim();
    if payload == DONE_TOKEN {
        return FrameAction::Done;
    }

    match parse_delta_payload(payload) {
        Ok(Some(text)) => FrameAction::Delta(text),
        Ok(None) => FrameAction::Skip,
        Err(_) => FrameAction::Malformed(payload.to_owned()),
    }
}

/// Extract `choices[0].delta.content` from a JSON payload.
///
/// Valid JSON of another shape yields `Ok(None)`; so does empty content.
///
/// # Errors
///
/// Returns the JSON error when the payload is not a complete JSON document.
pub fn parse_delta_payload(payload: &str) -> Result<Option<String>, serde_json::Error> {
    let shape: PayloadShape = serde_json::from_str(payload)?;
    let PayloadShape::Chunk(chunk) = shape else {
        return Ok(None);
    };
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty()))
}
