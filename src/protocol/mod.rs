pub mod image;
pub mod request;

pub use image::{decode_image_response, ImageReply, DEFAULT_IMAGE_CAPTION};
pub use request::{ChatRequest, WireMessage};
