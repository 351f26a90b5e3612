//! Text generation service boundary.
//!
//! Alt text and table descriptions come from an external model behind an HTTP
//! endpoint. The trait keeps strategies testable without a network; the one
//! production implementation speaks a small JSON POST protocol.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::GenerationError;

/// Images larger than this are re-encoded before upload.
pub const MAX_IMAGE_BYTES: usize = 4_000_000;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Path to an image to attach, for vision-model prompts.
    pub image: Option<PathBuf>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), image: None }
    }

    pub fn with_image(prompt: impl Into<String>, image: impl Into<PathBuf>) -> Self {
        Self { prompt: prompt.into(), image: Some(image.into()) }
    }
}

pub trait TextGenerator {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Generator backed by an HTTP inference endpoint.
pub struct HttpGenerator {
    endpoint: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl TextGenerator for HttpGenerator {
    fn name(&self) -> &str {
        "http"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut payload = serde_json::json!({
            "model": self.model_id,
            "prompt": request.prompt,
        });
        if let Some(path) = &request.image {
            let bytes = prepare_image(path)?;
            payload["image"] = serde_json::Value::String(BASE64.encode(bytes));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Service(format!("{status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        let text = body
            .get("output")
            .or_else(|| body.get("text"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Read an image and, if over the upload cap, re-encode it smaller: first by
/// walking JPEG quality down, then by halving dimensions.
pub fn prepare_image(path: &Path) -> Result<Vec<u8>, GenerationError> {
    let prep_err = |detail: String| GenerationError::ImagePreparation {
        path: path.display().to_string(),
        detail,
    };
    let bytes = std::fs::read(path).map_err(|e| prep_err(e.to_string()))?;
    if bytes.len() <= MAX_IMAGE_BYTES {
        return Ok(bytes);
    }
    tracing::debug!(path = %path.display(), size = bytes.len(), "shrinking oversized image");
    shrink_image(&bytes, MAX_IMAGE_BYTES).map_err(prep_err)
}

fn shrink_image(bytes: &[u8], limit: usize) -> Result<Vec<u8>, String> {
    let mut img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;

    for quality in [80u8, 60, 40, 20] {
        let encoded = encode_jpeg(&img, quality)?;
        if encoded.len() <= limit {
            return Ok(encoded);
        }
    }
    // Quality alone was not enough; halve dimensions until it fits.
    for _ in 0..8 {
        let (w, h) = (img.width() / 2, img.height() / 2);
        if w == 0 || h == 0 {
            break;
        }
        img = img.resize(w, h, image::imageops::FilterType::Triangle);
        let encoded = encode_jpeg(&img, 70)?;
        if encoded.len() <= limit {
            return Ok(encoded);
        }
    }
    Err(format!("could not reduce image under {limit} bytes"))
}

fn encode_jpeg(img: &image::DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // The blocking client must run outside the runtime; a multi-thread
    // runtime keeps the mock server responsive from its worker threads.
    fn start_server() -> (tokio::runtime::Runtime, MockServer) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        (rt, server)
    }

    #[test]
    fn test_generate_returns_output_field() {
        let (rt, server) = start_server();
        rt.block_on(
            Mock::given(method("POST"))
                .and(path("/generate"))
                .respond_with(ResponseTemplate::new(200).set_body_json(
                    serde_json::json!({"output": "  A bar chart of sales by region.  "}),
                ))
                .mount(&server),
        );
        let generator = HttpGenerator::new(format!("{}/generate", server.uri()), "vision-1");
        let text = generator
            .generate(&GenerationRequest::text("Describe this image"))
            .unwrap();
        assert_eq!(text, "A bar chart of sales by region.");
    }

    #[test]
    fn test_generate_service_error() {
        let (rt, server) = start_server();
        rt.block_on(
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
                .mount(&server),
        );
        let generator = HttpGenerator::new(server.uri(), "vision-1");
        let err = generator
            .generate(&GenerationRequest::text("hi"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::Service(_)));
    }

    #[test]
    fn test_generate_empty_response() {
        let (rt, server) = start_server();
        rt.block_on(
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"output": "  "})),
                )
                .mount(&server),
        );
        let generator = HttpGenerator::new(server.uri(), "vision-1");
        let err = generator
            .generate(&GenerationRequest::text("hi"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[test]
    fn test_prepare_image_small_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        let original = std::fs::read(&path).unwrap();
        assert_eq!(prepare_image(&path).unwrap(), original);
    }

    #[test]
    fn test_shrink_image_respects_limit() {
        let mut img = image::RgbImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = image::Rgb([x as u8 * 4, y as u8 * 4, (x + y) as u8 * 2]);
        }
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let limit = 700;
        let shrunk = shrink_image(&png, limit).unwrap();
        assert!(shrunk.len() <= limit);
        // Still a decodable image.
        image::load_from_memory(&shrunk).unwrap();
    }

    #[test]
    fn test_prepare_image_missing_file() {
        let err = prepare_image(Path::new("/nonexistent/image.png")).unwrap_err();
        assert!(matches!(err, GenerationError::ImagePreparation { .. }));
    }
}
