mod json;
mod mock;
mod pollinations;

pub use json::JsonBackend;
pub use mock::MockBackend;
pub use pollinations::PollinationsBackend;

use bluepic_contracts::GenerateError;

/// MIME type of a downloaded image: the header when it names an image,
/// otherwise whatever the bytes look like.
pub(crate) fn image_mime_type(
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<String, GenerateError> {
    if bytes.is_empty() {
        return Err(GenerateError::InvalidResponse(
            "response body was empty".to_string(),
        ));
    }
    let declared = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value.starts_with("image/"));
    if let Some(mime) = declared {
        return Ok(mime);
    }
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .map_err(|_| {
            GenerateError::InvalidResponse(format!(
                "response is not an image (content-type: {})",
                content_type.unwrap_or("missing")
            ))
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Read as _;
    use std::sync::{Arc, Mutex};
    use std::thread::{self, JoinHandle};

    use crate::ProgressUpdate;

    /// Bytes of a real 2x2 PNG, for servers that need to return an image.
    pub fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        let image = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[derive(Debug, Clone)]
    pub struct Captured {
        pub method: String,
        pub url: String,
        pub body: String,
    }

    /// Serves exactly one request with the given status, content type and body.
    pub fn serve_once(
        status: u16,
        content_type: &str,
        body: Vec<u8>,
    ) -> (String, JoinHandle<Option<Captured>>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let content_type = content_type.to_string();
        let handle = thread::spawn(move || {
            let mut request = server.recv().ok()?;
            let mut received = String::new();
            request.as_reader().read_to_string(&mut received).ok()?;
            let captured = Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                body: received,
            };
            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                    .unwrap();
            let response = tiny_http::Response::from_data(body)
                .with_status_code(status)
                .with_header(header);
            request.respond(response).ok()?;
            Some(captured)
        });
        (format!("http://{addr}"), handle)
    }

    /// Progress sink that remembers every update.
    pub fn recorder() -> (
        Arc<Mutex<Vec<ProgressUpdate>>>,
        impl Fn(ProgressUpdate) + Send + Sync,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |update: ProgressUpdate| seen.lock().unwrap().push(update)
        };
        (seen, sink)
    }
}
