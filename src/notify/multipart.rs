//! Minimal `multipart/form-data` encoder for one text field plus one file.

use rand::distributions::Alphanumeric;
use rand::Rng;

const BOUNDARY_LEN: usize = 32;

pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BOUNDARY_LEN)
            .map(char::from)
            .collect();
        Self::with_boundary(format!("------------------------{}", token))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.header(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape(name)
        ));
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.open_part();
        self.header(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            escape(name),
            escape(filename)
        ));
        self.header(&format!("Content-Type: {}", content_type));
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// `Content-Type` header value for the request.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Close the form and return the encoded body.
    pub fn finish(mut self) -> Vec<u8> {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"--\r\n");
        self.body
    }

    fn open_part(&mut self) {
        self.body.extend_from_slice(b"--");
        self.body.extend_from_slice(self.boundary.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }

    fn header(&mut self, line: &str) {
        self.body.extend_from_slice(line.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_text_and_file_parts() {
        let form = MultipartForm::with_boundary("XyZ")
            .text("content", "cat detected")
            .file("file", "2024-01-01_00-00-00.jpg", "image/jpeg", b"\xff\xd8jpeg");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XyZ");

        let body = form.finish();
        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"--XyZ\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\ncat detected\r\n",
        );
        expected.extend_from_slice(
            b"--XyZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"2024-01-01_00-00-00.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n\xff\xd8jpeg\r\n",
        );
        expected.extend_from_slice(b"--XyZ--\r\n");
        assert_eq!(body, expected);
    }

    #[test]
    fn random_boundaries_differ() {
        assert_ne!(MultipartForm::new().content_type(), MultipartForm::new().content_type());
    }

    #[test]
    fn quotes_are_escaped_in_names() {
        let body = MultipartForm::with_boundary("b").text("a\"b", "v").finish();
        assert!(String::from_utf8_lossy(&body).contains("name=\"a\\\"b\""));
    }
}
