#![allow(dead_code)]

use crypto_core::JwtKeys;
use feed_service::db::Store;
use feed_service::images::ImageStore;
use feed_service::realtime::Broadcaster;
use feed_service::AppState;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----feedtestboundary";

pub struct TestEnv {
    pub state: AppState,
    pub keys: JwtKeys,
    pub images_dir: TempDir,
}

pub fn test_env() -> TestEnv {
    test_env_with_store(Store::memory())
}

pub fn test_env_with_store(store: Store) -> TestEnv {
    let images_dir = tempfile::tempdir().expect("tempdir");
    let keys = JwtKeys::from_secret("integration-test-secret-0123456789", 3600).expect("keys");
    let state = AppState::new(
        store,
        keys.clone(),
        ImageStore::new(images_dir.path(), 64 * 1024),
        Broadcaster::new(32),
        2,
    );
    TestEnv {
        state,
        keys,
        images_dir,
    }
}

/// One multipart/form-data part
pub enum Part<'a> {
    Text(&'a str, &'a str),
    /// `image` file: (file name, content type, bytes)
    Image(&'a str, &'a str, &'a [u8]),
}

/// Build a multipart/form-data body with text fields first and an optional
/// image last; returns (content type, body)
pub fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let mut parts: Vec<Part> = fields.iter().map(|&(n, v)| Part::Text(n, v)).collect();
    if let Some((file_name, content_type, bytes)) = file {
        parts.push(Part::Image(file_name, content_type, bytes));
    }
    multipart_parts(&parts)
}

/// Build a multipart/form-data body keeping the given part order
pub fn multipart_parts(parts: &[Part]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::Image(file_name, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
                        file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(
                    format!("Content-Type: {}\r\n\r\n", content_type).as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
}

/// Number of files in the images directory
pub fn stored_files(env: &TestEnv) -> usize {
    std::fs::read_dir(env.images_dir.path())
        .map(|entries| entries.count())
        .unwrap_or(0)
}
