//! Asset version helpers

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

/// Short hex digest of `content`: first 16 hex chars of its SHA-256.
pub fn from_bytes(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    format!("{:x}", hash)[..16].to_string()
}

/// Version derived from a build manifest; changes whenever the manifest does.
pub fn from_manifest(path: impl AsRef<Path>) -> Result<String> {
    let content = std::fs::read(path.as_ref())?;
    Ok(from_bytes(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_stable_and_short() {
        let a = from_bytes(br#"{"app.js": {"file": "assets/app-1a2b.js"}}"#);
        let b = from_bytes(br#"{"app.js": {"file": "assets/app-1a2b.js"}}"#);
        let c = from_bytes(br#"{"app.js": {"file": "assets/app-3c4d.js"}}"#);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_from_manifest() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"manifest").unwrap();

        assert_eq!(from_manifest(file.path()).unwrap(), from_bytes(b"manifest"));
        assert!(from_manifest("/nonexistent/manifest.json").is_err());
    }
}
