//! Secret payloads with memory protection.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A binary secret that is zeroed on drop.
///
/// Payloads are opaque bytes and never assumed to be text. `Debug` and
/// `Display` are redacted so values cannot end up in logs.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes {
    inner: Vec<u8>,
}

impl SecretBytes {
    /// Create a new secret from raw bytes.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Expose the secret bytes.
    ///
    /// Use sparingly - only when the actual value is needed.
    pub fn expose(&self) -> &[u8] {
        &self.inner
    }

    /// Interpret the secret as UTF-8 text, if it is valid UTF-8.
    pub fn to_text(&self) -> Option<String> {
        std::str::from_utf8(&self.inner).ok().map(str::to_owned)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

// Never print secrets
impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED; {} bytes]", self.inner.len())
    }
}

impl fmt::Display for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecretBytes {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.inner, &other.inner)
    }
}

impl Eq for SecretBytes {}

impl From<Vec<u8>> for SecretBytes {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for SecretBytes {
    fn from(v: &[u8]) -> Self {
        Self::new(v)
    }
}

impl From<&str> for SecretBytes {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_bytes_redacted() {
        let secret = SecretBytes::from("hunter2");
        assert_eq!(format!("{:?}", secret), "[REDACTED; 7 bytes]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn test_binary_safe() {
        let raw = vec![0u8, 255, 0, 10, 13, 0];
        let secret = SecretBytes::new(raw.clone());
        assert_eq!(secret.expose(), raw.as_slice());
        assert_eq!(secret.len(), 6);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(
            SecretBytes::from("this is a password").to_text().as_deref(),
            Some("this is a password")
        );
        assert_eq!(SecretBytes::new(vec![0xff, 0xfe]).to_text(), None);
    }

    #[test]
    fn test_equality() {
        assert_eq!(SecretBytes::from("abc"), SecretBytes::from("abc"));
        assert_ne!(SecretBytes::from("abc"), SecretBytes::from("abd"));
        assert_ne!(SecretBytes::from("abc"), SecretBytes::from("ab"));
    }
}
