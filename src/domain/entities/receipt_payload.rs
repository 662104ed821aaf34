use base64::{engine::general_purpose::STANDARD, Engine};

/// The local receipt blob as supplied by the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPayload(Vec<u8>);

impl ReceiptPayload {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into())
    }

    /// Wraps a receipt that is already base64-encoded, as delivered by most
    /// client SDKs.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(encoded.trim()).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_encoding_is_standard_alphabet() {
        let payload = ReceiptPayload::new(vec![0xfb, 0xff, 0x00, 0x10]);
        assert_eq!(payload.to_base64(), "+/8AEA==");
    }

    #[test]
    fn from_base64_trims_whitespace() {
        let payload = ReceiptPayload::from_base64(" cmVjZWlwdA==\n").unwrap();
        assert_eq!(payload.as_bytes(), b"receipt");
    }

    #[test]
    fn from_base64_rejects_garbage() {
        assert!(ReceiptPayload::from_base64("not base64!").is_err());
    }
}
