//! Base64 and PEM conversion shared by every other module.
//!
//! PEM decoding is lenient: every `-----...-----` armor token is stripped
//! along with all whitespace, so keys pasted with CRLF line endings, without
//! wrapping, or squashed onto a single line still parse.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Line width of PEM bodies.
pub const PEM_LINE_WIDTH: usize = 64;

/// Encodes bytes as standard, padded base64.
pub fn encode_b64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard, padded base64.
pub fn decode_b64(encoded: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Encoding(format!("invalid base64: {e}")))
}

/// Wraps DER bytes in PEM armor with the given label.
pub fn pem_encode(label: &str, der: &[u8]) -> String {
    let body = encode_b64(der);
    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 2 * label.len() + 40);

    pem.push_str("-----BEGIN ");
    pem.push_str(label);
    pem.push_str("-----\n");
    for (i, c) in body.chars().enumerate() {
        if i > 0 && i % PEM_LINE_WIDTH == 0 {
            pem.push('\n');
        }
        pem.push(c);
    }
    if !body.is_empty() {
        pem.push('\n');
    }
    pem.push_str("-----END ");
    pem.push_str(label);
    pem.push_str("-----\n");
    pem
}

/// Strips PEM armor and whitespace, returning the decoded DER bytes.
pub fn pem_decode(pem: &str) -> CryptoResult<Vec<u8>> {
    let mut body = String::with_capacity(pem.len());
    let mut rest = pem;
    while let Some(start) = rest.find("-----") {
        body.push_str(&rest[..start]);
        let armor = &rest[start + 5..];
        let end = armor
            .find("-----")
            .ok_or_else(|| CryptoError::MalformedKey("unterminated PEM armor".to_string()))?;
        rest = &armor[end + 5..];
    }
    body.push_str(rest);
    body.retain(|c| !c.is_whitespace());

    if body.is_empty() {
        return Err(CryptoError::MalformedKey("PEM contains no body".to_string()));
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| CryptoError::MalformedKey(format!("PEM body is not base64: {e}")))
}

/// Returns the label of the first `BEGIN` line, if any.
pub fn pem_label(pem: &str) -> Option<&str> {
    pem.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("-----BEGIN "))
        .and_then(|rest| rest.strip_suffix("-----"))
}

/// Serde adapter that stores byte fields as base64 strings.
///
/// Works for `Vec<u8>` and fixed-size arrays; arrays reject strings that
/// decode to the wrong length.
///
/// ```ignore
/// #[serde(with = "sealshare_crypto::codec::b64")]
/// nonce: [u8; 12],
/// ```
pub mod b64 {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&super::encode_b64(value))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = super::decode_b64(&encoded).map_err(D::Error::custom)?;
        let len = bytes.len();
        T::try_from(bytes)
            .map_err(|_| D::Error::custom(format!("unexpected decoded length {len}")))
    }
}
