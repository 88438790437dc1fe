use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

/// Tokens shorter than this are rejected even when they match the secret
pub const MIN_TOKEN_LEN: usize = 8;

const BEARER_PREFIX: &str = "Bearer ";

/// Standard alphabet; trailing `=` padding is optional when decoding
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Check a raw `Authorization` header value against the configured secret.
///
/// The header must read `Bearer <base64(token)>`. The token is taken from the
/// last space-separated segment, decoded, and compared for exact equality.
pub fn authorize(secret: &str, header: Option<&str>) -> bool {
    let Some(header) = header else {
        return false;
    };
    if !header.starts_with(BEARER_PREFIX) {
        return false;
    }

    let encoded = header.rsplit(' ').next().unwrap_or_default();
    let Some(token) = decode_token(encoded) else {
        tracing::debug!("Failed to decode bearer token");
        return false;
    };

    token.chars().count() >= MIN_TOKEN_LEN && token == secret
}

fn decode_token(encoded: &str) -> Option<String> {
    let bytes = TOKEN_ENGINE.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}
