use thiserror::Error;
use web3::ethabi::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Bytes32Error {
    #[error("bytes32 string {0:?} is longer than 31 bytes")]
    TooLong(String),

    #[error("expected 32 bytes, found {0}")]
    InvalidLength(usize),

    #[error("bytes32 string has no null terminator")]
    MissingTerminator,

    #[error("bytes32 string is not valid utf-8")]
    InvalidUtf8,
}

/// Packs a short utf-8 string into a zero padded `bytes32`. One byte is
/// always left for the null terminator.
pub fn format_bytes32_string(value: &str) -> Result<[u8; 32], Bytes32Error> {
    let bytes = value.as_bytes();
    if bytes.len() > 31 {
        return Err(Bytes32Error::TooLong(value.to_string()));
    }
    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// Reverses [`format_bytes32_string`].
pub fn parse_bytes32_string(bytes: &[u8]) -> Result<String, Bytes32Error> {
    if bytes.len() != 32 {
        return Err(Bytes32Error::InvalidLength(bytes.len()));
    }
    if bytes[31] != 0 {
        return Err(Bytes32Error::MissingTerminator);
    }
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(31);
    String::from_utf8(bytes[..end].to_vec()).map_err(|_| Bytes32Error::InvalidUtf8)
}

/// Encodes a list of names as the `bytes32[]` argument ballot constructors take.
pub fn bytes32_array<S: AsRef<str>>(names: &[S]) -> Result<Token, Bytes32Error> {
    let tokens = names
        .iter()
        .map(|name| format_bytes32_string(name.as_ref()).map(|b| Token::FixedBytes(b.to_vec())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Token::Array(tokens))
}
