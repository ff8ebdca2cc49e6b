use sha3::{Digest, Keccak256};
use web3::types::Address;

/// Renders an address in its EIP-55 mixed-case checksum form.
///
/// Every hex letter of the lowercase address is uppercased when the
/// matching nibble of `keccak256(lowercase_hex)` is 8 or above.
pub fn to_checksum_address(address: &Address) -> String {
    let hex_address = hex::encode(address.as_bytes());
    let mut hasher = Keccak256::new();
    hasher.update(hex_address.as_bytes());
    let hash = hasher.finalize();
    let checksum_address: String = hex_address
        .char_indices()
        .map(|(i, c)| {
            if c.is_ascii_digit() {
                return c;
            }
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();

    format!("0x{}", checksum_address)
}

/// Parses a `0x`-prefixed (or bare) hex address, ignoring checksum casing.
pub fn parse_address(value: &str) -> Result<Address, hex::FromHexError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(stripped)?;
    if bytes.len() != 20 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(Address::from_slice(&bytes))
}
