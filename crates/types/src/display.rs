use web3::ethabi::Token;

use crate::{format_units, parse_bytes32_string, to_checksum_address};

/// How unsigned integers in a decoded result are rendered in traces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueFormat {
    #[default]
    Raw,
    /// Fixed-point token amount with the given decimals.
    Units(u32),
}

/// Human readable rendering of a decoded ABI value.
///
/// Addresses use their checksum form and `bytes32` values holding a short
/// string are shown as that string.
pub fn render_token(token: &Token, format: ValueFormat) -> String {
    match token {
        Token::Address(address) => to_checksum_address(address),
        Token::Uint(value) => match format {
            ValueFormat::Raw => value.to_string(),
            ValueFormat::Units(decimals) => format_units(*value, decimals),
        },
        Token::Int(value) => value.to_string(),
        Token::Bool(value) => value.to_string(),
        Token::String(value) => format!("{value:?}"),
        Token::FixedBytes(bytes) if bytes.len() == 32 => match parse_bytes32_string(bytes) {
            Ok(text) if !text.is_empty() => format!("{text:?}"),
            _ => format!("0x{}", hex::encode(bytes)),
        },
        Token::FixedBytes(bytes) | Token::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Token::Array(items) | Token::FixedArray(items) => {
            format!("[{}]", render_tokens(items, format))
        }
        Token::Tuple(items) => format!("({})", render_tokens(items, format)),
    }
}

pub fn render_tokens(tokens: &[Token], format: ValueFormat) -> String {
    tokens
        .iter()
        .map(|t| render_token(t, format))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{format_bytes32_string, parse_ether};
    use web3::types::{Address, U256};

    #[test]
    fn renders_voter_struct() {
        let voter = vec![
            Token::Uint(U256::from(1u64)),
            Token::Bool(false),
            Token::Address(Address::zero()),
            Token::Uint(U256::zero()),
        ];
        assert_eq!(
            render_tokens(&voter, ValueFormat::Raw),
            "1, false, 0x0000000000000000000000000000000000000000, 0"
        );
    }

    #[test]
    fn renders_proposals_and_amounts() {
        let proposal = Token::Tuple(vec![
            Token::FixedBytes(format_bytes32_string("proposal_1").unwrap().to_vec()),
            Token::Uint(parse_ether("50").unwrap()),
        ]);
        assert_eq!(
            render_token(&proposal, ValueFormat::Units(18)),
            "(\"proposal_1\", 50.0)"
        );
        assert_eq!(
            render_token(&Token::FixedBytes(vec![0xff; 32]), ValueFormat::Raw),
            format!("0x{}", "ff".repeat(32))
        );
    }
}
