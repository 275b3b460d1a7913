use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::errors::{ResolveError, ResolveResult};

/// Key observed alongside the hex/xor scheme.
pub const DEFAULT_XOR_KEY: &str = "X9a(O;FMV2-7VO5x;Ao\u{0005}:dN1NoFs?j,";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DecodeVariant {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant")]
pub enum DecodeRule {
    /// reverse, keep even positions, base64
    #[serde(rename = "A")]
    StrideBase64,
    /// reverse, hex pairs, repeating key xor
    #[serde(rename = "B")]
    HexXor { key: String },
}

impl DecodeRule {
    pub fn hex_xor<S: Into<String>>(key: S) -> Self {
        DecodeRule::HexXor { key: key.into() }
    }

    pub fn variant(&self) -> DecodeVariant {
        match self {
            DecodeRule::StrideBase64 => DecodeVariant::A,
            DecodeRule::HexXor { .. } => DecodeVariant::B,
        }
    }

    pub fn decode(&self, token: &str) -> ResolveResult<String> {
        match self {
            DecodeRule::StrideBase64 => decode_stride_base64(token),
            DecodeRule::HexXor { key } => decode_hex_xor(token, key.as_bytes()),
        }
    }
}

pub fn decode(token: &str, rule: &DecodeRule) -> ResolveResult<String> {
    rule.decode(token)
}

fn decode_stride_base64(token: &str) -> ResolveResult<String> {
    // odd positions of the reversed string are filler
    let b64: String = token.chars().rev().step_by(2).collect();

    let bytes = BASE64_STANDARD
        .decode(b64.as_bytes())
        .map_err(|err| ResolveError::decode(DecodeVariant::A, err.to_string()))?;

    String::from_utf8(bytes).map_err(|err| ResolveError::decode(DecodeVariant::A, err.to_string()))
}

fn decode_hex_xor(token: &str, key: &[u8]) -> ResolveResult<String> {
    if key.is_empty() {
        return Err(ResolveError::decode(DecodeVariant::B, "empty key"));
    }

    let reversed: String = token.chars().rev().collect();
    if reversed.len() % 2 != 0 {
        return Err(ResolveError::decode(
            DecodeVariant::B,
            format!("odd length input: {}", reversed.len()),
        ));
    }

    let bytes = hex::decode(reversed)
        .map_err(|err| ResolveError::decode(DecodeVariant::B, err.to_string()))?;

    let plain = bytes
        .iter()
        .zip(key.iter().cycle())
        .map(|(v, k)| v ^ k)
        .collect::<Vec<_>>();

    String::from_utf8(plain).map_err(|err| ResolveError::decode(DecodeVariant::B, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "https://example.com/x.m3u8";

    fn obfuscate_a(plain: &str, filler: &[char]) -> String {
        let b64 = BASE64_STANDARD.encode(plain);
        let mut out = String::new();
        for (idx, ch) in b64.chars().enumerate() {
            out.push(ch);
            out.push(filler[idx % filler.len()]);
        }
        out.chars().rev().collect()
    }

    fn obfuscate_b(plain: &[u8], key: &[u8]) -> String {
        let xored = plain
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ key[i % key.len()])
            .collect::<Vec<_>>();
        hex::encode(xored).chars().rev().collect()
    }

    #[test]
    fn should_decode_variant_a() {
        let token = obfuscate_a(PLAIN, &['q', '%', 'Z', '9', '=']);
        assert_eq!(decode(&token, &DecodeRule::StrideBase64).unwrap(), PLAIN);
    }

    #[test]
    fn should_decode_variant_a_with_padding() {
        let plain = "https://cdn.example.org/hls/master.m3u8?t=1";
        let token = obfuscate_a(plain, &['x']);
        assert!(BASE64_STANDARD.encode(plain).ends_with('='));
        assert_eq!(decode(&token, &DecodeRule::StrideBase64).unwrap(), plain);
    }

    #[test]
    fn should_fail_variant_a_on_shifted_parity() {
        let token = obfuscate_a(PLAIN, &['!']);
        let shifted = &token[..token.len() - 1];
        let err = decode(shifted, &DecodeRule::StrideBase64).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DecodeFailed {
                variant: DecodeVariant::A,
                ..
            }
        ));
    }

    #[test]
    fn should_decode_variant_b() {
        let token = obfuscate_b(PLAIN.as_bytes(), b"k");
        assert_eq!(decode(&token, &DecodeRule::hex_xor("k")).unwrap(), PLAIN);
    }

    #[test]
    fn should_decode_variant_b_with_default_key() {
        let token = obfuscate_b(PLAIN.as_bytes(), DEFAULT_XOR_KEY.as_bytes());
        assert_eq!(
            decode(&token, &DecodeRule::hex_xor(DEFAULT_XOR_KEY)).unwrap(),
            PLAIN
        );
    }

    #[test]
    fn should_fail_variant_b_on_odd_length() {
        let token = obfuscate_b(PLAIN.as_bytes(), b"k");
        let err = decode(&token[1..], &DecodeRule::hex_xor("k")).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DecodeFailed {
                variant: DecodeVariant::B,
                ..
            }
        ));
    }

    #[test]
    fn should_fail_variant_b_on_empty_key() {
        let token = obfuscate_b(PLAIN.as_bytes(), b"k");
        let err = decode(&token, &DecodeRule::hex_xor("")).unwrap_err();
        assert_eq!(err, ResolveError::decode(DecodeVariant::B, "empty key"));
    }

    #[test]
    fn should_deserialize_rules() {
        let rule: DecodeRule = serde_json::from_str(r#"{"variant":"A"}"#).unwrap();
        assert_eq!(rule, DecodeRule::StrideBase64);

        let rule: DecodeRule = serde_json::from_str(r#"{"variant":"B","key":"k"}"#).unwrap();
        assert_eq!(rule, DecodeRule::hex_xor("k"));
        assert_eq!(rule.variant(), DecodeVariant::B);
    }
}
