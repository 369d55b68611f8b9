//! MangaFire request signing ("vrf" query parameter)
//!
//! The signature is produced by five fixed stages applied to the
//! percent-encoded input. Every stage runs RC4 keyed with a 32-byte secret,
//! then mixes each byte with a 32-byte seed and a 10-step operation schedule,
//! interleaving raw prefix bytes into the first few output positions.
//! The final bytes are base64 encoded, optionally with the URL-safe alphabet
//! and no padding.
//!
//! ```
//! use rust_manga_sources::vrf::{compute_signature, VrfEncoding};
//!
//! let token = compute_signature("one piece", VrfEncoding::Url);
//! assert!(!token.contains('+') && !token.contains('/') && !token.contains('='));
//! ```

use crate::error::{Result, SourceError};
use crate::helpers::encode_uri_component;
use base64::{prelude::BASE64_STANDARD, Engine};
use rc4::{consts::U32, Key, KeyInit, Rc4, StreamCipher};
use std::sync::LazyLock;

const KEY_LEN: usize = 32;
const SEED_LEN: usize = 32;
const SCHEDULE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VrfEncoding {
    /// `-` and `_` instead of `+` and `/`, trailing `=` removed
    #[default]
    Url,
    /// Standard alphabet with padding
    Base64,
}

/// A single per-position byte operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOp {
    Add(u8),
    Sub(u8),
    Xor(u8),
    RotateLeft(u32),
}

impl ByteOp {
    #[inline]
    pub fn apply(self, b: u8) -> u8 {
        match self {
            ByteOp::Add(n) => b.wrapping_add(n),
            ByteOp::Sub(n) => b.wrapping_sub(n),
            ByteOp::Xor(n) => b ^ n,
            ByteOp::RotateLeft(n) => b.rotate_left(n),
        }
    }
}

use ByteOp::{Add, RotateLeft as Rotl, Sub, Xor};

/// Base64 encoded constants for one stage, as shipped by the site
struct StageConstants {
    key: &'static str,
    seed: &'static str,
    prefix: &'static str,
    schedule: [ByteOp; SCHEDULE_LEN],
}

const STAGES: [StageConstants; 5] = [
    StageConstants {
        key: "u8cBwTi1CM4XE3BkwG5Ble3AxWgnhKiXD9Cr279yNW0=",
        seed: "pGjzSCtS4izckNAOhrY5unJnO2E1VbrU+tXRYG24vTo=",
        prefix: "Rowe+rg/0g==",
        schedule: [
            Sub(48), Sub(19), Xor(241), Sub(19), Add(223),
            Sub(19), Sub(170), Sub(19), Sub(48), Xor(8),
        ],
    },
    StageConstants {
        key: "t00NOJ/Fl3wZtez1xU6/YvcWDoXzjrDHJLL2r/IWgcY=",
        seed: "dFcKX9Qpu7mt/AD6mb1QF4w+KqHTKmdiqp7penubAKI=",
        prefix: "8cULcnOMJVY8AA==",
        schedule: [
            Rotl(4), Add(223), Rotl(4), Xor(163), Sub(48),
            Add(82), Add(223), Sub(48), Xor(83), Rotl(4),
        ],
    },
    StageConstants {
        key: "S7I+968ZY4Fo3sLVNH/ExCNq7gjuOHjSRgSqh6SsPJc=",
        seed: "owp1QIY/kBiRWrRn9TLN2CdZsLeejzHhfJwdiQMjg3w=",
        prefix: "n2+Og2Gth8Hh",
        schedule: [
            Sub(19), Add(82), Sub(48), Sub(170), Rotl(4),
            Sub(48), Sub(170), Xor(8), Add(82), Xor(163),
        ],
    },
    StageConstants {
        key: "7D4Q8i8dApRj6UWxXbIBEa1UqvjI+8W0UvPH9talJK8=",
        seed: "H1XbRvXOvZAhyyPaO68vgIUgdAHn68Y6mrwkpIpEue8=",
        prefix: "aRpvzH+yoA==",
        schedule: [
            Add(223), Rotl(4), Add(223), Xor(83), Sub(19),
            Add(223), Sub(170), Add(223), Sub(170), Xor(83),
        ],
    },
    StageConstants {
        key: "0JsmfWZA1kwZeWLk5gfV5g41lwLL72wHbam5ZPfnOVE=",
        seed: "2Nmobf/mpQ7+Dxq1/olPSDj3xV8PZkPbKaucJvVckL0=",
        prefix: "ZB4oBi0=",
        schedule: [
            Add(82), Xor(83), Xor(163), Add(82), Sub(170),
            Xor(8), Xor(241), Add(82), Add(176), Rotl(4),
        ],
    },
];

/// A decoded stage, ready to run
#[derive(Debug, Clone)]
pub struct Stage {
    key: [u8; KEY_LEN],
    seed: [u8; SEED_LEN],
    prefix: Vec<u8>,
    schedule: [ByteOp; SCHEDULE_LEN],
}

fn decode_fixed<const N: usize>(name: &str, b64: &str) -> Result<[u8; N]> {
    let bytes = BASE64_STANDARD
        .decode(b64)
        .map_err(|e| SourceError::config(name, e.to_string()))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| SourceError::config(name, format!("expected {} bytes, got {}", N, len)))
}

impl Stage {
    pub fn decode(
        index: usize,
        key: &str,
        seed: &str,
        prefix: &str,
        schedule: [ByteOp; SCHEDULE_LEN],
    ) -> Result<Self> {
        let key = decode_fixed::<KEY_LEN>(&format!("stage[{}].key", index), key)?;
        let seed = decode_fixed::<SEED_LEN>(&format!("stage[{}].seed", index), seed)?;
        let prefix_name = format!("stage[{}].prefix", index);
        let prefix = BASE64_STANDARD
            .decode(prefix)
            .map_err(|e| SourceError::config(&prefix_name, e.to_string()))?;
        if prefix.is_empty() {
            return Err(SourceError::config(&prefix_name, "prefix is empty"));
        }
        Ok(Stage {
            key,
            seed,
            prefix,
            schedule,
        })
    }

    /// Length of the window in which raw prefix bytes are interleaved
    pub fn prefix_len(&self) -> usize {
        self.prefix.len()
    }

    fn keystream(&self, data: &mut [u8]) {
        let mut cipher = Rc4::new(Key::<U32>::from_slice(&self.key));
        cipher.apply_keystream(data);
    }

    fn mix(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + self.prefix.len());
        for (i, &b) in data.iter().enumerate() {
            if let Some(&p) = self.prefix.get(i) {
                out.push(p);
            }
            out.push(self.schedule[i % SCHEDULE_LEN].apply(b ^ self.seed[i % SEED_LEN]));
        }
        out
    }

    /// RC4 followed by the seed/schedule mix
    pub fn run(&self, mut data: Vec<u8>) -> Vec<u8> {
        self.keystream(&mut data);
        self.mix(&data)
    }
}

/// The five decoded stages
#[derive(Debug, Clone)]
pub struct SignatureEngine {
    stages: Vec<Stage>,
}

impl SignatureEngine {
    /// Decode and validate the embedded constants
    pub fn new() -> Result<Self> {
        let stages = STAGES
            .iter()
            .enumerate()
            .map(|(i, c)| Stage::decode(i, c.key, c.seed, c.prefix, c.schedule))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Raw signature bytes before base64
    pub fn sign_bytes(&self, input: &str) -> Vec<u8> {
        let encoded = encode_uri_component(input);
        self.stages
            .iter()
            .fold(encoded.into_bytes(), |bytes, stage| stage.run(bytes))
    }

    pub fn sign(&self, input: &str, encoding: VrfEncoding) -> String {
        let b64 = BASE64_STANDARD.encode(self.sign_bytes(input));
        match encoding {
            VrfEncoding::Base64 => b64,
            VrfEncoding::Url => b64
                .trim_end_matches('=')
                .chars()
                .map(|c| match c {
                    '+' => '-',
                    '/' => '_',
                    c => c,
                })
                .collect(),
        }
    }
}

static ENGINE: LazyLock<Result<SignatureEngine>> = LazyLock::new(SignatureEngine::new);

/// Decode the embedded constants now and report a broken build early
pub fn init() -> Result<()> {
    match &*ENGINE {
        Ok(_) => Ok(()),
        Err(SourceError::Configuration { name, reason }) => Err(SourceError::Configuration {
            name: name.clone(),
            reason: reason.clone(),
        }),
        Err(e) => Err(SourceError::config("vrf", e.to_string())),
    }
}

/// Sign `input` with the process-wide engine
///
/// Panics only if the embedded constants are malformed, which `init` reports
/// at startup.
pub fn compute_signature(input: &str, encoding: VrfEncoding) -> String {
    match &*ENGINE {
        Ok(engine) => engine.sign(input, encoding),
        Err(e) => panic!("signature constants failed to decode: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_ops_wrap() {
        assert_eq!(ByteOp::Add(223).apply(100), 67);
        assert_eq!(ByteOp::Sub(48).apply(10), 218);
        assert_eq!(ByteOp::Xor(0xff).apply(0x0f), 0xf0);
        assert_eq!(ByteOp::RotateLeft(4).apply(0x12), 0x21);
        assert_eq!(ByteOp::RotateLeft(4).apply(0xa5), 0x5a);
    }

    #[test]
    fn test_constants_decode() {
        let engine = SignatureEngine::new().unwrap();
        let lens: Vec<usize> = engine.stages().iter().map(Stage::prefix_len).collect();
        assert_eq!(lens, vec![7, 10, 9, 7, 5]);
        assert!(init().is_ok());
    }

    #[test]
    fn test_rc4_keystream_matches_reference_vector() {
        let key: Vec<u8> = (1..=32).collect();
        let mut cipher = Rc4::new(Key::<U32>::from_slice(&key));
        let mut data = [0u8; 16];
        cipher.apply_keystream(&mut data);
        assert_eq!(
            data,
            [
                0xea, 0xa6, 0xbd, 0x25, 0x88, 0x0b, 0xf9, 0x3d, 0x3f, 0x5d, 0x1e, 0x4c, 0xa2,
                0x61, 0x1d, 0x91
            ]
        );
    }

    #[test]
    fn test_first_stage_interleaves_prefix() {
        let engine = SignatureEngine::new().unwrap();
        let stage = &engine.stages()[0];
        assert_eq!(stage.run(b"a".to_vec()), vec![70, 106]);
        assert_eq!(stage.run(b"ab".to_vec()), vec![70, 106, 140, 16]);
    }

    #[test]
    fn test_output_grows_with_prefix_window() {
        let engine = SignatureEngine::new().unwrap();
        let stage = &engine.stages()[4];
        assert_eq!(stage.run(vec![0; 3]).len(), 6);
        assert_eq!(stage.run(vec![0; 20]).len(), 25);
    }

    #[test]
    fn test_rejects_short_key() {
        let err = Stage::decode(0, "AAAA", STAGES[0].seed, STAGES[0].prefix, STAGES[0].schedule)
            .unwrap_err();
        assert!(matches!(err, SourceError::Configuration { .. }));
        assert!(err.to_string().contains("stage[0].key"));
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let err = Stage::decode(3, STAGES[3].key, "not base64!", STAGES[3].prefix, STAGES[3].schedule)
            .unwrap_err();
        assert!(err.to_string().contains("stage[3].seed"));
    }

    #[test]
    fn test_known_signature() {
        assert_eq!(
            compute_signature("a", VrfEncoding::Url),
            "ZBYeRCjYBk0tkZnKW4kTuWBYw5w"
        );
        assert_eq!(
            compute_signature("a", VrfEncoding::Base64),
            "ZBYeRCjYBk0tkZnKW4kTuWBYw5w="
        );
    }
}
