//! The algorithm registry and the family descriptors behind each entry.

use crate::{error::Lookup, Error};

registry! {
    /// The algorithms a message or recipient can name.
    pub enum Algorithm {
        unknown = |_: Lookup| Error::InvalidAlgorithm("unknown algorithm");
        invalid = Error::InvalidAlgorithm("algorithm must be int or tstr");
        Direct = -6 => "DIRECT",
        EcdhEsHkdf256 = -25 => "ECDH-ES+HKDF-256",
        EcdhEsHkdf512 = -26 => "ECDH-ES+HKDF-512",
        EcdhSsHkdf256 = -27 => "ECDH-SS+HKDF-256",
        EcdhSsHkdf512 = -28 => "ECDH-SS+HKDF-512",
        EcdhEsA128Kw = -29 => "ECDH-ES+A128KW",
        EcdhEsA192Kw = -30 => "ECDH-ES+A192KW",
        EcdhEsA256Kw = -31 => "ECDH-ES+A256KW",
        EcdhSsA128Kw = -32 => "ECDH-SS+A128KW",
        EcdhSsA192Kw = -33 => "ECDH-SS+A192KW",
        EcdhSsA256Kw = -34 => "ECDH-SS+A256KW",
        A128Kw = -3 => "A128KW",
        A192Kw = -4 => "A192KW",
        A256Kw = -5 => "A256KW",
        RsaOaep = -40 => "RSA-OAEP",
        RsaOaep256 = -41 => "RSA-OAEP-256",
        RsaOaep512 = -42 => "RSA-OAEP-512",
        A128Gcm = 1 => "A128GCM",
        A192Gcm = 2 => "A192GCM",
        A256Gcm = 3 => "A256GCM",
        AesCcm16_64_128 = 10 => "AES-CCM-16-64-128",
        AesCcm16_64_256 = 11 => "AES-CCM-16-64-256",
        AesCcm64_64_128 = 12 => "AES-CCM-64-64-128",
        AesCcm64_64_256 = 13 => "AES-CCM-64-64-256",
        AesCcm16_128_128 = 30 => "AES-CCM-16-128-128",
        AesCcm16_128_256 = 31 => "AES-CCM-16-128-256",
        AesCcm64_128_128 = 32 => "AES-CCM-64-128-128",
        AesCcm64_128_256 = 33 => "AES-CCM-64-128-256",
        Hmac256_64 = 4 => "HMAC-256/64",
        Hmac256 = 5 => "HMAC-256/256",
        Hmac384 = 6 => "HMAC-384/384",
        Hmac512 = 7 => "HMAC-512/512",
        EdDsa = -8 => "EDDSA",
        Es256 = -7 => "ES256",
        Es384 = -35 => "ES384",
        Es512 = -36 => "ES512",
        Ps256 = -37 => "PS256",
        Ps384 = -38 => "PS384",
        Ps512 = -39 => "PS512",
        Rs256 = -257 => "RS256",
        Rs384 = -258 => "RS384",
        Rs512 = -259 => "RS512",
        Sha256_64 = -15 => "SHA-256/64",
        Sha256 = -16 => "SHA-256",
        Sha512_256 = -17 => "SHA-512/256",
        Sha384 = -43 => "SHA-384",
        Sha512 = -44 => "SHA-512",
    }
}

/// The behavior an algorithm belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// The shared key is used as the CEK.
    Direct,
    /// ECDH followed by HKDF yields the CEK.
    DirectAgreement,
    /// ECDH followed by HKDF yields a KEK for AES key wrap.
    AgreementKeyWrap,
    /// A pre-shared KEK wraps the CEK.
    KeyWrap,
    /// The recipient's RSA public key encrypts the CEK.
    RsaOaep,
    /// Authenticated encryption of content.
    Aead,
    Mac,
    Signature,
    Hash,
}

impl Algorithm {
    pub fn family(&self) -> Family {
        use Algorithm::*;

        match self {
            Direct => Family::Direct,
            EcdhEsHkdf256 | EcdhEsHkdf512 | EcdhSsHkdf256 | EcdhSsHkdf512 => {
                Family::DirectAgreement
            }
            EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw | EcdhSsA128Kw
            | EcdhSsA192Kw | EcdhSsA256Kw => Family::AgreementKeyWrap,
            A128Kw | A192Kw | A256Kw => Family::KeyWrap,
            RsaOaep | RsaOaep256 | RsaOaep512 => Family::RsaOaep,
            A128Gcm | A192Gcm | A256Gcm | AesCcm16_64_128 | AesCcm16_64_256
            | AesCcm64_64_128 | AesCcm64_64_256 | AesCcm16_128_128
            | AesCcm16_128_256 | AesCcm64_128_128 | AesCcm64_128_256 => {
                Family::Aead
            }
            Hmac256_64 | Hmac256 | Hmac384 | Hmac512 => Family::Mac,
            EdDsa | Es256 | Es384 | Es512 | Ps256 | Ps384 | Ps512 | Rs256
            | Rs384 | Rs512 => Family::Signature,
            Sha256_64 | Sha256 | Sha512_256 | Sha384 | Sha512 => Family::Hash,
        }
    }

    /// Returns the length in bytes of the key this algorithm uses or, for
    /// agreement algorithms, derives.
    ///
    /// Direct, RSA, signature and hash algorithms have no fixed length.
    pub fn key_length(&self) -> Option<usize> {
        use Algorithm::*;

        match self {
            A128Kw | EcdhEsA128Kw | EcdhSsA128Kw | A128Gcm
            | AesCcm16_64_128 | AesCcm64_64_128 | AesCcm16_128_128
            | AesCcm64_128_128 => Some(16),
            A192Kw | EcdhEsA192Kw | EcdhSsA192Kw | A192Gcm => Some(24),
            A256Kw | EcdhEsA256Kw | EcdhSsA256Kw | A256Gcm
            | AesCcm16_64_256 | AesCcm64_64_256 | AesCcm16_128_256
            | AesCcm64_128_256 => Some(32),
            EcdhEsHkdf256 | EcdhSsHkdf256 | Hmac256_64 | Hmac256 => Some(32),
            Hmac384 => Some(48),
            EcdhEsHkdf512 | EcdhSsHkdf512 | Hmac512 => Some(64),
            _ => None,
        }
    }

    /// Returns the hash function the algorithm is built on.
    pub fn hash(&self) -> Option<Algorithm> {
        use Algorithm::*;

        match self {
            EcdhEsHkdf256 | EcdhSsHkdf256 | EcdhEsA128Kw | EcdhEsA192Kw
            | EcdhEsA256Kw | EcdhSsA128Kw | EcdhSsA192Kw | EcdhSsA256Kw
            | RsaOaep256 | Hmac256_64 | Hmac256 | Es256 | Ps256 | Rs256 => {
                Some(Sha256)
            }
            Hmac384 | Es384 | Ps384 | Rs384 => Some(Sha384),
            EcdhEsHkdf512 | EcdhSsHkdf512 | RsaOaep512 | Hmac512 | EdDsa
            | Es512 | Ps512 | Rs512 => Some(Sha512),
            Sha256_64 | Sha256 | Sha512_256 | Sha384 | Sha512 => Some(*self),
            _ => None,
        }
    }

    /// Returns the AES key wrap algorithm paired with an agreement algorithm.
    pub fn key_wrap(&self) -> Option<Algorithm> {
        use Algorithm::*;

        match self {
            EcdhEsA128Kw | EcdhSsA128Kw => Some(A128Kw),
            EcdhEsA192Kw | EcdhSsA192Kw => Some(A192Kw),
            EcdhEsA256Kw | EcdhSsA256Kw => Some(A256Kw),
            _ => None,
        }
    }

    /// Returns whether the sender contributes a fresh ephemeral key to the
    /// agreement, as opposed to a static one.
    pub fn is_ephemeral_agreement(&self) -> bool {
        use Algorithm::*;

        matches!(
            self,
            EcdhEsHkdf256
                | EcdhEsHkdf512
                | EcdhEsA128Kw
                | EcdhEsA192Kw
                | EcdhEsA256Kw
        )
    }

    /// Returns the nonce length of an AEAD algorithm, in bytes.
    pub fn nonce_length(&self) -> Option<usize> {
        use Algorithm::*;

        match self {
            A128Gcm | A192Gcm | A256Gcm => Some(12),
            AesCcm16_64_128 | AesCcm16_64_256 | AesCcm16_128_128
            | AesCcm16_128_256 => Some(13),
            AesCcm64_64_128 | AesCcm64_64_256 | AesCcm64_128_128
            | AesCcm64_128_256 => Some(7),
            _ => None,
        }
    }

    /// Returns the authentication tag length of an AEAD or MAC algorithm,
    /// in bytes.
    pub fn tag_length(&self) -> Option<usize> {
        use Algorithm::*;

        match self {
            A128Gcm | A192Gcm | A256Gcm => Some(16),
            AesCcm16_64_128 | AesCcm16_64_256 | AesCcm64_64_128
            | AesCcm64_64_256 => Some(8),
            AesCcm16_128_128 | AesCcm16_128_256 | AesCcm64_128_128
            | AesCcm64_128_256 => Some(16),
            // Truncated to 64 bits
            Hmac256_64 => Some(8),
            Hmac256 => Some(32),
            Hmac384 => Some(48),
            Hmac512 => Some(64),
            _ => None,
        }
    }
}
