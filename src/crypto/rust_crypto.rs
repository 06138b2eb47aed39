use aes::{Aes128, Aes192, Aes256};
use aes_gcm::{
    aead::{
        consts::{U12, U13, U16, U7, U8},
        generic_array::GenericArray,
        Aead, KeyInit, Payload,
    },
    Aes128Gcm, Aes256Gcm, AesGcm,
};
use aes_kw::Kek;
use alloc::vec::Vec;
use ccm::Ccm;
use ed25519_dalek::{Signer as _, Verifier as _};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::{OsRng, RngCore};
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512, Sha512_256};

use super::{check_key_wrap_input, CryptoBackend, CryptoError};
use crate::{
    algorithm::{Algorithm, Family},
    attribute::{Curve, KeyParam, KeyType, RsaParam},
    kdf::KdfContext,
    key::CoseKey,
    Error, Result,
};

/// The default backend, built on the RustCrypto and dalek crates.
///
/// Covers AES-GCM, AES-CCM, AES key wrap, RSA-OAEP with SHA-256 and SHA-512,
/// ECDH over X25519 and P-256 with HKDF, HMAC, EdDSA over Ed25519, ES256 and
/// the SHA-2 hashes. Randomness comes from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct RustCrypto;

/// Runs `$body` with `$cipher` bound to the AEAD type of `$alg`.
macro_rules! with_aead {
    ($alg:expr, $cipher:ident => $body:expr) => {
        match $alg {
            Algorithm::A128Gcm => {
                type $cipher = Aes128Gcm;
                $body
            }
            Algorithm::A192Gcm => {
                type $cipher = AesGcm<Aes192, U12>;
                $body
            }
            Algorithm::A256Gcm => {
                type $cipher = Aes256Gcm;
                $body
            }
            Algorithm::AesCcm16_64_128 => {
                type $cipher = Ccm<Aes128, U8, U13>;
                $body
            }
            Algorithm::AesCcm16_64_256 => {
                type $cipher = Ccm<Aes256, U8, U13>;
                $body
            }
            Algorithm::AesCcm64_64_128 => {
                type $cipher = Ccm<Aes128, U8, U7>;
                $body
            }
            Algorithm::AesCcm64_64_256 => {
                type $cipher = Ccm<Aes256, U8, U7>;
                $body
            }
            Algorithm::AesCcm16_128_128 => {
                type $cipher = Ccm<Aes128, U16, U13>;
                $body
            }
            Algorithm::AesCcm16_128_256 => {
                type $cipher = Ccm<Aes256, U16, U13>;
                $body
            }
            Algorithm::AesCcm64_128_128 => {
                type $cipher = Ccm<Aes128, U16, U7>;
                $body
            }
            Algorithm::AesCcm64_128_256 => {
                type $cipher = Ccm<Aes256, U16, U7>;
                $body
            }
            other => Err(CryptoError::UnsupportedAlgorithm(other).into()),
        }
    };
}

impl CryptoBackend for RustCrypto {
    fn encrypt(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let k = symmetric_key(alg, key)?;
        check_nonce(alg, nonce)?;
        with_aead!(alg, C => {
            let cipher = C::new_from_slice(k)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            let payload = Payload { msg: plaintext, aad };
            Ok(cipher.encrypt(GenericArray::from_slice(nonce), payload)?)
        })
    }

    fn decrypt(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let k = symmetric_key(alg, key)?;
        check_nonce(alg, nonce)?;
        with_aead!(alg, C => {
            let cipher = C::new_from_slice(k)
                .map_err(|_| CryptoError::InvalidKeyLength)?;
            let payload = Payload { msg: ciphertext, aad };
            Ok(cipher.decrypt(GenericArray::from_slice(nonce), payload)?)
        })
    }

    fn sign(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let d = key.d().ok_or(Error::InvalidKey("private key is missing"))?;
        match (alg, key.curve()?) {
            (Algorithm::EdDsa, Curve::Ed25519) => {
                let signing_key =
                    ed25519_dalek::SigningKey::from_bytes(&to_array(d)?);
                Ok(signing_key.sign(data).to_bytes().to_vec())
            }
            (Algorithm::Es256, Curve::P256) => {
                let signing_key = p256::ecdsa::SigningKey::from_slice(d)
                    .map_err(|_| CryptoError::Signature)?;
                let signature: p256::ecdsa::Signature = signing_key.sign(data);
                Ok(signature.to_bytes().to_vec())
            }
            (Algorithm::EdDsa, _) | (Algorithm::Es256, _) => {
                Err(Error::InvalidKey("curve doesn't fit the algorithm"))
            }
            (other, _) => Err(CryptoError::UnsupportedAlgorithm(other).into()),
        }
    }

    fn verify(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        match (alg, key.curve()?) {
            (Algorithm::EdDsa, Curve::Ed25519) => {
                let x = key.x().ok_or(Error::InvalidKey("x is missing"))?;
                let verifying_key =
                    ed25519_dalek::VerifyingKey::from_bytes(&to_array(x)?)
                        .map_err(|_| CryptoError::Signature)?;
                let signature =
                    match ed25519_dalek::Signature::from_slice(signature) {
                        Ok(signature) => signature,
                        Err(_) => return Ok(false),
                    };
                Ok(verifying_key.verify(data, &signature).is_ok())
            }
            (Algorithm::Es256, Curve::P256) => {
                let verifying_key =
                    p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1(key)?)
                        .map_err(|_| CryptoError::Signature)?;
                let signature =
                    match p256::ecdsa::Signature::from_slice(signature) {
                        Ok(signature) => signature,
                        Err(_) => return Ok(false),
                    };
                Ok(verifying_key.verify(data, &signature).is_ok())
            }
            (Algorithm::EdDsa, _) | (Algorithm::Es256, _) => {
                Err(Error::InvalidKey("curve doesn't fit the algorithm"))
            }
            (other, _) => Err(CryptoError::UnsupportedAlgorithm(other).into()),
        }
    }

    fn key_wrap(
        &self,
        alg: Algorithm,
        kek: &CoseKey,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        match alg {
            Algorithm::A128Kw | Algorithm::A192Kw | Algorithm::A256Kw => {
                check_key_wrap_input(data)?;
                let k = symmetric_key(alg, kek)?;
                Ok(match alg {
                    Algorithm::A128Kw => {
                        Kek::<Aes128>::new(GenericArray::from_slice(k))
                            .wrap_vec(data)?
                    }
                    Algorithm::A192Kw => {
                        Kek::<Aes192>::new(GenericArray::from_slice(k))
                            .wrap_vec(data)?
                    }
                    _ => Kek::<Aes256>::new(GenericArray::from_slice(k))
                        .wrap_vec(data)?,
                })
            }
            Algorithm::RsaOaep256 => Ok(rsa_public(kek)?.encrypt(
                &mut OsRng,
                Oaep::new::<Sha256>(),
                data,
            )?),
            Algorithm::RsaOaep512 => Ok(rsa_public(kek)?.encrypt(
                &mut OsRng,
                Oaep::new::<Sha512>(),
                data,
            )?),
            other => Err(CryptoError::UnsupportedAlgorithm(other).into()),
        }
    }

    fn key_unwrap(
        &self,
        alg: Algorithm,
        kek: &CoseKey,
        wrapped: &[u8],
    ) -> Result<Vec<u8>> {
        match alg {
            Algorithm::A128Kw | Algorithm::A192Kw | Algorithm::A256Kw => {
                // The output is one block shorter than the input
                if wrapped.len() < KW_MIN_WRAPPED
                    || wrapped.len() % super::KW_BLOCK != 0
                {
                    return Err(Error::ValueError(
                        "wrapped key has an invalid length",
                    ));
                }
                let k = symmetric_key(alg, kek)?;
                Ok(match alg {
                    Algorithm::A128Kw => {
                        Kek::<Aes128>::new(GenericArray::from_slice(k))
                            .unwrap_vec(wrapped)?
                    }
                    Algorithm::A192Kw => {
                        Kek::<Aes192>::new(GenericArray::from_slice(k))
                            .unwrap_vec(wrapped)?
                    }
                    _ => Kek::<Aes256>::new(GenericArray::from_slice(k))
                        .unwrap_vec(wrapped)?,
                })
            }
            Algorithm::RsaOaep256 => {
                Ok(rsa_private(kek)?.decrypt(Oaep::new::<Sha256>(), wrapped)?)
            }
            Algorithm::RsaOaep512 => {
                Ok(rsa_private(kek)?.decrypt(Oaep::new::<Sha512>(), wrapped)?)
            }
            other => Err(CryptoError::UnsupportedAlgorithm(other).into()),
        }
    }

    fn derive_kek(
        &self,
        alg: Algorithm,
        private: &CoseKey,
        public: &CoseKey,
        salt: Option<&[u8]>,
        context: &KdfContext,
    ) -> Result<Vec<u8>> {
        match alg.family() {
            Family::DirectAgreement | Family::AgreementKeyWrap => (),
            _ => {
                return Err(Error::InvalidAlgorithm(
                    "not a key agreement algorithm",
                ))
            }
        }
        let shared_secret = ecdh(private, public)?;
        let info = context.encode()?;

        hkdf_expand(alg, salt, &shared_secret, &info, context.key_length())
    }

    fn generate_key(&self, curve: Curve) -> Result<CoseKey> {
        log::debug!("Generating key pair on {}", curve);
        match curve {
            Curve::X25519 => {
                let secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
                let public = x25519_dalek::PublicKey::from(&secret);
                let d = secret.to_bytes();
                CoseKey::okp(curve, public.as_bytes(), Some(&d[..]))
            }
            Curve::P256 => {
                let secret = p256::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false);
                let x = point.x().ok_or(CryptoError::EllipticCurve)?;
                let y = point.y().ok_or(CryptoError::EllipticCurve)?;
                let d = secret.to_bytes();
                CoseKey::ec2(curve, x, y, Some(d.as_slice()))
            }
            Curve::Ed25519 => {
                let seed: [u8; 32] = to_array(&self.random(32)?)?;
                let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
                let x = signing_key.verifying_key().to_bytes();
                CoseKey::okp(curve, &x, Some(&seed[..]))
            }
            other => Err(CryptoError::UnsupportedCurve(other).into()),
        }
    }

    fn random(&self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| CryptoError::Random)?;

        Ok(bytes)
    }

    fn compute_hash(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>> {
        match alg {
            Algorithm::Sha256 => Ok(Sha256::digest(data).to_vec()),
            // Truncated to the leftmost 64 bits
            Algorithm::Sha256_64 => Ok(Sha256::digest(data)[..8].to_vec()),
            Algorithm::Sha512_256 => Ok(Sha512_256::digest(data).to_vec()),
            Algorithm::Sha384 => Ok(Sha384::digest(data).to_vec()),
            Algorithm::Sha512 => Ok(Sha512::digest(data).to_vec()),
            other => Err(CryptoError::UnsupportedAlgorithm(other).into()),
        }
    }

    fn compute_tag(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let k = key
            .k()
            .ok_or(Error::InvalidKeyType("MAC key must be symmetric"))?;
        let mut tag = match alg {
            Algorithm::Hmac256_64 | Algorithm::Hmac256 => {
                hmac_tag::<Hmac<Sha256>>(k, data)?
            }
            Algorithm::Hmac384 => hmac_tag::<Hmac<Sha384>>(k, data)?,
            Algorithm::Hmac512 => hmac_tag::<Hmac<Sha512>>(k, data)?,
            other => {
                return Err(CryptoError::UnsupportedAlgorithm(other).into())
            }
        };
        tag.truncate(alg.tag_length().unwrap_or(tag.len()));

        Ok(tag)
    }
}

/// The shortest AES key wrap output: a 16 byte key plus the integrity block.
const KW_MIN_WRAPPED: usize = super::KW_MIN_INPUT + super::KW_BLOCK;

/// Returns the bytes of a symmetric key, checking they fit the algorithm.
fn symmetric_key(alg: Algorithm, key: &CoseKey) -> Result<&[u8]> {
    let k = key
        .k()
        .ok_or(Error::InvalidKeyType("key must be symmetric"))?;
    if alg.key_length().map_or(false, |len| len != k.len()) {
        return Err(CryptoError::InvalidKeyLength.into());
    }

    Ok(k)
}

fn check_nonce(alg: Algorithm, nonce: &[u8]) -> Result<()> {
    match alg.nonce_length() {
        Some(len) if len == nonce.len() => Ok(()),
        Some(_) => Err(Error::InvalidHeader("nonce has the wrong length")),
        None => Err(CryptoError::UnsupportedAlgorithm(alg).into()),
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength.into())
}

/// Returns the uncompressed SEC1 encoding of an EC2 public key.
fn sec1(key: &CoseKey) -> Result<Vec<u8>> {
    let x = key.x().ok_or(Error::InvalidKey("x is missing"))?;
    let y = key.y().ok_or(Error::InvalidKey("y is missing"))?;
    let mut point = Vec::with_capacity(1 + x.len() + y.len());
    point.push(0x04);
    point.extend_from_slice(x);
    point.extend_from_slice(y);

    Ok(point)
}

/// Returns the shared secret of a Diffie-Hellman exchange.
fn ecdh(private: &CoseKey, public: &CoseKey) -> Result<Vec<u8>> {
    let curve = private.curve()?;
    if public.curve()? != curve {
        return Err(Error::InvalidKey("keys are on different curves"));
    }
    let d = private
        .d()
        .ok_or(Error::InvalidKey("private key is missing"))?;
    match curve {
        Curve::X25519 => {
            let x = public.x().ok_or(Error::InvalidKey("x is missing"))?;
            let d: [u8; 32] = to_array(d)?;
            let x: [u8; 32] = to_array(x)?;
            let secret = x25519_dalek::StaticSecret::from(d);
            let shared =
                secret.diffie_hellman(&x25519_dalek::PublicKey::from(x));
            // Low order points give an all-zero secret
            if !shared.was_contributory() {
                return Err(CryptoError::EllipticCurve.into());
            }
            Ok(shared.as_bytes().to_vec())
        }
        Curve::P256 => {
            let secret = p256::SecretKey::from_slice(d)?;
            let public = p256::PublicKey::from_sec1_bytes(&sec1(public)?)?;
            let shared = p256::ecdh::diffie_hellman(
                secret.to_nonzero_scalar(),
                public.as_affine(),
            );
            Ok(shared.raw_secret_bytes().to_vec())
        }
        other => Err(CryptoError::UnsupportedCurve(other).into()),
    }
}

/// Extracts a pseudorandom key from the shared secret and expands it to
/// `len` bytes, with the hash of the agreement algorithm.
fn hkdf_expand(
    alg: Algorithm,
    salt: Option<&[u8]>,
    ikm: &[u8],
    info: &[u8],
    len: usize,
) -> Result<Vec<u8>> {
    let mut okm = vec![0; len];
    match alg.hash() {
        Some(Algorithm::Sha256) => {
            Hkdf::<Sha256>::new(salt, ikm).expand(info, &mut okm)?
        }
        Some(Algorithm::Sha512) => {
            Hkdf::<Sha512>::new(salt, ikm).expand(info, &mut okm)?
        }
        _ => return Err(CryptoError::UnsupportedAlgorithm(alg).into()),
    }

    Ok(okm)
}

fn hmac_tag<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKeyLength)?;
    mac.update(data);

    Ok(mac.finalize().into_bytes().to_vec())
}

fn rsa_public(key: &CoseKey) -> Result<RsaPublicKey> {
    let n = key.n().ok_or(Error::InvalidKeyType("key must be RSA"))?;
    let e = key.e().ok_or(Error::InvalidKey("e is missing"))?;

    Ok(RsaPublicKey::new(
        BigUint::from_bytes_be(n),
        BigUint::from_bytes_be(e),
    )?)
}

fn rsa_private(key: &CoseKey) -> Result<RsaPrivateKey> {
    if key.kty() != KeyType::Rsa {
        return Err(Error::InvalidKeyType("key must be RSA"));
    }
    let component = |param| {
        key.bytes(KeyParam::Rsa(param))
            .map(BigUint::from_bytes_be)
            .ok_or(Error::InvalidKey("RSA private component is missing"))
    };

    Ok(RsaPrivateKey::from_components(
        component(RsaParam::N)?,
        component(RsaParam::E)?,
        component(RsaParam::D)?,
        vec![component(RsaParam::P)?, component(RsaParam::Q)?],
    )?)
}
