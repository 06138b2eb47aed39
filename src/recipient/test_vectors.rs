use alloc::vec::Vec;

pub const SHARED_KEY: [u8; 32] = [
    0x84, 0x9B, 0x57, 0x21, 0x9D, 0xAE, 0x48, 0xDE, 0x64, 0x6D, 0x07, 0xDB,
    0xB5, 0x33, 0x56, 0x6E, 0x97, 0x66, 0x86, 0x45, 0x7C, 0x14, 0x91, 0xBE,
    0x3A, 0x76, 0xDC, 0xEA, 0x6C, 0x42, 0x71, 0x88,
];
pub const CEK: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB,
    0xCC, 0xDD, 0xEE, 0xFF,
];
pub const KEK_128: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
    0x0C, 0x0D, 0x0E, 0x0F,
];
pub const KEK_192: [u8; 24] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
    0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
];
pub const KEK_256: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
    0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
    0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F,
];

pub const PARTY_U_IDENTITY: [u8; 6] = *b"sender";
pub const PARTY_U_NONCE: [u8; 4] = [0x01, 0x02, 0x03, 0x04];
pub const PARTY_U_OTHER: [u8; 3] = *b"u-o";
pub const PARTY_V_IDENTITY: [u8; 8] = *b"receiver";
pub const PARTY_V_NONCE: [u8; 4] = [0x05, 0x06, 0x07, 0x08];
pub const PARTY_V_OTHER: [u8; 3] = *b"v-o";
pub const SUPP_PUB_OTHER: [u8; 7] = *b"pub-oth";
pub const SUPP_PRIV_OTHER: [u8; 8] = *b"priv-oth";

// ECDH-ES + A128KW with an X25519 ephemeral key and an empty payload
pub const KAKW_PROTECTED: [u8; 5] = [0x44, 0xA1, 0x01, 0x38, 0x1C];
pub const KAKW_UNPROTECTED: [u8; 11] = [
    0xA1, 0x20, 0xA3, 0x01, 0x01, 0x20, 0x04, 0x21, 0x42, 0x01, 0x02,
];
pub const EMPTY_PAYLOAD: [u8; 1] = [0x40];

// A128KW with kid "kid" and a 24 byte wrapped key
pub const KW_RECIPIENT: [u8; 36] = [
    0x83, 0x40, 0xA2, 0x01, 0x22, 0x04, 0x43, 0x6B, 0x69, 0x64, 0x58, 0x18,
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
];

/// Returns the key agreement with key wrap recipient, with the key wrap
/// recipient nested in it if `nested` is set.
pub fn kakw_recipient(nested: bool) -> Vec<u8> {
    let mut bytes = vec![if nested { 0x84 } else { 0x83 }];
    bytes.extend_from_slice(&KAKW_PROTECTED);
    bytes.extend_from_slice(&KAKW_UNPROTECTED);
    bytes.extend_from_slice(&EMPTY_PAYLOAD);
    if nested {
        bytes.push(0x81);
        bytes.extend_from_slice(&KW_RECIPIENT);
    }

    bytes
}
