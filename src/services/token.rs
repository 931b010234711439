use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// 32 random bytes, hex encoded. Used for both API tokens and magic-link tokens.
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
