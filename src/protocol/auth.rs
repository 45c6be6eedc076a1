use std::str::FromStr;

use memchr::memchr;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// The challenge/response scheme negotiated during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthPlugin {
    MySqlNativePassword,
    CachingSha2Password,
}

impl AuthPlugin {
    pub(crate) fn name(self) -> &'static str {
        match self {
            AuthPlugin::MySqlNativePassword => "mysql_native_password",
            AuthPlugin::CachingSha2Password => "caching_sha2_password",
        }
    }

    /// Compute the auth response for the 20-byte challenge.
    ///
    /// An empty password always produces an empty response.
    pub(crate) fn scramble(self, password: &str, nonce: &[u8]) -> Vec<u8> {
        if password.is_empty() {
            return Vec::new();
        }

        // the nonce as sent is (optionally) NUL terminated and may carry a
        // trailing byte beyond the 20 challenge bytes
        let end = memchr(b'\0', nonce).unwrap_or(nonce.len());
        let nonce = &nonce[..end.min(20)];

        match self {
            AuthPlugin::MySqlNativePassword => scramble_sha1(password, nonce),
            AuthPlugin::CachingSha2Password => scramble_sha256(password, nonce),
        }
    }
}

impl FromStr for AuthPlugin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "mysql_native_password" => Ok(AuthPlugin::MySqlNativePassword),
            "caching_sha2_password" => Ok(AuthPlugin::CachingSha2Password),

            _ => Err(Error::UnsupportedAuthPlugin(s.to_owned())),
        }
    }
}

fn scramble_sha1(password: &str, nonce: &[u8]) -> Vec<u8> {
    // SHA1( password ) ^ SHA1( nonce + SHA1( SHA1( password ) ) )
    // https://mariadb.com/kb/en/connection/#mysql_native_password-plugin

    let mut ctx = Sha1::new();

    ctx.update(password);

    let mut pw_hash = ctx.finalize_reset();

    ctx.update(pw_hash);

    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(nonce);
    ctx.update(pw_hash_hash);

    let pw_nonce_hash = ctx.finalize();

    xor_eq(&mut pw_hash, &pw_nonce_hash);

    pw_hash.to_vec()
}

fn scramble_sha256(password: &str, nonce: &[u8]) -> Vec<u8> {
    // XOR( SHA256( password ), SHA256( SHA256( SHA256( password ) ) + nonce ) )
    // https://mariadb.com/kb/en/caching_sha2_password-authentication-plugin/#sha-2-encrypted-password

    let mut ctx = Sha256::new();

    ctx.update(password);

    let mut pw_hash = ctx.finalize_reset();

    ctx.update(pw_hash);

    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(pw_hash_hash);
    ctx.update(nonce);

    let pw_nonce_hash = ctx.finalize();

    xor_eq(&mut pw_hash, &pw_nonce_hash);

    pw_hash.to_vec()
}

// x ^= y, wrapping around y if it is shorter than x
fn xor_eq(x: &mut [u8], y: &[u8]) {
    let y_len = y.len();

    for i in 0..x.len() {
        x[i] ^= y[i % y_len];
    }
}
