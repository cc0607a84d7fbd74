//! Passphrase derivation.

use crate::policy::SitePolicy;
use errors::ServiceError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const PUNCT: &[u8] = b"!@#$%^&*-_=+?";

/// Turns a site policy and a secret into a passphrase. Must be
/// deterministic.
pub trait PassphraseDeriver: Send + Sync {
    fn derive(&self, site: &SitePolicy, secret: &str) -> Result<String, ServiceError>;
}

/// HMAC-SHA256 keyed by the secret over the salt and host, expanded with a
/// block counter.
///
/// With a `format`, each template character picks from a class: `A` upper,
/// `a` lower, `1` digit, `*` alphanumeric, `!` punctuation; anything else is
/// copied. Otherwise `length` characters are drawn from the alphanumerics,
/// plus punctuation when `punct` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacDeriver;

impl HmacDeriver {
    fn stream(site: &SitePolicy, secret: &str, n: usize) -> Result<Vec<u8>, ServiceError> {
        let mut out = Vec::with_capacity(n);
        let mut block: u32 = 0;
        while out.len() < n {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|e| ServiceError::internal("deriving passphrase", e))?;
            mac.update(site.salt.as_bytes());
            mac.update(&[0]);
            mac.update(site.host.as_bytes());
            mac.update(&block.to_be_bytes());
            out.extend_from_slice(&mac.finalize().into_bytes());
            block += 1;
        }
        out.truncate(n);
        Ok(out)
    }
}

fn pick(class: &[u8], b: u8) -> char {
    class[usize::from(b) % class.len()] as char
}

impl PassphraseDeriver for HmacDeriver {
    fn derive(&self, site: &SitePolicy, secret: &str) -> Result<String, ServiceError> {
        if !site.format.is_empty() {
            let template: Vec<char> = site.format.chars().collect();
            let bytes = Self::stream(site, secret, template.len())?;
            let alnum = [UPPER, LOWER, DIGITS].concat();
            return Ok(template
                .iter()
                .zip(bytes)
                .map(|(&c, b)| match c {
                    'A' => pick(UPPER, b),
                    'a' => pick(LOWER, b),
                    '1' => pick(DIGITS, b),
                    '*' => pick(&alnum, b),
                    '!' => pick(PUNCT, b),
                    other => other,
                })
                .collect());
        }

        let mut alphabet = [UPPER, LOWER, DIGITS].concat();
        if site.punct == Some(true) {
            alphabet.extend_from_slice(PUNCT);
        }
        let bytes = Self::stream(site, secret, site.length)?;
        Ok(bytes.into_iter().map(|b| pick(&alphabet, b)).collect())
    }
}

/// Short fingerprint of a passphrase for visual confirmation.
pub fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..4])
}
