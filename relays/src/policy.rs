//! Key-policy files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Passphrase length used when neither the file nor the request sets one.
pub const DEFAULT_LENGTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("reading key policy {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing key policy {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// How to derive the passphrase for one site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SitePolicy {
    /// Name fed to the derivation; defaults to the site's key in `sites`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Character-class template (`A`, `a`, `1`, `*`, `!`); wins over `length`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punct: Option<bool>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub salt: String,
    /// Free-form notes such as login names or security answers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub hints: BTreeMap<String, String>,
    /// One-time-password seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl SitePolicy {
    /// Fills every unset field of `self` from `base`.
    fn or(mut self, base: &SitePolicy) -> Self {
        if self.host.is_empty() {
            self.host = base.host.clone();
        }
        if self.format.is_empty() {
            self.format = base.format.clone();
        }
        if self.length == 0 {
            self.length = base.length;
        }
        if self.punct.is_none() {
            self.punct = base.punct;
        }
        if self.salt.is_empty() {
            self.salt = base.salt.clone();
        }
        for (k, v) in &base.hints {
            self.hints.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if self.otp.is_none() {
            self.otp = base.otp.clone();
        }
        self
    }
}

/// The contents of a key-policy file.
///
/// ```yaml
/// default:
///   length: 18
///   punct: true
/// sites:
///   example.com:
///     format: "Aaaa-1111-aaaa"
///     hints:
///       user: me@example.com
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPolicy {
    pub default: SitePolicy,
    pub sites: BTreeMap<String, SitePolicy>,
}

impl KeyPolicy {
    /// Reads a YAML policy file. An empty file yields the default policy.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The effective policy for `host` and whether the host is listed.
    ///
    /// Listed sites inherit unset fields from `default`. Unlisted hosts get
    /// `default` itself. Either way the result names a host and a non-zero
    /// length.
    pub fn site(&self, host: &str) -> (SitePolicy, bool) {
        let (mut site, known) = match self.sites.get(host) {
            Some(site) => (site.clone().or(&self.default), true),
            None => (self.default.clone(), false),
        };
        if site.host.is_empty() || !known {
            site.host = host.to_string();
        }
        if site.length == 0 {
            site.length = DEFAULT_LENGTH;
        }
        (site, known)
    }

    /// Listed site names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.sites.keys().cloned().collect()
    }
}
