//! The access-token hook.

use config::{AuthConfig, SharedConfig};
use errors::ServiceError;
use tracing::debug;

/// Decides whether a call may proceed.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, method: &str, token: Option<&str>) -> Result<(), ServiceError>;
}

/// One `auth.rules` entry: a method glob, denying when written `-pattern`.
#[derive(Debug, Clone)]
struct Rule {
    deny: bool,
    pattern: glob::Pattern,
}

fn compile(rules: &[String]) -> Result<Vec<Rule>, glob::PatternError> {
    rules
        .iter()
        .map(|r| {
            let (deny, pattern) = match r.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, r.as_str()),
            };
            Ok(Rule {
                deny,
                pattern: glob::Pattern::new(pattern)?,
            })
        })
        .collect()
}

/// Checks `rules` for malformed globs.
pub fn check_rules(auth: &AuthConfig) -> Result<(), glob::PatternError> {
    compile(&auth.rules).map(|_| ())
}

/// Enforces `auth.token` and `auth.rules` from the current config snapshot.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// - With a token configured, every call must carry it.
/// - Rules are tried in order and the first matching glob decides; a
///   leading `-` makes it a deny rule. With rules configured, a method no
///   rule matches is denied. No rules allow everything.
/// - `rpc.*` methods are always allowed.
///
/// Reads the snapshot on every call, so reloads apply immediately.
pub struct TokenAuthorizer {
    config: SharedConfig,
}

impl TokenAuthorizer {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }
}

impl Authorizer for TokenAuthorizer {
    fn authorize(&self, method: &str, token: Option<&str>) -> Result<(), ServiceError> {
        if method.starts_with("rpc.") {
            return Ok(());
        }
        let snapshot = self.config.current();
        let auth = &snapshot.auth;

        if let Some(expected) = auth.token.as_deref().filter(|t| !t.is_empty()) {
            if token != Some(expected) {
                debug!(method, "Rejected call with missing or wrong token");
                return Err(ServiceError::unauthorized("invalid access token"));
            }
        }
        if auth.rules.is_empty() {
            return Ok(());
        }
        let rules = compile(&auth.rules)
            .map_err(|e| ServiceError::internal("compiling auth rules", e))?;
        match rules.iter().find(|r| r.pattern.matches(method)) {
            Some(rule) if !rule.deny => Ok(()),
            Some(rule) => Err(ServiceError::unauthorized(format!(
                "method {method} denied by rule -{}",
                rule.pattern
            ))),
            None => Err(ServiceError::unauthorized(format!(
                "method {method} matches no rule"
            ))),
        }
    }
}
