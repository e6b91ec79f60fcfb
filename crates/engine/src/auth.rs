//! Request authorization: per-action nonce plus a role/capability check
//!
//! A nonce is `hex(sha256("{secret}:{action}"))`, so a nonce minted for one
//! action is useless for another. The bearer token maps the caller to a role;
//! only administrators may drive the automation.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{AutomationError, AutomationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Subscriber,
}

impl Role {
    /// Capability required for every automation action
    pub fn can_manage_options(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

pub fn create_nonce(secret: &str, action: &str) -> String {
    let hash = Sha256::digest(format!("{}:{}", secret, action).as_bytes());
    format!("{:x}", hash)
}

pub fn verify_nonce(secret: &str, action: &str, nonce: &str) -> bool {
    constant_time_eq(create_nonce(secret, action).as_bytes(), nonce.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Secrets the server checks requests against
#[derive(Clone)]
pub struct AccessPolicy {
    api_token: String,
    nonce_secret: String,
}

impl AccessPolicy {
    pub fn new(api_token: impl Into<String>, nonce_secret: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            nonce_secret: nonce_secret.into(),
        }
    }

    pub fn nonce_for(&self, action: &str) -> String {
        create_nonce(&self.nonce_secret, action)
    }

    pub fn role_for(&self, bearer: Option<&str>) -> Role {
        match bearer {
            Some(token)
                if !self.api_token.is_empty()
                    && constant_time_eq(token.as_bytes(), self.api_token.as_bytes()) =>
            {
                Role::Administrator
            }
            _ => Role::Subscriber,
        }
    }

    /// Every failure collapses into the same `PermissionDenied`
    pub fn authorize(
        &self,
        bearer: Option<&str>,
        action: &str,
        nonce: Option<&str>,
    ) -> AutomationResult<Role> {
        let nonce_ok = nonce
            .map(|n| verify_nonce(&self.nonce_secret, action, n))
            .unwrap_or(false);
        if !nonce_ok {
            debug!(action, "Rejected request: bad or missing nonce");
            return Err(AutomationError::PermissionDenied);
        }

        let role = self.role_for(bearer);
        if !role.can_manage_options() {
            debug!(action, ?role, "Rejected request: insufficient role");
            return Err(AutomationError::PermissionDenied);
        }

        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::new("admin-token", "nonce-secret")
    }

    #[test]
    fn test_nonce_is_hex_sha256() {
        let nonce = create_nonce("s", "toggle_automation");
        assert_eq!(nonce.len(), 64);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(nonce, create_nonce("s", "toggle_automation"));
    }

    #[test]
    fn test_nonce_is_bound_to_action() {
        let nonce = create_nonce("s", "toggle_automation");
        assert!(verify_nonce("s", "toggle_automation", &nonce));
        assert!(!verify_nonce("s", "clear_process_errors", &nonce));
        assert!(!verify_nonce("other", "toggle_automation", &nonce));
    }

    #[test]
    fn test_authorize_admin_with_valid_nonce() {
        let p = policy();
        let nonce = p.nonce_for("get_automation_status");
        let role = p
            .authorize(Some("admin-token"), "get_automation_status", Some(&nonce))
            .unwrap();
        assert_eq!(role, Role::Administrator);
    }

    #[test]
    fn test_authorize_rejects_missing_nonce() {
        let err = policy()
            .authorize(Some("admin-token"), "get_automation_status", None)
            .unwrap_err();
        assert!(matches!(err, AutomationError::PermissionDenied));
    }

    #[test]
    fn test_authorize_rejects_wrong_token() {
        let p = policy();
        let nonce = p.nonce_for("toggle_automation");
        for bearer in [None, Some("guess"), Some("")] {
            let err = p
                .authorize(bearer, "toggle_automation", Some(&nonce))
                .unwrap_err();
            assert!(matches!(err, AutomationError::PermissionDenied));
        }
    }

    #[test]
    fn test_empty_api_token_never_grants_admin() {
        let p = AccessPolicy::new("", "nonce-secret");
        assert_eq!(p.role_for(Some("")), Role::Subscriber);
    }
}
