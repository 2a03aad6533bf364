use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Identifier of the principal that owns tenant-scoped rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Already-authenticated caller identity handed over by the host.
/// Token validation happens before a principal reaches the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Principal {
    pub name: Option<String>,
    pub authenticated: bool,
    claims: HashMap<String, String>,
}

impl Principal {
    /// Authenticated principal with no claims yet
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            authenticated: true,
            claims: HashMap::new(),
        }
    }

    /// Authenticated principal whose owner claim carries the given user id
    pub fn for_user(user_id: Uuid) -> Self {
        let claim = config::config().tenant.owner_claim.clone();
        Self::authenticated(user_id.to_string()).with_claim(claim, user_id.to_string())
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    #[error("Access denied: no authenticated principal")]
    AccessDenied,

    #[error("Principal is missing the '{0}' owner claim")]
    MissingOwnerClaim(String),

    #[error("Owner claim '{claim}' is not a valid id: {value}")]
    InvalidOwnerClaim { claim: String, value: String },
}

/// Per-request tenant context. Passed explicitly to the storage session
/// instead of being read from ambient state.
#[derive(Debug, Clone)]
pub struct TenantContext {
    principal: Option<Principal>,
    owner_claim: String,
}

impl TenantContext {
    pub fn new(principal: Option<Principal>) -> Self {
        Self::with_owner_claim(principal, config::config().tenant.owner_claim.clone())
    }

    pub fn with_owner_claim(principal: Option<Principal>, owner_claim: impl Into<String>) -> Self {
        Self {
            principal,
            owner_claim: owner_claim.into(),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Resolve the owner id of the current principal.
    ///
    /// Fails with [`TenantError::AccessDenied`] when there is no authenticated
    /// principal and with a claim error when the principal carries no usable
    /// owner claim.
    pub fn resolve_owner_id(&self) -> Result<OwnerId, TenantError> {
        let principal = self
            .principal
            .as_ref()
            .filter(|p| p.is_authenticated())
            .ok_or(TenantError::AccessDenied)?;

        let raw = principal
            .claim(&self.owner_claim)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TenantError::MissingOwnerClaim(self.owner_claim.clone()))?;

        Uuid::parse_str(raw)
            .map(OwnerId)
            .map_err(|_| TenantError::InvalidOwnerClaim {
                claim: self.owner_claim.clone(),
                value: raw.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_owner_id_from_claim() {
        let user_id = Uuid::new_v4();
        let tenant = TenantContext::with_owner_claim(
            Some(Principal::authenticated("alice").with_claim("sub", user_id.to_string())),
            "sub",
        );

        assert_eq!(tenant.resolve_owner_id(), Ok(OwnerId(user_id)));
    }

    #[test]
    fn test_missing_principal_is_access_denied() {
        let tenant = TenantContext::with_owner_claim(None, "sub");
        assert_eq!(tenant.resolve_owner_id(), Err(TenantError::AccessDenied));
    }

    #[test]
    fn test_unauthenticated_principal_is_access_denied() {
        let principal = Principal::default().with_claim("sub", Uuid::new_v4().to_string());
        let tenant = TenantContext::with_owner_claim(Some(principal), "sub");
        assert_eq!(tenant.resolve_owner_id(), Err(TenantError::AccessDenied));
    }

    #[test]
    fn test_missing_claim_is_configuration_error() {
        let tenant = TenantContext::with_owner_claim(Some(Principal::authenticated("bob")), "sub");
        assert_eq!(
            tenant.resolve_owner_id(),
            Err(TenantError::MissingOwnerClaim("sub".to_string()))
        );
    }

    #[test]
    fn test_malformed_claim_is_rejected() {
        let principal = Principal::authenticated("carol").with_claim("sub", "not-a-uuid");
        let tenant = TenantContext::with_owner_claim(Some(principal), "sub");
        assert!(matches!(
            tenant.resolve_owner_id(),
            Err(TenantError::InvalidOwnerClaim { .. })
        ));
    }
}
