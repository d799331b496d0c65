//! `tamv-auth`: pure authentication/authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it turns a
//! bearer credential into a [`Principal`] and a principal plus a
//! [`Capability`] into an [`AuthorizedContext`].

pub mod authorize;
pub mod capability;
pub mod claims;
pub mod issuer;
pub mod password;
pub mod principal;
pub mod revocation;
pub mod roles;
pub mod verifier;

pub use authorize::{AuthorizationExplanation, AuthorizedContext, AuthzError, authorize, explain};
pub use capability::Capability;
pub use claims::{CredentialClaims, validate_claims};
pub use issuer::{CredentialIssuer, IssueError, IssuedCredential};
pub use password::{PasswordError, check_policy, hash_password, verify_password};
pub use principal::Principal;
pub use revocation::RevocationList;
pub use roles::{Role, RoleSet};
pub use verifier::{CredentialError, CredentialVerifier, Hs256CredentialVerifier};
