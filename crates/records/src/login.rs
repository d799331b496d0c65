//! Records behind password login: the stored hash and the per-tenant email
//! reservation that maps an address to its user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tamv_core::{Record, RecordId, RecordKind, UserId};

/// Namespace for name-based email reservation ids.
const EMAIL_NAMESPACE: Uuid = Uuid::from_u128(0x5b0c_7d2e_41a6_4f0b_9a3e_6c1d_2f48_e7a1);

/// A user's password hash, stored under the user's id. Never serialized into
/// API responses.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordLogin {
    pub id: RecordId,
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl PasswordLogin {
    pub fn new(user: UserId, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: user.into(),
            password_hash,
            updated_at: now,
        }
    }
}

impl core::fmt::Debug for PasswordLogin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordLogin").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Record for PasswordLogin {
    const KIND: RecordKind = RecordKind::Login;

    fn record_id(&self) -> RecordId {
        self.id
    }
}

/// Reserves one normalized email address within a tenant.
///
/// The id is derived from the address, so two reservations of the same
/// address collide on the storage key and the second insert fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailClaim {
    pub id: RecordId,
    pub email: String,
    pub user_id: UserId,
}

impl EmailClaim {
    /// `email` must already be normalized (see `UserProfile::create`).
    pub fn new(email: &str, user_id: UserId) -> Self {
        Self {
            id: Self::id_for(email),
            email: email.to_string(),
            user_id,
        }
    }

    pub fn id_for(email: &str) -> RecordId {
        RecordId::from_uuid(Uuid::new_v5(&EMAIL_NAMESPACE, email.as_bytes()))
    }
}

impl Record for EmailClaim {
    const KIND: RecordKind = RecordKind::EmailIndex;

    fn record_id(&self) -> RecordId {
        self.id
    }
}
