//! Revoked credential ids (explicit logout / refresh rotation).

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// In-process set of revoked credential ids.
///
/// An entry lives as long as the verifier could still accept the credential
/// it names: until `expires_at + leeway`. Later revocations prune it.
#[derive(Debug, Default)]
pub struct RevocationList {
    inner: RwLock<HashMap<String, DateTime<Utc>>>,
    leeway: Duration,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must match the verifier's clock leeway.
    pub fn with_leeway(leeway: Duration) -> Self {
        Self {
            inner: RwLock::default(),
            leeway,
        }
    }

    /// Revoke a credential.
    ///
    /// Returns `true` only for the call that recorded the revocation; a
    /// credential that was already revoked, or a poisoned lock, gives `false`.
    pub fn revoke(&self, credential_id: impl Into<String>, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        map.retain(|_, until| *until > now);

        // Past this instant the verifier rejects the credential as expired.
        let until = expires_at.checked_add_signed(self.leeway).unwrap_or(DateTime::<Utc>::MAX_UTC);
        match map.entry(credential_id.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                if until > now {
                    slot.insert(until);
                }
                true
            }
        }
    }

    /// Fails closed: a poisoned lock reports every credential as revoked.
    pub fn is_revoked(&self, credential_id: &str) -> bool {
        match self.inner.read() {
            Ok(map) => map.contains_key(credential_id),
            Err(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn revoked_ids_are_reported_until_pruned() {
        let now = Utc::now();
        let list = RevocationList::new();
        assert!(list.revoke("a", now + Duration::minutes(5), now));
        assert!(list.is_revoked("a"));
        assert!(!list.is_revoked("b"));

        // Revoking anything later prunes entries past their expiry.
        list.revoke("b", now + Duration::minutes(20), now + Duration::minutes(10));
        assert!(!list.is_revoked("a"));
        assert!(list.is_revoked("b"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn credentials_past_the_leeway_are_not_stored() {
        let now = Utc::now();
        let list = RevocationList::new();
        assert!(list.revoke("old", now - Duration::seconds(1), now));
        assert!(list.is_empty());
    }

    #[test]
    fn entries_outlive_expiry_by_the_leeway() {
        let now = Utc::now();
        let list = RevocationList::with_leeway(Duration::seconds(60));

        // Expired five seconds ago but still inside the verifier's leeway.
        assert!(list.revoke("late", now - Duration::seconds(5), now));
        assert!(list.is_revoked("late"));

        list.revoke("other", now + Duration::minutes(5), now + Duration::seconds(30));
        assert!(list.is_revoked("late"));

        list.revoke("third", now + Duration::minutes(5), now + Duration::seconds(56));
        assert!(!list.is_revoked("late"));
    }

    #[test]
    fn only_the_first_revocation_wins() {
        let now = Utc::now();
        let list = RevocationList::new();
        assert!(list.revoke("a", now + Duration::minutes(5), now));
        assert!(!list.revoke("a", now + Duration::minutes(5), now));
    }

    #[test]
    fn concurrent_revocations_have_a_single_winner() {
        let now = Utc::now();
        let list = Arc::new(RevocationList::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let list = list.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    if list.revoke("shared", now + Duration::minutes(5), now) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn far_future_expiry_does_not_overflow() {
        let now = Utc::now();
        let list = RevocationList::with_leeway(Duration::seconds(60));
        assert!(list.revoke("max", DateTime::<Utc>::MAX_UTC, now));
        assert!(list.is_revoked("max"));
    }
}
