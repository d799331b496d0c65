use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role identifier used for RBAC.
///
/// Roles form a closed set. Anything a token carries outside of it is not a
/// role at all, so a typo can never grant access.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Owner,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::Owner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Role::User => 0b001,
            Role::Admin => 0b010,
            Role::Owner => 0b100,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A set of roles (bitset over [`Role`]).
///
/// Serialized as a sorted list of role names.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersection(&self, other: RoleSet) -> RoleSet {
        RoleSet(self.0 & other.0)
    }

    pub fn intersects(&self, other: RoleSet) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Roles in `self` that are not in `other`.
    pub fn difference(&self, other: RoleSet) -> RoleSet {
        RoleSet(self.0 & !other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|r| self.contains(*r))
    }

    pub fn to_vec(&self) -> Vec<Role> {
        self.iter().collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::EMPTY;
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        RoleSet(role.bit())
    }
}

impl core::fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let roles = Vec::<Role>::deserialize(deserializer)?;
        Ok(roles.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("Admin".parse::<Role>().is_err());
        assert!("admin ".parse::<Role>().is_err());
    }

    #[test]
    fn intersection_is_typed_set_logic() {
        let principal = RoleSet::of(&[Role::User]);
        let delete = RoleSet::of(&[Role::Admin, Role::Owner]);
        assert!(!principal.intersects(delete));

        let admin = RoleSet::of(&[Role::User, Role::Admin]);
        assert!(admin.intersects(delete));
        assert_eq!(admin.intersection(delete), RoleSet::from(Role::Admin));
        assert_eq!(delete.difference(admin), RoleSet::from(Role::Owner));
    }

    #[test]
    fn serializes_as_sorted_names() {
        let set: RoleSet = [Role::Owner, Role::User].into_iter().collect();
        assert_eq!(serde_json::to_value(set).unwrap(), serde_json::json!(["user", "owner"]));

        let back: RoleSet = serde_json::from_value(serde_json::json!(["owner", "user", "owner"])).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn unknown_names_fail_strict_deserialization() {
        assert!(serde_json::from_value::<RoleSet>(serde_json::json!(["superuser"])).is_err());
    }
}
