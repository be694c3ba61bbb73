//! Claims → authorities mapping.
//!
//! Sources, in order:
//! - `scope` (or `scp`) → `SCOPE_*`
//! - configured roles claim → `ROLE_*`
//! - `roles` → `ROLE_*` (second naming convention)
//! - configured permissions claim → `PERMISSION_*`

use std::fmt;

use serde::{Serialize, Serializer};

use super::claims::Claims;

const SCOPE_CLAIMS: [&str; 2] = ["scope", "scp"];
const FALLBACK_ROLES_CLAIM: &str = "roles";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Authority {
    Scope(String),
    Role(String),
    Permission(String),
}

impl Authority {
    pub fn scope(name: impl Into<String>) -> Self {
        Self::Scope(name.into())
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::Role(name.into())
    }

    pub fn permission(name: impl Into<String>) -> Self {
        Self::Permission(name.into())
    }

    /// A granted authority satisfies a required one when they are equal, or when a
    /// permission carries the same name as a required scope.
    pub fn satisfies(&self, required: &Authority) -> bool {
        match (self, required) {
            (Authority::Permission(granted), Authority::Scope(needed)) => granted == needed,
            _ => self == required,
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authority::Scope(name) => write!(f, "SCOPE_{}", name),
            Authority::Role(name) => write!(f, "ROLE_{}", name),
            Authority::Permission(name) => write!(f, "PERMISSION_{}", name),
        }
    }
}

impl Serialize for Authority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Insertion-ordered set of authorities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthoritySet(Vec<Authority>);

impl AuthoritySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the authority was already present.
    pub fn insert(&mut self, authority: Authority) -> bool {
        if self.0.contains(&authority) {
            return false;
        }
        self.0.push(authority);
        true
    }

    pub fn contains(&self, authority: &Authority) -> bool {
        self.0.contains(authority)
    }

    pub fn satisfies_any(&self, required: &[Authority]) -> bool {
        required
            .iter()
            .any(|needed| self.0.iter().any(|granted| granted.satisfies(needed)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Authority> {
        self.0.iter()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl FromIterator<Authority> for AuthoritySet {
    fn from_iter<I: IntoIterator<Item = Authority>>(iter: I) -> Self {
        let mut set = Self::new();
        for authority in iter {
            set.insert(authority);
        }
        set
    }
}

/// Which claims carry roles and permissions for this tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimNames {
    pub roles_claim: Option<String>,
    pub permissions_claim: String,
}

pub fn derive_authorities(claims: &Claims, names: &ClaimNames) -> AuthoritySet {
    let mut set = AuthoritySet::new();

    // First scope claim that is present wins.
    if let Some(scopes) = SCOPE_CLAIMS
        .iter()
        .filter_map(|name| claims.get(name))
        .find(|value| !value.is_null())
    {
        for scope in scopes.authority_values() {
            set.insert(Authority::scope(scope));
        }
    }

    let role_claims = [names.roles_claim.as_deref(), Some(FALLBACK_ROLES_CLAIM)];
    for claim in role_claims.into_iter().flatten() {
        extend_from_claim(&mut set, claims, claim, Authority::Role);
    }

    extend_from_claim(&mut set, claims, &names.permissions_claim, Authority::Permission);

    set
}

fn extend_from_claim(
    set: &mut AuthoritySet,
    claims: &Claims,
    claim: &str,
    make: fn(String) -> Authority,
) {
    if claim.trim().is_empty() {
        return;
    }
    let Some(value) = claims.get(claim) else {
        return;
    };
    for name in value.authority_values() {
        set.insert(make(name.to_string()));
    }
}
