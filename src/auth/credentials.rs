//! Roles and the named credentials they grant.
//!
//! Roles are provisioned with the account and stored as plain strings; they are
//! resolved here into a [`CredentialSet`] every time a token pair is issued.

use std::{collections::BTreeSet, fmt, str::FromStr};
use thiserror::Error;

/// A single capability carried inside an access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Credential {
    BookCreate,
    BookUpdate,
    BookDelete,
}

impl Credential {
    pub const ALL: [Self; 3] = [Self::BookCreate, Self::BookUpdate, Self::BookDelete];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BookCreate => "book:create",
            Self::BookUpdate => "book:update",
            Self::BookDelete => "book:delete",
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown credential: {0}")]
pub struct UnknownCredential(pub String);

impl FromStr for Credential {
    type Err = UnknownCredential;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|credential| credential.as_str() == s)
            .ok_or_else(|| UnknownCredential(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Moderator,
    User,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("role '{0}' does not exist")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Moderator, Self::User];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::User => "user",
        }
    }

    #[must_use]
    pub fn credentials(self) -> CredentialSet {
        let granted: &[Credential] = match self {
            Self::Admin => &[
                Credential::BookCreate,
                Credential::BookUpdate,
                Credential::BookDelete,
            ],
            Self::Moderator => &[Credential::BookCreate, Credential::BookUpdate],
            Self::User => &[Credential::BookCreate],
        };
        granted.iter().copied().collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Resolve a stored role name into the credentials it grants.
///
/// # Errors
/// Returns [`UnknownRole`] when the name is not one of the registered roles.
pub fn credentials_for_role(role: &str) -> Result<CredentialSet, UnknownRole> {
    role.parse::<Role>().map(Role::credentials)
}

/// Ordered set of credentials.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialSet(BTreeSet<Credential>);

impl CredentialSet {
    #[must_use]
    pub fn contains(&self, credential: Credential) -> bool {
        self.0.contains(&credential)
    }

    pub fn iter(&self) -> impl Iterator<Item = Credential> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Credential> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
