use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";

/// Identity and role payload carried inside a signed token.
///
/// - Timestamps are serialized as unix seconds (`iat` / `exp`), so they carry
///   no sub-second precision.
/// - `roles` may be empty; such claims never pass `authorize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(rename = "aud")]
    pub audience: String,
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Claims {
    /// Build claims issued now and valid for `ttl`.
    pub fn new<I, R>(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        audience: impl Into<String>,
        roles: I,
        ttl: Duration,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let issued_at = Utc::now().trunc_subsecs(0);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = issued_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            issuer: issuer.into(),
            subject: subject.into(),
            audience: audience.into(),
            issued_at,
            expires_at,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// True iff at least one of `required` is among the roles carried by
    /// these claims. Role names are opaque and compared exactly.
    pub fn authorize<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .any(|want| self.roles.contains(want.as_ref()))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway_seconds: u64) -> bool {
        expired_at(self.expires_at, now, leeway_seconds)
    }

    /// `exp` is not before `iat`.
    pub fn has_consistent_times(&self) -> bool {
        self.expires_at >= self.issued_at
    }
}

/// True when `now` is past `expires_at` plus the leeway.
pub(crate) fn expired_at(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    leeway_seconds: u64,
) -> bool {
    let Some(leeway) = i64::try_from(leeway_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
    else {
        return false;
    };
    match expires_at.checked_add_signed(leeway) {
        Some(deadline) => now > deadline,
        None => false,
    }
}
