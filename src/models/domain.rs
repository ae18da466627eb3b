//! Domains: lower-cased hosts, validated against a fixed TLD pattern.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

/// Hosts must be dotted labels ending in a recognized TLD.
static KEY_VAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^([a-z0-9]([-a-z0-9]*[a-z0-9])?\\.)+((a[cdefgilmnoqrstuwxz]|aero|arpa)\
         |(b[abdefghijmnorstvwyz]|biz)|(c[acdfghiklmnorsuvxyz]|cat|com|coop)\
         |d[ejkmoz]|(e[ceghrstu]|edu)|f[ijkmor]|(g[abdefghilmnpqrstuwy]|gov)\
         |h[kmnrtu]|(i[delmnoqrst]|info|int)|(j[emop]|jobs)|k[eghimnprwyz]\
         |l[abcikrstuvy]|(m[acdghklmnopqrstuvwxyz]|mil|mobi|museum)\
         |(n[acefgilopruz]|name|net)|(om|org)|(p[aefghklmnrstwy]|pro)|qa\
         |r[eouw]|s[abcdeghijklmnortvyz]|(t[cdfghjklmnoprtvwz]|travel)\
         |u[agkmsyz]|v[aceginu]|w[fs]|y[etu]|z[amw])$",
    )
    .unwrap()
});

pub const MAX_DOMAIN_LENGTH: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain is too short")]
    TooShort,
    #[error("domain is too long: {0}")]
    TooLong(String),
    #[error("not a valid domain: {0}")]
    Invalid(String),
}

/// Validate a domain key, returning the trimmed value.
pub fn validate_domain_key(value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::TooShort);
    }
    if value.len() > MAX_DOMAIN_LENGTH {
        return Err(DomainError::TooLong(value.to_string()));
    }
    if value.starts_with('.') || !KEY_VAL.is_match(value) {
        return Err(DomainError::Invalid(value.to_string()));
    }
    Ok(value.to_string())
}

/// A known host and when it was first seen.
#[derive(Debug, Clone)]
pub struct Domain {
    pub id: i64,
    pub key: String,
    pub date: DateTime<Utc>,
}
