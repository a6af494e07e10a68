//! Authentication and password hashing.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Password verification
//! - Principal roles and account kinds

mod password;

pub use password::{
    MIN_PASSWORD_LENGTH, PasswordError, hash_password, validate_new_password, verify_password,
};

use serde::{Deserialize, Serialize};

/// Principal roles.
///
/// The hierarchy is fixed: platform admin, company admin, company member,
/// and the professional ("regular") roles that behave identically for
/// access purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Role {
    /// Platform administrator; sees every record.
    Admin,
    /// Administrator of a single company.
    CompanyAdmin,
    /// Member of a company.
    CompanyUser,
    /// Pharmacist.
    Pharmacist,
    /// Nurse.
    Nurse,
    /// Doctor.
    Doctor,
    /// Any other professional role, stored verbatim.
    Other(String),
}

impl Role {
    /// Returns true for the platform administrator.
    #[must_use]
    pub const fn is_platform_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns true if this role administers a company.
    #[must_use]
    pub const fn is_company_admin(&self) -> bool {
        matches!(self, Self::CompanyAdmin)
    }

    /// Returns true for the company member role.
    #[must_use]
    pub const fn is_company_user(&self) -> bool {
        matches!(self, Self::CompanyUser)
    }

    /// Returns true for roles a caller may pick for themselves.
    #[must_use]
    pub const fn is_self_assignable(&self) -> bool {
        !matches!(self, Self::Admin | Self::CompanyAdmin | Self::CompanyUser)
    }

    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::CompanyAdmin => "company_admin",
            Self::CompanyUser => "company_user",
            Self::Pharmacist => "pharmacist",
            Self::Nurse => "nurse",
            Self::Doctor => "doctor",
            Self::Other(role) => role,
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "company_admin" => Self::CompanyAdmin,
            "company_user" => Self::CompanyUser,
            "pharmacist" => Self::Pharmacist,
            "nurse" => Self::Nurse,
            "doctor" => Self::Doctor,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of account a principal holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// A standalone professional.
    #[default]
    Individual,
    /// The account that owns a company.
    Company,
    /// A member of a company.
    CompanyUser,
}

impl AccountKind {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Company => "company",
            Self::CompanyUser => "company_user",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "company" => Ok(Self::Company),
            "company_user" => Ok(Self::CompanyUser),
            other => Err(format!("unknown account kind: {other}")),
        }
    }
}
