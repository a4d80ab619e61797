//! Application-level user attributes.

use authgate_token::UserId;
use serde::{Deserialize, Serialize};

/// What a user is allowed to do, application-wide.
///
/// Roles are ordered: an admin can do anything an agent can, an agent
/// anything a customer can. Route requirements use [`allows`](Self::allows)
/// rather than equality so that granting a route to agents automatically
/// grants it to admins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access, including impersonation.
    Admin,

    /// Support staff: works tickets across the company.
    Agent,

    /// End user: sees only their own tickets.
    Customer,
}

impl Role {
    fn privilege(self) -> u8 {
        match self {
            Role::Admin => 2,
            Role::Agent => 1,
            Role::Customer => 0,
        }
    }

    /// Whether this role satisfies a route that requires `required`.
    pub fn allows(self, required: Role) -> bool {
        self.privilege() >= required.privilege()
    }
}

/// Application-level attributes for one user.
///
/// Fetched once per session establishment from the profile service,
/// cached in memory and in persisted storage, and invalidated on
/// sign-out. Read-mostly: nothing in this library ever edits a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The owning user.
    pub user_id: UserId,

    /// The user's application role.
    pub role: Role,

    /// Name shown in the UI.
    pub display_name: String,

    /// BCP 47 locale tag, e.g. "en-US".
    pub locale: String,

    /// The company this user belongs to, if any.
    pub company_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_allows_is_reflexive() {
        for role in [Role::Admin, Role::Agent, Role::Customer] {
            assert!(role.allows(role));
        }
    }

    #[test]
    fn test_role_admin_allows_everything() {
        assert!(Role::Admin.allows(Role::Agent));
        assert!(Role::Admin.allows(Role::Customer));
    }

    #[test]
    fn test_role_customer_allows_nothing_higher() {
        assert!(!Role::Customer.allows(Role::Agent));
        assert!(!Role::Customer.allows(Role::Admin));
        assert!(!Role::Agent.allows(Role::Admin));
    }

    #[test]
    fn test_role_serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
        assert_eq!(
            serde_json::to_string(&Role::Customer).unwrap(),
            "\"customer\""
        );
    }

    #[test]
    fn test_profile_round_trips_through_json() {
        let profile = Profile {
            user_id: UserId::from("u-1"),
            role: Role::Agent,
            display_name: "Dana".into(),
            locale: "en-US".into(),
            company_id: Some("c-9".into()),
        };
        let raw = serde_json::to_string(&profile).unwrap();
        let decoded: Profile = serde_json::from_str(&raw).unwrap();
        assert_eq!(profile, decoded);
    }
}
