//! Access rules attached to datatypes.

use crate::model::{Access, AccessStatus, Ident};

/// Who may read or write items of a datatype.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessRule {
    /// Anyone, including anonymous calls.
    #[default]
    All,
    /// Any identified caller.
    Auth,
    /// Callers holding the given role.
    Role(String),
    /// Only the caller with the given ident id.
    Ident(String),
}

impl AccessRule {
    pub fn authorize(&self, ident: Option<&Ident>) -> Access {
        let ident_id = ident.and_then(|i| i.id.as_deref());
        let granted = match self {
            Self::All => true,
            Self::Auth => ident_id.is_some(),
            Self::Role(role) => ident.is_some_and(|i| i.has_role(role)),
            Self::Ident(id) => ident_id == Some(id.as_str()),
        };
        Access {
            status: if granted {
                AccessStatus::Granted
            } else {
                AccessStatus::Refused
            },
            ident: ident.cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_requires_an_ident_id() {
        assert_eq!(AccessRule::Auth.authorize(None).status, AccessStatus::Refused);
        assert_eq!(
            AccessRule::Auth.authorize(Some(&Ident::new("johnf"))).status,
            AccessStatus::Granted
        );
    }

    #[test]
    fn role_checks_ident_roles() {
        let rule = AccessRule::Role("admin".into());
        let editor = Ident::new("johnf").with_roles(["editor"]);
        let admin = Ident::new("betty").with_roles(["admin"]);

        assert_eq!(rule.authorize(Some(&editor)).status, AccessStatus::Refused);
        let access = rule.authorize(Some(&admin));
        assert_eq!(access.status, AccessStatus::Granted);
        assert_eq!(access.ident, Some(admin));
    }
}
