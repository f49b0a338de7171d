//! Who may run admin commands.

use std::collections::HashSet;

/// Allow-list of user ids plus an optional role that also grants access.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    admin_ids: HashSet<String>,
    admin_role: Option<String>,
}

impl AdminPolicy {
    pub fn new(admin_ids: impl IntoIterator<Item = String>, admin_role: Option<String>) -> Self {
        Self {
            admin_ids: admin_ids
                .into_iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            admin_role: admin_role.filter(|r| !r.trim().is_empty()),
        }
    }

    pub fn is_admin(&self, user_id: &str, roles: &[String]) -> bool {
        if self.admin_ids.contains(user_id) {
            return true;
        }
        match &self.admin_role {
            Some(role) => roles.iter().any(|r| r == role),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_allow_list() {
        let policy = AdminPolicy::new(vec!["42".to_string(), " ".to_string()], None);
        assert!(policy.is_admin("42", &[]));
        assert!(!policy.is_admin("43", &[]));
        assert!(!policy.is_admin("", &[]));
    }

    #[test]
    fn role_grants_access() {
        let policy = AdminPolicy::new(Vec::new(), Some("coach-admin".into()));
        assert!(policy.is_admin("7", &["member".into(), "coach-admin".into()]));
        assert!(!policy.is_admin("7", &["member".into()]));
    }

    #[test]
    fn empty_policy_denies_everyone() {
        let policy = AdminPolicy::default();
        assert!(!policy.is_admin("1", &["admin".into()]));
    }
}
