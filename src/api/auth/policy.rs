//! Resource-level authorization decisions.
//!
//! Pure functions over an already-authenticated caller. The gate answers
//! "who are you", these answer "may you touch this". Handlers load the
//! resource first so absence reports 404 before ownership reports 403.

use super::principal::Principal;

/// A ticket may be modified or deleted by an admin or by its creator.
/// Orphaned tickets (creator deleted, `created_by` NULL) are admin-only.
#[must_use]
pub(crate) fn can_modify_ticket(caller: &Principal, created_by: Option<i64>) -> bool {
    if caller.is_admin() {
        return true;
    }
    created_by == Some(caller.user.id)
}

/// Admins may delete any account except their own. Self-deletion is refused
/// so an instance cannot lock itself out of its last administrator.
#[must_use]
pub(crate) fn can_admin_delete_user(caller: &Principal, target_id: i64) -> bool {
    caller.user.id != target_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::types::{sample_user, Role};

    fn principal(id: i64, role: Role) -> Principal {
        Principal {
            user: sample_user(id, role),
        }
    }

    #[test]
    fn creator_can_modify_own_ticket() {
        assert!(can_modify_ticket(&principal(5, Role::User), Some(5)));
    }

    #[test]
    fn non_creator_cannot_modify() {
        assert!(!can_modify_ticket(&principal(5, Role::User), Some(6)));
    }

    #[test]
    fn admin_can_modify_any_ticket() {
        let admin = principal(1, Role::Admin);
        assert!(can_modify_ticket(&admin, Some(99)));
        assert!(can_modify_ticket(&admin, None));
    }

    #[test]
    fn orphaned_ticket_is_admin_only() {
        assert!(!can_modify_ticket(&principal(5, Role::User), None));
    }

    #[test]
    fn admin_cannot_delete_self() {
        let admin = principal(1, Role::Admin);
        assert!(!can_admin_delete_user(&admin, 1));
        assert!(can_admin_delete_user(&admin, 2));
    }
}
