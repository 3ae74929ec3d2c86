//! Action derivation and authoring-time action validation

use super::{RequiredAction, Responsibility, ResponsibilityAction};
use crate::error::Result;
use crate::rules::{keys, ErrorMap};
use crate::types::{ActionPolicy, ActionType};

/// Field labels used as `error.empty.entry` arguments
pub const ACTION_POLICY_CODE_LABEL: &str = "Action Policy Code";
pub const PRIORITY_NUMBER_LABEL: &str = "Priority Number";
pub const ACTION_TYPE_CODE_LABEL: &str = "Action Type Code";

/// Actions a role member must take for `responsibility`
///
/// At assignment level the member's own actions apply, falling back to the
/// role-level list when the member has none. Otherwise the role-level list
/// applies to every member. Entries for other responsibilities are ignored
/// and the order of the chosen list is kept.
///
/// # Errors
///
/// Returns `KimError::InvalidAction` if a chosen entry is incomplete.
pub fn derive_actions(
    responsibility: &Responsibility,
    role_actions: &[ResponsibilityAction],
    member_actions: &[ResponsibilityAction],
) -> Result<Vec<RequiredAction>> {
    let for_responsibility = |actions: &[ResponsibilityAction]| -> Vec<ResponsibilityAction> {
        actions
            .iter()
            .filter(|a| a.responsibility_id == responsibility.id)
            .cloned()
            .collect()
    };

    let role_level = for_responsibility(role_actions);
    let chosen = if responsibility.actions_at_assignment_level {
        let member_level = for_responsibility(member_actions);
        if member_level.is_empty() {
            role_level
        } else {
            member_level
        }
    } else {
        role_level
    };

    chosen.iter().map(RequiredAction::try_from).collect()
}

/// Check an authored action, recording one message per problem at `path`
///
/// Missing fields are reported independently, in the order policy, priority,
/// type. Codes that are present but unknown record `error.invalid.entry`.
/// Returns `true` when nothing was recorded.
pub fn validate_action(path: &str, action: &ResponsibilityAction, errors: &mut ErrorMap) -> bool {
    let mut valid = true;

    match non_blank(&action.action_policy_code) {
        None => {
            errors.put_error_with_args(path, keys::ERROR_EMPTY_ENTRY, [ACTION_POLICY_CODE_LABEL]);
            valid = false;
        }
        Some(code) if ActionPolicy::from_code(code).is_none() => {
            errors.put_error_with_args(
                path,
                keys::ERROR_INVALID_ENTRY,
                [ACTION_POLICY_CODE_LABEL, code],
            );
            valid = false;
        }
        Some(_) => {}
    }

    if action.priority_number.is_none() {
        errors.put_error_with_args(path, keys::ERROR_EMPTY_ENTRY, [PRIORITY_NUMBER_LABEL]);
        valid = false;
    }

    match non_blank(&action.action_type_code) {
        None => {
            errors.put_error_with_args(path, keys::ERROR_EMPTY_ENTRY, [ACTION_TYPE_CODE_LABEL]);
            valid = false;
        }
        Some(code) if ActionType::from_code(code).is_none() => {
            errors.put_error_with_args(
                path,
                keys::ERROR_INVALID_ENTRY,
                [ACTION_TYPE_CODE_LABEL, code],
            );
            valid = false;
        }
        Some(_) => {}
    }

    valid
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
