use thiserror::Error;

use crate::{ChainAction, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role '{role}' may not perform '{action}'")]
    Forbidden { role: Role, action: ChainAction },
}

/// Which roles may perform a given operation.
///
/// This is the single allow-list every mutating operation consults; nothing
/// in the system relies on which buttons a front end chooses to render.
fn allowed_roles(action: ChainAction) -> &'static [Role] {
    match action {
        ChainAction::RegisterCrop => &[Role::Farmer],
        ChainAction::AcceptCrop => &[Role::Distributor],
        ChainAction::StartTransport => &[Role::Distributor],
        ChainAction::UpdateTracking => &[Role::Distributor],
        ChainAction::AcceptDelivery => &[Role::Retailer],
        ChainAction::RecordSale => &[Role::Retailer],
        ChainAction::OverrideCropStatus => &[Role::Farmer],
        ChainAction::RecordPayment => &[Role::Distributor, Role::Retailer, Role::Buyer],
        ChainAction::ManageUsers => &[Role::Admin],
    }
}

/// Authorize a role against the allow-list for one operation.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
///
/// Admin passes every check (wildcard role).
pub fn authorize(role: Role, action: ChainAction) -> Result<(), AuthzError> {
    if role == Role::Admin || allowed_roles(action).contains(&role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { role, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_every_check() {
        for action in [
            ChainAction::RegisterCrop,
            ChainAction::AcceptCrop,
            ChainAction::StartTransport,
            ChainAction::UpdateTracking,
            ChainAction::AcceptDelivery,
            ChainAction::RecordSale,
            ChainAction::OverrideCropStatus,
            ChainAction::RecordPayment,
            ChainAction::ManageUsers,
        ] {
            assert!(authorize(Role::Admin, action).is_ok());
        }
    }

    #[test]
    fn allow_list_matches_the_role_matrix() {
        // (action, permitted non-admin roles)
        let matrix: &[(ChainAction, &[Role])] = &[
            (ChainAction::RegisterCrop, &[Role::Farmer]),
            (ChainAction::AcceptCrop, &[Role::Distributor]),
            (ChainAction::StartTransport, &[Role::Distributor]),
            (ChainAction::UpdateTracking, &[Role::Distributor]),
            (ChainAction::AcceptDelivery, &[Role::Retailer]),
            (ChainAction::RecordSale, &[Role::Retailer]),
            (ChainAction::OverrideCropStatus, &[Role::Farmer]),
            (
                ChainAction::RecordPayment,
                &[Role::Distributor, Role::Retailer, Role::Buyer],
            ),
            (ChainAction::ManageUsers, &[Role::Admin]),
        ];

        for (action, permitted) in matrix {
            for role in Role::ALL {
                let expected = role == Role::Admin || permitted.contains(&role);
                assert_eq!(
                    authorize(role, *action).is_ok(),
                    expected,
                    "role {role} / action {action}"
                );
            }
        }
    }

    #[test]
    fn forbidden_error_names_role_and_action() {
        let err = authorize(Role::Buyer, ChainAction::RegisterCrop).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Buyer"));
        assert!(msg.contains("register_crop"));
    }
}
