use serde::{Deserialize, Serialize};

/// A mutating supply-chain operation subject to authorization.
///
/// Read paths (listings, batch tracing) are deliberately absent: provenance
/// lookup is open to everyone, consumers included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainAction {
    /// Register a harvested batch (creates the crop + the Harvest trace).
    RegisterCrop,
    /// Accept an available crop for distribution (creates the delivery).
    AcceptCrop,
    /// Move a pending delivery onto the road.
    StartTransport,
    /// Attach a free-text tracking note to an active delivery.
    UpdateTracking,
    /// Accept an in-transit delivery at the retail end.
    AcceptDelivery,
    /// Record a retail sale against delivered stock.
    RecordSale,
    /// Directly overwrite a crop's status (audited farmer escape hatch).
    OverrideCropStatus,
    /// Record a monetary transfer.
    RecordPayment,
    /// Approve/deactivate/reactivate user accounts.
    ManageUsers,
}

impl ChainAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainAction::RegisterCrop => "register_crop",
            ChainAction::AcceptCrop => "accept_crop",
            ChainAction::StartTransport => "start_transport",
            ChainAction::UpdateTracking => "update_tracking",
            ChainAction::AcceptDelivery => "accept_delivery",
            ChainAction::RecordSale => "record_sale",
            ChainAction::OverrideCropStatus => "override_crop_status",
            ChainAction::RecordPayment => "record_payment",
            ChainAction::ManageUsers => "manage_users",
        }
    }
}

impl core::fmt::Display for ChainAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
