//! Filter predicates for listing operations.
//!
//! Filters are simple predicate conjunctions: every populated field must
//! match. Text queries are case-insensitive substring matches. `limit` is a
//! plain result cap; there is no other pagination.

use rust_decimal::Decimal;

use agritrace_auth::Role;
use agritrace_core::UserId;
use agritrace_crops::CropStatus;
use agritrace_deliveries::DeliveryStatus;
use agritrace_payments::PaymentStatus;
use agritrace_users::AccountStatus;

/// Case-insensitive substring test shared by the list implementations.
pub(crate) fn matches_query(haystack: &str, query: &str) -> bool {
    haystack.to_lowercase().contains(&query.to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    /// Substring over name and email.
    pub query: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropFilter {
    pub farmer: Option<UserId>,
    pub status: Option<CropStatus>,
    pub category: Option<String>,
    pub max_unit_price: Option<Decimal>,
    /// Substring over name and batch id.
    pub query: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFilter {
    pub distributor: Option<UserId>,
    pub retailer: Option<UserId>,
    pub crop: Option<agritrace_core::CropId>,
    pub status: Option<DeliveryStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub payer: Option<UserId>,
    pub payee: Option<UserId>,
    pub crop: Option<agritrace_core::CropId>,
    pub status: Option<PaymentStatus>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_matching_ignores_case() {
        assert!(matches_query("Organic Wheat", "wheat"));
        assert!(matches_query("BATCH_3FA9C1D2", "3fa9"));
        assert!(!matches_query("Rice", "wheat"));
    }
}
