//! Dashboard summary computed from the mock collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{AiStoreDraft, Order, OrderStatus, Tenant, User};

/// Count per status plus the overall count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// Number of entities.
    pub total: usize,
    /// Number of entities per status value.
    pub by_status: BTreeMap<String, usize>,
}

impl StatusCounts {
    fn from_statuses<'a>(statuses: impl Iterator<Item = &'a str>) -> Self {
        let mut counts = StatusCounts::default();
        for status in statuses {
            counts.total += 1;
            *counts.by_status.entry(status.to_owned()).or_default() += 1;
        }
        counts
    }

    /// Count for one status, zero when absent.
    pub fn get(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }
}

/// Revenue of non-cancelled orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    /// Sum over every currency.
    pub total: f64,
    /// Sum per currency code.
    pub by_currency: BTreeMap<String, f64>,
    /// Mean order value, zero without orders.
    pub average_order_value: f64,
}

/// Summary served by the analytics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    /// Tenants by account status.
    pub tenants: StatusCounts,
    /// Orders by fulfilment status.
    pub orders: StatusCounts,
    /// AI store drafts by wizard status.
    pub drafts: StatusCounts,
    /// Users by account status.
    pub users: StatusCounts,
    /// Seats in use across tenants.
    pub seats_in_use: u64,
    /// Revenue of non-cancelled orders.
    pub revenue: Revenue,
}

impl AnalyticsSummary {
    pub(crate) fn compute(
        tenants: &[Tenant],
        orders: &[Order],
        drafts: &[AiStoreDraft],
        users: &[User],
    ) -> Self {
        let mut revenue = Revenue::default();
        let mut billed = 0usize;
        for order in orders.iter().filter(|o| o.status != OrderStatus::Cancelled) {
            billed += 1;
            revenue.total += order.total_amount;
            *revenue
                .by_currency
                .entry(order.currency.clone())
                .or_default() += order.total_amount;
        }
        if billed > 0 {
            revenue.average_order_value = revenue.total / billed as f64;
        }

        AnalyticsSummary {
            tenants: StatusCounts::from_statuses(tenants.iter().map(|t| t.status.as_str())),
            orders: StatusCounts::from_statuses(orders.iter().map(|o| o.status.as_str())),
            drafts: StatusCounts::from_statuses(drafts.iter().map(|d| d.status.as_str())),
            users: StatusCounts::from_statuses(users.iter().map(|u| u.status.as_str())),
            seats_in_use: tenants.iter().map(|t| u64::from(t.current_users)).sum(),
            revenue,
        }
    }
}
