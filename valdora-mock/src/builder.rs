//! Builder for configuring [`MockDataProvider`].

use std::time::Duration;

use valdora_config::DEFAULT_MOCK_DELAY;

use crate::collection::Collection;
use crate::entity::{AiStoreDraft, Order, Permission, Role, Tenant, User};
use crate::provider::{MockDataProvider, Store};
use crate::seed;

/// Builder for creating a [`MockDataProvider`].
///
/// Collections start empty. [`seed`](Self::seed) loads the fixture dataset;
/// the per-collection setters replace one collection, before or after seeding.
///
/// # Examples
///
/// Fixture data without latency:
///
/// ```
/// use std::time::Duration;
/// use valdora_mock::MockDataProvider;
///
/// let provider = MockDataProvider::builder()
///     .seed()
///     .delay(Duration::ZERO)
///     .build();
/// ```
///
/// Only the collections a test needs:
///
/// ```
/// use valdora_mock::MockDataProvider;
///
/// let provider = MockDataProvider::builder()
///     .tenants(Vec::new())
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MockDataProviderBuilder {
    delay: Duration,
    tenants: Vec<Tenant>,
    orders: Vec<Order>,
    drafts: Vec<AiStoreDraft>,
    users: Vec<User>,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
}

impl Default for MockDataProviderBuilder {
    fn default() -> Self {
        Self {
            delay: DEFAULT_MOCK_DELAY,
            tenants: Vec::new(),
            orders: Vec::new(),
            drafts: Vec::new(),
            users: Vec::new(),
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }
}

impl MockDataProviderBuilder {
    /// Loads the fixture dataset into every collection.
    pub fn seed(self) -> Self {
        Self {
            tenants: seed::tenants(),
            orders: seed::orders(),
            drafts: seed::ai_store_drafts(),
            users: seed::users(),
            roles: seed::roles(),
            permissions: seed::permissions(),
            ..self
        }
    }

    /// Sets the artificial latency.
    pub fn delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Replaces the tenants.
    pub fn tenants(self, tenants: Vec<Tenant>) -> Self {
        Self { tenants, ..self }
    }

    /// Replaces the orders.
    pub fn orders(self, orders: Vec<Order>) -> Self {
        Self { orders, ..self }
    }

    /// Replaces the AI store drafts.
    pub fn ai_store_drafts(self, drafts: Vec<AiStoreDraft>) -> Self {
        Self { drafts, ..self }
    }

    /// Replaces the users.
    pub fn users(self, users: Vec<User>) -> Self {
        Self { users, ..self }
    }

    /// Replaces the roles.
    pub fn roles(self, roles: Vec<Role>) -> Self {
        Self { roles, ..self }
    }

    /// Replaces the permissions.
    pub fn permissions(self, permissions: Vec<Permission>) -> Self {
        Self {
            permissions,
            ..self
        }
    }

    /// Builds the provider.
    pub fn build(self) -> MockDataProvider {
        let store = Store {
            tenants: Collection::new(self.tenants),
            orders: Collection::new(self.orders),
            drafts: Collection::new(self.drafts),
            users: Collection::new(self.users),
            roles: Collection::new(self.roles),
            permissions: Collection::new(self.permissions),
        };
        MockDataProvider::from_parts(store, self.delay)
    }
}
