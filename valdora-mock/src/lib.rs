#![warn(missing_docs)]
//! # valdora-mock
//!
//! In-memory stand-in for the back-office API.
//!
//! [`MockDataProvider`] keeps one typed [`Collection`] per resource and offers
//! list/get/create/update/delete with realistic latency, plus the user/role
//! and role/permission relations and an analytics summary. It implements
//! [`Transport`](valdora_core::Transport), so the router can swap it for the
//! real HTTP client without the cache noticing.
//!
//! Failures are [`MockError`]s, converted into
//! [`ApiError::Mock`](valdora_core::ApiError::Mock) at the transport boundary.

mod analytics;
mod builder;
mod collection;
mod entity;
mod error;
mod provider;
mod seed;

pub use analytics::{AnalyticsSummary, Revenue, StatusCounts};
pub use builder::MockDataProviderBuilder;
pub use collection::Collection;
pub use entity::{
    AiStoreDraft, DraftStatus, Entity, Order, OrderStatus, Permission, Role, Tenant, TenantPlan,
    TenantStatus, User, UserStatus, WIZARD_STEPS,
};
pub use error::MockError;
pub use provider::MockDataProvider;
