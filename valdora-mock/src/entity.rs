//! Typed entities held by the mock collections.
//!
//! Every entity serializes in camelCase, carries an [`EntityId`] plus
//! `createdAt`/`updatedAt` timestamps, and implements [`Entity`] so a single
//! generic [`Collection`](crate::Collection) can filter, search and merge it.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use valdora_core::{EntityId, Resource};

use crate::error::MockError;

/// An entity stored in a mock collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this entity lives in.
    const RESOURCE: Resource;

    /// Identifier, unique within the collection.
    fn id(&self) -> &EntityId;

    /// Status compared by the `status` list filter. `None` never matches.
    fn status(&self) -> Option<&str> {
        None
    }

    /// Fields matched by the `search` list filter.
    fn search_fields(&self) -> Vec<&str>;

    /// Field values applied to a create payload before the caller's fields.
    fn defaults() -> Map<String, Value>;

    /// Refreshes `updatedAt`.
    fn touch(&mut self, now: DateTime<Utc>);

    /// Checks constraints the type system does not express.
    fn validate(&self) -> Result<(), MockError> {
        Ok(())
    }

    /// Case-insensitive substring match of a lower-cased needle.
    fn matches(&self, needle: &str) -> bool {
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Wire representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }
    };
}

status_enum! {
    /// Lifecycle of a tenant account.
    TenantStatus {
        /// Tenant can log in.
        Active => "active",
        /// Tenant closed its account.
        Inactive => "inactive",
        /// Tenant blocked, usually for billing.
        Suspended => "suspended",
    }
}

status_enum! {
    /// Subscription plan of a tenant.
    TenantPlan {
        /// Entry plan.
        Starter => "starter",
        /// Mid tier.
        Professional => "professional",
        /// Custom contract.
        Enterprise => "enterprise",
    }
}

status_enum! {
    /// Fulfilment state of an order.
    OrderStatus {
        /// Placed, not yet handled.
        Pending => "pending",
        /// Being prepared.
        Processing => "processing",
        /// Handed to the carrier.
        Shipped => "shipped",
        /// Received by the customer.
        Delivered => "delivered",
        /// Cancelled before delivery.
        Cancelled => "cancelled",
    }
}

status_enum! {
    /// Progress of an AI store wizard draft.
    DraftStatus {
        /// Created, wizard not started.
        Draft => "draft",
        /// Wizard partially filled.
        InProgress => "in_progress",
        /// All steps filled.
        Completed => "completed",
        /// Store generated and live.
        Published => "published",
    }
}

status_enum! {
    /// Account state of a back-office user.
    UserStatus {
        /// Can sign in.
        Active => "active",
        /// Disabled by an administrator.
        Inactive => "inactive",
        /// Invited, not signed in yet.
        Pending => "pending",
    }
}

/// Number of steps of the AI store wizard.
pub const WIZARD_STEPS: u8 = 5;

/// Customer organisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Primary domain.
    pub domain: String,
    /// Contact email.
    pub email: String,
    /// Account state.
    pub status: TenantStatus,
    /// Subscription plan.
    pub plan: TenantPlan,
    /// Seats included in the plan.
    pub max_users: u32,
    /// Seats in use.
    pub current_users: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Entity for Tenant {
    const RESOURCE: Resource = Resource::Tenant;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.domain.as_str(), self.email.as_str()]
    }

    fn defaults() -> Map<String, Value> {
        object(json!({
            "status": "active",
            "plan": "starter",
            "maxUsers": 10,
            "currentUsers": 0,
        }))
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), MockError> {
        require_text("name", &self.name)?;
        require_email(&self.email)?;
        if self.current_users > self.max_users {
            return Err(MockError::Validation(format!(
                "currentUsers ({}) exceeds maxUsers ({})",
                self.current_users, self.max_users
            )));
        }
        Ok(())
    }
}

/// Order placed by a tenant's customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Identifier.
    pub id: EntityId,
    /// Human facing number such as `ORD-1001`.
    pub order_number: String,
    /// Buyer name.
    pub customer_name: String,
    /// Buyer email.
    pub customer_email: String,
    /// Owning tenant.
    pub tenant_id: EntityId,
    /// Fulfilment state.
    pub status: OrderStatus,
    /// Amount charged.
    pub total_amount: f64,
    /// ISO currency code.
    pub currency: String,
    /// Number of line items.
    pub items_count: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Entity for Order {
    const RESOURCE: Resource = Resource::Order;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.order_number.as_str(), self.customer_name.as_str(), self.customer_email.as_str()]
    }

    fn defaults() -> Map<String, Value> {
        object(json!({
            "status": "pending",
            "currency": "USD",
            "itemsCount": 0,
        }))
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), MockError> {
        require_text("orderNumber", &self.order_number)?;
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(MockError::Validation(
                "totalAmount must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

/// Draft produced by the AI store wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStoreDraft {
    /// Identifier.
    pub id: EntityId,
    /// Name of the store to generate.
    pub store_name: String,
    /// Business category.
    pub business_type: String,
    /// Free text description.
    pub description: String,
    /// Intended customers.
    pub target_audience: String,
    /// Wizard progress.
    pub status: DraftStatus,
    /// Current wizard step, 1-based.
    pub current_step: u8,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Entity for AiStoreDraft {
    const RESOURCE: Resource = Resource::AiStoreDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.store_name.as_str(), self.business_type.as_str(), self.description.as_str()]
    }

    fn defaults() -> Map<String, Value> {
        object(json!({
            "description": "",
            "targetAudience": "",
            "status": "draft",
            "currentStep": 1,
        }))
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), MockError> {
        require_text("storeName", &self.store_name)?;
        if !(1..=WIZARD_STEPS).contains(&self.current_step) {
            return Err(MockError::Validation(format!(
                "currentStep must be between 1 and {WIZARD_STEPS}"
            )));
        }
        Ok(())
    }
}

/// Back-office user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier.
    pub id: EntityId,
    /// Full name.
    pub name: String,
    /// Sign-in email.
    pub email: String,
    /// Account state.
    pub status: UserStatus,
    /// Assigned roles.
    pub role_ids: Vec<EntityId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const RESOURCE: Resource = Resource::User;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }

    fn defaults() -> Map<String, Value> {
        object(json!({ "status": "active", "roleIds": [] }))
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), MockError> {
        require_text("name", &self.name)?;
        require_email(&self.email)
    }
}

/// Named group of permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// What the role is for.
    pub description: String,
    /// Granted permissions.
    pub permission_ids: Vec<EntityId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Entity for Role {
    const RESOURCE: Resource = Resource::Role;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }

    fn defaults() -> Map<String, Value> {
        object(json!({ "description": "", "permissionIds": [] }))
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), MockError> {
        require_text("name", &self.name)
    }
}

/// Single grant such as `orders.write`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Identifier.
    pub id: EntityId,
    /// Dotted name, `<resource>.<action>`.
    pub name: String,
    /// Resource the grant applies to.
    pub resource: String,
    /// Allowed action.
    pub action: String,
    /// What the grant allows.
    pub description: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Entity for Permission {
    const RESOURCE: Resource = Resource::Permission;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.resource.as_str(),
            self.action.as_str(),
            self.description.as_str(),
        ]
    }

    fn defaults() -> Map<String, Value> {
        object(json!({ "description": "" }))
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<(), MockError> {
        require_text("name", &self.name)?;
        require_text("resource", &self.resource)?;
        require_text("action", &self.action)
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn require_text(field: &str, value: &str) -> Result<(), MockError> {
    if value.trim().is_empty() {
        return Err(MockError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), MockError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(MockError::Validation(format!("`{email}` is not an email address"))),
    }
}
