//! Deterministic fixture dataset.

use chrono::{DateTime, TimeDelta, Utc};

use crate::entity::{
    AiStoreDraft, DraftStatus, Order, OrderStatus, Permission, Role, Tenant, TenantPlan,
    TenantStatus, User, UserStatus,
};

/// 2024-01-15T09:00:00Z, the instant every seed timestamp is derived from.
const SEED_EPOCH: i64 = 1_705_309_200;

fn at(days: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(SEED_EPOCH, 0).unwrap_or_default() + TimeDelta::days(days)
}

pub(crate) fn tenants() -> Vec<Tenant> {
    let tenant = |id: &str,
                  name: &str,
                  domain: &str,
                  email: &str,
                  status: TenantStatus,
                  plan: TenantPlan,
                  (max_users, current_users): (u32, u32),
                  day: i64| Tenant {
        id: id.into(),
        name: name.into(),
        domain: domain.into(),
        email: email.into(),
        status,
        plan,
        max_users,
        current_users,
        created_at: at(day),
        updated_at: at(day + 30),
    };
    vec![
        tenant(
            "1",
            "Acme Corporation",
            "acme.com",
            "admin@acme.com",
            TenantStatus::Active,
            TenantPlan::Enterprise,
            (500, 342),
            0,
        ),
        tenant(
            "2",
            "TechStart Solutions",
            "techstart.io",
            "hello@techstart.io",
            TenantStatus::Active,
            TenantPlan::Professional,
            (50, 27),
            12,
        ),
        tenant(
            "3",
            "Global Retail Group",
            "globalretail.com",
            "it@globalretail.com",
            TenantStatus::Suspended,
            TenantPlan::Professional,
            (100, 88),
            25,
        ),
        tenant(
            "4",
            "Bloom Florists",
            "bloomflorists.shop",
            "owner@bloomflorists.shop",
            TenantStatus::Inactive,
            TenantPlan::Starter,
            (10, 2),
            40,
        ),
    ]
}

pub(crate) fn orders() -> Vec<Order> {
    let order = |id: &str,
                 number: &str,
                 customer: &str,
                 email: &str,
                 tenant: &str,
                 status: OrderStatus,
                 amount: f64,
                 items: u32,
                 day: i64| Order {
        id: id.into(),
        order_number: number.into(),
        customer_name: customer.into(),
        customer_email: email.into(),
        tenant_id: tenant.into(),
        status,
        total_amount: amount,
        currency: "USD".into(),
        items_count: items,
        created_at: at(day),
        updated_at: at(day + 2),
    };
    vec![
        order(
            "1",
            "ORD-1001",
            "John Smith",
            "john.smith@example.com",
            "1",
            OrderStatus::Delivered,
            249.99,
            3,
            50,
        ),
        order(
            "2",
            "ORD-1002",
            "Maria Garcia",
            "maria.garcia@example.com",
            "1",
            OrderStatus::Shipped,
            89.5,
            1,
            52,
        ),
        order(
            "3",
            "ORD-1003",
            "Wei Chen",
            "wei.chen@example.com",
            "2",
            OrderStatus::Processing,
            1200.0,
            8,
            53,
        ),
        order(
            "4",
            "ORD-1004",
            "Fatima Khan",
            "fatima.khan@example.com",
            "2",
            OrderStatus::Pending,
            42.0,
            2,
            55,
        ),
        order(
            "5",
            "ORD-1005",
            "Lucas Martin",
            "lucas.martin@example.com",
            "3",
            OrderStatus::Cancelled,
            310.25,
            4,
            56,
        ),
    ]
}

pub(crate) fn ai_store_drafts() -> Vec<AiStoreDraft> {
    vec![
        AiStoreDraft {
            id: "1".into(),
            store_name: "Sunrise Bakery".into(),
            business_type: "food".into(),
            description: "Artisan breads and pastries baked daily".into(),
            target_audience: "local families".into(),
            status: DraftStatus::InProgress,
            current_step: 3,
            created_at: at(60),
            updated_at: at(61),
        },
        AiStoreDraft {
            id: "2".into(),
            store_name: "Pixel Gadgets".into(),
            business_type: "electronics".into(),
            description: "Refurbished phones and accessories".into(),
            target_audience: "students".into(),
            status: DraftStatus::Draft,
            current_step: 1,
            created_at: at(62),
            updated_at: at(62),
        },
        AiStoreDraft {
            id: "3".into(),
            store_name: "Trail & Summit".into(),
            business_type: "outdoor".into(),
            description: "Hiking and camping equipment".into(),
            target_audience: "outdoor enthusiasts".into(),
            status: DraftStatus::Published,
            current_step: 5,
            created_at: at(45),
            updated_at: at(58),
        },
    ]
}

pub(crate) fn permissions() -> Vec<Permission> {
    [
        ("1", "tenants", "read", "View tenants"),
        ("2", "tenants", "write", "Create and edit tenants"),
        ("3", "orders", "read", "View orders"),
        ("4", "orders", "write", "Update order status"),
        ("5", "users", "read", "View users"),
        ("6", "users", "write", "Invite and edit users"),
        ("7", "analytics", "read", "View the analytics dashboard"),
    ]
    .into_iter()
    .map(|(id, resource, action, description)| Permission {
        id: id.into(),
        name: format!("{resource}.{action}"),
        resource: resource.into(),
        action: action.into(),
        description: description.into(),
        created_at: at(0),
        updated_at: at(0),
    })
    .collect()
}

pub(crate) fn roles() -> Vec<Role> {
    let role = |id: &str, name: &str, description: &str, permissions: &[&str]| Role {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        permission_ids: permissions.iter().map(|p| (*p).into()).collect(),
        created_at: at(0),
        updated_at: at(0),
    };
    vec![
        role(
            "1",
            "Administrator",
            "Full access to every screen",
            &["1", "2", "3", "4", "5", "6", "7"],
        ),
        role(
            "2",
            "Operations",
            "Manages tenants and orders",
            &["1", "2", "3", "4"],
        ),
        role("3", "Viewer", "Read-only access", &["1", "3", "5", "7"]),
    ]
}

pub(crate) fn users() -> Vec<User> {
    let user = |id: &str, name: &str, email: &str, status: UserStatus, roles: &[&str]| User {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        status,
        role_ids: roles.iter().map(|r| (*r).into()).collect(),
        created_at: at(1),
        updated_at: at(1),
    };
    vec![
        user("1", "Alice Johnson", "alice@valdora.io", UserStatus::Active, &["1"]),
        user("2", "Bob Williams", "bob@valdora.io", UserStatus::Active, &["2"]),
        user("3", "Carol Davis", "carol@valdora.io", UserStatus::Pending, &["3"]),
        user("4", "Dan Brown", "dan@valdora.io", UserStatus::Inactive, &[]),
    ]
}
