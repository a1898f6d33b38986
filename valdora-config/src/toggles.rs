//! Per-feature switches of the dashboard.

use serde::{Deserialize, Serialize};

/// Strongly typed feature toggles.
///
/// Each field has a stable snake_case name used by [`FeatureToggles::is_enabled`]
/// and by the `VALDORA_FEATURE_<NAME>` environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Analytics dashboard and its summary endpoint.
    pub analytics: bool,
    /// AI store draft wizard.
    pub ai_store_wizard: bool,
    /// Orders screens.
    pub orders: bool,
    /// Users, roles and permissions screens.
    pub user_management: bool,
    /// In-app notifications.
    pub notifications: bool,
    /// Billing alerts in the top bar.
    pub billing_alerts: bool,
}

impl FeatureToggles {
    /// Toggle names, in field order.
    pub const NAMES: [&'static str; 6] = [
        "analytics",
        "ai_store_wizard",
        "orders",
        "user_management",
        "notifications",
        "billing_alerts",
    ];

    /// Looks a toggle up by name. Unknown names are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    /// Looks a toggle up by name, `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<bool> {
        match name {
            "analytics" => Some(self.analytics),
            "ai_store_wizard" => Some(self.ai_store_wizard),
            "orders" => Some(self.orders),
            "user_management" => Some(self.user_management),
            "notifications" => Some(self.notifications),
            "billing_alerts" => Some(self.billing_alerts),
            _ => None,
        }
    }

    /// Sets a toggle by name. Returns `false` for unknown names.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        let slot = match name {
            "analytics" => &mut self.analytics,
            "ai_store_wizard" => &mut self.ai_store_wizard,
            "orders" => &mut self.orders,
            "user_management" => &mut self.user_management,
            "notifications" => &mut self.notifications,
            "billing_alerts" => &mut self.billing_alerts,
            _ => return false,
        };
        *slot = enabled;
        true
    }

    /// Iterates over `(name, enabled)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        Self::NAMES.into_iter().map(|name| (name, self.is_enabled(name)))
    }
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            analytics: true,
            ai_store_wizard: true,
            orders: true,
            user_management: true,
            notifications: true,
            billing_alerts: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_is_addressable() {
        let mut toggles = FeatureToggles::default();
        for name in FeatureToggles::NAMES {
            assert_eq!(toggles.get(name), Some(true));
            assert!(toggles.set(name, false));
            assert!(!toggles.is_enabled(name));
        }
        assert!(toggles.iter().all(|(_, enabled)| !enabled));
    }

    #[test]
    fn test_unknown_name() {
        let mut toggles = FeatureToggles::default();
        assert_eq!(toggles.get("dark_mode"), None);
        assert!(!toggles.is_enabled("dark_mode"));
        assert!(!toggles.set("dark_mode", true));
    }
}
