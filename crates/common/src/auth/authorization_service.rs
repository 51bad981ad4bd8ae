use crate::auth::Actor;
use crate::domain::{Device, DeviceState, DomainError, DomainResult};
use tracing::debug;

/// Role checks and device visibility.
/// Enables mocking in tests while using role rules in production.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthorizationProvider: Send + Sync {
    /// Return PermissionDenied unless the actor is an administrator
    fn require_admin(&self, actor: &Actor, operation: &str) -> DomainResult<()>;

    /// Whether the actor may see the device in listings
    fn can_view(&self, actor: &Actor, device: &Device) -> bool;
}

/// Default policy: admins see and manage everything, users see every device
/// that is not withdrawn plus the ones they own or hold.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorizationProvider;

impl RoleAuthorizationProvider {
    pub fn new() -> Self {
        Self
    }
}

impl AuthorizationProvider for RoleAuthorizationProvider {
    fn require_admin(&self, actor: &Actor, operation: &str) -> DomainResult<()> {
        if actor.is_admin() {
            return Ok(());
        }
        debug!(user_id = %actor.user_id, operation, "admin permission denied");
        Err(DomainError::PermissionDenied(format!(
            "{} requires an administrator",
            operation
        )))
    }

    fn can_view(&self, actor: &Actor, device: &Device) -> bool {
        actor.is_admin()
            || device.effective_state() != DeviceState::Unavailable
            || actor.holds(
                device.attributes.owner.as_deref(),
                device.attributes.possessor.as_deref(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_device;

    #[test]
    fn test_admin_passes_require_admin() {
        let provider = RoleAuthorizationProvider::new();
        assert!(provider
            .require_admin(&Actor::admin("root"), "destroy")
            .is_ok());
    }

    #[test]
    fn test_user_is_denied_admin_operations() {
        let provider = RoleAuthorizationProvider::new();
        let result = provider.require_admin(&Actor::user("bob"), "destroy");
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }

    #[test]
    fn test_users_do_not_see_withdrawn_devices_they_do_not_hold() {
        let provider = RoleAuthorizationProvider::new();
        let device = sample_device("dev-1", Some(DeviceState::Unavailable));

        assert!(!provider.can_view(&Actor::user("bob"), &device));
        assert!(provider.can_view(&Actor::admin("root"), &device));
    }

    #[test]
    fn test_owner_sees_own_withdrawn_device() {
        let provider = RoleAuthorizationProvider::new();
        let mut device = sample_device("dev-1", Some(DeviceState::Unavailable));
        device.attributes.owner = Some("bob".to_string());

        assert!(provider.can_view(&Actor::user("bob"), &device));
    }

    #[test]
    fn test_available_and_requested_devices_are_visible() {
        let provider = RoleAuthorizationProvider::new();
        let bob = Actor::user("bob");
        assert!(provider.can_view(&bob, &sample_device("dev-1", None)));
        assert!(provider.can_view(&bob, &sample_device("dev-2", Some(DeviceState::Requested))));
    }
}
