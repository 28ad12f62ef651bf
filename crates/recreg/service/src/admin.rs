use recreg_types::{Address, RegistryError, Role};
use tracing::warn;

/// Gatekeeper for administrator-only operations.
///
/// The administrator is fixed when the registry is opened and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminController {
    admin: Address,
}

impl AdminController {
    pub fn new(admin: Address) -> Self {
        Self { admin }
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn is_admin(&self, caller: &Address) -> bool {
        caller == &self.admin
    }

    pub fn authorize(&self, caller: &Address) -> Result<(), RegistryError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "Administrator operation rejected");
            Err(RegistryError::unauthorized(caller, Role::Administrator))
        }
    }
}
