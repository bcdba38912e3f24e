//! Host hardware lookups: installation disk and usable network interfaces.

use std::fmt::Debug;

use crate::core::{Disk, Host, Interface, Inventory, StepResult};

/// Device the installer writes to.
///
/// The host's recorded installation disk wins; hosts without one fall back
/// to the first eligible inventory disk.
pub fn boot_device(host: &Host, inventory: &Inventory) -> Option<String> {
    match host.installation_path() {
        Some(path) => Some(path.to_string()),
        None => first_eligible_disk(inventory).map(|disk| disk.device_identifier().to_string()),
    }
}

/// Inventory disk the host installs to, with the same fallback as [`boot_device`].
pub fn installation_disk<'a>(host: &Host, inventory: &'a Inventory) -> Option<&'a Disk> {
    match host.installation_path() {
        Some(path) => inventory.disks.iter().find(|disk| disk.matches_path(path)),
        None => first_eligible_disk(inventory),
    }
}

pub fn first_eligible_disk(inventory: &Inventory) -> Option<&Disk> {
    inventory.disks.iter().find(|disk| disk.is_install_eligible())
}

/// Selects the interfaces a host can be probed on
pub trait InterfaceValidator: Send + Sync + Debug {
    fn valid_interfaces(&self, host: &Host) -> StepResult<Vec<Interface>>;
}

/// Interfaces reported in the inventory that carry at least one address
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryInterfaceValidator;

impl InterfaceValidator for InventoryInterfaceValidator {
    fn valid_interfaces(&self, host: &Host) -> StepResult<Vec<Interface>> {
        let inventory = host.parse_inventory()?;
        Ok(inventory
            .interfaces
            .into_iter()
            .filter(Interface::has_addresses)
            .collect())
    }
}
