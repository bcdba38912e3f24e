//! Agent-reported hardware inventory.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub disks: Vec<Disk>,
    #[serde(default)]
    pub boot: Option<Boot>,
    #[serde(default)]
    pub system_vendor: Option<SystemVendor>,
    #[serde(default)]
    pub cpu: Option<Cpu>,
}

impl Inventory {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn has_ipv4(&self) -> bool {
        self.interfaces.iter().any(|i| !i.ipv4_addresses.is_empty())
    }

    pub fn has_ipv6(&self) -> bool {
        self.interfaces.iter().any(|i| !i.ipv6_addresses.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub ipv4_addresses: Vec<String>,
    #[serde(default)]
    pub ipv6_addresses: Vec<String>,
}

impl Interface {
    /// IPv4 addresses first, then IPv6, each in CIDR notation.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.ipv4_addresses
            .iter()
            .chain(self.ipv6_addresses.iter())
            .map(String::as_str)
    }

    pub fn has_addresses(&self) -> bool {
        !self.ipv4_addresses.is_empty() || !self.ipv6_addresses.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveType {
    #[serde(rename = "HDD")]
    Hdd,
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "ODD")]
    Odd,
    #[serde(rename = "FC")]
    Fc,
    #[serde(rename = "iSCSI")]
    Iscsi,
    Multipath,
    #[serde(rename = "LVM")]
    Lvm,
    #[serde(rename = "RAID")]
    Raid,
    #[serde(rename = "ECKD")]
    Eckd,
    #[serde(rename = "ECKD (ESE)")]
    EckdEse,
    #[serde(rename = "FBA")]
    Fba,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Iscsi {
    #[serde(default)]
    pub host_ip_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub by_path: String,
    #[serde(default)]
    pub by_id: String,
    #[serde(default)]
    pub drive_type: DriveType,
    #[serde(default)]
    pub bootable: bool,
    #[serde(default)]
    pub removable: bool,
    #[serde(default)]
    pub is_installation_media: bool,
    #[serde(default)]
    pub iscsi: Option<Iscsi>,
}

impl Disk {
    /// Stable identifier: the disk id, then its by-id link, then its path.
    pub fn device_identifier(&self) -> &str {
        [&self.id, &self.by_id, &self.path]
            .into_iter()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    /// Whether the disk may be picked as installation disk when none was
    /// recorded for the host.
    ///
    /// MMC, FC and iSCSI devices, removable media and the installation media
    /// itself never qualify.
    pub fn is_install_eligible(&self) -> bool {
        !self.removable
            && !self.is_installation_media
            && !self.by_path.contains("mmcblk")
            && !self.by_path.contains("-fc-")
            && !self.by_path.contains("-iscsi-")
            && !self.device_identifier().is_empty()
    }

    /// Whether the installer should wipe this disk's boot sector.
    pub fn is_format_candidate(&self) -> bool {
        self.bootable && self.is_install_eligible()
    }

    pub fn matches_path(&self, path: &str) -> bool {
        !path.is_empty() && (self.id == path || self.by_id == path || self.path == path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Boot {
    #[serde(default)]
    pub current_boot_mode: String,
    #[serde(default)]
    pub command_line: String,
    #[serde(default)]
    pub device_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemVendor {
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    #[serde(default)]
    pub architecture: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootable(by_path: &str) -> Disk {
        Disk {
            id: "/dev/disk/by-id/test".to_string(),
            path: "/dev/sda".to_string(),
            by_path: by_path.to_string(),
            bootable: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_candidates() {
        assert!(bootable("/dev/disk/by-path/pci-0000:00:06.0").is_format_candidate());
        assert!(!bootable("/dev/disk/by-path/platform-mmcblk0").is_format_candidate());
        assert!(!bootable("/dev/disk/by-path/pci-0000:41:00.0-fc-0x5006").is_format_candidate());
        assert!(!bootable("/dev/disk/by-path/ip-192.168.1.1:3260-iscsi-iqn").is_format_candidate());

        let mut removable = bootable("");
        removable.removable = true;
        assert!(!removable.is_format_candidate());

        let mut media = bootable("");
        media.is_installation_media = true;
        assert!(!media.is_format_candidate());

        let mut not_bootable = bootable("");
        not_bootable.bootable = false;
        assert!(!not_bootable.is_format_candidate());
    }

    #[test]
    fn test_device_identifier_fallback() {
        let mut disk = Disk {
            path: "/dev/sdb".to_string(),
            ..Default::default()
        };
        assert_eq!(disk.device_identifier(), "/dev/sdb");
        disk.id = "/dev/disk/by-id/wwn-sdb".to_string();
        assert_eq!(disk.device_identifier(), "/dev/disk/by-id/wwn-sdb");
    }

    #[test]
    fn test_drive_type_wire_names() {
        let disk: Disk =
            serde_json::from_str(r#"{"drive_type":"Multipath","bootable":true}"#).unwrap();
        assert_eq!(disk.drive_type, DriveType::Multipath);
        let disk: Disk = serde_json::from_str(r#"{"drive_type":"iSCSI"}"#).unwrap();
        assert_eq!(disk.drive_type, DriveType::Iscsi);
        let disk: Disk = serde_json::from_str(r#"{"drive_type":"NVMe"}"#).unwrap();
        assert_eq!(disk.drive_type, DriveType::Unknown);
    }
}
