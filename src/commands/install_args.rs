//! coreos-installer argument assembly
//!
//! User-supplied flags are validated against an allow-list, then extended
//! with the kernel arguments the host needs to come back up on the right
//! network after the first reboot.

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::{debug, warn};

use crate::{
    core::{Cluster, Disk, DriveType, Host, InfraEnv, Interface, Inventory, StepError, StepResult},
    hardware::installation_disk,
    network::{address_in_cidr, is_dual_stack, parse_address, primary_machine_cidr, NetworkError},
};

/// Flags users may pass through to coreos-installer
pub const ALLOWED_INSTALLER_FLAGS: [&str; 9] = [
    "--append-karg",
    "--delete-karg",
    "-n",
    "--copy-network",
    "--network-dir",
    "--save-partlabel",
    "--save-partindex",
    "--image-url",
    "--image-file",
];

const COPY_NETWORK_FLAG: &str = "--copy-network";
const APPEND_KARG_FLAG: &str = "--append-karg";
const SAVE_PARTITION_FLAGS: [&str; 2] = ["--save-partlabel", "--save-partindex"];

const ZVM_VENDOR_ID: &str = "IBM/S390";
/// Product name suffix of s390x KVM guests, which boot like any other VM
const ZVM_KVM_PRODUCT_SUFFIX: &str = "KVM/Linux";
const ZVM_IP_CONFIG_OVERRIDE: &str = "ai.ip_cfg_override=1";
const ZVM_KARG_PREFIXES: [&str; 5] = [
    "rd.neednet",
    "zfcp.allow_lun_scan",
    "rd.znet",
    "rd.dasd",
    "rd.zfcp",
];
const ZVM_IP_KARG_PREFIXES: [&str; 2] = ["ip=", "nameserver="];

const MULTIPATH_KARGS: [&str; 3] = [
    "root=/dev/disk/by-label/dm-mpath-root",
    "rw",
    "rd.multipath=default",
];
const ISCSI_FIRMWARE_KARG: &str = "rd.iscsi.firmware=1";

/// Reject flags outside [`ALLOWED_INSTALLER_FLAGS`].
pub fn validate_installer_args(args: &[String]) -> StepResult<()> {
    let unexpected: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|arg| arg.starts_with('-') && !ALLOWED_INSTALLER_FLAGS.contains(arg))
        .collect();
    if unexpected.is_empty() {
        return Ok(());
    }
    Err(StepError::InvalidInstallerArgs {
        reason: format!(
            "found unexpected flags {:?}, only {:?} are allowed",
            unexpected, ALLOWED_INSTALLER_FLAGS
        ),
    })
}

/// Parse the host's stored installer args, a JSON array of strings.
pub fn parse_installer_args(raw: &str) -> StepResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let args: Vec<String> =
        serde_json::from_str(raw).map_err(|e| StepError::InvalidInstallerArgs {
            reason: e.to_string(),
        })?;
    validate_installer_args(&args)?;
    Ok(args)
}

/// Whether the user asked coreos-installer to keep existing partitions.
pub fn has_save_partition_flag(args: &[String]) -> bool {
    args.iter()
        .any(|arg| SAVE_PARTITION_FLAGS.contains(&arg.as_str()))
}

/// Whether an `ip=` kernel argument was configured manually.
pub fn has_user_ip(args: &[String]) -> bool {
    args.iter().any(|arg| arg.starts_with("ip="))
}

/// JSON encoding of the final args, `None` when there are none.
pub fn to_json_string(args: &[String]) -> StepResult<Option<String>> {
    if args.is_empty() {
        return Ok(None);
    }
    super::encode("installer args", args).map(Some)
}

/// Everything the argument builder reads about a host
#[derive(Debug, Clone, Copy)]
pub struct InstallerArgsContext<'a> {
    pub cluster: &'a Cluster,
    pub host: &'a Host,
    /// All hosts of the cluster, used to infer the machine network
    pub hosts: &'a [Host],
    pub inventory: &'a Inventory,
    pub infra_env: Option<&'a InfraEnv>,
}

impl InstallerArgsContext<'_> {
    fn has_static_network(&self) -> bool {
        self.infra_env.is_some_and(InfraEnv::has_static_network)
            || self.cluster.static_network_configured
    }
}

/// Final coreos-installer args for a host.
///
/// Starts from the user's args and appends, in order: s390x boot kargs,
/// DHCP kargs for the machine network, multipath and iSCSI kargs for the
/// installation disk, and `--copy-network` for statically configured hosts.
pub fn construct_host_installer_args(ctx: &InstallerArgsContext<'_>) -> StepResult<Vec<String>> {
    let mut args = parse_installer_args(&ctx.host.installer_args)?;

    let ip_config_override = append_s390x_args(ctx.inventory, &mut args);
    let user_ip = has_user_ip(&args);
    let static_network = ctx.has_static_network();

    if !static_network && !ip_config_override && !user_ip {
        append_dhcp_args(ctx, &mut args)?;
    }

    if let Some(disk) = installation_disk(ctx.host, ctx.inventory) {
        append_multipath_args(disk, &mut args);
        append_iscsi_args(disk, ctx.inventory, user_ip, &mut args)?;
    }

    if static_network && !args.iter().any(|arg| arg == COPY_NETWORK_FLAG) {
        args.push(COPY_NETWORK_FLAG.to_string());
    }
    Ok(args)
}

fn push_karg(args: &mut Vec<String>, karg: impl Into<String>) {
    args.push(APPEND_KARG_FLAG.to_string());
    args.push(karg.into());
}

/// Carry the z/VM and LPAR boot kargs over to the installed system.
///
/// Returns whether the boot cmdline requested its IP config to be kept.
fn append_s390x_args(inventory: &Inventory, args: &mut Vec<String>) -> bool {
    let (Some(vendor), Some(boot)) = (&inventory.system_vendor, &inventory.boot) else {
        return false;
    };
    if !vendor.manufacturer.eq_ignore_ascii_case(ZVM_VENDOR_ID)
        || vendor.product_name.ends_with(ZVM_KVM_PRODUCT_SUFFIX)
    {
        return false;
    }

    let cmdline = boot.command_line.trim();
    debug!(cmdline = %cmdline, "Copying s390x boot kernel arguments");
    let ip_config_override = cmdline.to_lowercase().contains(ZVM_IP_CONFIG_OVERRIDE);

    for part in cmdline.split(' ').filter(|part| !part.is_empty()) {
        let lower = part.to_lowercase();
        let copied = ZVM_KARG_PREFIXES.iter().any(|p| lower.starts_with(p))
            || (ip_config_override && ZVM_IP_KARG_PREFIXES.iter().any(|p| lower.starts_with(p)));
        if copied {
            push_karg(args, part);
        }
    }
    ip_config_override
}

fn dhcp_karg_value(cidr: &IpNet, dual_stack: bool) -> &'static str {
    match (dual_stack, cidr) {
        (true, _) => "dhcp,dhcp6",
        (false, IpNet::V4(_)) => "dhcp",
        (false, IpNet::V6(_)) => "dhcp6",
    }
}

fn interface_in_cidr(interface: &Interface, cidr: &IpNet) -> StepResult<bool> {
    let addresses = match cidr {
        IpNet::V4(_) => &interface.ipv4_addresses,
        IpNet::V6(_) => &interface.ipv6_addresses,
    };
    for address in addresses {
        if address_in_cidr(address, cidr)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `ip=<nic>:dhcp` for every NIC on the machine network.
fn append_dhcp_args(ctx: &InstallerArgsContext<'_>, args: &mut Vec<String>) -> StepResult<()> {
    let Some(cidr) = primary_machine_cidr(ctx.cluster, ctx.hosts)? else {
        if !ctx.host.is_day2() && !ctx.cluster.is_day2() {
            return Err(StepError::MachineCidrUnknown {
                host_id: ctx.host.id,
            });
        }
        if ctx.inventory.has_ipv4() && ctx.inventory.has_ipv6() {
            warn!(
                host_id = %ctx.host.id,
                cluster_id = %ctx.cluster.id,
                "Cannot set DHCP kernel argument for dual-stack day-2 host, ignition or ISO download may fail"
            );
        }
        return Ok(());
    };

    let dhcp = dhcp_karg_value(&cidr, is_dual_stack(ctx.cluster));
    for interface in &ctx.inventory.interfaces {
        if interface_in_cidr(interface, &cidr)? {
            debug!(
                host_id = %ctx.host.id,
                interface = %interface.name,
                dhcp,
                "Adding DHCP kernel argument"
            );
            push_karg(args, format!("ip={}:{}", interface.name, dhcp));
        }
    }
    Ok(())
}

fn append_multipath_args(disk: &Disk, args: &mut Vec<String>) {
    if disk.drive_type != DriveType::Multipath {
        return;
    }
    for karg in MULTIPATH_KARGS {
        push_karg(args, karg);
    }
}

/// Enable iSCSI boot and DHCP on the NIC that reaches the iSCSI target.
fn append_iscsi_args(
    disk: &Disk,
    inventory: &Inventory,
    user_ip: bool,
    args: &mut Vec<String>,
) -> StepResult<()> {
    if disk.drive_type != DriveType::Iscsi {
        return Ok(());
    }
    push_karg(args, ISCSI_FIRMWARE_KARG);
    if user_ip {
        return Ok(());
    }

    let host_ip = disk
        .iscsi
        .as_ref()
        .map(|iscsi| iscsi.host_ip_address.as_str())
        .unwrap_or_default();
    let host_ip = parse_address(host_ip)?;
    let nic = inventory.interfaces.iter().find(|interface| {
        let addresses = match host_ip {
            IpAddr::V4(_) => &interface.ipv4_addresses,
            IpAddr::V6(_) => &interface.ipv6_addresses,
        };
        addresses
            .iter()
            .any(|address| parse_address(address).is_ok_and(|ip| ip == host_ip))
    });
    let nic = nic.ok_or_else(|| NetworkError::NoMatchingInterface {
        address: host_ip.to_string(),
    })?;

    let dhcp = if host_ip.is_ipv6() { "dhcp6" } else { "dhcp" };
    push_karg(args, format!("ip={}:{}", nic.name, dhcp));
    Ok(())
}
