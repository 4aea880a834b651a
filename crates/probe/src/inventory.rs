//! Block device inventory from `lsblk --json`.

use crate::command;
use linkguard_core::{HarnessError, NamingScheme, Result};
use serde::Deserialize;
use std::process::Command;

/// Transport class matching every device with an H:C:T:L address.
pub const SCSI_TRANSPORT: &str = "scsi";

/// One entry of the block device tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BlockDevice {
    /// Kernel name, e.g. `sda`, `nvme0n1p1`
    pub name: String,
    /// SCSI address, present for SCSI-attached devices
    #[serde(default)]
    pub hctl: Option<String>,
    /// Transport (`sata`, `sas`, `iscsi`, `nvme`, ...)
    #[serde(default)]
    pub tran: Option<String>,
    /// Device type (`disk`, `part`, `mpath`, ...)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// GPT partition name
    #[serde(default)]
    pub partlabel: Option<String>,
    /// Filesystem label
    #[serde(default)]
    pub label: Option<String>,
    /// Partitions and holders
    #[serde(default)]
    pub children: Vec<BlockDevice>,
}

impl BlockDevice {
    /// This device followed by all its descendants, depth first.
    pub fn flatten(&self) -> Vec<&BlockDevice> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }

    /// Whether the device belongs to the transport class `transport`.
    pub fn has_transport(&self, transport: &str) -> bool {
        if transport == SCSI_TRANSPORT {
            return self.hctl.as_deref().is_some_and(|h| !h.is_empty());
        }
        self.tran.as_deref() == Some(transport)
    }

    /// Label value published under `scheme`, if any.
    pub fn label_for(&self, scheme: NamingScheme) -> Option<&str> {
        match scheme {
            NamingScheme::ByPartlabel => self.partlabel.as_deref(),
            NamingScheme::ByLabel => self.label.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<BlockDevice>,
}

/// Enumerates block devices.
pub trait BlockInventory: Send + Sync {
    /// Top-level block devices with their children.
    fn devices(&self) -> Result<Vec<BlockDevice>>;

    /// Top-level devices of transport class `transport`.
    fn count_transport(&self, transport: &str) -> Result<usize> {
        Ok(self
            .devices()?
            .iter()
            .filter(|d| d.has_transport(transport))
            .count())
    }

    /// Entries anywhere in the tree whose `scheme` label equals `label`.
    fn count_label(&self, scheme: NamingScheme, label: &str) -> Result<usize> {
        Ok(self
            .devices()?
            .iter()
            .flat_map(|d| d.flatten())
            .filter(|d| d.label_for(scheme) == Some(label))
            .count())
    }
}

/// Inventory backed by `lsblk`.
#[derive(Debug, Clone, Default)]
pub struct LsblkInventory;

impl LsblkInventory {
    /// Create the inventory.
    pub fn new() -> Self {
        LsblkInventory
    }
}

impl BlockInventory for LsblkInventory {
    fn devices(&self) -> Result<Vec<BlockDevice>> {
        let output = command::run(Command::new("lsblk").args([
            "--json",
            "--all",
            "-o",
            "NAME,HCTL,TRAN,TYPE,PARTLABEL,LABEL",
        ]))?;
        parse_lsblk(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `lsblk --json` output.
pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>> {
    let parsed: LsblkOutput = serde_json::from_str(json)
        .map_err(|e| HarnessError::parse(format!("invalid lsblk output: {}", e)))?;
    Ok(parsed.blockdevices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSBLK: &str = r#"{
   "blockdevices": [
      {"name":"sda", "hctl":"0:0:0:0", "tran":"sata", "type":"disk", "partlabel":null, "label":null,
         "children": [
            {"name":"sda1", "hctl":null, "tran":null, "type":"part", "partlabel":"Hello world", "label":null},
            {"name":"sda2", "hctl":null, "tran":null, "type":"part", "partlabel":"Hello world", "label":"data"}
         ]
      },
      {"name":"sdb", "hctl":"1:0:0:0", "tran":"iscsi", "type":"disk", "partlabel":null, "label":null},
      {"name":"nvme0n1", "hctl":null, "tran":"nvme", "type":"disk", "partlabel":null, "label":null},
      {"name":"vda", "hctl":null, "tran":null, "type":"disk", "partlabel":null, "label":"Hello world"}
   ]
}"#;

    struct Fixed;

    impl BlockInventory for Fixed {
        fn devices(&self) -> Result<Vec<BlockDevice>> {
            parse_lsblk(LSBLK)
        }
    }

    #[test]
    fn test_parse_tree() {
        let devices = parse_lsblk(LSBLK).unwrap();
        assert_eq!(devices.len(), 4);
        assert_eq!(devices[0].children.len(), 2);
        assert_eq!(devices[0].kind.as_deref(), Some("disk"));
        assert_eq!(devices[0].flatten().len(), 3);
    }

    #[test]
    fn test_transport_counts() {
        assert_eq!(Fixed.count_transport(SCSI_TRANSPORT).unwrap(), 2);
        assert_eq!(Fixed.count_transport("nvme").unwrap(), 1);
        assert_eq!(Fixed.count_transport("usb").unwrap(), 0);
    }

    #[test]
    fn test_label_counts_by_scheme() {
        assert_eq!(Fixed.count_label(NamingScheme::ByPartlabel, "Hello world").unwrap(), 2);
        assert_eq!(Fixed.count_label(NamingScheme::ByLabel, "Hello world").unwrap(), 1);
        assert_eq!(Fixed.count_label(NamingScheme::ById, "Hello world").unwrap(), 0);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_lsblk("not json"), Err(HarnessError::Parse(_))));
    }
}
