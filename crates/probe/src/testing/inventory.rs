//! Fixed block device inventories.

use crate::inventory::{BlockDevice, BlockInventory};
use linkguard_core::Result;

/// Inventory returning a fixed device list.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    devices: Vec<BlockDevice>,
}

impl StaticInventory {
    /// An empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` disks; `transport` `scsi` gives them H:C:T:L addresses,
    /// anything else sets the `TRAN` column.
    pub fn with_disks(mut self, prefix: &str, count: usize, transport: &str) -> Self {
        let start = self.devices.len();
        for i in 0..count {
            let scsi = transport == crate::inventory::SCSI_TRANSPORT;
            self.devices.push(BlockDevice {
                name: format!("{}{}", prefix, i),
                hctl: scsi.then(|| format!("{}:0:0:0", start + i)),
                tran: (!scsi).then(|| transport.to_string()),
                kind: Some("disk".to_string()),
                ..BlockDevice::default()
            });
        }
        self
    }

    /// Add `disks` disks carrying `parts` partitions each, all named `label`.
    pub fn with_labeled_partitions(mut self, prefix: &str, disks: usize, parts: usize, label: &str) -> Self {
        for d in 0..disks {
            let name = format!("{}{}", prefix, d);
            let children = (1..=parts)
                .map(|p| BlockDevice {
                    name: format!("{}{}", name, p),
                    kind: Some("part".to_string()),
                    partlabel: Some(label.to_string()),
                    ..BlockDevice::default()
                })
                .collect();
            self.devices.push(BlockDevice {
                name,
                tran: Some("virtio".to_string()),
                kind: Some("disk".to_string()),
                children,
                ..BlockDevice::default()
            });
        }
        self
    }
}

impl BlockInventory for StaticInventory {
    fn devices(&self) -> Result<Vec<BlockDevice>> {
        Ok(self.devices.clone())
    }
}
