//! Address Inventory
//!
//! Loads the mapping records for one cycle. Without the inventory there is
//! nothing to do, so a failure here aborts the cycle.

use crate::client::ServiceClient;
use crate::cycle::CycleError;
use crate::types::AddressRecord;

/// Snapshot of the wallet's mapping records
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub records: Vec<AddressRecord>,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records no longer accepting deposits
    pub fn disabled_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_disabled).count()
    }
}

/// Fetch the inventory for this cycle
pub async fn load_inventory<C>(client: &C) -> Result<Inventory, CycleError>
where
    C: ServiceClient + ?Sized,
{
    let records = client
        .list_address_records()
        .await
        .map_err(CycleError::Inventory)?;

    Ok(Inventory { records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MockServiceClient};
    use crate::common::config::ServiceKind;

    #[tokio::test]
    async fn test_load_inventory() {
        let mut client = MockServiceClient::new();
        client.expect_list_address_records().returning(|| {
            Ok(vec![
                AddressRecord::new("A", 1),
                AddressRecord::new("B", 2).disabled_until("2000-01-01T00:00:00Z"),
            ])
        });

        let inventory = load_inventory(&client).await.unwrap();
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.disabled_count(), 1);
    }

    #[tokio::test]
    async fn test_inventory_failure_is_cycle_error() {
        let mut client = MockServiceClient::new();
        client
            .expect_list_address_records()
            .returning(|| Err(ClientError::upstream(ServiceKind::Wallet, Some(502), "bad gateway")));

        let err = load_inventory(&client).await.unwrap_err();
        assert!(matches!(err, CycleError::Inventory(_)));
    }
}
