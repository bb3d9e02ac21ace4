//! The ADP discovery table.
//!
//! Pure state: frames and timers come in, lifecycle decisions come out. The
//! engine layers event emission and transaction cancellation on top.

use crate::entity::DiscoveredEntity;
use avdecc_core::adpdu::Adpdu;
use avdecc_core::ethernet::MacAddress;
use avdecc_core::types::UniqueIdentifier;
use std::collections::HashMap;
use tokio::time::Instant;

/// What an ENTITY_AVAILABLE advertisement meant for the table.
#[derive(Debug)]
pub(crate) enum AdpOutcome {
    /// First sighting of this entity.
    Online(DiscoveredEntity),
    /// A field other than `available_index` changed.
    Updated(DiscoveredEntity),
    /// `available_index` went backwards: the entity restarted. Observers see
    /// offline followed by online, and pending transactions are cancelled.
    Rebirth(DiscoveredEntity),
    /// Identical advertisement; only the timeout was refreshed. No event.
    Refreshed,
}

#[derive(Default)]
pub(crate) struct DiscoveryTable {
    entities: HashMap<UniqueIdentifier, DiscoveredEntity>,
}

impl DiscoveryTable {
    pub fn on_available(&mut self, adp: &Adpdu, source: MacAddress, now: Instant) -> AdpOutcome {
        let fresh = DiscoveredEntity::from_advertisement(adp, source, now);
        match self.entities.get_mut(&adp.entity_id) {
            None => {
                self.entities.insert(adp.entity_id, fresh.clone());
                AdpOutcome::Online(fresh)
            }
            Some(known) => {
                if adp.available_index < known.available_index {
                    *known = fresh.clone();
                    return AdpOutcome::Rebirth(fresh);
                }
                if known.advertised_fields_differ(adp, source) {
                    *known = fresh.clone();
                    return AdpOutcome::Updated(fresh);
                }
                known.available_index = adp.available_index;
                known.valid_until = fresh.valid_until;
                AdpOutcome::Refreshed
            }
        }
    }

    /// Removes a departing entity; `None` if it was never known.
    pub fn on_departing(&mut self, entity_id: UniqueIdentifier) -> Option<DiscoveredEntity> {
        self.entities.remove(&entity_id)
    }

    /// Removes and returns every entity whose timeout has passed.
    pub fn sweep(&mut self, now: Instant) -> Vec<UniqueIdentifier> {
        let expired: Vec<UniqueIdentifier> = self
            .entities
            .values()
            .filter(|entity| now > entity.valid_until)
            .map(|entity| entity.entity_id)
            .collect();
        for entity_id in &expired {
            self.entities.remove(entity_id);
        }
        expired
    }

    pub fn get(&self, entity_id: UniqueIdentifier) -> Option<&DiscoveredEntity> {
        self.entities.get(&entity_id)
    }

    pub fn snapshot(&self) -> Vec<DiscoveredEntity> {
        let mut entities: Vec<DiscoveredEntity> = self.entities.values().cloned().collect();
        entities.sort_by_key(|entity| entity.entity_id);
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::{AdpOutcome, DiscoveryTable};
    use avdecc_core::adpdu::{AdpMessageType, Adpdu};
    use avdecc_core::ethernet::MacAddress;
    use avdecc_core::types::{EntityCapabilities, UniqueIdentifier};
    use tokio::time::{Duration, Instant};

    const MAC: MacAddress = MacAddress([2, 0, 0, 0, 0, 1]);

    fn available(entity: u64, index: u32) -> Adpdu {
        let mut adp = Adpdu::discover(UniqueIdentifier::new(entity));
        adp.message_type = AdpMessageType::EntityAvailable;
        adp.valid_time_seconds = 10;
        adp.available_index = index;
        adp
    }

    #[test]
    fn first_available_is_online() {
        let mut table = DiscoveryTable::default();
        let now = Instant::now();
        match table.on_available(&available(1, 0), MAC, now) {
            AdpOutcome::Online(entity) => {
                assert_eq!(entity.entity_id, UniqueIdentifier::new(1));
                assert_eq!(entity.valid_until, now + Duration::from_secs(20));
            }
            other => panic!("expected online, got {other:?}"),
        }
    }

    #[test]
    fn identical_refresh_is_silent() {
        let mut table = DiscoveryTable::default();
        let now = Instant::now();
        table.on_available(&available(1, 0), MAC, now);
        let later = now + Duration::from_secs(3);
        assert!(matches!(
            table.on_available(&available(1, 0), MAC, later),
            AdpOutcome::Refreshed
        ));
        // The timeout moved even though no event fired.
        assert_eq!(
            table.get(UniqueIdentifier::new(1)).unwrap().valid_until,
            later + Duration::from_secs(20)
        );
    }

    #[test]
    fn increased_available_index_only_refreshes() {
        let mut table = DiscoveryTable::default();
        table.on_available(&available(1, 0), MAC, Instant::now());
        assert!(matches!(
            table.on_available(&available(1, 5), MAC, Instant::now()),
            AdpOutcome::Refreshed
        ));
    }

    #[test]
    fn changed_field_is_an_update() {
        let mut table = DiscoveryTable::default();
        table.on_available(&available(1, 0), MAC, Instant::now());
        let mut changed = available(1, 1);
        changed.entity_capabilities = EntityCapabilities::AEM_SUPPORTED;
        assert!(matches!(
            table.on_available(&changed, MAC, Instant::now()),
            AdpOutcome::Updated(_)
        ));
    }

    #[test]
    fn available_index_rollback_is_a_rebirth() {
        let mut table = DiscoveryTable::default();
        table.on_available(&available(1, 7), MAC, Instant::now());
        assert!(matches!(
            table.on_available(&available(1, 2), MAC, Instant::now()),
            AdpOutcome::Rebirth(_)
        ));
        // The reborn entity starts over from the new index.
        assert_eq!(
            table.get(UniqueIdentifier::new(1)).unwrap().available_index,
            2
        );
    }

    #[test]
    fn source_mac_change_is_an_update() {
        let mut table = DiscoveryTable::default();
        table.on_available(&available(1, 0), MAC, Instant::now());
        let other_mac = MacAddress([2, 0, 0, 0, 0, 9]);
        assert!(matches!(
            table.on_available(&available(1, 1), other_mac, Instant::now()),
            AdpOutcome::Updated(_)
        ));
        assert_eq!(table.get(UniqueIdentifier::new(1)).unwrap().mac, other_mac);
    }

    #[test]
    fn sweep_removes_expired_entities() {
        let mut table = DiscoveryTable::default();
        let now = Instant::now();
        table.on_available(&available(1, 0), MAC, now);
        table.on_available(&available(2, 0), MAC, now + Duration::from_secs(15));

        assert!(table.sweep(now + Duration::from_secs(19)).is_empty());
        let expired = table.sweep(now + Duration::from_secs(21));
        assert_eq!(expired, vec![UniqueIdentifier::new(1)]);
        assert!(table.get(UniqueIdentifier::new(1)).is_none());
        assert!(table.get(UniqueIdentifier::new(2)).is_some());
    }

    #[test]
    fn departing_removes_immediately() {
        let mut table = DiscoveryTable::default();
        table.on_available(&available(1, 0), MAC, Instant::now());
        assert!(table.on_departing(UniqueIdentifier::new(1)).is_some());
        assert!(table.on_departing(UniqueIdentifier::new(1)).is_none());
    }
}
