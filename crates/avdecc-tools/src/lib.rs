//! Shared plumbing for the avdecc command-line tools: argument parsing for
//! EUI-64 and stream identifiers, controller construction, and JSON views
//! of discovered entities.

use avdecc_controller::{Controller, DiscoveredEntity, LocalEntity};
use avdecc_core::ethernet::MacAddress;
use avdecc_core::types::{StreamIdentification, UniqueIdentifier};
use avdecc_datalink::{DataLink, RawEthernetTransport};

/// Parses an EUI-64 from hex, tolerating `0x` prefixes and `:`/`-` group
/// separators.
pub fn parse_eui64(s: &str) -> Result<UniqueIdentifier, String> {
    let digits: String = s
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !matches!(c, ':' | '-'))
        .collect();
    u64::from_str_radix(&digits, 16)
        .map(UniqueIdentifier::new)
        .map_err(|err| format!("invalid EUI-64 {s:?}: {err}"))
}

/// Parses `ENTITY_ID/STREAM_INDEX`, e.g. `0x0011223344556677/0`.
pub fn parse_stream(s: &str) -> Result<StreamIdentification, String> {
    let (entity, index) = s
        .split_once('/')
        .ok_or_else(|| format!("expected ENTITY_ID/STREAM_INDEX, got {s:?}"))?;
    Ok(StreamIdentification::new(
        parse_eui64(entity)?,
        index
            .parse()
            .map_err(|err| format!("invalid stream index {index:?}: {err}"))?,
    ))
}

/// Derives a controller EUI-64 from the interface MAC (EUI-48 to EUI-64
/// expansion with FF-FE in the middle).
pub fn eui64_from_mac(mac: MacAddress) -> UniqueIdentifier {
    let m = mac.raw();
    UniqueIdentifier::new(u64::from_be_bytes([
        m[0], m[1], m[2], 0xFF, 0xFE, m[3], m[4], m[5],
    ]))
}

/// Opens the interface and starts a controller on it. The entity id
/// defaults to one derived from the interface MAC.
pub fn controller_on(
    interface: &str,
    entity_id: Option<UniqueIdentifier>,
) -> Result<Controller<RawEthernetTransport>, Box<dyn std::error::Error>> {
    let datalink = RawEthernetTransport::open(interface)?;
    let entity_id = entity_id.unwrap_or_else(|| eui64_from_mac(datalink.mac()));
    let local = LocalEntity::controller(entity_id, UniqueIdentifier::NULL);
    Ok(Controller::new(datalink, local)?)
}

/// Discovers `entity_id` and waits until it shows up, or errors out after
/// `timeout_secs`.
pub async fn await_entity(
    controller: &Controller<RawEthernetTransport>,
    entity_id: UniqueIdentifier,
    timeout_secs: u64,
) -> Result<DiscoveredEntity, Box<dyn std::error::Error>> {
    controller.discover_remote_entity(entity_id).await?;
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(timeout_secs);
    loop {
        if let Some(entity) = controller.discovered_entity(entity_id).await {
            return Ok(entity);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(format!("entity {entity_id} not found").into());
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

/// A JSON view of a discovered entity for `--json` output.
pub fn entity_json(entity: &DiscoveredEntity) -> serde_json::Value {
    serde_json::json!({
        "entity_id": entity.entity_id.to_string(),
        "entity_model_id": entity.entity_model_id.to_string(),
        "mac": entity.mac.to_string(),
        "entity_capabilities": entity.entity_capabilities.raw(),
        "talker_stream_sources": entity.talker_stream_sources,
        "talker_capabilities": entity.talker_capabilities.raw(),
        "listener_stream_sinks": entity.listener_stream_sinks,
        "listener_capabilities": entity.listener_capabilities.raw(),
        "controller_capabilities": entity.controller_capabilities.raw(),
        "available_index": entity.available_index,
        "gptp_grandmaster_id": entity.gptp_grandmaster_id.to_string(),
        "gptp_domain_number": entity.gptp_domain_number,
        "association_id": entity.association_id.to_string(),
        "interface_index": entity.interface_index,
    })
}

pub fn print_entity(index: usize, entity: &DiscoveredEntity) {
    println!(
        "{index}: {} model={} mac={} talkers={} listeners={}",
        entity.entity_id,
        entity.entity_model_id,
        entity.mac,
        entity.talker_stream_sources,
        entity.listener_stream_sinks,
    );
}

#[cfg(test)]
mod tests {
    use super::{eui64_from_mac, parse_eui64, parse_stream};
    use avdecc_core::ethernet::MacAddress;

    #[test]
    fn parses_eui64_forms() {
        let expected = 0x0011_2233_4455_6677;
        assert_eq!(parse_eui64("0x0011223344556677").unwrap().raw(), expected);
        assert_eq!(
            parse_eui64("00:11:22:33:44:55:66:77").unwrap().raw(),
            expected
        );
        assert!(parse_eui64("garbage").is_err());
    }

    #[test]
    fn parses_stream_identification() {
        let stream = parse_stream("0x0011223344556677/2").unwrap();
        assert_eq!(stream.stream_index, 2);
        assert!(parse_stream("0x0011223344556677").is_err());
    }

    #[test]
    fn expands_mac_to_eui64() {
        let id = eui64_from_mac(MacAddress([0x00, 0x1B, 0x92, 0x01, 0x02, 0x03]));
        assert_eq!(id.raw(), 0x001B_92FF_FE01_0203);
    }
}
