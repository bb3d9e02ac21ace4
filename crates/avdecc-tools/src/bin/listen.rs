use avdecc_controller::ControllerEvent;
use avdecc_tools::{controller_on, entity_json};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "avdecc-listen",
    about = "Stream discovery, unsolicited and sniffed events from the network"
)]
struct Args {
    interface: String,
    /// Also ask everyone to advertise right away
    #[arg(long)]
    discover: bool,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let controller = controller_on(&args.interface, None)?;
    let mut events = controller.events();

    if args.discover {
        controller.discover_remote_entities().await?;
    }

    while let Some(event) = events.recv().await {
        if args.json {
            let value = match &event {
                ControllerEvent::EntityOnline(entity) => {
                    serde_json::json!({"event": "online", "entity": entity_json(entity)})
                }
                ControllerEvent::EntityUpdated(entity) => {
                    serde_json::json!({"event": "updated", "entity": entity_json(entity)})
                }
                ControllerEvent::EntityOffline(entity_id) => {
                    serde_json::json!({"event": "offline", "entity_id": entity_id.to_string()})
                }
                other => serde_json::json!({"event": format!("{other:?}")}),
            };
            println!("{value}");
        } else {
            match &event {
                ControllerEvent::EntityOnline(entity) => {
                    println!("online  {} via {}", entity.entity_id, entity.mac)
                }
                ControllerEvent::EntityUpdated(entity) => {
                    println!("update  {}", entity.entity_id)
                }
                ControllerEvent::EntityOffline(entity_id) => println!("offline {entity_id}"),
                ControllerEvent::Unsolicited(notification) => {
                    println!("unsol   {notification:?}")
                }
                ControllerEvent::AcmpSniffedCommand(acmpdu) => println!(
                    "sniffed command {:?} controller={}",
                    acmpdu.message_type, acmpdu.controller_entity_id
                ),
                ControllerEvent::AcmpSniffedResponse(acmpdu) => println!(
                    "sniffed response {:?} status={}",
                    acmpdu.message_type, acmpdu.status
                ),
                ControllerEvent::TransportError => {
                    eprintln!("transport error, exiting");
                    break;
                }
            }
        }
    }
    Ok(())
}
