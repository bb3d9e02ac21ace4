use avdecc_tools::{controller_on, entity_json, parse_eui64, print_entity};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "avdecc-discover", about = "Discover AVDECC entities on a network interface")]
struct Args {
    /// Network interface to bind, e.g. eth0
    interface: String,
    /// How long to collect advertisements
    #[arg(long, default_value_t = 3)]
    wait_secs: u64,
    /// Discover one specific entity instead of everyone
    #[arg(long, value_parser = parse_eui64)]
    entity: Option<avdecc_core::types::UniqueIdentifier>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let controller = controller_on(&args.interface, None)?;

    match args.entity {
        Some(entity_id) => controller.discover_remote_entity(entity_id).await?,
        None => controller.discover_remote_entities().await?,
    }
    tokio::time::sleep(Duration::from_secs(args.wait_secs)).await;

    let entities = controller.discovered_entities().await;
    if args.json {
        let list: Vec<_> = entities.iter().map(entity_json).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        for (index, entity) in entities.iter().enumerate() {
            print_entity(index, entity);
        }
    }
    controller.shutdown().await;
    Ok(())
}
