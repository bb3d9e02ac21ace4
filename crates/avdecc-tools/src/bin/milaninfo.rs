use avdecc_core::types::UniqueIdentifier;
use avdecc_tools::{await_entity, controller_on, parse_eui64};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "avdecc-milaninfo", about = "Query Milan info (MVU GET_MILAN_INFO)")]
struct Args {
    interface: String,
    #[arg(value_parser = parse_eui64)]
    entity: UniqueIdentifier,
    #[arg(long, default_value_t = 0)]
    configuration: u16,
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let controller = controller_on(&args.interface, None)?;
    await_entity(&controller, args.entity, args.timeout_secs).await?;

    let result = controller
        .get_milan_info(args.entity, args.configuration)
        .await?;
    println!("status: {}", result.status);
    if let Some(info) = result.info {
        println!("protocol version: {}", info.protocol_version);
        println!("features: 0x{:08x}", info.features_flags);
        println!("certification: 0x{:08x}", info.certification_version);
    }
    controller.shutdown().await;
    Ok(())
}
