use avdecc_core::types::StreamIdentification;
use avdecc_tools::{await_entity, controller_on, parse_stream};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "avdecc-connect", about = "Connect a talker stream to a listener stream")]
struct Args {
    interface: String,
    /// Talker as ENTITY_ID/STREAM_INDEX
    #[arg(value_parser = parse_stream)]
    talker: StreamIdentification,
    /// Listener as ENTITY_ID/STREAM_INDEX
    #[arg(value_parser = parse_stream)]
    listener: StreamIdentification,
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let controller = controller_on(&args.interface, None)?;
    await_entity(&controller, args.listener.entity_id, args.timeout_secs).await?;

    let result = controller.connect_stream(args.talker, args.listener).await?;
    println!("status: {}", result.status);
    println!("connection count: {}", result.connection_count);
    if !result.stream_dest_mac.is_unset() {
        println!("stream dest mac: {}", result.stream_dest_mac);
        println!("stream id: {}", result.stream_id);
    }
    controller.shutdown().await;
    Ok(())
}
