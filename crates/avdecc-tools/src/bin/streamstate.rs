use avdecc_core::types::StreamIdentification;
use avdecc_tools::{await_entity, controller_on, parse_stream};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "avdecc-streamstate", about = "Query a talker or listener stream state")]
struct Args {
    interface: String,
    /// Stream as ENTITY_ID/STREAM_INDEX
    #[arg(value_parser = parse_stream)]
    stream: StreamIdentification,
    /// Query the listener side instead of the talker side
    #[arg(long)]
    listener: bool,
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let controller = controller_on(&args.interface, None)?;
    await_entity(&controller, args.stream.entity_id, args.timeout_secs).await?;

    let result = if args.listener {
        controller.get_listener_stream_state(args.stream).await?
    } else {
        controller.get_talker_stream_state(args.stream).await?
    };
    println!("status: {}", result.status);
    println!("talker: {}", result.talker_stream);
    println!("listener: {}", result.listener_stream);
    println!("connection count: {}", result.connection_count);
    println!("flags: 0x{:04x}", result.flags.raw());
    controller.shutdown().await;
    Ok(())
}
