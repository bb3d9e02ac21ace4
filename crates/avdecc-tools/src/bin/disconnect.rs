use avdecc_core::types::StreamIdentification;
use avdecc_tools::{await_entity, controller_on, parse_stream};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "avdecc-disconnect", about = "Disconnect a stream at the listener (or talker)")]
struct Args {
    interface: String,
    #[arg(value_parser = parse_stream)]
    talker: StreamIdentification,
    #[arg(value_parser = parse_stream)]
    listener: StreamIdentification,
    /// Send DISCONNECT_TX to the talker instead of DISCONNECT_RX to the
    /// listener (for cleaning up after a vanished listener)
    #[arg(long)]
    at_talker: bool,
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let controller = controller_on(&args.interface, None)?;

    let result = if args.at_talker {
        await_entity(&controller, args.talker.entity_id, args.timeout_secs).await?;
        controller
            .disconnect_talker_stream(args.talker, args.listener)
            .await?
    } else {
        await_entity(&controller, args.listener.entity_id, args.timeout_secs).await?;
        controller
            .disconnect_stream(args.talker, args.listener)
            .await?
    };
    println!("status: {}", result.status);
    println!("connection count: {}", result.connection_count);
    controller.shutdown().await;
    Ok(())
}
