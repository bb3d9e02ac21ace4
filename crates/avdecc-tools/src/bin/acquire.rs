use avdecc_core::aem::DescriptorRef;
use avdecc_core::types::{DescriptorType, UniqueIdentifier};
use avdecc_tools::{await_entity, controller_on, parse_eui64};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "avdecc-acquire", about = "Acquire or release an AVDECC entity")]
struct Args {
    interface: String,
    #[arg(value_parser = parse_eui64)]
    entity: UniqueIdentifier,
    /// Keep the acquisition across controller restarts
    #[arg(long)]
    persistent: bool,
    /// Release instead of acquiring
    #[arg(long)]
    release: bool,
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let controller = controller_on(&args.interface, None)?;
    await_entity(&controller, args.entity, args.timeout_secs).await?;

    let descriptor = DescriptorRef::new(DescriptorType::Entity, 0);
    let result = if args.release {
        controller.release_entity(args.entity, descriptor).await?
    } else {
        controller
            .acquire_entity(args.entity, args.persistent, descriptor)
            .await?
    };

    println!("status: {}", result.status);
    if let Some(owner) = result.owning_entity {
        println!("owning entity: {owner}");
    }
    controller.shutdown().await;
    Ok(())
}
