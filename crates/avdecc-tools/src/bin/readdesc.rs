use avdecc_core::aem::DescriptorRef;
use avdecc_core::types::{DescriptorType, UniqueIdentifier};
use avdecc_tools::{await_entity, controller_on, parse_eui64};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "avdecc-readdesc", about = "Read a raw descriptor from an entity")]
struct Args {
    interface: String,
    #[arg(value_parser = parse_eui64)]
    entity: UniqueIdentifier,
    /// Descriptor type (numeric, e.g. 0 for ENTITY, 5 for STREAM_INPUT)
    #[arg(long, default_value_t = 0)]
    descriptor_type: u16,
    #[arg(long, default_value_t = 0)]
    descriptor_index: u16,
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
        .read_descriptor(
            args.entity,
            args.configuration,
            DescriptorRef::new(
                DescriptorType::from_u16(args.descriptor_type),
                args.descriptor_index,
            ),
        )
        .await?;

    println!("status: {}", result.status);
    if let Some(descriptor) = result.descriptor {
        println!(
            "descriptor: type={:?} index={}",
            descriptor.descriptor_type, descriptor.descriptor_index
        );
    }
    if !result.data.is_empty() {
        for chunk in result.data.chunks(16) {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            println!("  {}", hex.join(" "));
        }
    }
    controller.shutdown().await;
    Ok(())
}
