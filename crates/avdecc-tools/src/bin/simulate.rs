use avdecc_controller::simulator::{
    default_entity_descriptor, SimulatedEntity, SimulatedEntityConfig,
};
use avdecc_core::mvu::MilanInfo;
use avdecc_core::types::UniqueIdentifier;
use avdecc_datalink::RawEthernetTransport;
use avdecc_tools::parse_eui64;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "avdecc-simulate",
    about = "Run a simulated AVDECC entity on a network interface"
)]
struct Args {
    interface: String,
    #[arg(value_parser = parse_eui64)]
    entity: UniqueIdentifier,
    #[arg(long, default_value_t = 10)]
    valid_time_secs: u8,
    /// Answer GET_MILAN_INFO as a Milan device
    #[arg(long)]
    milan: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = SimulatedEntityConfig::new(args.entity);
    config.valid_time_seconds = args.valid_time_secs.clamp(2, 62);
    if args.milan {
        config.milan_info = Some(MilanInfo {
            configuration_index: 0,
            protocol_version: 1,
            features_flags: 0,
            certification_version: 0,
        });
    }

    let datalink = RawEthernetTransport::open(&args.interface)?;
    let simulator = SimulatedEntity::new(config.clone(), datalink);
    let (descriptor, body) = default_entity_descriptor(&config);
    simulator.add_descriptor(descriptor, body).await;

    log::info!("simulating entity {} on {}", args.entity, args.interface);
    let responder = async { simulator.run().await };
    let advertiser = async {
        let interval = Duration::from_secs(u64::from(config.valid_time_seconds) / 4).max(
            Duration::from_secs(1),
        );
        loop {
            if let Err(err) = simulator.advertise().await {
                break Err::<(), _>(err);
            }
            tokio::time::sleep(interval).await;
        }
    };
    tokio::select! {
        result = responder => result?,
        result = advertiser => result?,
    }
    Ok(())
}
