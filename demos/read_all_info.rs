use dual_gripper_rs::*;

/// Dump every register of both actuators as JSON.
///
/// `cargo run --example read_all_info -- /dev/ttyUSB0`
#[tokio::main]
async fn main() -> Result<(), GripperError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let config = GripperConfig {
        serial: SerialConfig {
            port,
            ..Default::default()
        },
        ..Default::default()
    };

    let gripper = Coordinator::open(&config)?;
    let (left, right) = gripper.read_snapshots().await;
    for snapshot in [left, right] {
        if !snapshot.is_complete() {
            eprintln!("{:?}: no answer for {:?}", snapshot.side, snapshot.missing());
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("cannot encode snapshot: {err}"),
        }
    }

    gripper.close().await?;
    Ok(())
}
