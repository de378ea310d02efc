use std::time::Duration;

use dual_gripper_rs::*;

/// Sweep both fingers 0% -> 100% -> 0% and print the read-back positions.
///
/// `cargo run --example sweep -- /dev/ttyUSB0 [config.json]`
#[tokio::main]
async fn main() -> Result<(), GripperError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let mut config = match args.next() {
        Some(path) => GripperConfig::from_file(path)?,
        None => GripperConfig::default(),
    };
    config.serial.port = port;

    let gripper = Coordinator::open(&config)?;
    gripper.set_speed(1022).await?.into_result()?;

    // abort the sweep on ctrl-c, even while a position write is being retried
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut percent: i32 = 0;
    let mut step: i32 = 1;
    while !cancel.is_cancelled() {
        tokio::time::sleep(Duration::from_millis(1)).await;
        percent += step;
        if percent >= 100 {
            step = -1;
        }
        if percent <= 0 {
            step = 1;
        }

        let outcome = gripper
            .set_position_percent_with_cancel(f64::from(percent), &cancel)
            .await?;
        if !outcome.is_success() {
            println!("{percent:>3}%: not confirmed on {:?}", outcome.failed_sides());
            continue;
        }

        let position = gripper.read_position().await;
        println!(
            "{percent:>3}%: left {:?}, right {:?}",
            position.left.ok(),
            position.right.ok()
        );
    }

    gripper.close().await?;
    Ok(())
}
