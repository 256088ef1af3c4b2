//! Print module information, then identify one finger

use as608::Device;
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::var("DEVICE_ADDR").unwrap_or_else(|_| "192.168.1.50:8899".to_string());

    let device = Device::open(TcpStream::connect(&addr).await?);

    let info = device.device_info().await?;
    println!("{}", info);
    println!("Serial: {}", device.serial_number().await?);
    println!("Templates: {}", device.template_count().await?);

    println!("Place a finger on the sensor...");
    let result = device.search().await?;
    if result.is_found() {
        println!("Matched template #{} (score {})", result.id, result.score);
    } else {
        println!("No match");
    }

    device.close().await?;
    Ok(())
}
