//! Enroll a finger at the next free index
//!
//! Expects the module behind a TCP-to-serial bridge:
//! `DEVICE_ADDR=192.168.1.50:8899 cargo run --example enroll`

use as608::{Device, EnrollOptions};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::var("DEVICE_ADDR").unwrap_or_else(|_| "192.168.1.50:8899".to_string());

    let device = Device::open(TcpStream::connect(&addr).await?);

    let table = device.read_index_table().await?;
    println!("{} templates stored: {:?}", table.len(), table.occupied());

    let index = device
        .enroll_with(EnrollOptions::default(), |event| println!("{}", event))
        .await?;
    println!("Stored at index {}", index);

    device.close().await?;
    Ok(())
}
