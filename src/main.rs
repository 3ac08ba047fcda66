use sbd_modem::Driver;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let driver = Driver::builder()
        .port("/dev/ttyUSB0")
        .baudrate(19200)
        .open()
        .await?;

    driver
        .on_event(|event| println!("event: {event:?}"))
        .await?;

    println!("signal quality: {}", driver.signal_quality().await?);
    println!("modem clock: {}", driver.system_time().await?);

    let momsn = driver.send_message("hello from the field").await?;
    println!("sent as MOMSN {momsn}");

    let outcome = driver.mailbox_check().await?;
    println!("mailbox check: {outcome:?}");

    driver.close().await;
    Ok(())
}
