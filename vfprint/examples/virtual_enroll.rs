//! Enroll and verify against the virtual image device
//!
//! Set `FP_VIRTUAL_IMAGE` to choose the socket path.

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use vfprint::{
    CancellationToken, Device, DeviceConfig, Finger, FingerStatusFlags, Image, Print,
    VirtualHardware,
};

const SIZE: u32 = 64;

fn whorl() -> anyhow::Result<Image> {
    let c = SIZE as i64 / 2;
    let data: Vec<u8> = (0..SIZE as i64 * SIZE as i64)
        .map(|i| {
            let (x, y) = (i % SIZE as i64 - c, i / SIZE as i64 - c);
            let r = ((x * x + y * y) as f64).sqrt() as i64;
            if (r / 8) % 2 == 0 { 220 } else { 40 }
        })
        .collect();
    Ok(Image::new(SIZE, SIZE, data)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::var("FP_VIRTUAL_IMAGE")
        .unwrap_or_else(|_| std::env::temp_dir().join("vfprint-demo.sock").display().to_string());

    let hardware = VirtualHardware::bind(&path)?;
    let device = Device::new(DeviceConfig::new(&path));

    device.open().await?;
    let mut link = hardware.accept().await?;
    println!("Opened {}", device.info());

    let scan = whorl()?;
    let template = Print::builder(device.info())
        .finger(Finger::RightIndex)
        .username("demo")
        .enroll_date(chrono::Local::now().date_naive())
        .build();

    let cancel = CancellationToken::new();
    let enroll = device.enroll(template, &cancel, |progress| {
        println!("Enroll stage {}/{}", progress.stage, progress.nr_stages);
    });
    let feed = async {
        for _ in 0..device.nr_enroll_stages() {
            device
                .wait_for_finger_status(FingerStatusFlags::NEEDED, Duration::from_secs(5))
                .await?;
            link.send_image(scan.clone()).await?;
        }
        Ok::<_, anyhow::Error>(())
    };
    let (print, fed) = tokio::join!(enroll, feed);
    fed?;
    let print = print?;
    println!("Enrolled {}", print);

    let verify = device.verify(&print, &cancel);
    let (outcome, sent) = tokio::join!(verify, link.send_image(scan));
    sent?;
    println!("Verify matched: {}", outcome?.matched);

    device.close().await?;
    Ok(())
}
