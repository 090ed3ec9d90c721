//! Shared harness for the virtual image device tests

#![allow(dead_code)]

use std::time::Duration;

use chrono::NaiveDate;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vfprint::{
    BitmapSource, CancellationToken, Device, DeviceConfig, EnrollProgress, Finger,
    FingerStatusFlags, HardwareLink, Image, Print, VirtualHardware,
};

pub const WAIT: Duration = Duration::from_secs(5);

const SCAN_SIZE: u32 = 62;

/// Generated stand-ins for the reference print bitmaps
///
/// Dimensions are padded to multiples of four with white pixels, the way
/// scanned bitmaps are prepared for the device.
pub struct SyntheticPrints;

impl SyntheticPrints {
    fn whorl() -> Vec<u8> {
        let c = SCAN_SIZE as i64 / 2;
        (0..SCAN_SIZE as i64 * SCAN_SIZE as i64)
            .map(|i| {
                let (x, y) = (i % SCAN_SIZE as i64 - c, i / SCAN_SIZE as i64 - c);
                let r = ((x * x + y * y) as f64).sqrt() as i64;
                if (r / 8) % 2 == 0 { 220 } else { 40 }
            })
            .collect()
    }

    fn tented_arch() -> Vec<u8> {
        (0..SCAN_SIZE * SCAN_SIZE)
            .map(|i| ((i / SCAN_SIZE) * 4) as u8)
            .collect()
    }
}

impl BitmapSource for SyntheticPrints {
    fn load(&self, name: &str) -> vfprint_types::Result<Image> {
        let data = match name {
            "whorl" => Self::whorl(),
            "tented_arch" => Self::tented_arch(),
            other => {
                return Err(vfprint_types::Error::Validation(format!("no print named {}", other)));
            }
        };
        Image::padded(SCAN_SIZE, SCAN_SIZE, &data, 0xFF)
    }
}

/// An open device connected to its simulated hardware
pub struct Harness {
    pub device: Device,
    pub link: HardwareLink,
    pub hardware: VirtualHardware,
    pub prints: SyntheticPrints,
    _dir: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(|config| config).await
    }

    pub async fn start_with(configure: impl FnOnce(DeviceConfig) -> DeviceConfig) -> Self {
        let dir = tempfile::Builder::new().prefix("vfprint-").tempdir().unwrap();
        let hardware = VirtualHardware::bind(dir.path().join("virtual-image.socket")).unwrap();
        let device = Device::new(configure(DeviceConfig::new(hardware.path())));

        device.open().await.unwrap();
        let link = hardware.accept().await.unwrap();

        Self {
            device,
            link,
            hardware,
            prints: SyntheticPrints,
            _dir: dir,
        }
    }

    pub fn image(&self, name: &str) -> Image {
        self.prints.load(name).unwrap()
    }

    pub async fn send_image(&mut self, name: &str) {
        let image = self.image(name);
        self.link.send_image(image).await.unwrap();
    }

    /// Wait until the device asks for a finger
    pub async fn wait_needed(&self) {
        self.device
            .wait_for_finger_status(FingerStatusFlags::NEEDED, WAIT)
            .await
            .unwrap();
    }

    /// Wait until the finger status is exactly `status`
    pub async fn wait_status(&self, status: FingerStatusFlags) {
        let mut rx = self.device.finger_status_watch();
        tokio::time::timeout(WAIT, rx.wait_for(|current| *current == status))
            .await
            .unwrap_or_else(|_| panic!("finger status never became {}", status))
            .unwrap();
    }

    pub fn template(&self) -> Print {
        Print::builder(self.device.info())
            .finger(Finger::LeftThumb)
            .username("testuser")
            .description("test print")
            .enroll_date(enroll_date())
            .build()
    }

    pub fn spawn_verify(
        &self,
        print: &Print,
    ) -> JoinHandle<vfprint::Result<vfprint::VerifyOutcome>> {
        let device = self.device.clone();
        let print = print.clone();
        tokio::spawn(async move { device.verify(&print, &CancellationToken::new()).await })
    }

    pub fn spawn_identify(
        &self,
        gallery: &[Print],
    ) -> JoinHandle<vfprint::Result<vfprint::IdentifyOutcome>> {
        let device = self.device.clone();
        let gallery = gallery.to_vec();
        tokio::spawn(async move { device.identify(&gallery, &CancellationToken::new()).await })
    }

    /// Enroll `name`, walking the finger through both reporting modes
    ///
    /// Passing a `template` that already holds matching data updates it.
    pub async fn enroll_print(&mut self, name: &str, template: Option<Print>) -> Print {
        let template = template.unwrap_or_else(|| self.template());
        let nr_stages = self.device.nr_enroll_stages();
        assert!(nr_stages >= 3, "the finger walk needs at least three stages");
        assert_eq!(self.device.finger_status(), FingerStatusFlags::NONE);

        let (progress_tx, mut progress) = mpsc::unbounded_channel::<EnrollProgress>();
        let task = tokio::spawn({
            let device = self.device.clone();
            async move {
                device
                    .enroll(template, &CancellationToken::new(), move |p| {
                        let _ = progress_tx.send(p);
                    })
                    .await
            }
        });

        self.wait_needed().await;
        self.send_image(name).await;
        assert_eq!(next_stage(&mut progress).await, 1);

        // Finger removal decoupled from the end of the scan
        self.link.send_finger_automatic(false).await.unwrap();
        self.wait_status(FingerStatusFlags::NEEDED).await;
        self.link.send_finger_report(true).await.unwrap();
        self.wait_status(FingerStatusFlags::NEEDED | FingerStatusFlags::PRESENT).await;
        self.send_image(name).await;
        assert_eq!(next_stage(&mut progress).await, 2);
        self.link.send_finger_report(false).await.unwrap();
        self.wait_status(FingerStatusFlags::NEEDED).await;

        self.link.send_finger_automatic(true).await.unwrap();
        for stage in 3..=nr_stages {
            self.send_image(name).await;
            assert_eq!(next_stage(&mut progress).await, stage);
            if stage < nr_stages {
                assert_eq!(self.device.finger_status(), FingerStatusFlags::NEEDED);
            }
        }

        let print = task.await.unwrap().unwrap();
        assert_eq!(self.device.finger_status(), FingerStatusFlags::NONE);
        assert_eq!(print.driver(), self.device.driver());
        assert_eq!(print.device_id(), self.device.device_id());
        assert_eq!(
            print.device_stored(),
            self.device.has_feature(vfprint::DeviceFeature::STORAGE)
        );
        assert!(print.image().is_none());
        print
    }
}

async fn next_stage(progress: &mut mpsc::UnboundedReceiver<EnrollProgress>) -> u32 {
    tokio::time::timeout(WAIT, progress.recv())
        .await
        .expect("enroll progress")
        .expect("enroll progress channel")
        .stage
}

pub fn enroll_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
}
