//! Enrolled prints and their serialized form
//!
//! A [`Print`] is built once, either by enrollment or by [`Print::deserialize`],
//! and never changes afterwards. Updating a print means building a new one
//! from [`Print::to_builder`].
//!
//! # Serialized layout
//!
//! ```text
//! ┌───────┬─────┬────────┬───────────┬────────┬────────┬──────────┬─────────────┬──────┬─────────┐
//! │ "VFP" │ ver │ driver │ device_id │ stored │ finger │ username │ description │ date │ payload │
//! │  3 B  │ u8  │ u16+N  │   u16+N   │   u8   │   u8   │ u8?u16+N │  u8?u16+N   │u8?i32│  u32+N  │
//! └───────┴─────┴────────┴───────────┴────────┴────────┴──────────┴─────────────┴──────┴─────────┘
//! ```
//!
//! All integers are little-endian. The embedded image is never serialized.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{Datelike, NaiveDate};

use crate::{
    device_info::DeviceInfo,
    error::{Error, Result},
    finger::Finger,
    flags::DeviceFeature,
    image::Image,
};

/// Opaque matching data produced by a match engine
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MatchPayload(Bytes);

impl MatchPayload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for MatchPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchPayload({})", self)
    }
}

impl fmt::Display for MatchPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = &self.0[..self.0.len().min(8)];
        write!(f, "{}", hex::encode(head))?;
        if self.0.len() > head.len() {
            write!(f, "..")?;
        }
        write!(f, " ({} bytes)", self.0.len())
    }
}

/// An enrolled (or captured) fingerprint
#[derive(Clone)]
pub struct Print {
    driver: String,
    device_id: String,
    device_stored: bool,
    finger: Finger,
    username: Option<String>,
    description: Option<String>,
    enroll_date: Option<NaiveDate>,
    image: Option<Image>,
    payload: Option<MatchPayload>,
}

impl Print {
    const MAGIC: [u8; 3] = *b"VFP";
    const VERSION: u8 = 1;

    /// Start a print template for the given device
    pub fn builder(info: &DeviceInfo) -> PrintBuilder {
        PrintBuilder {
            print: Print {
                driver: info.driver.clone(),
                device_id: info.device_id.clone(),
                device_stored: info.has_feature(DeviceFeature::STORAGE),
                finger: Finger::Unknown,
                username: None,
                description: None,
                enroll_date: None,
                image: None,
                payload: None,
            },
        }
    }

    /// Start a new print carrying this print's metadata and payload
    pub fn to_builder(&self) -> PrintBuilder {
        PrintBuilder { print: self.clone() }
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_stored(&self) -> bool {
        self.device_stored
    }

    pub fn finger(&self) -> Finger {
        self.finger
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn enroll_date(&self) -> Option<NaiveDate> {
        self.enroll_date
    }

    /// Captured bitmap, only present on freshly captured prints
    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    pub fn payload(&self) -> Option<&MatchPayload> {
        self.payload.as_ref()
    }

    /// Whether the print holds matching data (as opposed to a bare template)
    pub fn is_enrolled(&self) -> bool {
        self.payload.is_some()
    }

    /// Whether this print was produced by the given device
    pub fn compatible(&self, info: &DeviceInfo) -> bool {
        self.driver == info.driver && self.device_id == info.device_id
    }

    /// Encode the print, dropping any embedded image
    pub fn serialize(&self) -> Result<Bytes> {
        let payload = self.payload.as_ref().ok_or(Error::MissingPayload)?;

        let mut buf = BytesMut::with_capacity(64 + payload.len());
        buf.put_slice(&Self::MAGIC);
        buf.put_u8(Self::VERSION);
        put_str(&mut buf, "driver", &self.driver)?;
        put_str(&mut buf, "device_id", &self.device_id)?;
        buf.put_u8(self.device_stored as u8);
        buf.put_u8(self.finger.into());
        put_opt_str(&mut buf, "username", self.username.as_deref())?;
        put_opt_str(&mut buf, "description", self.description.as_deref())?;
        match self.enroll_date {
            Some(date) => {
                buf.put_u8(1);
                buf.put_i32_le(date.num_days_from_ce());
            }
            None => buf.put_u8(0),
        }
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| Error::Validation("payload larger than 4 GiB".into()))?;
        buf.put_u32_le(payload_len);
        buf.put_slice(payload.as_bytes());

        Ok(buf.freeze())
    }

    /// Decode a print produced by [`Print::serialize`]
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut reader = Reader { data, offset: 0 };

        let magic = reader.take(3)?;
        if magic != Self::MAGIC {
            return Err(Error::BadMagic([magic[0], magic[1], magic[2]]));
        }
        let version = reader.u8()?;
        if version != Self::VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let driver = reader.string("driver")?;
        let device_id = reader.string("device_id")?;
        let device_stored = reader.u8()? != 0;
        let finger = Finger::try_from(reader.u8()?)?;
        let username = reader.opt_string("username")?;
        let description = reader.opt_string("description")?;
        let enroll_date = match reader.u8()? {
            0 => None,
            _ => {
                let days = reader.i32()?;
                Some(NaiveDate::from_num_days_from_ce_opt(days).ok_or(Error::InvalidDate(days))?)
            }
        };
        let payload_len = reader.u32()? as usize;
        let payload = MatchPayload::new(Bytes::copy_from_slice(reader.take(payload_len)?));

        if reader.remaining() != 0 {
            return Err(Error::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            driver,
            device_id,
            device_stored,
            finger,
            username,
            description,
            enroll_date,
            image: None,
            payload: Some(payload),
        })
    }
}

// The embedded image is diagnostic only and takes no part in equality.
impl PartialEq for Print {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
            && self.driver == other.driver
            && self.device_id == other.device_id
            && self.device_stored == other.device_stored
            && self.finger == other.finger
            && self.username == other.username
            && self.description == other.description
            && self.enroll_date == other.enroll_date
    }
}

impl Eq for Print {}

impl fmt::Debug for Print {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Print")
            .field("driver", &self.driver)
            .field("device_id", &self.device_id)
            .field("device_stored", &self.device_stored)
            .field("finger", &self.finger)
            .field("username", &self.username)
            .field("description", &self.description)
            .field("enroll_date", &self.enroll_date)
            .field("image", &self.image)
            .field("payload", &self.payload)
            .finish()
    }
}

impl fmt::Display for Print {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Print[{}/{}](finger={}, user={}",
            self.driver,
            self.device_id,
            self.finger,
            self.username.as_deref().unwrap_or("-")
        )?;
        if let Some(payload) = &self.payload {
            write!(f, ", payload={}", payload)?;
        }
        write!(f, ")")
    }
}

/// Builder for [`Print`]
#[derive(Debug, Clone)]
pub struct PrintBuilder {
    print: Print,
}

impl PrintBuilder {
    pub fn finger(mut self, finger: Finger) -> Self {
        self.print.finger = finger;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.print.username = Some(username.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.print.description = Some(description.into());
        self
    }

    pub fn enroll_date(mut self, date: NaiveDate) -> Self {
        self.print.enroll_date = Some(date);
        self
    }

    /// Re-home the print on a device, refreshing driver, device id and storage flag
    pub fn device(mut self, info: &DeviceInfo) -> Self {
        self.print.driver = info.driver.clone();
        self.print.device_id = info.device_id.clone();
        self.print.device_stored = info.has_feature(DeviceFeature::STORAGE);
        self
    }

    pub fn image(mut self, image: Option<Image>) -> Self {
        self.print.image = image;
        self
    }

    pub fn payload(mut self, payload: Option<MatchPayload>) -> Self {
        self.print.payload = payload;
        self
    }

    pub fn build(self) -> Print {
        self.print
    }
}

fn put_str(buf: &mut BytesMut, field: &'static str, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| Error::Validation(format!("field `{}` longer than 65535 bytes", field)))?;
    buf.put_u16_le(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn put_opt_str(buf: &mut BytesMut, field: &'static str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => {
            buf.put_u8(1);
            put_str(buf, field, value)
        }
        None => {
            buf.put_u8(0);
            Ok(())
        }
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Truncated {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16_le())
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32_le())
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(self.take(4)?.get_i32_le())
    }

    fn string(&mut self, field: &'static str) -> Result<String> {
        let len = self.u16()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| Error::InvalidUtf8 { field })
    }

    fn opt_string(&mut self, field: &'static str) -> Result<Option<String>> {
        match self.u8()? {
            0 => Ok(None),
            _ => self.string(field).map(Some),
        }
    }
}
