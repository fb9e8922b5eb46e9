use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const QUALITY_GOOD: i32 = 192;
pub const QUALITY_BAD: i32 = 0;

/// Static descriptor of a historian tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTag {
    pub id: String,
    pub description: String,
    pub units: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quality {
    Good,
    Bad,
    Unknown,
}

impl Quality {
    pub fn from_code(code: i32) -> Self {
        match code {
            QUALITY_GOOD => Quality::Good,
            QUALITY_BAD => Quality::Bad,
            _ => Quality::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Good => "Good",
            Quality::Bad => "Bad",
            Quality::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of one tag, stamped in the site timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct TagMeasurement {
    value: f64,
    timestamp: DateTime<Tz>,
    quality: i32,
}

impl TagMeasurement {
    pub fn new(value: f64, timestamp: DateTime<Tz>, quality: i32) -> Self {
        Self {
            value,
            timestamp,
            quality,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp(&self) -> &DateTime<Tz> {
        &self.timestamp
    }

    pub fn quality(&self) -> i32 {
        self.quality
    }

    pub fn quality_label(&self) -> Quality {
        Quality::from_code(self.quality)
    }

    pub fn quality_str(&self) -> &'static str {
        self.quality_label().as_str()
    }
}

impl fmt::Display for TagMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} at {} (S:{})",
            self.value,
            self.timestamp.format("%m/%d/%y %H:%M:%S %z"),
            self.quality_str()
        )
    }
}

impl Serialize for TagMeasurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            value: f64,
            timestamp: String,
            quality: i32,
            quality_label: &'a str,
        }

        Wire {
            value: self.value,
            timestamp: self.timestamp.to_rfc3339(),
            quality: self.quality,
            quality_label: self.quality_str(),
        }
        .serialize(serializer)
    }
}
