//! Band classifier and channel output.
//!
//! `smoothed >= 2` is Bullish, `smoothed <= -2` is Bearish, anything in the
//! open interval `(-2, 2)` is Neutral. NaN lands in Neutral so it stays visible.

use serde::{Deserialize, Serialize};

pub const BULLISH_LEVEL: f64 = 2.0;
pub const BEARISH_LEVEL: f64 = -2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Bullish,
    Bearish,
    Neutral,
}

impl Band {
    pub fn classify(smoothed: f64) -> Self {
        if smoothed >= BULLISH_LEVEL {
            Band::Bullish
        } else if smoothed <= BEARISH_LEVEL {
            Band::Bearish
        } else {
            Band::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Bullish => "bullish",
            Band::Bearish => "bearish",
            Band::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three mutually exclusive plot channels; `None` is the "no value" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BandValues {
    pub bullish: Option<f64>,
    pub bearish: Option<f64>,
    pub neutral: Option<f64>,
}

impl BandValues {
    /// Route `smoothed` into the channel of its band.
    pub fn from_smoothed(smoothed: f64) -> Self {
        let mut values = Self::default();
        match Band::classify(smoothed) {
            Band::Bullish => values.bullish = Some(smoothed),
            Band::Bearish => values.bearish = Some(smoothed),
            Band::Neutral => values.neutral = Some(smoothed),
        }
        values
    }

    pub fn populated_count(&self) -> usize {
        [self.bullish, self.bearish, self.neutral]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }

    pub fn get(&self, band: Band) -> Option<f64> {
        match band {
            Band::Bullish => self.bullish,
            Band::Bearish => self.bearish,
            Band::Neutral => self.neutral,
        }
    }
}

/// How an update is presented to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    ThreeChannel,
    SingleChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChannelOutput {
    ThreeChannel(BandValues),
    SingleChannel { value: f64 },
}

impl ChannelOutput {
    pub fn new(mode: OutputMode, smoothed: f64) -> Self {
        match mode {
            OutputMode::ThreeChannel => ChannelOutput::ThreeChannel(BandValues::from_smoothed(smoothed)),
            OutputMode::SingleChannel => ChannelOutput::SingleChannel { value: smoothed },
        }
    }

    pub fn band_values(&self) -> Option<&BandValues> {
        match self {
            ChannelOutput::ThreeChannel(values) => Some(values),
            ChannelOutput::SingleChannel { .. } => None,
        }
    }
}
