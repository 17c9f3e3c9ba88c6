use crate::{audio::ChannelMask, config::Region};

/// Host-facing settings for a [`Player`](crate::player::Player) session.
///
/// - `sample_rate` is the PCM rate handed back by `render_frame`, in Hz.
/// - `lowpass` is an optional filter spec such as `"LpBu2/12000"`, applied
///   after decimation. A spec that fails to design is logged and skipped.
/// - `volume` scales the final output (1.0 = unity).
/// - `channel_mask` mutes native and expansion voices.
/// - `region` overrides the timing region requested by the image.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub sample_rate: u32,
    pub lowpass: Option<String>,
    pub volume: f32,
    pub channel_mask: ChannelMask,
    pub region: Option<Region>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            lowpass: None,
            volume: 1.0,
            channel_mask: ChannelMask::all(),
            region: None,
        }
    }
}
