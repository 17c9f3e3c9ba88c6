use nsfium_filter::FilterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Images are mapped into the program ROM window.
    #[error("load address {0:#06x} lies below $8000")]
    InvalidLoadAddress(u16),
    /// Neither plain nor banked data was supplied.
    #[error("music image carries no program data")]
    EmptyImage,
    #[error("song {song} out of range (image has {count})")]
    SongOutOfRange { song: u8, count: u8 },
    #[error("invalid output sample rate {0} Hz")]
    InvalidSampleRate(u32),
    /// The decimator could not be built for the requested rates.
    #[error("resampler setup failed: {0}")]
    Resampler(#[from] FilterError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
