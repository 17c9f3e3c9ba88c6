pub mod accumulator;
pub mod channel;
pub mod mixer;
pub mod pipeline;

pub use accumulator::Accumulator;
pub use channel::ChannelMask;
pub use pipeline::AudioPipeline;
