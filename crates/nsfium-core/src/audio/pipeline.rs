//! Flush-time path from the accumulator to host PCM.
//!
//! Mixed cycles are appended to a pending buffer, the decimator consumes
//! what a full window allows, and the unconsumed tail stays at the front of
//! the buffer for the next frame. The optional lowpass and the output volume
//! are applied per output sample.

use nsfium_filter::{Decimator, FilterHandle, design_filter};
use tracing::{debug, warn};

use crate::{audio::Accumulator, error::Result};

#[derive(Debug, Clone)]
pub struct AudioPipeline {
    decimator: Decimator,
    /// Mixed samples at the CPU rate not yet consumed by the decimator.
    pending: Vec<f32>,
    lowpass: Option<FilterHandle>,
    volume: f32,
}

impl AudioPipeline {
    /// Builds the pipeline. A lowpass spec that fails to design is logged and
    /// left out.
    pub fn new(
        cpu_clock: f64,
        sample_rate: u32,
        lowpass: Option<&str>,
        volume: f32,
    ) -> Result<Self> {
        let decimator = Decimator::new(cpu_clock, sample_rate as f64)?;
        let lowpass = lowpass.and_then(|spec| match design_filter(spec, sample_rate as f64) {
            Ok(handle) => {
                debug!("lowpass {} enabled", spec);
                Some(handle)
            }
            Err(err) => {
                warn!("lowpass {:?} disabled: {}", spec, err);
                None
            }
        });
        Ok(Self {
            decimator,
            pending: Vec::new(),
            lowpass,
            volume,
        })
    }

    pub fn has_lowpass(&self) -> bool {
        self.lowpass.is_some()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Mixed samples carried over to the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Input samples the carried tail may need on top of one frame.
    pub fn history(&self) -> usize {
        self.decimator.taps() + self.decimator.ratio().ceil() as usize
    }

    /// Mixes `len` accumulator slots, decimates, and appends the resulting
    /// PCM to `out`. Returns the number of samples produced.
    pub fn flush(&mut self, acc: &mut Accumulator, len: u32, out: &mut Vec<f32>) -> usize {
        acc.mix_into(len, &mut self.pending);

        let start = out.len();
        let consumed = self.decimator.process(&self.pending, out);
        self.pending.drain(..consumed);

        for sample in &mut out[start..] {
            let filtered = match &mut self.lowpass {
                Some(filter) => filter.step(*sample),
                None => *sample,
            };
            *sample = filtered * self.volume;
        }
        out.len() - start
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.decimator.reset();
        if let Some(filter) = &mut self.lowpass {
            filter.reset();
        }
    }
}
