//! Frame sequencer responsible for clocking envelopes, length counters, and
//! sweep units at quarter- and half-frame intervals.
//!
//! The sequencer is a fixed-point countdown in CPU half-cycles: every step
//! adds one increment (7457.5 CPU cycles on NTSC), which keeps the documented
//! half-cycle alignment without a per-step table.

/// Frame sequencer timing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameCounterMode {
    #[default]
    FourStep,
    FiveStep,
}

/// Which frame units a sequencer step clocks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct FrameTick {
    pub(super) quarter: bool,
    pub(super) half: bool,
    pub(super) irq: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct FrameCounter {
    mode: FrameCounterMode,
    irq_inhibit: bool,
    irq_pending: bool,
    step: u8,
    /// Half-cycles until the next step.
    counter: i32,
    increment: i32,
}

impl FrameCounter {
    pub(super) fn new(increment: i32) -> Self {
        Self {
            mode: FrameCounterMode::FourStep,
            irq_inhibit: false,
            irq_pending: false,
            step: 0,
            counter: increment,
            increment,
        }
    }

    pub(super) fn mode(&self) -> FrameCounterMode {
        self.mode
    }

    pub(super) fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    pub(super) fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    /// `$4017` write. Restarts the sequence; returns true when bit 7 asks for
    /// an immediate quarter + half clock.
    pub(super) fn configure(&mut self, value: u8) -> bool {
        self.mode = if value & 0b1000_0000 == 0 {
            FrameCounterMode::FourStep
        } else {
            FrameCounterMode::FiveStep
        };
        self.irq_inhibit = value & 0b0100_0000 != 0;
        if self.irq_inhibit {
            self.irq_pending = false;
        }
        self.step = 0;
        self.counter = self.increment;
        self.mode == FrameCounterMode::FiveStep
    }

    /// Whole CPU cycles until the next step fires.
    pub(super) fn cycles_until_step(&self) -> u32 {
        ((self.counter + 1) / 2).max(1) as u32
    }

    /// Advances by `cycles`; returns the step that fires at the end of the
    /// span, if any. `cycles` never exceeds [`Self::cycles_until_step`].
    pub(super) fn advance(&mut self, cycles: u32) -> Option<FrameTick> {
        self.counter -= 2 * cycles as i32;
        if self.counter > 0 {
            return None;
        }

        let tick = match self.step {
            0 | 2 => FrameTick {
                quarter: true,
                ..FrameTick::default()
            },
            1 => FrameTick {
                quarter: true,
                half: true,
                irq: false,
            },
            _ => FrameTick {
                quarter: true,
                half: true,
                irq: self.mode == FrameCounterMode::FourStep && !self.irq_inhibit,
            },
        };
        if tick.irq {
            self.irq_pending = true;
        }

        self.step = (self.step + 1) & 0b11;
        self.counter += self.increment;
        // 5-step mode spends one silent step before the last clock.
        if self.step == 3 && self.mode == FrameCounterMode::FiveStep {
            self.counter += self.increment;
        }
        Some(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fc: &mut FrameCounter, cycles: u32) -> Vec<(u32, FrameTick)> {
        let mut out = Vec::new();
        let mut t = 0;
        while t < cycles {
            let step = fc.cycles_until_step().min(cycles - t);
            t += step;
            if let Some(tick) = fc.advance(step) {
                out.push((t, tick));
            }
        }
        out
    }

    #[test]
    fn four_step_timeline() {
        let mut fc = FrameCounter::new(14915);
        let ticks = run(&mut fc, 29_831);
        let times: Vec<u32> = ticks.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![7_458, 14_915, 22_373, 29_830]);
        let halves: Vec<bool> = ticks.iter().map(|(_, k)| k.half).collect();
        assert_eq!(halves, vec![false, true, false, true]);
        assert!(ticks[3].1.irq);
        assert!(fc.irq_pending());
    }

    #[test]
    fn five_step_has_no_irq_and_longer_period() {
        let mut fc = FrameCounter::new(14915);
        assert!(fc.configure(0b1000_0000));
        let ticks = run(&mut fc, 37_290);
        assert_eq!(ticks.len(), 4);
        assert_eq!(ticks[3].0, 37_288);
        assert!(ticks.iter().all(|(_, k)| !k.irq));
        assert!(!fc.irq_pending());
    }

    #[test]
    fn inhibit_clears_and_blocks_irq() {
        let mut fc = FrameCounter::new(14915);
        run(&mut fc, 30_000);
        assert!(fc.irq_pending());
        assert!(!fc.configure(0b0100_0000));
        assert!(!fc.irq_pending());
        run(&mut fc, 30_000);
        assert!(!fc.irq_pending());
    }
}
