/// Cycle cost class of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Cycle {
    /// Fixed cost.
    Normal(u8),
    /// Indexed read: one more cycle when the index crosses a page.
    Cross(u8),
    /// Branch: one more when taken, another when the target is on a new page.
    Branch(u8),
}

const fn n(cycle: u8) -> Cycle {
    Cycle::Normal(cycle)
}

const fn c(cycle: u8) -> Cycle {
    Cycle::Cross(cycle)
}

const fn b(cycle: u8) -> Cycle {
    Cycle::Branch(cycle)
}

impl Cycle {
    pub(crate) const fn base(&self) -> u32 {
        match self {
            Cycle::Normal(cycle) | Cycle::Cross(cycle) | Cycle::Branch(cycle) => *cycle as u32,
        }
    }

    /// Total cost given whether the effective address crossed a page and, for
    /// branches, whether the branch was taken.
    pub(crate) const fn total(&self, page_crossed: bool, branch_taken: bool) -> u32 {
        let mut total = self.base();
        match self {
            Cycle::Normal(_) => {}
            Cycle::Cross(_) => {
                if page_crossed {
                    total += 1;
                }
            }
            Cycle::Branch(_) => {
                if branch_taken {
                    total += 1;
                    if page_crossed {
                        total += 1;
                    }
                }
            }
        }
        total
    }
}

/// Base cost per opcode. JAM slots carry the two cycles of the fetch that
/// locks the CPU up.
#[rustfmt::skip]
pub(crate) static CYCLE_TABLE: [Cycle; 256] = [
    n(7), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(3), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(4), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(3), n(2), n(2), n(2), n(3), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(4), n(2), n(2), n(2), n(5), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(2), n(6), n(2), n(6), n(3), n(3), n(3), n(3), n(2), n(2), n(2), n(2), n(4), n(4), n(4), n(4),
    b(2), n(6), n(2), n(6), n(4), n(4), n(4), n(4), n(2), n(5), n(2), n(5), n(5), n(5), n(5), n(5),
    n(2), n(6), n(2), n(6), n(3), n(3), n(3), n(3), n(2), n(2), n(2), n(2), n(4), n(4), n(4), n(4),
    b(2), c(5), n(2), c(5), n(4), n(4), n(4), n(4), n(2), c(4), n(2), c(4), c(4), c(4), c(4), c(4),
    n(2), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(2), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(2), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(2), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
];
