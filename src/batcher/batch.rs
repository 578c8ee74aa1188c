use crate::batcher::delays::Delays;
use crate::batcher::threads::Threads;
use std::fmt;

/// The three worker scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Hack,
    Grow,
    Weaken,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::Hack => "hack",
            Operation::Grow => "grow",
            Operation::Weaken => "weaken",
        };
        f.write_str(label)
    }
}

/// One of the four positions inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Hack,
    WeakenForHack,
    Grow,
    WeakenForGrow,
}

impl Slot {
    /// Landing order.
    pub const ALL: [Slot; 4] = [Slot::Hack, Slot::WeakenForHack, Slot::Grow, Slot::WeakenForGrow];

    pub fn operation(self) -> Operation {
        match self {
            Slot::Hack => Operation::Hack,
            Slot::Grow => Operation::Grow,
            Slot::WeakenForHack | Slot::WeakenForGrow => Operation::Weaken,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Slot::Hack => "H",
            Slot::WeakenForHack => "W1",
            Slot::Grow => "G",
            Slot::WeakenForGrow => "W2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: u64,
    pub target: String,
    pub threads: Threads,
    pub delays: Delays,
}

/// A share of one slot's threads pinned to a host.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub slot: Slot,
    pub host: String,
    pub threads: u64,
}
