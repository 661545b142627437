use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

/// Stage of the outer runner lifecycle a thread is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeSuite,
    BeforeClass,
    BeforeMethod,
    Method,
    AfterMethod,
    AfterClass,
    AfterSuite,
}

thread_local! {
    static ACTIVE_PHASE: Cell<Option<Phase>> = Cell::new(None);
}

/// Records the phase for the calling thread only.
pub fn set_active_phase(phase: Phase) {
    ACTIVE_PHASE.with(|active| active.set(Some(phase)));
}

/// Last phase set on the calling thread, `None` before any lifecycle callback.
pub fn active_phase() -> Option<Phase> {
    ACTIVE_PHASE.with(Cell::get)
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeSuite => "BEFORE_SUITE",
            Phase::BeforeClass => "BEFORE_CLASS",
            Phase::BeforeMethod => "BEFORE_METHOD",
            Phase::Method => "METHOD",
            Phase::AfterMethod => "AFTER_METHOD",
            Phase::AfterClass => "AFTER_CLASS",
            Phase::AfterSuite => "AFTER_SUITE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BEFORE_SUITE" => Ok(Phase::BeforeSuite),
            "BEFORE_CLASS" => Ok(Phase::BeforeClass),
            "BEFORE_METHOD" => Ok(Phase::BeforeMethod),
            "METHOD" => Ok(Phase::Method),
            "AFTER_METHOD" => Ok(Phase::AfterMethod),
            "AFTER_CLASS" => Ok(Phase::AfterClass),
            "AFTER_SUITE" => Ok(Phase::AfterSuite),
            _ => Err(format!("Phase '{}' not supported", s)),
        }
    }
}
