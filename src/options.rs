use crate::error::{Result, WkError};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Hook polled by producers to learn whether the caller wants to stop.
pub trait Interrupt {
    fn is_interrupted(&self) -> bool;
}

impl Interrupt for AtomicBool {
    fn is_interrupted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F> Interrupt for F
where
    F: Fn() -> bool,
{
    fn is_interrupted(&self) -> bool {
        self()
    }
}

const DEFAULT_MAX_DEPTH: usize = 128;

/// Options shared by every producer.
#[derive(Clone)]
pub struct ReadOptions {
    /// Poll the interrupt hook once every this many features.
    pub interrupt_interval: usize,
    pub interrupt: Option<Arc<dyn Interrupt + Send + Sync>>,
    /// Deepest geometry nesting a decoder accepts. A top-level geometry is
    /// at depth 1; each collection level adds one.
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            interrupt_interval: 1000,
            interrupt: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("interrupt_interval", &self.interrupt_interval)
            .field("interrupt", &self.interrupt.is_some())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl ReadOptions {
    pub fn with_interrupt<I>(mut self, interrupt: I) -> Self
    where
        I: Interrupt + Send + Sync + 'static,
    {
        self.interrupt = Some(Arc::new(interrupt));
        self
    }

    pub(crate) fn check_interrupt(&self, feature_id: usize) -> Result<()> {
        let interval = self.interrupt_interval.max(1);
        if (feature_id + 1) % interval != 0 {
            return Ok(());
        }
        match &self.interrupt {
            Some(interrupt) if interrupt.is_interrupted() => {
                Err(WkError::Cancelled { feature_id })
            }
            _ => Ok(()),
        }
    }
}

/// WKT output formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WktWriteOptions {
    /// Digits after the decimal point. `None` writes the shortest text that
    /// parses back to the same `f64`.
    pub precision: Option<usize>,
    /// Strip trailing zeros left by `precision`.
    pub trim: bool,
}

impl Default for WktWriteOptions {
    fn default() -> Self {
        Self {
            precision: None,
            trim: true,
        }
    }
}

/// Byte order marker of a WKB geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endianness {
    Big,
    #[default]
    Little,
}

impl Endianness {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Big),
            1 => Some(Self::Little),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Big => 0,
            Self::Little => 1,
        }
    }
}

/// How dimensions and SRID are folded into the WKB type code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WkbConvention {
    /// High bits: 0x80000000 for Z, 0x40000000 for M, 0x20000000 for SRID.
    #[default]
    Extended,
    /// ISO 13249 offsets: +1000 for Z, +2000 for M, +3000 for ZM. Cannot carry an SRID.
    Iso,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WkbWriteOptions {
    pub endianness: Endianness,
    pub convention: WkbConvention,
}

#[cfg(test)]
mod tests {
    use super::ReadOptions;
    use crate::error::WkError;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn interrupt_is_polled_on_interval() {
        let options = ReadOptions {
            interrupt_interval: 3,
            ..Default::default()
        }
        .with_interrupt(AtomicBool::new(true));

        assert!(options.check_interrupt(0).is_ok());
        assert!(options.check_interrupt(1).is_ok());
        assert!(matches!(
            options.check_interrupt(2),
            Err(WkError::Cancelled { feature_id: 2 })
        ));
    }

    #[test]
    fn no_interrupt_never_cancels() {
        let options = ReadOptions::default();
        assert!(options.check_interrupt(999).is_ok());

        let options = ReadOptions::default().with_interrupt(|| false);
        assert!(options.check_interrupt(999).is_ok());
    }
}
