//! Input and output boundaries of the codecs.
//!
//! A [`Provider`] hands the decoders one feature at a time; an [`Exporter`]
//! receives what the writers produce, one feature at a time.

use crate::error::{Result, WkError};

/// A cursor over the raw features of some source.
pub trait Provider {
    /// Advance to the next feature. Returns `false` when no features remain.
    fn seek_next_feature(&mut self) -> Result<bool>;

    /// Whether the current feature is absent, as opposed to an empty geometry.
    fn feature_is_null(&self) -> bool;

    fn n_features(&self) -> usize;
}

/// A provider whose features are WKB bytes.
pub trait BinaryProvider: Provider {
    /// Bytes of the current feature. Empty for a null feature.
    fn feature_bytes(&self) -> Result<&[u8]>;
}

/// A provider whose features are WKT strings.
pub trait TextProvider: Provider {
    /// Text of the current feature. Empty for a null feature.
    fn feature_text(&self) -> Result<&str>;
}

/// A sink receiving one encoded value per feature.
pub trait Exporter {
    type Item;
    type Output;

    /// Number of features the exporter was built to hold.
    fn n_features(&self) -> usize;

    /// Move to the next output slot. Returns `false` when the exporter is full.
    fn seek_next_feature(&mut self) -> Result<bool>;

    fn write_null(&mut self) -> Result<()>;

    fn write_feature(&mut self, item: Self::Item) -> Result<()>;

    /// Hand over everything written so far.
    fn finish(&mut self) -> Self::Output;
}

/// In-memory provider over a vector of optional values.
///
/// `None` items are null features.
#[derive(Debug, Clone)]
pub struct VecProvider<T> {
    values: Vec<Option<T>>,
    index: Option<usize>,
}

impl<T> VecProvider<T> {
    pub fn new(values: Vec<Option<T>>) -> Self {
        Self {
            values,
            index: None,
        }
    }

    /// Rewind so that the next `seek_next_feature` returns the first feature.
    pub fn reset(&mut self) {
        self.index = None;
    }

    fn current(&self) -> Option<&T> {
        self.index
            .and_then(|i| self.values.get(i))
            .and_then(Option::as_ref)
    }
}

impl<T> FromIterator<Option<T>> for VecProvider<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> Provider for VecProvider<T> {
    fn seek_next_feature(&mut self) -> Result<bool> {
        let next = self.index.map_or(0, |i| i + 1);
        if next >= self.values.len() {
            self.index = Some(self.values.len());
            return Ok(false);
        }
        self.index = Some(next);
        Ok(true)
    }

    fn feature_is_null(&self) -> bool {
        self.current().is_none()
    }

    fn n_features(&self) -> usize {
        self.values.len()
    }
}

impl<T: AsRef<[u8]>> BinaryProvider for VecProvider<T> {
    fn feature_bytes(&self) -> Result<&[u8]> {
        Ok(self.current().map_or(&[][..], |v| v.as_ref()))
    }
}

impl<T: AsRef<str>> TextProvider for VecProvider<T> {
    fn feature_text(&self) -> Result<&str> {
        Ok(self.current().map_or("", |v| v.as_ref()))
    }
}

/// In-memory exporter with a fixed number of slots.
#[derive(Debug, Clone)]
pub struct VecExporter<T> {
    size: usize,
    values: Vec<Option<T>>,
}

impl<T> VecExporter<T> {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: Vec::with_capacity(size),
        }
    }

    fn current_mut(&mut self) -> Result<&mut Option<T>> {
        let n_features = self.size;
        self.values
            .last_mut()
            .ok_or(WkError::ExporterExhausted { n_features })
    }
}

impl<T> Exporter for VecExporter<T> {
    type Item = T;
    type Output = Vec<Option<T>>;

    fn n_features(&self) -> usize {
        self.size
    }

    fn seek_next_feature(&mut self) -> Result<bool> {
        if self.values.len() >= self.size {
            return Ok(false);
        }
        self.values.push(None);
        Ok(true)
    }

    fn write_null(&mut self) -> Result<()> {
        *self.current_mut()? = None;
        Ok(())
    }

    fn write_feature(&mut self, item: T) -> Result<()> {
        *self.current_mut()? = Some(item);
        Ok(())
    }

    fn finish(&mut self) -> Vec<Option<T>> {
        std::mem::take(&mut self.values)
    }
}
