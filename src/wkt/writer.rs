use std::fmt::Write;

use crate::error::{Result, WkError};
use crate::handler::{Handler, HandlerResult};
use crate::io::Exporter;
use crate::options::WktWriteOptions;
use crate::types::{Coord, GeometryMeta, RecursionFrame, SimpleType, VectorMeta};

struct Frame {
    recursion: RecursionFrame,
    // Whether "(" has been written. A frame closed before that is EMPTY.
    opened: bool,
}

/// Handler that renders each feature as WKT.
///
/// The type keyword is written for top-level geometries and for members of
/// a GEOMETRYCOLLECTION, and left out for parts of MULTIPOINT,
/// MULTILINESTRING and MULTIPOLYGON. `SRID=<n>;` is only written at the top
/// level.
pub struct WktWriter<E> {
    exporter: E,
    options: WktWriteOptions,
    buf: String,
    stack: Vec<Frame>,
    // Some(opened) while a ring is open.
    ring: Option<bool>,
    has_geometry: bool,
}

impl<E: Exporter<Item = String>> WktWriter<E> {
    pub fn new(exporter: E, options: WktWriteOptions) -> Self {
        Self {
            exporter,
            options,
            buf: String::new(),
            stack: Vec::new(),
            ring: None,
            has_geometry: false,
        }
    }

    fn write_number(&mut self, value: f64) -> Result<()> {
        match self.options.precision {
            None => write!(self.buf, "{value}")?,
            Some(precision) => {
                let text = format!("{value:.precision$}");
                let text = if self.options.trim && text.contains('.') {
                    text.trim_end_matches('0').trim_end_matches('.')
                } else {
                    text.as_str()
                };
                // Rounding can leave "-0"; write it as "0".
                self.buf.push_str(if text == "-0" { "0" } else { text });
            }
        }
        Ok(())
    }

    fn write_coord(&mut self, coord: &Coord) -> Result<()> {
        for (i, value) in coord.ordinates().enumerate() {
            if i > 0 {
                self.buf.push(' ');
            }
            self.write_number(value)?;
        }
        Ok(())
    }

    /// Open the enclosing list on its first item, or separate from the previous one.
    fn begin_item(buf: &mut String, opened: &mut bool) {
        if *opened {
            buf.push_str(", ");
        } else {
            buf.push('(');
            *opened = true;
        }
    }

    fn end_list(buf: &mut String, opened: bool) {
        if opened {
            buf.push(')');
        } else {
            buf.push_str("EMPTY");
        }
    }
}

impl<E: Exporter<Item = String>> Handler for WktWriter<E> {
    type Output = E::Output;

    fn feature_start(&mut self, _meta: &VectorMeta, _feature_id: usize) -> Result<HandlerResult> {
        if !self.exporter.seek_next_feature()? {
            return Err(WkError::ExporterExhausted {
                n_features: self.exporter.n_features(),
            });
        }
        self.buf.clear();
        self.stack.clear();
        self.ring = None;
        self.has_geometry = false;
        Ok(HandlerResult::Continue)
    }

    fn geometry_start(&mut self, meta: &GeometryMeta, part_id: u32) -> Result<HandlerResult> {
        self.has_geometry = true;
        let geometry_type = meta.geometry_type;

        match self.stack.last_mut() {
            None => {
                if let Some(srid) = meta.srid {
                    write!(self.buf, "SRID={srid};")?;
                }
                write!(self.buf, "{geometry_type} ")?;
            }
            Some(parent) => {
                Self::begin_item(&mut self.buf, &mut parent.opened);
                if parent.recursion.geometry_type.simple_type == SimpleType::GeometryCollection {
                    write!(self.buf, "{geometry_type} ")?;
                }
            }
        }

        self.stack.push(Frame {
            recursion: RecursionFrame {
                geometry_type,
                part_id,
            },
            opened: false,
        });
        Ok(HandlerResult::Continue)
    }

    fn ring_start(
        &mut self,
        _meta: &GeometryMeta,
        _size: Option<u32>,
        _ring_id: u32,
    ) -> Result<HandlerResult> {
        if let Some(frame) = self.stack.last_mut() {
            Self::begin_item(&mut self.buf, &mut frame.opened);
        }
        self.ring = Some(false);
        Ok(HandlerResult::Continue)
    }

    fn coord(
        &mut self,
        _meta: &GeometryMeta,
        coord: &Coord,
        _coord_id: u32,
    ) -> Result<HandlerResult> {
        match (&mut self.ring, self.stack.last_mut()) {
            (Some(opened), _) => Self::begin_item(&mut self.buf, opened),
            (None, Some(frame)) => Self::begin_item(&mut self.buf, &mut frame.opened),
            (None, None) => {}
        }
        self.write_coord(coord)?;
        Ok(HandlerResult::Continue)
    }

    fn ring_end(
        &mut self,
        _meta: &GeometryMeta,
        _size: Option<u32>,
        _ring_id: u32,
    ) -> Result<HandlerResult> {
        if let Some(opened) = self.ring.take() {
            Self::end_list(&mut self.buf, opened);
        }
        Ok(HandlerResult::Continue)
    }

    fn geometry_end(&mut self, _meta: &GeometryMeta, _part_id: u32) -> Result<HandlerResult> {
        if let Some(frame) = self.stack.pop() {
            Self::end_list(&mut self.buf, frame.opened);
        }
        Ok(HandlerResult::Continue)
    }

    fn feature_end(&mut self, _meta: &VectorMeta, feature_id: usize) -> Result<HandlerResult> {
        if !self.has_geometry || !self.stack.is_empty() {
            log::trace!("feature {feature_id} written as null");
            self.stack.clear();
            self.exporter.write_null()?;
        } else {
            self.exporter.write_feature(std::mem::take(&mut self.buf))?;
        }
        Ok(HandlerResult::Continue)
    }

    fn vector_end(&mut self, _meta: &VectorMeta) -> Result<E::Output> {
        Ok(self.exporter.finish())
    }
}
