use crate::error::{Result, WkError};
use crate::handler::{Handler, HandlerResult};
use crate::io::Exporter;
use crate::options::{Endianness, WkbConvention, WkbWriteOptions};
use crate::types::{Coord, GeometryMeta, GeometryType, SimpleType, VectorMeta};

use super::type_code;

struct Frame {
    geometry_type: GeometryType,
    // Where the child count lives, patched once the children are known.
    count_offset: Option<usize>,
    count: u32,
}

/// Handler that encodes each feature as WKB.
///
/// Counts are written when a geometry ends, so the input may come from a
/// producer that does not know sizes up front.
pub struct WkbWriter<E> {
    exporter: E,
    options: WkbWriteOptions,
    buf: Vec<u8>,
    stack: Vec<Frame>,
    // (offset of the point count, points seen) for the open ring.
    ring: Option<(usize, u32)>,
    has_geometry: bool,
}

impl<E: Exporter<Item = Vec<u8>>> WkbWriter<E> {
    pub fn new(exporter: E, options: WkbWriteOptions) -> Self {
        Self {
            exporter,
            options,
            buf: Vec::new(),
            stack: Vec::new(),
            ring: None,
            has_geometry: false,
        }
    }

    fn write_u32(&mut self, value: u32) {
        let bytes = match self.options.endianness {
            Endianness::Big => value.to_be_bytes(),
            Endianness::Little => value.to_le_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    fn write_f64(&mut self, value: f64) {
        let bytes = match self.options.endianness {
            Endianness::Big => value.to_be_bytes(),
            Endianness::Little => value.to_le_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    fn patch_u32(&mut self, offset: usize, value: u32) {
        let bytes = match self.options.endianness {
            Endianness::Big => value.to_be_bytes(),
            Endianness::Little => value.to_le_bytes(),
        };
        self.buf[offset..offset + 4].copy_from_slice(&bytes);
    }

    fn write_coord(&mut self, geometry_type: &GeometryType, coord: &Coord) {
        self.write_f64(coord.x);
        self.write_f64(coord.y);
        if geometry_type.has_z {
            self.write_f64(coord.z.unwrap_or(f64::NAN));
        }
        if geometry_type.has_m {
            self.write_f64(coord.m.unwrap_or(f64::NAN));
        }
    }
}

impl<E: Exporter<Item = Vec<u8>>> Handler for WkbWriter<E> {
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

    fn geometry_start(&mut self, meta: &GeometryMeta, _part_id: u32) -> Result<HandlerResult> {
        self.has_geometry = true;
        if let Some(parent) = self.stack.last_mut() {
            parent.count += 1;
        }

        let srid = match (self.stack.is_empty(), self.options.convention, meta.srid) {
            (true, WkbConvention::Extended, Some(srid)) => Some(srid),
            _ => None,
        };
        let geometry_type = meta.geometry_type.with_srid(srid.is_some());

        self.buf.push(self.options.endianness.to_byte());
        self.write_u32(type_code(&geometry_type, self.options.convention));
        if let Some(srid) = srid {
            self.write_u32(srid as u32);
        }

        let count_offset = if geometry_type.simple_type == SimpleType::Point {
            None
        } else {
            let offset = self.buf.len();
            self.write_u32(0);
            Some(offset)
        };

        self.stack.push(Frame {
            geometry_type,
            count_offset,
            count: 0,
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
            frame.count += 1;
        }
        let offset = self.buf.len();
        self.write_u32(0);
        self.ring = Some((offset, 0));
        Ok(HandlerResult::Continue)
    }

    fn coord(
        &mut self,
        meta: &GeometryMeta,
        coord: &Coord,
        _coord_id: u32,
    ) -> Result<HandlerResult> {
        match &mut self.ring {
            Some((_, count)) => *count += 1,
            None => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.count += 1;
                }
            }
        }
        self.write_coord(&meta.geometry_type, coord);
        Ok(HandlerResult::Continue)
    }

    fn ring_end(
        &mut self,
        _meta: &GeometryMeta,
        _size: Option<u32>,
        _ring_id: u32,
    ) -> Result<HandlerResult> {
        if let Some((offset, count)) = self.ring.take() {
            self.patch_u32(offset, count);
        }
        Ok(HandlerResult::Continue)
    }

    fn geometry_end(&mut self, _meta: &GeometryMeta, _part_id: u32) -> Result<HandlerResult> {
        if let Some(frame) = self.stack.pop() {
            match frame.count_offset {
                Some(offset) => self.patch_u32(offset, frame.count),
                None if frame.count == 0 => {
                    // POINT EMPTY is written as NaN ordinates.
                    let geometry_type = frame.geometry_type;
                    let nan = Coord::from_ordinates(&[], geometry_type.has_z, geometry_type.has_m);
                    self.write_coord(&geometry_type, &nan);
                }
                None => {}
            }
        }
        Ok(HandlerResult::Continue)
    }

    fn feature_end(&mut self, _meta: &VectorMeta, _feature_id: usize) -> Result<HandlerResult> {
        if !self.has_geometry || !self.stack.is_empty() {
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
