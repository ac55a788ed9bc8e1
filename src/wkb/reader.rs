use crate::error::{Result, WkError};
use crate::handler::{FeatureSource, Handler, HandlerResult, handle, run_features};
use crate::io::BinaryProvider;
use crate::options::{Endianness, ReadOptions};
use crate::types::{Coord, GeometryMeta, GeometryType, PART_ID_NONE, VectorMeta};

use super::parse_type_code;

/// Decode every WKB feature of `provider`, sending events to `handler`.
///
/// Example:
/// ```
/// use wkstream::{ReadOptions, VecProvider, WktWriteOptions, WktWriter, VecExporter, read_wkb};
///
/// let point = vec![
///     0x01, 0x01, 0x00, 0x00, 0x00,
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0x3f,
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40,
/// ];
/// let mut provider = VecProvider::new(vec![Some(point)]);
/// let mut writer = WktWriter::new(VecExporter::new(1), WktWriteOptions::default());
/// let wkt = read_wkb(&mut provider, &mut writer, &ReadOptions::default())?;
/// assert_eq!(wkt, vec![Some("POINT (1 2)".to_string())]);
/// # Ok::<(), wkstream::WkError>(())
/// ```
pub fn read_wkb<P, H>(provider: &mut P, handler: &mut H, options: &ReadOptions) -> Result<H::Output>
where
    P: BinaryProvider,
    H: Handler,
{
    let meta = VectorMeta::new(None, Some(provider.n_features()));
    let mut source = WkbSource {
        provider,
        max_depth: options.max_depth,
    };
    run_features(&mut source, handler, &meta, options)
}

struct WkbSource<'a, P> {
    provider: &'a mut P,
    max_depth: usize,
}

impl<P: BinaryProvider> FeatureSource for WkbSource<'_, P> {
    fn next_feature(&mut self) -> Result<bool> {
        self.provider.seek_next_feature()
    }

    fn feature_is_null(&self) -> bool {
        self.provider.feature_is_null()
    }

    fn emit_feature<H: Handler>(&mut self, handler: &mut H) -> Result<HandlerResult> {
        let mut buffer = WkbBuffer::new(self.provider.feature_bytes()?, self.max_depth);
        read_geometry(&mut buffer, handler, PART_ID_NONE, None, 1)
    }
}

/// Bounds-checked cursor over one feature's bytes.
struct WkbBuffer<'a> {
    buf: &'a [u8],
    offset: usize,
    endian: Endianness,
    max_depth: usize,
}

impl<'a> WkbBuffer<'a> {
    fn new(buf: &'a [u8], max_depth: usize) -> Self {
        Self {
            buf,
            offset: 0,
            endian: Endianness::Little,
            max_depth,
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.offset + N;
        if end > self.buf.len() {
            return Err(WkError::TruncatedInput {
                offset: self.offset,
                needed: N,
                len: self.buf.len(),
            });
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buf[self.offset..end]);
        self.offset = end;
        Ok(bytes)
    }

    fn read_endian(&mut self) -> Result<()> {
        let [byte] = self.take::<1>()?;
        self.endian = Endianness::from_byte(byte).ok_or_else(|| {
            WkError::UnsupportedEncoding(format!(
                "unexpected byte order {byte:#04x} at offset {}",
                self.offset - 1
            ))
        })?;
        Ok(())
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take::<4>()?;
        Ok(match self.endian {
            Endianness::Big => u32::from_be_bytes(bytes),
            Endianness::Little => u32::from_le_bytes(bytes),
        })
    }

    fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.take::<8>()?;
        Ok(match self.endian {
            Endianness::Big => f64::from_be_bytes(bytes),
            Endianness::Little => f64::from_le_bytes(bytes),
        })
    }

    fn read_coord(&mut self, geometry_type: &GeometryType) -> Result<Coord> {
        let mut values = [0.0; 4];
        let n_dims = geometry_type.n_dims();
        for value in values.iter_mut().take(n_dims) {
            *value = self.read_f64()?;
        }
        Ok(Coord::from_ordinates(
            &values[..n_dims],
            geometry_type.has_z,
            geometry_type.has_m,
        ))
    }
}

fn read_header(
    buffer: &mut WkbBuffer<'_>,
    parent: Option<&GeometryType>,
) -> Result<(GeometryType, Option<i32>)> {
    buffer.read_endian()?;
    let mut geometry_type = parse_type_code(buffer.read_u32()?)?;
    let mut srid = if geometry_type.has_srid {
        Some(buffer.read_u32()? as i32)
    } else {
        None
    };

    if let Some(parent) = parent {
        // The SRID belongs to the feature; a nested one is read and dropped.
        if srid.take().is_some() {
            log::trace!("ignoring SRID of a nested {}", geometry_type.simple_type.keyword());
        }
        geometry_type.has_srid = false;

        if !geometry_type.same_dims(parent) {
            return Err(WkError::UnsupportedEncoding(format!(
                "{geometry_type} cannot be nested in {parent}"
            )));
        }
        if let Some(child_type) = parent.simple_type.child_type()
            && child_type != geometry_type.simple_type
        {
            return Err(WkError::UnsupportedEncoding(format!(
                "{} cannot be nested in {}",
                geometry_type.simple_type.keyword(),
                parent.simple_type.keyword()
            )));
        }
    }

    Ok((geometry_type, srid))
}

fn read_geometry<H: Handler>(
    buffer: &mut WkbBuffer<'_>,
    handler: &mut H,
    part_id: u32,
    parent: Option<&GeometryType>,
    depth: usize,
) -> Result<HandlerResult> {
    use crate::types::SimpleType::*;

    if depth > buffer.max_depth {
        return Err(WkError::UnsupportedEncoding(format!(
            "geometry nested deeper than {} levels at offset {}",
            buffer.max_depth, buffer.offset
        )));
    }
    let (geometry_type, srid) = read_header(buffer, parent)?;
    let mut meta = GeometryMeta::new(geometry_type, None);
    meta.srid = srid;

    match geometry_type.simple_type {
        Point => {
            // An all-NaN point is how WKB spells POINT EMPTY.
            let coord = buffer.read_coord(&geometry_type)?;
            let empty = coord.is_nan();
            meta.size = Some(if empty { 0 } else { 1 });
            handle!(handler.geometry_start(&meta, part_id));
            if !empty {
                handle!(handler.coord(&meta, &coord, 0));
            }
        }
        LineString => {
            let size = buffer.read_u32()?;
            meta.size = Some(size);
            handle!(handler.geometry_start(&meta, part_id));
            for coord_id in 0..size {
                let coord = buffer.read_coord(&geometry_type)?;
                handle!(handler.coord(&meta, &coord, coord_id));
            }
        }
        Polygon => {
            let n_rings = buffer.read_u32()?;
            meta.size = Some(n_rings);
            handle!(handler.geometry_start(&meta, part_id));
            for ring_id in 0..n_rings {
                let size = buffer.read_u32()?;
                handle!(handler.ring_start(&meta, Some(size), ring_id));
                for coord_id in 0..size {
                    let coord = buffer.read_coord(&geometry_type)?;
                    handle!(handler.coord(&meta, &coord, coord_id));
                }
                handle!(handler.ring_end(&meta, Some(size), ring_id));
            }
        }
        MultiPoint | MultiLineString | MultiPolygon | GeometryCollection => {
            let n_parts = buffer.read_u32()?;
            meta.size = Some(n_parts);
            handle!(handler.geometry_start(&meta, part_id));
            for child_id in 0..n_parts {
                handle!(read_geometry(
                    buffer,
                    handler,
                    child_id,
                    Some(&geometry_type),
                    depth + 1
                ));
            }
        }
    }

    handler.geometry_end(&meta, part_id)
}
