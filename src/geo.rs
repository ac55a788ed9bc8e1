//! Any [`geo_traits`] geometry as a producer of events.
//!
//! `Rect` and `Triangle` are emitted as polygons with a closed ring and
//! `Line` as a two-point line string, since the event protocol only knows
//! the seven simple feature types.

use geo_traits::{
    CoordTrait, Dimensions, GeometryCollectionTrait, GeometryTrait, LineStringTrait, LineTrait,
    MultiLineStringTrait, MultiPointTrait, MultiPolygonTrait, PointTrait, PolygonTrait, RectTrait,
    TriangleTrait,
};

use crate::error::{Result, WkError};
use crate::handler::{FeatureSource, Handler, HandlerResult, handle, part_count, run_features};
use crate::options::ReadOptions;
use crate::types::{Coord, GeometryMeta, GeometryType, PART_ID_NONE, SimpleType, VectorMeta};

/// Emit one feature per item; `None` items are null features.
///
/// ```
/// use geo_types::{Geometry, Point};
/// use wkstream::{ReadOptions, VecExporter, WktWriteOptions, WktWriter, read_geometries};
///
/// let geometries = vec![Some(Geometry::Point(Point::new(1.0, 2.0))), None];
/// let mut writer = WktWriter::new(VecExporter::new(2), WktWriteOptions::default());
/// let out = read_geometries(geometries, &mut writer, &ReadOptions::default())?;
/// assert_eq!(out, vec![Some("POINT (1 2)".to_string()), None]);
/// # Ok::<(), wkstream::WkError>(())
/// ```
pub fn read_geometries<I, G, H>(
    geometries: I,
    handler: &mut H,
    options: &ReadOptions,
) -> Result<H::Output>
where
    I: IntoIterator<Item = Option<G>>,
    G: GeometryTrait<T = f64>,
    H: Handler,
{
    let iter = geometries.into_iter();
    let size = match iter.size_hint() {
        (lower, Some(upper)) if lower == upper => Some(lower),
        _ => None,
    };
    let meta = VectorMeta::new(None, size);
    let mut source = GeoSource {
        iter,
        current: None,
    };
    run_features(&mut source, handler, &meta, options)
}

struct GeoSource<I, G> {
    iter: I,
    current: Option<Option<G>>,
}

impl<I, G> FeatureSource for GeoSource<I, G>
where
    I: Iterator<Item = Option<G>>,
    G: GeometryTrait<T = f64>,
{
    fn next_feature(&mut self) -> Result<bool> {
        self.current = self.iter.next();
        Ok(self.current.is_some())
    }

    fn feature_is_null(&self) -> bool {
        matches!(self.current, Some(None))
    }

    fn emit_feature<H: Handler>(&mut self, handler: &mut H) -> Result<HandlerResult> {
        match &self.current {
            Some(Some(geometry)) => emit_geometry(handler, geometry, PART_ID_NONE),
            _ => Ok(HandlerResult::Continue),
        }
    }
}

fn dims(dim: Dimensions) -> Result<(bool, bool)> {
    match dim {
        Dimensions::Xy | Dimensions::Unknown(2) => Ok((false, false)),
        Dimensions::Xyz | Dimensions::Unknown(3) => Ok((true, false)),
        Dimensions::Xym => Ok((false, true)),
        Dimensions::Xyzm | Dimensions::Unknown(4) => Ok((true, true)),
        Dimensions::Unknown(n) => Err(WkError::UnsupportedEncoding(format!(
            "coordinates with {n} dimensions"
        ))),
    }
}

fn to_coord<C: CoordTrait<T = f64>>(coord: &C, geometry_type: &GeometryType) -> Coord {
    let n_dims = geometry_type.n_dims();
    let mut values = [f64::NAN; 4];
    for (i, value) in values.iter_mut().take(n_dims).enumerate() {
        *value = coord.nth(i).unwrap_or(f64::NAN);
    }
    Coord::from_ordinates(&values[..n_dims], geometry_type.has_z, geometry_type.has_m)
}

fn emit_geometry<H, G>(handler: &mut H, geometry: &G, part_id: u32) -> Result<HandlerResult>
where
    H: Handler,
    G: GeometryTrait<T = f64>,
{
    use geo_traits::GeometryType as GeoType;

    let (has_z, has_m) = dims(geometry.dim())?;
    let typed = |simple_type| GeometryType::new(simple_type).with_dims(has_z, has_m);

    match geometry.as_type() {
        GeoType::Point(point) => emit_point(handler, point, typed(SimpleType::Point), part_id),
        GeoType::LineString(line) => {
            emit_line_string(handler, line, typed(SimpleType::LineString), part_id)
        }
        GeoType::Polygon(polygon) => {
            emit_polygon(handler, polygon, typed(SimpleType::Polygon), part_id)
        }
        GeoType::MultiPoint(multi) => {
            let geometry_type = typed(SimpleType::MultiPoint);
            let child_type = typed(SimpleType::Point);
            let meta = GeometryMeta::new(geometry_type, Some(part_count(multi.num_points())?));
            handle!(handler.geometry_start(&meta, part_id));
            for (i, point) in (0u32..).zip(multi.points()) {
                handle!(emit_point(handler, &point, child_type, i));
            }
            handler.geometry_end(&meta, part_id)
        }
        GeoType::MultiLineString(multi) => {
            let geometry_type = typed(SimpleType::MultiLineString);
            let child_type = typed(SimpleType::LineString);
            let meta =
                GeometryMeta::new(geometry_type, Some(part_count(multi.num_line_strings())?));
            handle!(handler.geometry_start(&meta, part_id));
            for (i, line) in (0u32..).zip(multi.line_strings()) {
                handle!(emit_line_string(handler, &line, child_type, i));
            }
            handler.geometry_end(&meta, part_id)
        }
        GeoType::MultiPolygon(multi) => {
            let geometry_type = typed(SimpleType::MultiPolygon);
            let child_type = typed(SimpleType::Polygon);
            let meta = GeometryMeta::new(geometry_type, Some(part_count(multi.num_polygons())?));
            handle!(handler.geometry_start(&meta, part_id));
            for (i, polygon) in (0u32..).zip(multi.polygons()) {
                handle!(emit_polygon(handler, &polygon, child_type, i));
            }
            handler.geometry_end(&meta, part_id)
        }
        GeoType::GeometryCollection(collection) => {
            let geometry_type = typed(SimpleType::GeometryCollection);
            let meta =
                GeometryMeta::new(geometry_type, Some(part_count(collection.num_geometries())?));
            handle!(handler.geometry_start(&meta, part_id));
            for (i, child) in (0u32..).zip(collection.geometries()) {
                handle!(emit_geometry(handler, &child, i));
            }
            handler.geometry_end(&meta, part_id)
        }
        GeoType::Rect(rect) => {
            let geometry_type = typed(SimpleType::Polygon);
            let (min, max) = (rect.min(), rect.max());
            let corners = [
                (min.x(), min.y()),
                (max.x(), min.y()),
                (max.x(), max.y()),
                (min.x(), max.y()),
                (min.x(), min.y()),
            ];
            let ring = corners.map(|(x, y)| Coord::from_ordinates(&[x, y], has_z, has_m));
            emit_closed_ring(handler, &ring, geometry_type, part_id)
        }
        GeoType::Triangle(triangle) => {
            let geometry_type = typed(SimpleType::Polygon);
            let [a, b, c] = triangle.coords().map(|coord| to_coord(&coord, &geometry_type));
            emit_closed_ring(handler, &[a, b, c, a], geometry_type, part_id)
        }
        GeoType::Line(line) => {
            let geometry_type = typed(SimpleType::LineString);
            let meta = GeometryMeta::new(geometry_type, Some(2));
            handle!(handler.geometry_start(&meta, part_id));
            handle!(handler.coord(&meta, &to_coord(&line.start(), &geometry_type), 0));
            handle!(handler.coord(&meta, &to_coord(&line.end(), &geometry_type), 1));
            handler.geometry_end(&meta, part_id)
        }
    }
}

fn emit_point<H, P>(
    handler: &mut H,
    point: &P,
    geometry_type: GeometryType,
    part_id: u32,
) -> Result<HandlerResult>
where
    H: Handler,
    P: PointTrait<T = f64>,
{
    let coord = point.coord();
    let meta = GeometryMeta::new(geometry_type, Some(u32::from(coord.is_some())));
    handle!(handler.geometry_start(&meta, part_id));
    if let Some(coord) = coord {
        handle!(handler.coord(&meta, &to_coord(&coord, &geometry_type), 0));
    }
    handler.geometry_end(&meta, part_id)
}

fn emit_line_string<H, L>(
    handler: &mut H,
    line: &L,
    geometry_type: GeometryType,
    part_id: u32,
) -> Result<HandlerResult>
where
    H: Handler,
    L: LineStringTrait<T = f64>,
{
    let meta = GeometryMeta::new(geometry_type, Some(part_count(line.num_coords())?));
    handle!(handler.geometry_start(&meta, part_id));
    for (i, coord) in (0u32..).zip(line.coords()) {
        handle!(handler.coord(&meta, &to_coord(&coord, &geometry_type), i));
    }
    handler.geometry_end(&meta, part_id)
}

fn emit_polygon<H, P>(
    handler: &mut H,
    polygon: &P,
    geometry_type: GeometryType,
    part_id: u32,
) -> Result<HandlerResult>
where
    H: Handler,
    P: PolygonTrait<T = f64>,
{
    let Some(exterior) = polygon.exterior() else {
        let meta = GeometryMeta::new(geometry_type, Some(0));
        handle!(handler.geometry_start(&meta, part_id));
        return handler.geometry_end(&meta, part_id);
    };

    let meta = GeometryMeta::new(geometry_type, Some(part_count(polygon.num_interiors() + 1)?));
    handle!(handler.geometry_start(&meta, part_id));
    handle!(emit_ring(handler, &meta, &exterior, 0));
    for (i, ring) in (1u32..).zip(polygon.interiors()) {
        handle!(emit_ring(handler, &meta, &ring, i));
    }
    handler.geometry_end(&meta, part_id)
}

fn emit_ring<H, L>(
    handler: &mut H,
    meta: &GeometryMeta,
    ring: &L,
    ring_id: u32,
) -> Result<HandlerResult>
where
    H: Handler,
    L: LineStringTrait<T = f64>,
{
    let size = Some(part_count(ring.num_coords())?);
    handle!(handler.ring_start(meta, size, ring_id));
    for (i, coord) in (0u32..).zip(ring.coords()) {
        handle!(handler.coord(meta, &to_coord(&coord, &meta.geometry_type), i));
    }
    handler.ring_end(meta, size, ring_id)
}

fn emit_closed_ring<H: Handler>(
    handler: &mut H,
    ring: &[Coord],
    geometry_type: GeometryType,
    part_id: u32,
) -> Result<HandlerResult> {
    let meta = GeometryMeta::new(geometry_type, Some(1));
    let size = Some(part_count(ring.len())?);
    handle!(handler.geometry_start(&meta, part_id));
    handle!(handler.ring_start(&meta, size, 0));
    for (i, coord) in (0u32..).zip(ring) {
        handle!(handler.coord(&meta, coord, i));
    }
    handle!(handler.ring_end(&meta, size, 0));
    handler.geometry_end(&meta, part_id)
}
