use std::fmt;

/// Part id passed for a geometry that is not nested in another geometry.
pub const PART_ID_NONE: u32 = u32::MAX;

/// The seven simple feature geometry kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SimpleType {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    GeometryCollection = 7,
}

impl SimpleType {
    /// Map a WKB base type id (1-7) to a type.
    pub fn from_wkb_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::Point),
            2 => Some(Self::LineString),
            3 => Some(Self::Polygon),
            4 => Some(Self::MultiPoint),
            5 => Some(Self::MultiLineString),
            6 => Some(Self::MultiPolygon),
            7 => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    #[inline]
    pub fn wkb_id(self) -> u32 {
        self as u32
    }

    #[inline]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// Parse a WKT keyword, ignoring ASCII case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let s = keyword;
        if s.eq_ignore_ascii_case("POINT") {
            Some(Self::Point)
        } else if s.eq_ignore_ascii_case("LINESTRING") {
            Some(Self::LineString)
        } else if s.eq_ignore_ascii_case("POLYGON") {
            Some(Self::Polygon)
        } else if s.eq_ignore_ascii_case("MULTIPOINT") {
            Some(Self::MultiPoint)
        } else if s.eq_ignore_ascii_case("MULTILINESTRING") {
            Some(Self::MultiLineString)
        } else if s.eq_ignore_ascii_case("MULTIPOLYGON") {
            Some(Self::MultiPolygon)
        } else if s.eq_ignore_ascii_case("GEOMETRYCOLLECTION") {
            Some(Self::GeometryCollection)
        } else {
            None
        }
    }

    /// True for the homogeneous multi-part containers.
    #[inline]
    pub fn is_multi(self) -> bool {
        matches!(
            self,
            Self::MultiPoint | Self::MultiLineString | Self::MultiPolygon
        )
    }

    /// True for any geometry whose children are geometries.
    #[inline]
    pub fn is_collection(self) -> bool {
        self.is_multi() || self == Self::GeometryCollection
    }

    /// The only child type allowed in a homogeneous multi-part container.
    pub fn child_type(self) -> Option<Self> {
        match self {
            Self::MultiPoint => Some(Self::Point),
            Self::MultiLineString => Some(Self::LineString),
            Self::MultiPolygon => Some(Self::Polygon),
            _ => None,
        }
    }
}

/// Simple type plus dimension and SRID flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryType {
    pub simple_type: SimpleType,
    pub has_z: bool,
    pub has_m: bool,
    pub has_srid: bool,
}

impl GeometryType {
    pub fn new(simple_type: SimpleType) -> Self {
        Self {
            simple_type,
            has_z: false,
            has_m: false,
            has_srid: false,
        }
    }

    pub fn with_dims(mut self, has_z: bool, has_m: bool) -> Self {
        self.has_z = has_z;
        self.has_m = has_m;
        self
    }

    pub fn with_srid(mut self, has_srid: bool) -> Self {
        self.has_srid = has_srid;
        self
    }

    /// Number of ordinates per coordinate (2 to 4).
    #[inline]
    pub fn n_dims(&self) -> usize {
        2 + usize::from(self.has_z) + usize::from(self.has_m)
    }

    #[inline]
    pub fn same_dims(&self, other: &GeometryType) -> bool {
        self.has_z == other.has_z && self.has_m == other.has_m
    }

    /// "Z", "M", "ZM", or "" for XY.
    pub fn dims_suffix(&self) -> &'static str {
        match (self.has_z, self.has_m) {
            (false, false) => "",
            (true, false) => "Z",
            (false, true) => "M",
            (true, true) => "ZM",
        }
    }

    /// Keyword plus dimension suffix, e.g. `POINT ZM`.
    pub fn wkt_type(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.simple_type.keyword())?;
        let suffix = self.dims_suffix();
        if !suffix.is_empty() {
            write!(f, " {suffix}")?;
        }
        Ok(())
    }
}

/// Axis-aligned XY bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Describes one geometry occurrence, either a feature's geometry or a nested part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryMeta {
    pub geometry_type: GeometryType,
    /// Number of children: points for a line, rings for a polygon, parts for a
    /// collection, 1 for a non-empty point. `None` when not known up front.
    pub size: Option<u32>,
    pub srid: Option<i32>,
    pub bounds: Option<Bounds>,
}

impl GeometryMeta {
    pub fn new(geometry_type: GeometryType, size: Option<u32>) -> Self {
        Self {
            geometry_type,
            size,
            srid: None,
            bounds: None,
        }
    }

    #[inline]
    pub fn simple_type(&self) -> SimpleType {
        self.geometry_type.simple_type
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == Some(0)
    }
}

/// Describes a whole collection of features.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorMeta {
    /// The type shared by every feature, if the producer knows it.
    pub geometry_type: Option<GeometryType>,
    /// Number of features, or `None` for a stream of unknown length.
    pub size: Option<usize>,
    /// Every feature's `GeometryMeta` carries bounds.
    pub has_bounds: bool,
}

impl VectorMeta {
    pub fn new(geometry_type: Option<GeometryType>, size: Option<usize>) -> Self {
        Self {
            geometry_type,
            size,
            has_bounds: false,
        }
    }
}

/// A coordinate with optional Z and M ordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: None,
        }
    }

    pub fn xym(x: f64, y: f64, m: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: Some(m),
        }
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: Some(m),
        }
    }

    /// Build a coordinate from ordinates laid out as X Y [Z] [M].
    ///
    /// Missing ordinates required by the flags become NaN.
    pub fn from_ordinates(values: &[f64], has_z: bool, has_m: bool) -> Self {
        let get = |i: usize| values.get(i).copied().unwrap_or(f64::NAN);
        let z = has_z.then(|| get(2));
        let m = has_m.then(|| get(if has_z { 3 } else { 2 }));
        Self {
            x: get(0),
            y: get(1),
            z,
            m,
        }
    }

    /// Ordinates in X Y [Z] [M] order.
    pub fn ordinates(&self) -> impl Iterator<Item = f64> + '_ {
        [Some(self.x), Some(self.y), self.z, self.m]
            .into_iter()
            .flatten()
    }

    pub fn is_nan(&self) -> bool {
        self.ordinates().all(f64::is_nan)
    }
}

/// One level of the geometry nesting stack kept by consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecursionFrame {
    pub geometry_type: GeometryType,
    pub part_id: u32,
}

#[cfg(test)]
mod tests {
    use super::{Coord, GeometryType, SimpleType};

    #[test]
    fn keyword_roundtrip() {
        for id in 1..=7 {
            let simple_type = SimpleType::from_wkb_id(id).expect("valid id");
            assert_eq!(SimpleType::from_keyword(simple_type.keyword()), Some(simple_type));
            assert_eq!(simple_type.wkb_id(), id);
        }
        assert_eq!(SimpleType::from_wkb_id(0), None);
        assert_eq!(SimpleType::from_wkb_id(8), None);
        assert_eq!(
            SimpleType::from_keyword("multiPolygon"),
            Some(SimpleType::MultiPolygon)
        );
        assert_eq!(SimpleType::from_keyword("TRIANGLE"), None);
    }

    #[test]
    fn wkt_type_has_suffix() {
        let point = GeometryType::new(SimpleType::Point);
        assert_eq!(point.wkt_type(), "POINT");
        assert_eq!(point.with_dims(true, false).wkt_type(), "POINT Z");
        assert_eq!(point.with_dims(false, true).wkt_type(), "POINT M");
        assert_eq!(
            GeometryType::new(SimpleType::MultiPolygon)
                .with_dims(true, true)
                .wkt_type(),
            "MULTIPOLYGON ZM"
        );
        assert_eq!(point.with_dims(true, true).n_dims(), 4);
    }

    #[test]
    fn coord_from_ordinates_respects_flags() {
        let c = Coord::from_ordinates(&[1.0, 2.0, 3.0], false, true);
        assert_eq!(c, Coord::xym(1.0, 2.0, 3.0));
        let c = Coord::from_ordinates(&[1.0, 2.0, 3.0, 4.0], true, true);
        assert_eq!(c.ordinates().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(Coord::xy(f64::NAN, f64::NAN).is_nan());
        assert!(!Coord::xy(f64::NAN, 0.0).is_nan());
    }

    #[test]
    fn multi_child_types() {
        assert_eq!(SimpleType::MultiPoint.child_type(), Some(SimpleType::Point));
        assert_eq!(SimpleType::GeometryCollection.child_type(), None);
        assert!(SimpleType::GeometryCollection.is_collection());
        assert!(!SimpleType::GeometryCollection.is_multi());
        assert!(!SimpleType::Polygon.is_collection());
    }
}
