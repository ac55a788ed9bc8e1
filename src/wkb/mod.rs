//! Well-Known Binary.
//!
//! Both common type-code conventions are understood when reading:
//!
//! - ISO: `1000 * dims + base`, where dims is 1 (Z), 2 (M) or 3 (ZM).
//! - Extended (PostGIS EWKB): base type with the flag bits
//!   `0x80000000` (Z), `0x40000000` (M) and `0x20000000` (SRID follows).
//!
//! A code may mix both; the flags are combined.

mod reader;
mod writer;

pub use reader::read_wkb;
pub use writer::WkbWriter;

use crate::error::{Result, WkError};
use crate::options::WkbConvention;
use crate::types::{GeometryType, SimpleType};

const Z_FLAG_BIT: u32 = 0x80000000;
const M_FLAG_BIT: u32 = 0x40000000;
const SRID_FLAG_BIT: u32 = 0x20000000;
const FLAG_MASK: u32 = Z_FLAG_BIT | M_FLAG_BIT | SRID_FLAG_BIT;

pub(crate) fn parse_type_code(code: u32) -> Result<GeometryType> {
    let base = code & !FLAG_MASK;
    let (iso_z, iso_m) = match base / 1000 {
        0 => (false, false),
        1 => (true, false),
        2 => (false, true),
        3 => (true, true),
        _ => {
            return Err(WkError::UnsupportedEncoding(format!(
                "unknown geometry type code: {code:#010x}"
            )));
        }
    };
    let simple_type = SimpleType::from_wkb_id(base % 1000).ok_or_else(|| {
        WkError::UnsupportedEncoding(format!("unknown geometry type code: {code:#010x}"))
    })?;

    Ok(GeometryType {
        simple_type,
        has_z: iso_z || code & Z_FLAG_BIT != 0,
        has_m: iso_m || code & M_FLAG_BIT != 0,
        has_srid: code & SRID_FLAG_BIT != 0,
    })
}

pub(crate) fn type_code(geometry_type: &GeometryType, convention: WkbConvention) -> u32 {
    let base = geometry_type.simple_type.wkb_id();
    match convention {
        WkbConvention::Extended => {
            let mut code = base;
            if geometry_type.has_z {
                code |= Z_FLAG_BIT;
            }
            if geometry_type.has_m {
                code |= M_FLAG_BIT;
            }
            if geometry_type.has_srid {
                code |= SRID_FLAG_BIT;
            }
            code
        }
        WkbConvention::Iso => {
            let dims = u32::from(geometry_type.has_z) + 2 * u32::from(geometry_type.has_m);
            1000 * dims + base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_type_code, type_code};
    use crate::options::WkbConvention;
    use crate::types::{GeometryType, SimpleType};

    #[test]
    fn iso_codes() -> crate::Result<()> {
        let t = parse_type_code(1)?;
        assert_eq!(t, GeometryType::new(SimpleType::Point));

        let t = parse_type_code(1003)?;
        assert_eq!(t.simple_type, SimpleType::Polygon);
        assert!(t.has_z && !t.has_m && !t.has_srid);

        let t = parse_type_code(2002)?;
        assert!(!t.has_z && t.has_m);

        let t = parse_type_code(3007)?;
        assert_eq!(t.simple_type, SimpleType::GeometryCollection);
        assert!(t.has_z && t.has_m);
        Ok(())
    }

    #[test]
    fn extended_codes() -> crate::Result<()> {
        let t = parse_type_code(0x20000001)?;
        assert!(t.has_srid && !t.has_z && !t.has_m);

        let t = parse_type_code(0xE0000006)?;
        assert_eq!(t.simple_type, SimpleType::MultiPolygon);
        assert!(t.has_srid && t.has_z && t.has_m);
        Ok(())
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(parse_type_code(0).is_err());
        assert!(parse_type_code(8).is_err());
        assert!(parse_type_code(4001).is_err());
        assert!(parse_type_code(17).is_err());
    }

    #[test]
    fn codes_roundtrip_for_both_conventions() -> crate::Result<()> {
        let t = GeometryType::new(SimpleType::LineString).with_dims(true, true);
        assert_eq!(type_code(&t, WkbConvention::Iso), 3002);
        assert_eq!(type_code(&t, WkbConvention::Extended), 0xC0000002);
        assert_eq!(parse_type_code(type_code(&t, WkbConvention::Iso))?, t);
        assert_eq!(parse_type_code(type_code(&t, WkbConvention::Extended))?, t);

        let with_srid = t.with_srid(true);
        assert_eq!(type_code(&with_srid, WkbConvention::Extended), 0xE0000002);
        Ok(())
    }
}
