//! One-call conversions between WKB and WKT.

use crate::error::Result;
use crate::io::{BinaryProvider, TextProvider, VecExporter};
use crate::options::{ReadOptions, WkbWriteOptions, WktWriteOptions};
use crate::wkb::{WkbWriter, read_wkb};
use crate::wkt::{WktWriter, read_wkt};

/// Render every WKB feature of `provider` as WKT. Null features stay `None`.
pub fn wkb_translate_wkt<P: BinaryProvider>(
    provider: &mut P,
    options: &ReadOptions,
    write_options: WktWriteOptions,
) -> Result<Vec<Option<String>>> {
    let mut writer = WktWriter::new(VecExporter::new(provider.n_features()), write_options);
    read_wkb(provider, &mut writer, options)
}

/// Normalize WKT: canonical keywords, spacing and number formatting.
pub fn wkt_translate_wkt<P: TextProvider>(
    provider: &mut P,
    options: &ReadOptions,
    write_options: WktWriteOptions,
) -> Result<Vec<Option<String>>> {
    let mut writer = WktWriter::new(VecExporter::new(provider.n_features()), write_options);
    read_wkt(provider, &mut writer, options)
}

pub fn wkt_translate_wkb<P: TextProvider>(
    provider: &mut P,
    options: &ReadOptions,
    write_options: WkbWriteOptions,
) -> Result<Vec<Option<Vec<u8>>>> {
    let mut writer = WkbWriter::new(VecExporter::new(provider.n_features()), write_options);
    read_wkt(provider, &mut writer, options)
}

/// Re-encode WKB, e.g. to switch byte order or between ISO and extended type codes.
pub fn wkb_translate_wkb<P: BinaryProvider>(
    provider: &mut P,
    options: &ReadOptions,
    write_options: WkbWriteOptions,
) -> Result<Vec<Option<Vec<u8>>>> {
    let mut writer = WkbWriter::new(VecExporter::new(provider.n_features()), write_options);
    read_wkb(provider, &mut writer, options)
}
