//! Well-Known Text, including the `SRID=<n>;` prefix of EWKT.
//!
//! Keywords are case-insensitive. A geometry without a `Z`, `M` or `ZM`
//! suffix takes its dimensions from its first coordinate; nested parts take
//! the dimensions of the geometry that encloses them.

mod reader;
mod tokenizer;
mod writer;

pub use reader::{read_wkt, stream_wkt};
pub use writer::WktWriter;
