//! Handler-driven streaming codecs for Well-Known Binary and Well-Known Text.
//!
//! ## Overview
//!
//! Every reader in this crate is a *producer*: it walks its input one feature
//! at a time and calls the methods of a [`Handler`] for each structural
//! event (`feature_start`, `geometry_start`, `coord`, ...). Every writer is a
//! handler. Pairing them gives conversions that never materialize a whole
//! geometry tree.
//!
//! - Producers: [`read_wkb`], [`read_wkt`], [`stream_wkt`], [`read_rct`]
//!   and [`read_geometries`] (anything implementing `geo_traits::GeometryTrait`).
//! - Consumers: [`WktWriter`], [`WkbWriter`], [`DebugHandler`], or your own
//!   [`Handler`].
//! - Inputs come from a [`BinaryProvider`] or [`TextProvider`] ([`VecProvider`],
//!   [`SqliteProvider`]); writers hand their output to an [`Exporter`]
//!   ([`VecExporter`]).
//!
//! A handler steers the producer with its return value: [`HandlerResult::AbortFeature`]
//! skips to the next feature, [`HandlerResult::Abort`] stops the loop. Decode errors
//! stop the loop too and report the index of the failing feature.
//!
//! ## Converting
//!
//! ```
//! use wkstream::{ReadOptions, VecProvider, WktWriteOptions, wkt_translate_wkt};
//!
//! let mut provider = VecProvider::new(vec![
//!     Some("srid=4326;multipoint (1 2, 3 4)"),
//!     None,
//! ]);
//! let out = wkt_translate_wkt(
//!     &mut provider,
//!     &ReadOptions::default(),
//!     WktWriteOptions::default(),
//! )?;
//! assert_eq!(out[0].as_deref(), Some("SRID=4326;MULTIPOINT ((1 2), (3 4))"));
//! assert_eq!(out[1], None);
//! # Ok::<(), wkstream::WkError>(())
//! ```
//!
//! ## Writing a handler
//!
//! Only the events of interest need to be implemented; everything else
//! continues by default.
//!
//! ```
//! use wkstream::{
//!     Coord, GeometryMeta, Handler, HandlerResult, ReadOptions, Result, VecProvider,
//!     VectorMeta, read_wkt,
//! };
//!
//! #[derive(Default)]
//! struct CoordCount(usize);
//!
//! impl Handler for CoordCount {
//!     type Output = usize;
//!
//!     fn coord(
//!         &mut self,
//!         _meta: &GeometryMeta,
//!         _coord: &Coord,
//!         _coord_id: u32,
//!     ) -> Result<HandlerResult> {
//!         self.0 += 1;
//!         Ok(HandlerResult::Continue)
//!     }
//!
//!     fn vector_end(&mut self, _meta: &VectorMeta) -> Result<usize> {
//!         Ok(self.0)
//!     }
//! }
//!
//! let mut provider = VecProvider::new(vec![
//!     Some("LINESTRING (0 0, 1 1, 2 2)"),
//!     Some("POINT EMPTY"),
//! ]);
//! let n = read_wkt(&mut provider, &mut CoordCount::default(), &ReadOptions::default())?;
//! assert_eq!(n, 3);
//! # Ok::<(), wkstream::WkError>(())
//! ```
//!
//! ## Cancelling
//!
//! Long-running reads poll an [`Interrupt`] hook every
//! `ReadOptions::interrupt_interval` features and fail with
//! [`WkError::Cancelled`] once it fires.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use wkstream::{ReadOptions, VecProvider, WkError, WktWriteOptions, wkt_translate_wkt};
//!
//! let stop = Arc::new(AtomicBool::new(true));
//! let flag = Arc::clone(&stop);
//! let options = ReadOptions {
//!     interrupt_interval: 1,
//!     ..ReadOptions::default().with_interrupt(move || flag.load(Ordering::Relaxed))
//! };
//! let mut provider = VecProvider::new(vec![Some("POINT (1 2)")]);
//! let err = wkt_translate_wkt(&mut provider, &options, WktWriteOptions::default()).unwrap_err();
//! assert!(matches!(err, WkError::Cancelled { feature_id: 0 }));
//! ```
mod debug;
mod error;
mod geo;
mod handler;
mod io;
mod options;
mod rct;
mod sqlite;
mod translate;
mod types;
mod wkb;
mod wkt;

#[cfg(test)]
mod test_util;

pub use debug::DebugHandler;
pub use error::{Result, WkError};
pub use geo::read_geometries;
pub use handler::{Handler, HandlerResult};
pub use io::{BinaryProvider, Exporter, Provider, TextProvider, VecExporter, VecProvider};
pub use options::{
    Endianness, Interrupt, ReadOptions, WkbConvention, WkbWriteOptions, WktWriteOptions,
};
pub use rct::{Rct, read_rct};
pub use sqlite::{SqliteProvider, register_wk_functions};
pub use translate::{wkb_translate_wkb, wkb_translate_wkt, wkt_translate_wkb, wkt_translate_wkt};
pub use types::{
    Bounds, Coord, GeometryMeta, GeometryType, PART_ID_NONE, RecursionFrame, SimpleType,
    VectorMeta,
};
pub use wkb::{WkbWriter, read_wkb};
pub use wkt::{WktWriter, read_wkt, stream_wkt};
