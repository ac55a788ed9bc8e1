//! The event protocol shared by every producer and consumer.
//!
//! A producer (a decoder, or a synthesizer such as [`crate::read_rct`]) calls
//! the methods of a [`Handler`] in this order:
//!
//! ```text
//! vector_start
//!   feature_start(i)
//!     geometry_start            (absent for a null feature)
//!       ring_start              (polygons only)
//!         coord ...
//!       ring_end
//!       geometry_start ...      (children of multi-geometries and collections)
//!       geometry_end
//!     geometry_end
//!   feature_end(i)
//! vector_end
//! ```
//!
//! Every event returns a [`HandlerResult`]. `AbortFeature` skips the rest of
//! the current feature (its `feature_end` is still delivered) and `Abort`
//! stops the whole loop (`vector_end` is still delivered).

use crate::error::{Result, WkError};
use crate::options::ReadOptions;
use crate::types::{Coord, GeometryMeta, VectorMeta};

/// Control code returned by every handler callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandlerResult {
    #[default]
    Continue,
    /// Skip the remaining events of the current feature.
    AbortFeature,
    /// Stop producing features.
    Abort,
}

/// Consumer of the event protocol.
///
/// All events but `vector_end` default to `Continue`, so an implementation
/// only overrides what it needs.
pub trait Handler {
    type Output;

    fn vector_start(&mut self, _meta: &VectorMeta) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn feature_start(&mut self, _meta: &VectorMeta, _feature_id: usize) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn geometry_start(&mut self, _meta: &GeometryMeta, _part_id: u32) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn ring_start(
        &mut self,
        _meta: &GeometryMeta,
        _size: Option<u32>,
        _ring_id: u32,
    ) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn coord(
        &mut self,
        _meta: &GeometryMeta,
        _coord: &Coord,
        _coord_id: u32,
    ) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn ring_end(
        &mut self,
        _meta: &GeometryMeta,
        _size: Option<u32>,
        _ring_id: u32,
    ) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn geometry_end(&mut self, _meta: &GeometryMeta, _part_id: u32) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn feature_end(&mut self, _meta: &VectorMeta, _feature_id: usize) -> Result<HandlerResult> {
        Ok(HandlerResult::Continue)
    }

    fn vector_end(&mut self, meta: &VectorMeta) -> Result<Self::Output>;

    /// Called once after `vector_end`, or instead of it when a fatal error
    /// stops the producer.
    fn deinitialize(&mut self) {}
}

/// Return early from the enclosing function unless the handler said `Continue`.
macro_rules! handle {
    ($expr:expr) => {
        match $expr? {
            $crate::handler::HandlerResult::Continue => {}
            result => return Ok(result),
        }
    };
}

pub(crate) use handle;

/// A cursor over features that knows how to replay one feature as events.
pub(crate) trait FeatureSource {
    /// Advance to the next feature. Returns `false` at the end.
    fn next_feature(&mut self) -> Result<bool>;

    fn feature_is_null(&self) -> bool;

    /// Emit the geometry events of the current, non-null feature.
    fn emit_feature<H: Handler>(&mut self, handler: &mut H) -> Result<HandlerResult>;
}

/// Drive `handler` over every feature of `source`.
///
/// `deinitialize` is called on every path, including errors.
pub(crate) fn run_features<S, H>(
    source: &mut S,
    handler: &mut H,
    meta: &VectorMeta,
    options: &ReadOptions,
) -> Result<H::Output>
where
    S: FeatureSource,
    H: Handler,
{
    let result = feature_loop(source, handler, meta, options);
    handler.deinitialize();
    result
}

fn feature_loop<S, H>(
    source: &mut S,
    handler: &mut H,
    meta: &VectorMeta,
    options: &ReadOptions,
) -> Result<H::Output>
where
    S: FeatureSource,
    H: Handler,
{
    log::debug!("vector_start: {:?} features", meta.size);

    if handler.vector_start(meta)? == HandlerResult::Continue {
        let mut feature_id: usize = 0;
        while source.next_feature()? {
            if let Err(err) = options.check_interrupt(feature_id) {
                log::debug!("interrupted at feature {feature_id}");
                // Let the consumer finalize whatever it holds before unwinding.
                handler.vector_end(meta)?;
                return Err(err);
            }

            match handler.feature_start(meta, feature_id)? {
                HandlerResult::Abort => {
                    log::debug!("aborted at feature_start {feature_id}");
                    break;
                }
                HandlerResult::AbortFeature => {
                    log::trace!("skipping feature {feature_id}");
                }
                HandlerResult::Continue => {
                    if !source.feature_is_null() {
                        let result = source
                            .emit_feature(handler)
                            .map_err(|err| err.in_feature(feature_id))?;
                        if result == HandlerResult::Abort {
                            log::debug!("aborted inside feature {feature_id}");
                            break;
                        }
                    }
                }
            }

            if handler.feature_end(meta, feature_id)? == HandlerResult::Abort {
                log::debug!("aborted at feature_end {feature_id}");
                break;
            }
            feature_id += 1;
        }
    }

    handler.vector_end(meta)
}

pub(crate) fn part_count(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| WkError::UnsupportedEncoding(format!("too many parts: {len}")))
}
