//! Rectangles as polygons, without any parser in between.

use crate::error::{Result, WkError};
use crate::handler::{FeatureSource, Handler, HandlerResult, handle, run_features};
use crate::options::ReadOptions;
use crate::types::{Bounds, Coord, GeometryMeta, GeometryType, PART_ID_NONE, SimpleType, VectorMeta};

/// Four parallel columns of rectangle bounds, one rectangle per index.
#[derive(Clone, Copy, Debug)]
pub struct Rct<'a> {
    xmin: &'a [f64],
    ymin: &'a [f64],
    xmax: &'a [f64],
    ymax: &'a [f64],
}

impl<'a> Rct<'a> {
    pub fn new(xmin: &'a [f64], ymin: &'a [f64], xmax: &'a [f64], ymax: &'a [f64]) -> Result<Self> {
        for other in [ymin, xmax, ymax] {
            if other.len() != xmin.len() {
                return Err(WkError::MismatchedLength {
                    expected: xmin.len(),
                    got: other.len(),
                });
            }
        }
        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    pub fn len(&self) -> usize {
        self.xmin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xmin.is_empty()
    }

    pub fn bounds(&self, i: usize) -> Option<Bounds> {
        Some(Bounds {
            min_x: *self.xmin.get(i)?,
            min_y: *self.ymin.get(i)?,
            max_x: *self.xmax.get(i)?,
            max_y: *self.ymax.get(i)?,
        })
    }
}

/// A rectangle with all four values missing, or whose width or height is
/// negative infinity, has no area to draw.
fn is_empty_rect(bounds: &Bounds) -> bool {
    let all_nan = bounds.min_x.is_nan()
        && bounds.min_y.is_nan()
        && bounds.max_x.is_nan()
        && bounds.max_y.is_nan();
    all_nan
        || bounds.max_x - bounds.min_x == f64::NEG_INFINITY
        || bounds.max_y - bounds.min_y == f64::NEG_INFINITY
}

/// Emit each rectangle as a closed five-point polygon, or `POLYGON EMPTY`.
pub fn read_rct<H: Handler>(
    rct: &Rct<'_>,
    handler: &mut H,
    options: &ReadOptions,
) -> Result<H::Output> {
    let mut meta = VectorMeta::new(Some(GeometryType::new(SimpleType::Polygon)), Some(rct.len()));
    meta.has_bounds = true;
    let mut source = RctSource { rct, index: None };
    run_features(&mut source, handler, &meta, options)
}

struct RctSource<'r, 'a> {
    rct: &'r Rct<'a>,
    index: Option<usize>,
}

impl FeatureSource for RctSource<'_, '_> {
    fn next_feature(&mut self) -> Result<bool> {
        let next = self.index.map_or(0, |i| i + 1);
        self.index = Some(next);
        Ok(next < self.rct.len())
    }

    fn feature_is_null(&self) -> bool {
        false
    }

    fn emit_feature<H: Handler>(&mut self, handler: &mut H) -> Result<HandlerResult> {
        let Some(bounds) = self.index.and_then(|i| self.rct.bounds(i)) else {
            return Ok(HandlerResult::Continue);
        };

        let empty = is_empty_rect(&bounds);
        let mut meta = GeometryMeta::new(
            GeometryType::new(SimpleType::Polygon),
            Some(if empty { 0 } else { 1 }),
        );
        meta.bounds = Some(bounds);

        handle!(handler.geometry_start(&meta, PART_ID_NONE));
        if !empty {
            let Bounds {
                min_x,
                min_y,
                max_x,
                max_y,
            } = bounds;
            let ring = [
                (min_x, min_y),
                (max_x, min_y),
                (max_x, max_y),
                (min_x, max_y),
                (min_x, min_y),
            ];
            handle!(handler.ring_start(&meta, Some(5), 0));
            for (coord_id, (x, y)) in (0u32..).zip(ring) {
                handle!(handler.coord(&meta, &Coord::xy(x, y), coord_id));
            }
            handle!(handler.ring_end(&meta, Some(5), 0));
        }
        handler.geometry_end(&meta, PART_ID_NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::{Rct, read_rct};
    use crate::Result;
    use crate::error::WkError;
    use crate::handler::HandlerResult;
    use crate::io::VecExporter;
    use crate::options::{ReadOptions, WktWriteOptions};
    use crate::test_util::EventLog;
    use crate::wkt::WktWriter;

    #[test]
    fn rectangle_becomes_closed_ring() -> Result<()> {
        let rct = Rct::new(&[0.0], &[1.0], &[2.0], &[3.0])?;
        let events = read_rct(&rct, &mut EventLog::new(), &ReadOptions::default())?;
        assert_eq!(
            events,
            vec![
                "vector_start size=1",
                "feature_start 0",
                "geometry_start POLYGON size=1 part=none",
                "ring_start size=5 id=0",
                "coord 0: 0 1",
                "coord 1: 2 1",
                "coord 2: 2 3",
                "coord 3: 0 3",
                "coord 4: 0 1",
                "ring_end id=0",
                "geometry_end POLYGON part=none",
                "feature_end 0",
                "vector_end",
            ]
        );
        Ok(())
    }

    #[test]
    fn empty_rectangles() -> Result<()> {
        let nan = f64::NAN;
        let inf = f64::INFINITY;
        let xmin = [nan, inf, 0.0, 0.0, nan];
        let ymin = [nan, 0.0, inf, 0.0, 0.0];
        let xmax = [nan, 1.0, 1.0, 1.0, 1.0];
        let ymax = [nan, 1.0, -inf, 1.0, 1.0];
        let rct = Rct::new(&xmin, &ymin, &xmax, &ymax)?;
        let mut writer = WktWriter::new(VecExporter::new(rct.len()), WktWriteOptions::default());
        let out = read_rct(&rct, &mut writer, &ReadOptions::default())?;
        assert_eq!(
            out,
            vec![
                Some("POLYGON EMPTY".to_string()),
                Some("POLYGON EMPTY".to_string()),
                Some("POLYGON EMPTY".to_string()),
                Some("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))".to_string()),
                // Only one missing value: still drawn.
                Some("POLYGON ((NaN 0, 1 0, 1 1, NaN 1, NaN 0))".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn mismatched_lengths() {
        let err =
            Rct::new(&[0.0, 1.0], &[0.0, 1.0], &[1.0], &[1.0, 2.0]).expect_err("short column");
        assert!(matches!(err, WkError::MismatchedLength { expected: 2, got: 1 }));
    }

    #[test]
    fn abort_feature_skips_to_next_rectangle() -> Result<()> {
        let rct = Rct::new(&[0.0, 5.0], &[0.0, 5.0], &[1.0, 6.0], &[1.0, 6.0])?;
        let mut handler = EventLog::new().abort_on("coord 2", HandlerResult::AbortFeature);
        let events = read_rct(&rct, &mut handler, &ReadOptions::default())?;
        assert_eq!(handler.count("feature_end"), 2);
        assert_eq!(handler.count("ring_end"), 0);
        assert_eq!(events.last().map(String::as_str), Some("vector_end"));
        Ok(())
    }

    #[test]
    fn interrupt_is_polled() {
        let xs = vec![0.0; 10];
        let rct = Rct::new(&xs, &xs, &xs, &xs).expect("equal lengths");
        let options = ReadOptions {
            interrupt_interval: 4,
            ..ReadOptions::default().with_interrupt(|| true)
        };
        let mut handler = EventLog::new();
        let err = read_rct(&rct, &mut handler, &options).expect_err("interrupted");
        assert!(matches!(err, WkError::Cancelled { feature_id: 3 }));
        assert_eq!(handler.count("feature_end"), 3);
        assert_eq!(handler.count("vector_end"), 1);
    }
}
