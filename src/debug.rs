use std::io::Write;

use crate::error::Result;
use crate::handler::{Handler, HandlerResult};
use crate::types::{Coord, GeometryMeta, PART_ID_NONE, VectorMeta};

/// Handler that prints every event as an indented line, for inspecting what
/// a producer emits.
///
/// ```
/// use wkstream::{DebugHandler, ReadOptions, VecProvider, read_wkt};
///
/// let mut provider = VecProvider::new(vec![Some("POINT (1 2)"), None]);
/// let mut handler = DebugHandler::new(Vec::new());
/// read_wkt(&mut provider, &mut handler, &ReadOptions::default()).unwrap();
/// let text = String::from_utf8(handler.into_inner()).unwrap();
/// assert!(text.contains("    coord 0: (1 2)"));
/// assert!(text.contains("    <null>"));
/// ```
pub struct DebugHandler<W> {
    out: W,
    depth: usize,
    has_geometry: bool,
}

impl<W: Write> DebugHandler<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            depth: 0,
            has_geometry: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) -> Result<HandlerResult> {
        writeln!(self.out, "{:indent$}{text}", "", indent = self.depth * 2)?;
        Ok(HandlerResult::Continue)
    }
}

fn describe_size<T: std::fmt::Display>(size: Option<T>) -> String {
    size.map_or("unknown".to_string(), |s| s.to_string())
}

fn describe_part(part_id: u32) -> String {
    if part_id == PART_ID_NONE {
        String::new()
    } else {
        format!(" part {part_id}")
    }
}

impl<W: Write> Handler for DebugHandler<W> {
    type Output = ();

    fn vector_start(&mut self, meta: &VectorMeta) -> Result<HandlerResult> {
        let size = describe_size(meta.size);
        let result = self.line(format_args!("vector_start ({size} features)"));
        self.depth += 1;
        result
    }

    fn feature_start(&mut self, _meta: &VectorMeta, feature_id: usize) -> Result<HandlerResult> {
        self.has_geometry = false;
        let result = self.line(format_args!("feature_start {feature_id}"));
        self.depth += 1;
        result
    }

    fn geometry_start(&mut self, meta: &GeometryMeta, part_id: u32) -> Result<HandlerResult> {
        self.has_geometry = true;
        let srid = meta.srid.map(|srid| format!(" srid={srid}")).unwrap_or_default();
        let result = self.line(format_args!(
            "geometry_start{} {} (size {}){srid}",
            describe_part(part_id),
            meta.geometry_type,
            describe_size(meta.size),
        ));
        self.depth += 1;
        result
    }

    fn ring_start(
        &mut self,
        _meta: &GeometryMeta,
        size: Option<u32>,
        ring_id: u32,
    ) -> Result<HandlerResult> {
        let result = self.line(format_args!("ring_start {ring_id} (size {})", describe_size(size)));
        self.depth += 1;
        result
    }

    fn coord(
        &mut self,
        _meta: &GeometryMeta,
        coord: &Coord,
        coord_id: u32,
    ) -> Result<HandlerResult> {
        let values = coord
            .ordinates()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.line(format_args!("coord {coord_id}: ({values})"))
    }

    fn ring_end(
        &mut self,
        _meta: &GeometryMeta,
        _size: Option<u32>,
        ring_id: u32,
    ) -> Result<HandlerResult> {
        self.depth = self.depth.saturating_sub(1);
        self.line(format_args!("ring_end {ring_id}"))
    }

    fn geometry_end(&mut self, meta: &GeometryMeta, part_id: u32) -> Result<HandlerResult> {
        self.depth = self.depth.saturating_sub(1);
        self.line(format_args!(
            "geometry_end{} {}",
            describe_part(part_id),
            meta.geometry_type
        ))
    }

    fn feature_end(&mut self, _meta: &VectorMeta, feature_id: usize) -> Result<HandlerResult> {
        if !self.has_geometry {
            self.line(format_args!("<null>"))?;
        }
        // Back to feature level, in case the feature was aborted part way.
        self.depth = 1;
        self.line(format_args!("feature_end {feature_id}"))
    }

    fn vector_end(&mut self, _meta: &VectorMeta) -> Result<()> {
        self.depth = 0;
        self.line(format_args!("vector_end"))?;
        self.out.flush()?;
        Ok(())
    }
}
