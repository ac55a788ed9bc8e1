use crate::error::Result;
use crate::handler::{Handler, HandlerResult};
use crate::options::Endianness;
use crate::types::{Coord, GeometryMeta, PART_ID_NONE, VectorMeta};

/// Records every event as a line of text.
#[derive(Default)]
pub(crate) struct EventLog {
    pub events: Vec<String>,
    pub deinitialized: usize,
    abort_on: Option<(String, HandlerResult)>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `result` from every event whose text starts with `prefix`.
    pub fn abort_on(mut self, prefix: &str, result: HandlerResult) -> Self {
        self.abort_on = Some((prefix.to_string(), result));
        self
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn push(&mut self, event: String) -> Result<HandlerResult> {
        let result = match &self.abort_on {
            Some((prefix, result)) if event.starts_with(prefix.as_str()) => *result,
            _ => HandlerResult::Continue,
        };
        self.events.push(event);
        Ok(result)
    }
}

fn describe(meta: &GeometryMeta, part_id: u32) -> String {
    let part = part_label(part_id);
    let size = meta.size.map_or("?".to_string(), |s| s.to_string());
    let mut text = format!("{} size={size} part={part}", meta.geometry_type);
    if let Some(srid) = meta.srid {
        text.push_str(&format!(" srid={srid}"));
    }
    text
}

fn part_label(part_id: u32) -> String {
    if part_id == PART_ID_NONE {
        "none".to_string()
    } else {
        part_id.to_string()
    }
}

/// Drop the `size=` fields, which differ between the counting and streaming readers.
pub(crate) fn without_sizes(events: &[String]) -> Vec<String> {
    events
        .iter()
        .map(|e| {
            e.split(' ')
                .filter(|word| !word.starts_with("size="))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

impl Handler for EventLog {
    type Output = Vec<String>;

    fn vector_start(&mut self, meta: &VectorMeta) -> Result<HandlerResult> {
        let size = meta.size.map_or("?".to_string(), |s| s.to_string());
        self.push(format!("vector_start size={size}"))
    }

    fn feature_start(&mut self, _meta: &VectorMeta, feature_id: usize) -> Result<HandlerResult> {
        self.push(format!("feature_start {feature_id}"))
    }

    fn geometry_start(&mut self, meta: &GeometryMeta, part_id: u32) -> Result<HandlerResult> {
        self.push(format!("geometry_start {}", describe(meta, part_id)))
    }

    fn ring_start(
        &mut self,
        _meta: &GeometryMeta,
        size: Option<u32>,
        ring_id: u32,
    ) -> Result<HandlerResult> {
        let size = size.map_or("?".to_string(), |s| s.to_string());
        self.push(format!("ring_start size={size} id={ring_id}"))
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
        self.push(format!("coord {coord_id}: {values}"))
    }

    fn ring_end(
        &mut self,
        _meta: &GeometryMeta,
        _size: Option<u32>,
        ring_id: u32,
    ) -> Result<HandlerResult> {
        self.push(format!("ring_end id={ring_id}"))
    }

    fn geometry_end(&mut self, meta: &GeometryMeta, part_id: u32) -> Result<HandlerResult> {
        self.push(format!(
            "geometry_end {} part={}",
            meta.geometry_type,
            part_label(part_id)
        ))
    }

    fn feature_end(&mut self, _meta: &VectorMeta, feature_id: usize) -> Result<HandlerResult> {
        self.push(format!("feature_end {feature_id}"))
    }

    fn vector_end(&mut self, _meta: &VectorMeta) -> Result<Vec<String>> {
        self.events.push("vector_end".to_string());
        Ok(self.events.clone())
    }

    fn deinitialize(&mut self) {
        self.deinitialized += 1;
    }
}

/// Encode a geometry with the `wkb` crate.
pub(crate) fn wkb_bytes<G: geo_traits::GeometryTrait<T = f64>>(geometry: &G) -> Vec<u8> {
    let mut buf = Vec::new();
    wkb::writer::write_geometry(&mut buf, geometry, &Default::default())
        .expect("geometry should encode");
    buf
}

/// Hand-assembled WKB, for type codes and byte orders the `wkb` crate does not write.
pub(crate) struct WkbBuilder {
    bytes: Vec<u8>,
    endianness: Endianness,
}

impl WkbBuilder {
    pub fn new(endianness: Endianness) -> Self {
        Self {
            bytes: Vec::new(),
            endianness,
        }
    }

    /// Byte order marker followed by the type code.
    pub fn header(mut self, code: u32) -> Self {
        self.bytes.push(self.endianness.to_byte());
        self.u32(code)
    }

    pub fn u32(mut self, value: u32) -> Self {
        let bytes = match self.endianness {
            Endianness::Big => value.to_be_bytes(),
            Endianness::Little => value.to_le_bytes(),
        };
        self.bytes.extend_from_slice(&bytes);
        self
    }

    pub fn f64s(mut self, values: &[f64]) -> Self {
        for value in values {
            let bytes = match self.endianness {
                Endianness::Big => value.to_be_bytes(),
                Endianness::Little => value.to_le_bytes(),
            };
            self.bytes.extend_from_slice(&bytes);
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Forwards every event to `inner`, answering `AbortFeature` from the
/// `feature_start` of feature `skip`.
pub(crate) struct SkipFeature<H> {
    pub inner: H,
    pub skip: usize,
}

impl<H: Handler> Handler for SkipFeature<H> {
    type Output = H::Output;

    fn vector_start(&mut self, meta: &VectorMeta) -> Result<HandlerResult> {
        self.inner.vector_start(meta)
    }

    fn feature_start(&mut self, meta: &VectorMeta, feature_id: usize) -> Result<HandlerResult> {
        let result = self.inner.feature_start(meta, feature_id)?;
        if feature_id == self.skip {
            Ok(HandlerResult::AbortFeature)
        } else {
            Ok(result)
        }
    }

    fn geometry_start(&mut self, meta: &GeometryMeta, part_id: u32) -> Result<HandlerResult> {
        self.inner.geometry_start(meta, part_id)
    }

    fn ring_start(
        &mut self,
        meta: &GeometryMeta,
        size: Option<u32>,
        ring_id: u32,
    ) -> Result<HandlerResult> {
        self.inner.ring_start(meta, size, ring_id)
    }

    fn coord(
        &mut self,
        meta: &GeometryMeta,
        coord: &Coord,
        coord_id: u32,
    ) -> Result<HandlerResult> {
        self.inner.coord(meta, coord, coord_id)
    }

    fn ring_end(
        &mut self,
        meta: &GeometryMeta,
        size: Option<u32>,
        ring_id: u32,
    ) -> Result<HandlerResult> {
        self.inner.ring_end(meta, size, ring_id)
    }

    fn geometry_end(&mut self, meta: &GeometryMeta, part_id: u32) -> Result<HandlerResult> {
        self.inner.geometry_end(meta, part_id)
    }

    fn feature_end(&mut self, meta: &VectorMeta, feature_id: usize) -> Result<HandlerResult> {
        self.inner.feature_end(meta, feature_id)
    }

    fn vector_end(&mut self, meta: &VectorMeta) -> Result<H::Output> {
        self.inner.vector_end(meta)
    }

    fn deinitialize(&mut self) {
        self.inner.deinitialize();
    }
}

/// Check that an `AbortFeature` answered at the first event starting with
/// `prefix` jumps straight to `feature_end 0`, and that feature 1 is read in full.
pub(crate) fn assert_first_feature_aborted_at(events: &[String], prefix: &str) {
    let at = events
        .iter()
        .position(|e| e.starts_with(prefix))
        .unwrap_or_else(|| panic!("no event starts with {prefix:?}: {events:?}"));
    assert_eq!(events[at + 1], "feature_end 0", "{events:?}");
    assert_eq!(events.iter().filter(|e| e.starts_with("feature_end 0")).count(), 1);
    let feature_1 = events
        .iter()
        .position(|e| e == "feature_start 1")
        .unwrap_or_else(|| panic!("feature 1 missing: {events:?}"));
    assert_eq!(events[feature_1 - 1], "feature_end 0");
    assert_eq!(events[events.len() - 2], "feature_end 1");
}
