use crate::error::Result;
use crate::handler::{FeatureSource, Handler, HandlerResult, handle, run_features};
use crate::io::TextProvider;
use crate::options::ReadOptions;
use crate::types::{Coord, GeometryMeta, GeometryType, PART_ID_NONE, SimpleType, VectorMeta};

use super::tokenizer::{Token, Tokenizer};

/// Decode every WKT feature of `provider`, sending events to `handler`.
///
/// Sizes are counted ahead of each `geometry_start` and `ring_start`, so
/// consumers can preallocate.
pub fn read_wkt<P, H>(provider: &mut P, handler: &mut H, options: &ReadOptions) -> Result<H::Output>
where
    P: TextProvider,
    H: Handler,
{
    read_features(provider, handler, options, false)
}

/// Like [`read_wkt`], but makes a single forward pass per feature.
///
/// Sizes of non-empty geometries and rings are reported as unknown (`None`)
/// at the start events and filled in at the matching end events.
pub fn stream_wkt<P, H>(
    provider: &mut P,
    handler: &mut H,
    options: &ReadOptions,
) -> Result<H::Output>
where
    P: TextProvider,
    H: Handler,
{
    read_features(provider, handler, options, true)
}

fn read_features<P, H>(
    provider: &mut P,
    handler: &mut H,
    options: &ReadOptions,
    streaming: bool,
) -> Result<H::Output>
where
    P: TextProvider,
    H: Handler,
{
    let meta = VectorMeta::new(None, Some(provider.n_features()));
    let mut source = WktSource {
        provider,
        streaming,
        max_depth: options.max_depth,
    };
    run_features(&mut source, handler, &meta, options)
}

struct WktSource<'a, P> {
    provider: &'a mut P,
    streaming: bool,
    max_depth: usize,
}

impl<P: TextProvider> FeatureSource for WktSource<'_, P> {
    fn next_feature(&mut self) -> Result<bool> {
        self.provider.seek_next_feature()
    }

    fn feature_is_null(&self) -> bool {
        self.provider.feature_is_null()
    }

    fn emit_feature<H: Handler>(&mut self, handler: &mut H) -> Result<HandlerResult> {
        let mut parser = WktParser {
            tokens: Tokenizer::new(self.provider.feature_text()?),
            streaming: self.streaming,
            depth: 0,
            max_depth: self.max_depth,
        };
        parser.read_feature(handler)
    }
}

struct WktParser<'a> {
    tokens: Tokenizer<'a>,
    streaming: bool,
    depth: usize,
    max_depth: usize,
}

impl WktParser<'_> {
    fn read_feature<H: Handler>(&mut self, handler: &mut H) -> Result<HandlerResult> {
        let srid = self.read_srid()?;
        let result = self.read_tagged(handler, PART_ID_NONE, None, srid)?;
        if result == HandlerResult::Continue {
            let token = self.tokens.next_token()?;
            if token != Token::Eof {
                return Err(self.tokens.error(format!("unexpected trailing {token:?}")));
            }
        }
        Ok(result)
    }

    fn read_srid(&mut self) -> Result<Option<i32>> {
        if !self.tokens.peek()?.is_word("SRID") {
            return Ok(None);
        }
        self.tokens.next_token()?;
        self.expect(Token::Equals, "'='")?;
        let srid = match self.tokens.next_token()? {
            Token::Number(value) if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 => {
                value as i32
            }
            other => return Err(self.tokens.error(format!("invalid SRID {other:?}"))),
        };
        self.expect(Token::Semicolon, "';'")?;
        Ok(Some(srid))
    }

    /// A geometry that starts with its type keyword.
    fn read_tagged<H: Handler>(
        &mut self,
        handler: &mut H,
        part_id: u32,
        parent: Option<&GeometryType>,
        srid: Option<i32>,
    ) -> Result<HandlerResult> {
        let simple_type = match self.tokens.next_token()? {
            Token::Word(word) => SimpleType::from_keyword(word)
                .ok_or_else(|| self.tokens.error(format!("unknown geometry type '{word}'")))?,
            other => {
                return Err(self
                    .tokens
                    .error(format!("expected geometry type, found {other:?}")));
            }
        };

        let suffix = self.read_dims_suffix()?;
        let (has_z, has_m) = match (suffix, parent) {
            (Some(dims), Some(parent)) if dims != (parent.has_z, parent.has_m) => {
                return Err(self.tokens.error(format!(
                    "dimensions of {} differ from enclosing {parent}",
                    simple_type.keyword()
                )));
            }
            (Some(dims), _) => dims,
            (None, Some(parent)) => (parent.has_z, parent.has_m),
            (None, None) => self.infer_dims()?,
        };

        let geometry_type = GeometryType::new(simple_type)
            .with_dims(has_z, has_m)
            .with_srid(srid.is_some());
        self.read_body(handler, geometry_type, part_id, srid)
    }

    fn read_dims_suffix(&mut self) -> Result<Option<(bool, bool)>> {
        let token = self.tokens.peek()?;
        let dims = if token.is_word("Z") {
            (true, false)
        } else if token.is_word("M") {
            (false, true)
        } else if token.is_word("ZM") {
            (true, true)
        } else {
            return Ok(None);
        };
        self.tokens.next_token()?;
        Ok(Some(dims))
    }

    /// Dimensions implied by the first nested suffix, or else by the arity of
    /// the first coordinate ahead.
    fn infer_dims(&self) -> Result<(bool, bool)> {
        let mut ahead = self.tokens.clone();
        let mut arity = 0;
        loop {
            let token = ahead.next_token()?;
            if arity == 0 && token.is_word("Z") {
                return Ok((true, false));
            } else if arity == 0 && token.is_word("M") {
                return Ok((false, true));
            } else if arity == 0 && token.is_word("ZM") {
                return Ok((true, true));
            } else if token.as_number().is_some() {
                arity += 1;
            } else if arity > 0 || token == Token::Eof {
                break;
            }
        }
        match arity {
            0 | 2 => Ok((false, false)),
            3 => Ok((true, false)),
            4 => Ok((true, true)),
            _ => Err(self
                .tokens
                .error(format!("coordinates must have 2 to 4 values, found {arity}"))),
        }
    }

    /// The part after the keyword and suffix: `EMPTY` or a parenthesized body.
    fn read_body<H: Handler>(
        &mut self,
        handler: &mut H,
        geometry_type: GeometryType,
        part_id: u32,
        srid: Option<i32>,
    ) -> Result<HandlerResult> {
        if self.depth >= self.max_depth {
            return Err(self.tokens.error(format!(
                "geometry nested deeper than {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = self.read_nested_body(handler, geometry_type, part_id, srid);
        self.depth -= 1;
        result
    }

    fn read_nested_body<H: Handler>(
        &mut self,
        handler: &mut H,
        geometry_type: GeometryType,
        part_id: u32,
        srid: Option<i32>,
    ) -> Result<HandlerResult> {
        let mut meta = GeometryMeta::new(geometry_type, None);
        meta.srid = srid;

        if self.tokens.peek()?.is_word("EMPTY") {
            self.tokens.next_token()?;
            meta.size = Some(0);
            handle!(handler.geometry_start(&meta, part_id));
            return handler.geometry_end(&meta, part_id);
        }

        self.expect(Token::LeftParen, "'(' or EMPTY")?;
        if !self.streaming {
            meta.size = Some(self.count_items()?);
        }

        match geometry_type.simple_type {
            SimpleType::Point => self.read_point(handler, meta, part_id),
            SimpleType::LineString => self.read_line_string(handler, meta, part_id),
            SimpleType::Polygon => self.read_polygon(handler, meta, part_id),
            _ => self.read_collection(handler, meta, part_id),
        }
    }

    fn read_point<H: Handler>(
        &mut self,
        handler: &mut H,
        meta: GeometryMeta,
        part_id: u32,
    ) -> Result<HandlerResult> {
        handle!(handler.geometry_start(&meta, part_id));
        let coord = self.read_coord(&meta.geometry_type)?;
        handle!(handler.coord(&meta, &coord, 0));
        self.expect(Token::RightParen, "')'")?;
        let meta = GeometryMeta {
            size: Some(1),
            ..meta
        };
        handler.geometry_end(&meta, part_id)
    }

    fn read_line_string<H: Handler>(
        &mut self,
        handler: &mut H,
        mut meta: GeometryMeta,
        part_id: u32,
    ) -> Result<HandlerResult> {
        handle!(handler.geometry_start(&meta, part_id));
        let mut coord_id = 0;
        loop {
            let coord = self.read_coord(&meta.geometry_type)?;
            handle!(handler.coord(&meta, &coord, coord_id));
            coord_id += 1;
            if !self.read_separator()? {
                break;
            }
        }
        meta.size = Some(coord_id);
        handler.geometry_end(&meta, part_id)
    }

    fn read_polygon<H: Handler>(
        &mut self,
        handler: &mut H,
        mut meta: GeometryMeta,
        part_id: u32,
    ) -> Result<HandlerResult> {
        handle!(handler.geometry_start(&meta, part_id));
        let mut ring_id = 0;
        loop {
            if self.tokens.peek()?.is_word("EMPTY") {
                self.tokens.next_token()?;
                handle!(handler.ring_start(&meta, Some(0), ring_id));
                handle!(handler.ring_end(&meta, Some(0), ring_id));
                ring_id += 1;
                if !self.read_separator()? {
                    break;
                }
                continue;
            }

            self.expect(Token::LeftParen, "'(' or EMPTY")?;
            let size = if self.streaming {
                None
            } else {
                Some(self.count_items()?)
            };
            handle!(handler.ring_start(&meta, size, ring_id));

            let mut coord_id = 0;
            loop {
                let coord = self.read_coord(&meta.geometry_type)?;
                handle!(handler.coord(&meta, &coord, coord_id));
                coord_id += 1;
                if !self.read_separator()? {
                    break;
                }
            }
            handle!(handler.ring_end(&meta, Some(coord_id), ring_id));

            ring_id += 1;
            if !self.read_separator()? {
                break;
            }
        }
        meta.size = Some(ring_id);
        handler.geometry_end(&meta, part_id)
    }

    fn read_collection<H: Handler>(
        &mut self,
        handler: &mut H,
        mut meta: GeometryMeta,
        part_id: u32,
    ) -> Result<HandlerResult> {
        handle!(handler.geometry_start(&meta, part_id));
        let geometry_type = meta.geometry_type;
        let mut child_id = 0;
        loop {
            match geometry_type.simple_type.child_type() {
                None => {
                    handle!(self.read_tagged(handler, child_id, Some(&geometry_type), None));
                }
                Some(SimpleType::Point) if self.tokens.peek()?.as_number().is_some() => {
                    // MULTIPOINT (1 2, 3 4): points without their own parentheses.
                    let point = GeometryType::new(SimpleType::Point)
                        .with_dims(geometry_type.has_z, geometry_type.has_m);
                    let child = GeometryMeta::new(point, Some(1));
                    handle!(handler.geometry_start(&child, child_id));
                    let coord = self.read_coord(&child.geometry_type)?;
                    handle!(handler.coord(&child, &coord, 0));
                    handle!(handler.geometry_end(&child, child_id));
                }
                Some(child_type) => {
                    let child = GeometryType::new(child_type)
                        .with_dims(geometry_type.has_z, geometry_type.has_m);
                    handle!(self.read_body(handler, child, child_id, None));
                }
            }
            child_id += 1;
            if !self.read_separator()? {
                break;
            }
        }
        meta.size = Some(child_id);
        handler.geometry_end(&meta, part_id)
    }

    fn read_coord(&mut self, geometry_type: &GeometryType) -> Result<Coord> {
        let n_dims = geometry_type.n_dims();
        let mut values = [0.0; 4];
        for (i, value) in values.iter_mut().take(n_dims).enumerate() {
            let token = self.tokens.next_token()?;
            *value = token.as_number().ok_or_else(|| {
                if i >= 2 {
                    self.tokens.error(format!(
                        "{geometry_type} coordinates need {n_dims} values, found {i}"
                    ))
                } else {
                    self.tokens.error(format!("expected number, found {token:?}"))
                }
            })?;
        }
        if self.tokens.peek()?.as_number().is_some() {
            return Err(self.tokens.error(format!(
                "{geometry_type} coordinates need {n_dims} values, found more"
            )));
        }
        Ok(Coord::from_ordinates(
            &values[..n_dims],
            geometry_type.has_z,
            geometry_type.has_m,
        ))
    }

    /// Consume `,` (more items follow) or `)` (the list is closed).
    fn read_separator(&mut self) -> Result<bool> {
        match self.tokens.next_token()? {
            Token::Comma => Ok(true),
            Token::RightParen => Ok(false),
            Token::Eof => Err(self.tokens.error("unbalanced parentheses")),
            other => Err(self
                .tokens
                .error(format!("expected ',' or ')', found {other:?}"))),
        }
    }

    /// Number of comma-separated items before the `)` closing the current list.
    fn count_items(&self) -> Result<u32> {
        let mut ahead = self.tokens.clone();
        let mut depth = 0usize;
        let mut count = 1;
        if ahead.peek()? == Token::RightParen {
            return Err(ahead.error("empty parentheses; use EMPTY"));
        }
        loop {
            match ahead.next_token()? {
                Token::LeftParen => depth += 1,
                Token::RightParen if depth == 0 => return Ok(count),
                Token::RightParen => depth -= 1,
                Token::Comma if depth == 0 => count += 1,
                Token::Eof => return Err(ahead.error("unbalanced parentheses")),
                _ => {}
            }
        }
    }

    fn expect(&mut self, expected: Token<'_>, what: &str) -> Result<()> {
        let token = self.tokens.next_token()?;
        if token == expected {
            Ok(())
        } else if token == Token::Eof {
            Err(self.tokens.error(format!("expected {what}, found end of text")))
        } else {
            Err(self.tokens.error(format!("expected {what}, found {token:?}")))
        }
    }
}
