// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Loading [Graphs](Graph) from plain-text files.
//!
//! Each line of a graph file is either empty, a `#` comment, or one of:
//!
//! ```text
//! node <id> <lat> <lon> [region]
//! edge <from> <to> [cost]
//! ```
//!
//! Edges may reference nodes declared later in the file. A missing region
//! defaults to zero, and a missing cost to the crow-flies distance between
//! the endpoints, in kilometers. Costs below that distance are raised to it.
//! Files may be compressed with gzip or bzip2.

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::str::FromStr;

use crate::distance::crow_flies_bound;
use crate::{node_distance, Edge, Graph, Node};

/// Format of the input graph file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    #[default]
    Unknown,

    /// Force uncompressed text
    Text,

    /// Force text with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    TextGz,

    /// Force text with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    TextBz2,
}

impl FileFormat {
    /// Guesses the format from the first few bytes of a file.
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&[0x1F, 0x8B]) {
            Self::TextGz
        } else if prefix.starts_with(b"BZh") {
            Self::TextBz2
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    #[error("line {line}: unknown node {id}")]
    UnknownNode { line: usize, id: i64 },
}

fn syntax(line: usize, reason: impl Into<String>) -> Error {
    Error::Syntax {
        line,
        reason: reason.into(),
    }
}

struct PendingEdge {
    line: usize,
    from: i64,
    to: i64,
    cost: Option<f32>,
}

fn field<T: FromStr>(line: usize, fields: &[&str], idx: usize, name: &str) -> Result<T, Error> {
    let raw = fields
        .get(idx)
        .ok_or_else(|| syntax(line, format!("missing {}", name)))?;
    raw.parse()
        .map_err(|_| syntax(line, format!("invalid {}: {:?}", name, raw)))
}

fn optional_field<T: FromStr>(line: usize, fields: &[&str], idx: usize, name: &str) -> Result<Option<T>, Error> {
    if idx < fields.len() {
        field(line, fields, idx, name).map(Some)
    } else {
        Ok(None)
    }
}

/// Smallest f32 which is not below `distance`, so that defaulted
/// edge costs never undercut the heuristic.
fn crow_flies_cost(distance: f64) -> f32 {
    let cost = distance as f32;
    if (cost as f64) < distance {
        f32::from_bits(cost.to_bits() + 1)
    } else {
        cost
    }
}

fn parse_text<R: BufRead>(g: &mut Graph, reader: R) -> Result<(), Error> {
    let mut edges = Vec::new();
    let mut nodes = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let content = line.split('#').next().unwrap_or_default();
        let fields = content.split_whitespace().collect::<Vec<_>>();

        match fields.first().copied() {
            None => {}

            Some("node") => {
                if fields.len() > 5 {
                    return Err(syntax(line_no, "too many fields"));
                }
                let node = Node {
                    id: field(line_no, &fields, 1, "node id")?,
                    lat: field(line_no, &fields, 2, "latitude")?,
                    lon: field(line_no, &fields, 3, "longitude")?,
                    region: optional_field(line_no, &fields, 4, "region")?.unwrap_or(0),
                };
                if !g.set_node(node) {
                    return Err(syntax(line_no, "node id must not be zero"));
                }
                nodes += 1;
            }

            Some("edge") => {
                if fields.len() > 4 {
                    return Err(syntax(line_no, "too many fields"));
                }
                let cost: Option<f32> = optional_field(line_no, &fields, 3, "cost")?;
                if cost.is_some_and(|c| !c.is_finite() || c < 0.0) {
                    return Err(syntax(line_no, "cost must be finite and non-negative"));
                }
                edges.push(PendingEdge {
                    line: line_no,
                    from: field(line_no, &fields, 1, "edge source")?,
                    to: field(line_no, &fields, 2, "edge target")?,
                    cost,
                });
            }

            Some(other) => return Err(syntax(line_no, format!("unknown record {:?}", other))),
        }
    }

    for e in &edges {
        let from = g
            .get_node(e.from)
            .ok_or(Error::UnknownNode { line: e.line, id: e.from })?;
        let to = g
            .get_node(e.to)
            .ok_or(Error::UnknownNode { line: e.line, id: e.to })?;
        let cost = match e.cost {
            Some(cost) if (cost as f64) < crow_flies_bound(&from, &to) => {
                let raised = crow_flies_cost(node_distance(&from, &to));
                log::warn!(
                    "line {}: cost {} of edge {} -> {} is below the crow-flies distance, using {}",
                    e.line,
                    cost,
                    e.from,
                    e.to,
                    raised,
                );
                raised
            }
            Some(cost) => cost,
            None => crow_flies_cost(node_distance(&from, &to)),
        };
        g.set_edge(e.from, Edge { to: e.to, cost });
    }

    log::debug!("loaded {} nodes and {} edges", nodes, edges.len());
    Ok(())
}

/// Parse a graph file from a reader into a [Graph].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn add_from_io<R: io::Read>(g: &mut Graph, format: FileFormat, reader: R) -> Result<(), Error> {
    let mut b = io::BufReader::new(reader);

    let format = match format {
        FileFormat::Unknown => {
            let detected = FileFormat::detect(b.fill_buf()?);
            log::trace!("detected graph file format: {:?}", detected);
            detected
        }
        other => other,
    };

    match format {
        FileFormat::Unknown | FileFormat::Text => parse_text(g, b),

        FileFormat::TextGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            parse_text(g, io::BufReader::new(d))
        }

        FileFormat::TextBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            parse_text(g, io::BufReader::new(d))
        }
    }
}

/// Parse a graph file at the provided path into a [Graph].
pub fn add_from_file<P: AsRef<Path>>(g: &mut Graph, format: FileFormat, path: P) -> Result<(), Error> {
    let f = File::open(path)?;
    add_from_io(g, format, f)
}

/// Parse a graph file from an in-memory buffer into a [Graph].
pub fn add_from_buffer(g: &mut Graph, format: FileFormat, data: &[u8]) -> Result<(), Error> {
    match format {
        FileFormat::Unknown => add_from_buffer(g, FileFormat::detect(data), data),
        // No need for extra buffering of in-memory text
        FileFormat::Text => parse_text(g, data),
        _ => add_from_io(g, format, io::Cursor::new(data)),
    }
}
