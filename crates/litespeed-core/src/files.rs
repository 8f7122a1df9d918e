//! File serving with single-range `Range` support.

use crate::handler::{HandlerError, HandlerResult};
use crate::mime::content_type_for_path;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Serves files from a root directory, honoring a single `bytes=` range.
///
/// Range handling: a well-formed `bytes=<start>-[<end>]` header yields a 206
/// with `Content-Range`; a start at or past the end of the file (or an
/// explicit end before the start) is unsatisfiable (416). Malformed and
/// multi-range headers are ignored and the full file is served with 200.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
}

impl FileServer {
    /// Create a server rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve `path` (relative to the root), optionally applying the raw
    /// `Range` header value.
    ///
    /// # Errors
    /// [`HandlerError::NotFound`] when the file is absent,
    /// [`HandlerError::RangeNotSatisfiable`] for an unsatisfiable range, and
    /// [`HandlerError::Io`] for other read failures.
    pub fn serve(&self, path: &str, range: Option<&str>) -> Result<HandlerResult, HandlerError> {
        let full = self.root.join(path.trim_start_matches('/'));
        let data = std::fs::read(&full).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                HandlerError::NotFound
            } else {
                HandlerError::Io(e)
            }
        })?;
        let content_type = content_type_for_path(&full);
        let total = data.len() as u64;

        if let Some((start, end)) = range.and_then(parse_range) {
            if start >= total {
                return Err(HandlerError::RangeNotSatisfiable { start, length: total });
            }
            let end = end.map_or(total - 1, |e| e.min(total - 1));
            if end < start {
                return Err(HandlerError::RangeNotSatisfiable { start, length: total });
            }
            let slice = data[start as usize..=end as usize].to_vec();
            return Ok(HandlerResult::Served {
                headers: vec![
                    ("content-type".to_string(), content_type.to_string()),
                    ("accept-ranges".to_string(), "bytes".to_string()),
                    (
                        "content-range".to_string(),
                        format!("bytes {start}-{end}/{total}"),
                    ),
                ],
                body: slice,
                status: 206,
            });
        }

        Ok(HandlerResult::Served {
            headers: vec![
                ("content-type".to_string(), content_type.to_string()),
                ("accept-ranges".to_string(), "bytes".to_string()),
            ],
            body: data,
            status: 200,
        })
    }
}

/// Parse a single-range `Range` header value. Returns `None` for anything
/// other than exactly `bytes=<start>-[<end>]`.
fn parse_range(header: &str) -> Option<(u64, Option<u64>)> {
    let spec = header.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end = end.trim();
    if end.is_empty() {
        Some((start, None))
    } else {
        Some((start, Some(end.parse().ok()?)))
    }
}
