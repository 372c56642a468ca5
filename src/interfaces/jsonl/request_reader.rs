use crate::error::{BakeryError, Result};
use crate::interfaces::api::RequestLine;
use std::io::BufRead;

/// Reads API requests from a JSON-lines source, one request per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub struct RequestReader<R: BufRead> {
    reader: R,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(source: R) -> Self {
        Self { reader: source }
    }

    /// Lazily parses each line. A malformed line yields an error and does not
    /// stop the stream.
    pub fn requests(self) -> impl Iterator<Item = Result<RequestLine>> {
        self.reader.lines().filter_map(|line| match line {
            Err(e) => Some(Err(BakeryError::from(e))),
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    None
                } else {
                    Some(serde_json::from_str(line).map_err(|e| {
                        BakeryError::ValidationError(format!("malformed request: {e}"))
                    }))
                }
            }
        })
    }
}
