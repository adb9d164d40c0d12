//! Incremental parser for `multipart/x-mixed-replace` (MJPEG) bodies
//!
//! The live feed endpoint streams an endless sequence of parts:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! \r\n
//! <jpeg bytes>\r\n
//! --frame\r\n
//! ...
//! ```
//!
//! Chunks from the network are pushed in as they arrive and complete part
//! bodies come out. Parts with a `Content-Length` header are cut by length,
//! otherwise the body runs until the next delimiter.

use crate::constants::DEFAULT_STREAM_BOUNDARY;
use crate::error::ApiError;

/// Largest single part we are willing to buffer
pub const MAX_PART_BYTES: usize = 16 * 1024 * 1024;

const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekBoundary,
    Headers,
    Body(Option<usize>),
    Finished,
}

pub struct MjpegParser {
    /// `--boundary`
    delimiter: Vec<u8>,
    /// `\r\n--boundary`, terminates a body without Content-Length
    body_end: Vec<u8>,
    buf: Vec<u8>,
    state: State,
}

impl MjpegParser {
    pub fn new(boundary: &str) -> Self {
        let delimiter = format!("--{}", boundary).into_bytes();
        let mut body_end = b"\r\n".to_vec();
        body_end.extend_from_slice(&delimiter);
        Self {
            delimiter,
            body_end,
            buf: Vec::new(),
            state: State::SeekBoundary,
        }
    }

    /// Build a parser from the response `Content-Type` header, falling back to
    /// the server's default boundary when none is given.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let boundary = content_type
            .and_then(boundary_from_content_type)
            .unwrap_or_else(|| DEFAULT_STREAM_BOUNDARY.to_string());
        Self::new(&boundary)
    }

    /// True once the closing delimiter (`--boundary--`) has been seen.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Feed a chunk and collect every part body it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, ApiError> {
        if self.state == State::Finished {
            return Ok(Vec::new());
        }
        self.buf.extend_from_slice(chunk);

        let mut parts = Vec::new();
        loop {
            match self.state {
                State::Finished => {
                    self.buf.clear();
                    break;
                }
                State::SeekBoundary => {
                    let Some(pos) = find(&self.buf, &self.delimiter) else {
                        // Keep a tail long enough to complete a split delimiter
                        let keep = self.delimiter.len().saturating_sub(1);
                        if self.buf.len() > keep {
                            self.buf.drain(..self.buf.len() - keep);
                        }
                        break;
                    };
                    let after = pos + self.delimiter.len();
                    if self.buf.len() < after + 2 {
                        // Need two more bytes to tell a closing delimiter apart
                        break;
                    }
                    if &self.buf[after..after + 2] == b"--" {
                        self.state = State::Finished;
                        continue;
                    }
                    self.buf.drain(..after);
                    self.state = State::Headers;
                }
                State::Headers => {
                    let Some(pos) = find(&self.buf, HEADER_END) else {
                        self.check_size()?;
                        break;
                    };
                    let headers = String::from_utf8_lossy(&self.buf[..pos]).into_owned();
                    self.buf.drain(..pos + HEADER_END.len());
                    let len = content_length(&headers);
                    if let Some(n) = len {
                        if n > MAX_PART_BYTES {
                            return Err(ApiError::Stream(format!(
                                "part of {} bytes exceeds limit",
                                n
                            )));
                        }
                    }
                    self.state = State::Body(len);
                }
                State::Body(Some(n)) => {
                    if self.buf.len() < n {
                        break;
                    }
                    parts.push(self.buf.drain(..n).collect());
                    self.state = State::SeekBoundary;
                }
                State::Body(None) => {
                    let Some(pos) = find(&self.buf, &self.body_end) else {
                        self.check_size()?;
                        break;
                    };
                    parts.push(self.buf.drain(..pos).collect());
                    self.state = State::SeekBoundary;
                }
            }
        }

        Ok(parts)
    }

    fn check_size(&self) -> Result<(), ApiError> {
        if self.buf.len() > MAX_PART_BYTES {
            return Err(ApiError::Stream(format!(
                "no part boundary within {} bytes",
                MAX_PART_BYTES
            )));
        }
        Ok(())
    }
}

/// Extract the `boundary` parameter of a multipart Content-Type.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(body: &[u8]) -> Vec<u8> {
        let mut out = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n");
        out
    }

    #[test]
    fn body_is_emitted_once_next_delimiter_arrives() {
        let mut parser = MjpegParser::new("frame");
        let mut stream = part(b"first");
        stream.extend(part(b"second"));

        let parts = parser.push(&stream).unwrap();
        // The second body has no trailing delimiter yet
        assert_eq!(parts, vec![b"first".to_vec()]);

        let parts = parser.push(b"--frame\r\n").unwrap();
        assert_eq!(parts, vec![b"second".to_vec()]);
    }

    #[test]
    fn split_chunks_produce_same_frames() {
        let mut stream = Vec::new();
        for body in [&b"\xff\xd8one\xff\xd9"[..], b"\xff\xd8two\xff\xd9", b"three"] {
            stream.extend(part(body));
        }
        stream.extend_from_slice(b"--frame--\r\n");

        let mut whole = MjpegParser::new("frame");
        let expected = whole.push(&stream).unwrap();
        assert_eq!(expected.len(), 3);
        assert!(whole.is_finished());

        for chunk_size in [1, 2, 3, 7, 13] {
            let mut parser = MjpegParser::new("frame");
            let mut got = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                got.extend(parser.push(chunk).unwrap());
            }
            assert_eq!(got, expected, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn content_length_allows_delimiter_bytes_in_body() {
        let body = b"abc\r\n--frame\r\nxyz";
        let mut stream = format!(
            "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        stream.extend_from_slice(body);
        stream.extend_from_slice(b"\r\n--frame\r\n");

        let mut parser = MjpegParser::new("frame");
        let parts = parser.push(&stream).unwrap();
        assert_eq!(parts, vec![body.to_vec()]);
    }

    #[test]
    fn preamble_before_first_delimiter_is_skipped() {
        let mut stream = b"garbage preamble\r\n".to_vec();
        stream.extend(part(b"img"));
        stream.extend_from_slice(b"--frame\r\n");

        let mut parser = MjpegParser::new("frame");
        assert_eq!(parser.push(&stream).unwrap(), vec![b"img".to_vec()]);
    }

    #[test]
    fn nothing_is_emitted_after_closing_delimiter() {
        let mut parser = MjpegParser::new("frame");
        parser.push(b"--frame--\r\n").unwrap();
        assert!(parser.is_finished());
        assert!(parser.push(&part(b"late")).unwrap().is_empty());
    }

    #[test]
    fn oversized_content_length_is_rejected() {
        let header = format!(
            "--frame\r\nContent-Length: {}\r\n\r\n",
            MAX_PART_BYTES + 1
        );
        let mut parser = MjpegParser::new("frame");
        assert!(matches!(
            parser.push(header.as_bytes()),
            Err(ApiError::Stream(_))
        ));
    }

    #[test]
    fn boundary_parsing() {
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace; boundary=frame").as_deref(),
            Some("frame")
        );
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace;Boundary=\"my cam\"").as_deref(),
            Some("my cam")
        );
        assert_eq!(boundary_from_content_type("image/jpeg"), None);

        let parser = MjpegParser::from_content_type(None);
        assert_eq!(parser.delimiter, b"--frame");
    }
}
