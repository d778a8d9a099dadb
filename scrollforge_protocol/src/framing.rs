// Message framing for back-to-back JSON objects over TCP.
//
// The wire format has no length prefix and no delimiter: clients send UTF-8
// JSON objects one after another (`{...}{...}`), each carrying a `msg` field.
// The historical way to split this stream was to search for `}{` and repair
// the braces, which breaks the moment a string value contains a literal `}{`.
// `FrameBuffer` instead scans brace depth with full JSON string/escape
// awareness, so object boundaries are found unambiguously for any well-formed
// input while the observable wire behavior stays the same.
//
// An 8 KiB frame cap bounds allocation from misbehaving clients. An oversized
// object is consumed and discarded (the connection stays open and resyncs at
// the next boundary); bytes that cannot begin a JSON object at all are a
// fatal framing error, since there is no boundary left to resync on.

use std::io::{self, Write};

/// Maximum allowed size of a single wire message (8 KiB). Larger frames are
/// consumed and dropped without ever being handed to dispatch.
pub const MAX_MESSAGE_SIZE: usize = 8 * 1024;

/// Why a frame could not be produced.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    /// A complete object exceeded `MAX_MESSAGE_SIZE`; it was discarded and
    /// the stream is already resynced at the next object boundary.
    Oversized { len: usize },
    /// The stream does not start with a JSON object; no resync is possible.
    NotAnObject { byte: u8 },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Oversized { len } => {
                write!(f, "frame of {len} bytes exceeds the {MAX_MESSAGE_SIZE} byte cap")
            }
            FrameError::NotAnObject { byte } => {
                write!(f, "stream byte {byte:#04x} cannot begin a JSON object")
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Rolling inbound buffer that yields complete top-level JSON objects.
///
/// Feed raw socket bytes with `push`, then call `next_frame` until it returns
/// `Ok(None)`. Scan state is incremental: bytes are examined exactly once no
/// matter how they are split across reads.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    /// Scan cursor into `buf`. Everything before it has been classified.
    pos: usize,
    depth: u32,
    in_string: bool,
    escaped: bool,
    /// Whether the opening `{` of the current object has been seen.
    started: bool,
    /// Current object exceeded the cap; consume it without retaining bytes.
    discarding: bool,
    /// Total bytes of the current object scanned so far, including discarded.
    frame_len: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes received from the socket.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extract the next complete JSON object, if one is buffered.
    ///
    /// `Ok(None)` means more bytes are needed. `Err(Oversized)` reports one
    /// dropped frame; the buffer remains usable and later objects still
    /// arrive. `Err(NotAnObject)` is fatal for the connection.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        while self.pos < self.buf.len() {
            let byte = self.buf[self.pos];

            if !self.started {
                // Between objects: tolerate whitespace, demand `{`.
                match byte {
                    b' ' | b'\t' | b'\r' | b'\n' => {
                        self.buf.remove(0);
                        continue;
                    }
                    b'{' => {
                        self.started = true;
                        self.depth = 0;
                        self.frame_len = 0;
                    }
                    other => return Err(FrameError::NotAnObject { byte: other }),
                }
            }

            self.frame_len += 1;
            if self.frame_len > MAX_MESSAGE_SIZE {
                // Too big to ever deliver. Marked before the byte is
                // classified so a closing brace at the cap boundary still
                // reports the frame as oversized instead of delivering it.
                self.discarding = true;
            }
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else {
                    match byte {
                        b'\\' => self.escaped = true,
                        b'"' => self.in_string = false,
                        _ => {}
                    }
                }
            } else {
                match byte {
                    b'"' => self.in_string = true,
                    b'{' => self.depth += 1,
                    b'}' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            return self.finish_frame();
                        }
                    }
                    _ => {}
                }
            }

            self.pos += 1;

            if self.discarding {
                self.buf.drain(..self.pos);
                self.pos = 0;
            }
        }
        Ok(None)
    }

    /// Close out the object ending at `pos` and reset scan state.
    fn finish_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let end = self.pos + 1;
        let was_discarding = self.discarding;
        let len = self.frame_len;

        let frame = if was_discarding {
            self.buf.drain(..end);
            None
        } else {
            Some(self.buf.drain(..end).collect())
        };

        self.pos = 0;
        self.started = false;
        self.discarding = false;
        self.in_string = false;
        self.escaped = false;
        self.frame_len = 0;

        match frame {
            Some(bytes) => Ok(Some(bytes)),
            None => Err(FrameError::Oversized { len }),
        }
    }

    /// Number of buffered, not-yet-classified bytes. Exposed for tests.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Write one message's bytes to the wire. Objects abut with no delimiter;
/// the reader's brace scanner finds the boundary.
pub fn write_frame<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    if msg.len() > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {} bytes (max {MAX_MESSAGE_SIZE})", msg.len()),
        ));
    }
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_of(input: &[u8]) -> Vec<Vec<u8>> {
        let mut fb = FrameBuffer::new();
        fb.push(input);
        let mut out = Vec::new();
        while let Ok(Some(frame)) = fb.next_frame() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn single_object() {
        let frames = frames_of(br#"{"msg":"Ping"}"#);
        assert_eq!(frames, vec![br#"{"msg":"Ping"}"#.to_vec()]);
    }

    #[test]
    fn back_to_back_objects() {
        let frames = frames_of(br#"{"msg":"Ping"}{"msg":"Surrender"}"#);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], br#"{"msg":"Ping"}"#.to_vec());
        assert_eq!(frames[1], br#"{"msg":"Surrender"}"#.to_vec());
    }

    #[test]
    fn object_split_across_pushes() {
        let mut fb = FrameBuffer::new();
        fb.push(br#"{"msg":"Sign"#);
        assert_eq!(fb.next_frame().unwrap(), None);
        fb.push(br#"In","name":"ada"}"#);
        let frame = fb.next_frame().unwrap().unwrap();
        assert_eq!(frame, br#"{"msg":"SignIn","name":"ada"}"#.to_vec());
        assert_eq!(fb.next_frame().unwrap(), None);
    }

    #[test]
    fn brace_pair_inside_string_does_not_split() {
        // The literal `}{` inside the string value broke the historical
        // split-and-repair framer. The depth scanner must pass it through.
        let input = br#"{"msg":"SignIn","name":"}{evil"}{"msg":"Ping"}"#;
        let frames = frames_of(input);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], br#"{"msg":"SignIn","name":"}{evil"}"#.to_vec());
        assert_eq!(frames[1], br#"{"msg":"Ping"}"#.to_vec());
    }

    #[test]
    fn escaped_quote_inside_string() {
        let input = br#"{"msg":"SignIn","name":"a\"}{\"b"}{"msg":"Ping"}"#;
        let frames = frames_of(input);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], br#"{"msg":"Ping"}"#.to_vec());
    }

    #[test]
    fn nested_objects_count_depth() {
        let input = br#"{"msg":"PlayScroll","tile":{"color":"black","row":1,"col":2}}"#;
        let frames = frames_of(input);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], input.to_vec());
    }

    #[test]
    fn whitespace_between_objects_tolerated() {
        let frames = frames_of(b"{\"msg\":\"Ping\"} \r\n {\"msg\":\"Ping\"}");
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn oversized_object_discarded_stream_resyncs() {
        let mut fb = FrameBuffer::new();
        let big_name = "x".repeat(MAX_MESSAGE_SIZE);
        let big = format!(r#"{{"msg":"SignIn","name":"{big_name}"}}"#);
        fb.push(big.as_bytes());
        fb.push(br#"{"msg":"Ping"}"#);

        match fb.next_frame() {
            Err(FrameError::Oversized { len }) => assert!(len > MAX_MESSAGE_SIZE),
            other => panic!("expected Oversized, got {other:?}"),
        }
        // The following object still comes through.
        let frame = fb.next_frame().unwrap().unwrap();
        assert_eq!(frame, br#"{"msg":"Ping"}"#.to_vec());
        // Discarding released the oversized bytes.
        assert_eq!(fb.buffered(), 0);
    }

    /// A syntactically valid object padded to exactly `len` bytes.
    fn object_of_len(len: usize) -> Vec<u8> {
        let overhead = br#"{"msg":"SignIn","name":""}"#.len();
        let name = "x".repeat(len - overhead);
        format!(r#"{{"msg":"SignIn","name":"{name}"}}"#).into_bytes()
    }

    #[test]
    fn cap_boundary_is_exact() {
        let mut fb = FrameBuffer::new();
        fb.push(&object_of_len(MAX_MESSAGE_SIZE));
        let frame = fb.next_frame().unwrap().unwrap();
        assert_eq!(frame.len(), MAX_MESSAGE_SIZE);

        let mut fb = FrameBuffer::new();
        fb.push(&object_of_len(MAX_MESSAGE_SIZE + 1));
        fb.push(br#"{"msg":"Ping"}"#);
        match fb.next_frame() {
            Err(FrameError::Oversized { len }) => assert_eq!(len, MAX_MESSAGE_SIZE + 1),
            other => panic!("expected Oversized, got {other:?}"),
        }
        assert_eq!(fb.next_frame().unwrap().unwrap(), br#"{"msg":"Ping"}"#.to_vec());
    }

    #[test]
    fn non_object_bytes_are_fatal() {
        let mut fb = FrameBuffer::new();
        fb.push(b"GET / HTTP/1.1\r\n");
        match fb.next_frame() {
            Err(FrameError::NotAnObject { byte }) => assert_eq!(byte, b'G'),
            other => panic!("expected NotAnObject, got {other:?}"),
        }
    }

    #[test]
    fn write_frame_rejects_oversized() {
        let big = vec![b'x'; MAX_MESSAGE_SIZE + 1];
        let mut out = Vec::new();
        let err = write_frame(&mut out, &big).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn write_then_read_roundtrip() {
        let mut wire = Vec::new();
        write_frame(&mut wire, br#"{"msg":"Ping"}"#).unwrap();
        write_frame(&mut wire, br#"{"msg":"Surrender"}"#).unwrap();
        let frames = frames_of(&wire);
        assert_eq!(frames.len(), 2);
    }
}
