//! STOMP text frame codec.
//!
//! A frame on the wire is:
//!
//! ```text
//! COMMAND\n
//! key:value\n
//! key:value\n
//! \n
//! body\0
//! ```
//!
//! A payload made only of line terminators is a heartbeat. Both functions
//! are pure: [`encode`] cannot fail and [`decode`] reports malformed input
//! as `None` instead of an error so callers can drop it and carry on.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use super::Command;

// ============================================================================
// Constants
// ============================================================================

/// Frame terminator.
pub const TERMINATOR: char = '\0';

/// Heartbeat payload (a bare end-of-line).
pub const HEARTBEAT: &str = "\n";

/// Header names used by this client.
pub mod header {
    /// Protocol versions offered in CONNECT.
    pub const ACCEPT_VERSION: &str = "accept-version";
    /// Virtual host in CONNECT.
    pub const HOST: &str = "host";
    /// Login in CONNECT.
    pub const LOGIN: &str = "login";
    /// Passcode in CONNECT.
    pub const PASSCODE: &str = "passcode";
    /// Heart-beat intervals in CONNECT/CONNECTED.
    pub const HEART_BEAT: &str = "heart-beat";
    /// Negotiated version in CONNECTED.
    pub const VERSION: &str = "version";
    /// Broker identification in CONNECTED.
    pub const SERVER: &str = "server";
    /// Subscription id in SUBSCRIBE/UNSUBSCRIBE.
    pub const ID: &str = "id";
    /// Routing address in SEND/SUBSCRIBE/MESSAGE.
    pub const DESTINATION: &str = "destination";
    /// Acknowledgement mode in SUBSCRIBE.
    pub const ACK: &str = "ack";
    /// Body media type.
    pub const CONTENT_TYPE: &str = "content-type";
    /// Subscription id in MESSAGE.
    pub const SUBSCRIPTION: &str = "subscription";
    /// Human-readable fault in ERROR.
    pub const MESSAGE: &str = "message";
    /// Receipt request on client frames.
    pub const RECEIPT: &str = "receipt";
    /// Receipt confirmation in RECEIPT.
    pub const RECEIPT_ID: &str = "receipt-id";
}

// ============================================================================
// Frame
// ============================================================================

/// One protocol message: command, ordered headers, body.
///
/// Header keys are unique. Setting a key that already exists replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Command line, e.g. `MESSAGE`.
    pub command: String,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Body text, possibly empty.
    pub body: String,
}

impl Frame {
    /// Creates a frame with no headers and an empty body.
    #[inline]
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Adds or replaces a header.
    #[inline]
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Sets the body.
    #[inline]
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds or replaces a header in place.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Returns a header value.
    #[inline]
    #[must_use]
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the command if it is one this client knows.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<Command> {
        Command::parse(&self.command)
    }

    /// Encodes the frame to wire text.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(
            &self.command,
            self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            &self.body,
        )
    }
}

impl From<Command> for Frame {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for (k, v) in &self.headers {
            write!(f, " {k}:{v}")?;
        }
        write!(f, " ({} byte body)", self.body.len())
    }
}

// ============================================================================
// Decoded
// ============================================================================

/// Result of decoding one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Keepalive payload; carries nothing.
    Heartbeat,
    /// A complete frame.
    Frame(Frame),
}

// ============================================================================
// Codec
// ============================================================================

/// Encodes a frame to wire text.
///
/// Duplicate header keys collapse onto the first position with the last
/// value.
#[must_use]
pub fn encode<'a, I>(command: &str, headers: I, body: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut unique: Vec<(&str, &str)> = Vec::new();
    for (key, value) in headers {
        match unique.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => unique.push((key, value)),
        }
    }

    let header_len: usize = unique.iter().map(|(k, v)| k.len() + v.len() + 2).sum();
    let mut out = String::with_capacity(command.len() + header_len + body.len() + 3);

    out.push_str(command);
    out.push('\n');
    for (key, value) in unique {
        out.push_str(key);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(body);
    out.push(TERMINATOR);
    out
}

/// Decodes one inbound payload.
///
/// Returns `None` when the payload has no command line.
#[must_use]
pub fn decode(text: &str) -> Option<Decoded> {
    if is_heartbeat(text) {
        return Some(Decoded::Heartbeat);
    }

    let frame_text = match text.find(TERMINATOR) {
        Some(end) => &text[..end],
        None => text,
    };

    // Heartbeats may be glued in front of a frame
    let frame_text = frame_text.trim_start_matches(['\r', '\n']);

    let (command_line, rest) = frame_text.split_once('\n')?;
    let command = command_line.trim();
    if command.is_empty() {
        return None;
    }

    let (header_block, body) = split_header_block(rest);

    let mut frame = Frame::new(command);
    for line in header_block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || frame.get_header(key).is_some() {
            continue;
        }
        frame.headers.push((key.to_string(), value.trim().to_string()));
    }
    frame.body = body.to_string();

    Some(Decoded::Frame(frame))
}

/// Returns `true` if the payload is only line terminators.
#[inline]
fn is_heartbeat(text: &str) -> bool {
    text.contains('\n') && text.chars().all(|c| c == '\n' || c == '\r')
}

/// Splits at the first blank line into (headers, body).
fn split_header_block(rest: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.ends_with('\n') && line.trim_end_matches(['\r', '\n']).is_empty() {
            return (&rest[..offset], &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (rest, "")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn frame_of(text: &str) -> Frame {
        match decode(text) {
            Some(Decoded::Frame(frame)) => frame,
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_layout() {
        let wire = encode(
            "SEND",
            [("destination", "/queue/a"), ("content-type", "application/json")],
            "{}",
        );
        assert_eq!(
            wire,
            "SEND\ndestination:/queue/a\ncontent-type:application/json\n\n{}\0"
        );
    }

    #[test]
    fn test_encode_duplicate_header_last_wins() {
        let wire = encode("SEND", [("a", "1"), ("b", "2"), ("a", "3")], "");
        assert_eq!(wire, "SEND\na:3\nb:2\n\n\0");
    }

    #[test]
    fn test_encode_single_terminator() {
        let wire = Frame::new(Command::Disconnect).encode();
        assert_eq!(wire.matches(TERMINATOR).count(), 1);
        assert!(wire.ends_with(TERMINATOR));
    }

    #[test]
    fn test_frame_header_replaces_in_place() {
        let frame = Frame::new("SEND").header("a", "1").header("b", "2").header("a", "3");
        assert_eq!(
            frame.headers,
            vec![("a".into(), "3".into()), ("b".into(), "2".into())]
        );
    }

    #[test]
    fn test_decode_heartbeat() {
        assert_eq!(decode("\n"), Some(Decoded::Heartbeat));
        assert_eq!(decode("\r\n"), Some(Decoded::Heartbeat));
    }

    #[test]
    fn test_decode_message() {
        let frame = frame_of("MESSAGE\nsubscription:sub-0\ndestination:/t\n\n{\"battery\":42}\0");
        assert_eq!(frame.kind(), Some(Command::Message));
        assert_eq!(frame.get_header("subscription"), Some("sub-0"));
        assert_eq!(frame.get_header("destination"), Some("/t"));
        assert_eq!(frame.body, "{\"battery\":42}");
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let frame = frame_of("RECEIPT\nreceipt-id:77\n\n\0\n\nGARBAGE");
        assert_eq!(frame.get_header("receipt-id"), Some("77"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_decode_header_split_at_first_colon() {
        let frame = frame_of("ERROR\nmessage: bad: very bad \n\n\0");
        assert_eq!(frame.get_header("message"), Some("bad: very bad"));
    }

    #[test]
    fn test_decode_crlf_lines() {
        let frame = frame_of("CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0");
        assert_eq!(frame.command, "CONNECTED");
        assert_eq!(frame.get_header("version"), Some("1.2"));
        assert_eq!(frame.get_header("heart-beat"), Some("0,0"));
    }

    #[test]
    fn test_decode_leading_heartbeat() {
        let frame = frame_of("\nCONNECTED\nversion:1.2\n\n\0");
        assert_eq!(frame.command, "CONNECTED");
    }

    #[test]
    fn test_decode_without_blank_line() {
        let frame = frame_of("CONNECTED\nversion:1.2\n\0");
        assert_eq!(frame.get_header("version"), Some("1.2"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_decode_duplicate_header_first_wins() {
        let frame = frame_of("MESSAGE\na:1\na:2\n\n\0");
        assert_eq!(frame.get_header("a"), Some("1"));
        assert_eq!(frame.headers.len(), 1);
    }

    #[test]
    fn test_decode_body_keeps_blank_lines() {
        let frame = frame_of("SEND\na:1\n\nline1\n\nline2\0");
        assert_eq!(frame.body, "line1\n\nline2");
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(decode("MESSAGE\0"), None);
        assert_eq!(decode("garbage"), None);
        assert_eq!(decode(""), None);
        assert_eq!(decode("\0"), None);
        assert_eq!(decode("   \nheader:x\n\n\0"), None);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            command in "[A-Z]{1,12}",
            headers in prop::collection::btree_map(
                "[a-z][a-z-]{0,10}",
                "[A-Za-z0-9/._:-]{1,12}",
                0..6,
            ),
            body in "[ -~\n]{0,64}",
        ) {
            let wire = encode(
                &command,
                headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                &body,
            );
            let frame = frame_of(&wire);

            prop_assert_eq!(&frame.command, &command);
            prop_assert_eq!(&frame.body, &body);

            let mut decoded = frame.headers.clone();
            decoded.sort();
            let expected: Vec<(String, String)> = headers.into_iter().collect();
            prop_assert_eq!(decoded, expected);
        }
    }
}
