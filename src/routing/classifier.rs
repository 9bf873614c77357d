//! Stream classification.
//!
//! Decides from the first chunk of client bytes whether the exchange is an
//! open-ended stream. Only the literal chunked transfer-encoding marker is
//! considered; a marker split across two reads is not detected.

/// Marker whose presence classifies an exchange as streaming.
pub const STREAMING_MARKER: &[u8] = b"Transfer-Encoding: chunked";

/// Returns true if `initial` contains [`STREAMING_MARKER`].
pub fn is_streaming(initial: &[u8]) -> bool {
    initial
        .windows(STREAMING_MARKER.len())
        .any(|window| window == STREAMING_MARKER)
}
