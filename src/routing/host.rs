//! `Host:` header parsing.
//!
//! The header line is split on `:`. The first field is the header name, the
//! second the host, the optional third the port. Anything after the port is
//! ignored, so bracketed IPv6 literals are not supported.

use thiserror::Error;

use super::router::Target;

/// Port used when the header carries none.
pub const DEFAULT_PORT: u16 = 80;

/// Header line prefix located among the request headers (case-sensitive).
pub const HOST_PREFIX: &[u8] = b"Host: ";

/// Reasons a `Host:` line could not be turned into a target.
#[derive(Debug, Error)]
pub enum HostHeaderError {
    #[error("Host header is not valid UTF-8")]
    NotUtf8,

    #[error("Host header has no host segment")]
    MissingHost,

    #[error("Host header has an empty host")]
    EmptyHost,

    #[error("Host header port '{0}' is not a valid port")]
    InvalidPort(String),
}

/// Parse a raw `Host: <host>[:<port>]` line.
pub fn parse_host_header(line: &[u8]) -> Result<Target, HostHeaderError> {
    let line = std::str::from_utf8(line).map_err(|_| HostHeaderError::NotUtf8)?;
    let mut fields = line.split(':');
    let _name = fields.next();

    let host = fields.next().ok_or(HostHeaderError::MissingHost)?.trim();
    if host.is_empty() {
        return Err(HostHeaderError::EmptyHost);
    }

    let port = match fields.next() {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| HostHeaderError::InvalidPort(raw.trim().to_string()))?,
        None => DEFAULT_PORT,
    };

    Ok(Target::new(host, port))
}

/// Find the first header line starting with [`HOST_PREFIX`].
pub fn find_host_line(headers: &[u8]) -> Option<&[u8]> {
    headers
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .find(|line| line.starts_with(HOST_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_and_port() {
        let target = parse_host_header(b"Host: example.com:9090").unwrap();
        assert_eq!(target, Target::new("example.com", 9090));
    }

    #[test]
    fn host_without_port_defaults_to_80() {
        let target = parse_host_header(b"Host: example.com").unwrap();
        assert_eq!(target, Target::new("example.com", 80));
    }

    #[test]
    fn segments_are_trimmed() {
        let target = parse_host_header(b"Host:  example.com : 81 ").unwrap();
        assert_eq!(target, Target::new("example.com", 81));
    }

    #[test]
    fn malformed_lines() {
        assert!(matches!(parse_host_header(b""), Err(HostHeaderError::MissingHost)));
        assert!(matches!(parse_host_header(b"Host"), Err(HostHeaderError::MissingHost)));
        assert!(matches!(parse_host_header(b"Host: "), Err(HostHeaderError::EmptyHost)));
        assert!(matches!(
            parse_host_header(b"Host: example.com:http"),
            Err(HostHeaderError::InvalidPort(p)) if p == "http"
        ));
        assert!(matches!(
            parse_host_header(b"Host: example.com:70000"),
            Err(HostHeaderError::InvalidPort(_))
        ));
        assert!(matches!(
            parse_host_header(b"Host: \xff\xfe"),
            Err(HostHeaderError::NotUtf8)
        ));
    }

    #[test]
    fn finds_host_line_among_headers() {
        let headers = b"POST / HTTP/1.1\r\nContent-Type: application/json\r\nHost: a.test:81";
        assert_eq!(find_host_line(headers), Some(&b"Host: a.test:81"[..]));
    }

    #[test]
    fn host_prefix_is_case_sensitive() {
        assert_eq!(find_host_line(b"GET / HTTP/1.1\r\nhost: a.test"), None);
        assert_eq!(find_host_line(b"GET / HTTP/1.1\r\nHost:a.test"), None);
    }
}
