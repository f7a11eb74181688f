use std::net::IpAddr;

use crate::utils::error::AppError;

/// Marker that identifies a failed authentication attempt in the journal
pub const FAILURE_MARKER: &str = "Failed password";

/// The source address follows this token in a matching line
const SOURCE_KEYWORD: &str = "from";

/// Extracts the source address from failed-login journal lines.
#[derive(Debug, Default)]
pub struct AttemptParser;

impl AttemptParser {
    pub fn new() -> Self {
        Self
    }

    /// Returns `Ok(None)` for lines that do not denote a failed attempt.
    /// For matching lines, parses the token after "from" as an address;
    /// a missing or malformed token is a non-fatal parse error.
    pub fn parse(&self, line: &str) -> Result<Option<IpAddr>, AppError> {
        if !line.contains(FAILURE_MARKER) {
            return Ok(None);
        }

        let mut tokens = line.split(' ');
        while let Some(token) = tokens.next() {
            if token != SOURCE_KEYWORD {
                continue;
            }
            return match tokens.next() {
                Some(candidate) => candidate.parse::<IpAddr>().map(Some).map_err(|_| {
                    AppError::ParseError(format!(
                        "failed to parse '{}' as an IP address",
                        candidate
                    ))
                }),
                None => Err(AppError::ParseError(format!(
                    "no address token after '{}' in line '{}'",
                    SOURCE_KEYWORD, line
                ))),
            };
        }

        Err(AppError::ParseError(format!(
            "no source address found in line '{}'",
            line
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<IpAddr>, AppError> {
        AttemptParser::new().parse(line)
    }

    #[test]
    fn test_parses_failed_password_line() {
        let line = "Failed password for root from 10.0.0.5 port 48222 ssh2";
        let addr = parse(line).unwrap().unwrap();
        assert_eq!(addr, "10.0.0.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_parses_invalid_user_variant() {
        let line = "Failed password for invalid user admin from 192.168.1.77 port 2022 ssh2";
        let addr = parse(line).unwrap().unwrap();
        assert_eq!(addr, "192.168.1.77".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_parses_ipv6_address() {
        let line = "Failed password for root from 2001:db8::1 port 48222 ssh2";
        let addr = parse(line).unwrap().unwrap();
        assert_eq!(addr, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_skips_unrelated_lines() {
        assert!(parse("Accepted password for root from 10.0.0.5 port 22 ssh2")
            .unwrap()
            .is_none());
        assert!(parse("Server listening on 0.0.0.0 port 22").unwrap().is_none());
        assert!(parse("").unwrap().is_none());
    }

    #[test]
    fn test_missing_from_token_is_parse_error() {
        let err = parse("Failed password for root port 22 ssh2").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_trailing_from_is_parse_error() {
        let err = parse("Failed password for root from").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_malformed_address_is_parse_error() {
        let err = parse("Failed password for root from not-an-ip port 22").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
        assert!(!err.is_fatal());
    }
}
