//! Nickname parsing
//!
//! Turns the raw bytes of a client's first read into its nickname.

/// Strips one trailing `\n` and, beneath it, one trailing `\r`.
///
/// Nothing else is trimmed; an empty read gives an empty nickname.
pub fn parse_nickname(raw: &[u8]) -> Vec<u8> {
    let mut nick = raw;
    if let Some(rest) = nick.strip_suffix(b"\n") {
        nick = rest;
        if let Some(rest) = nick.strip_suffix(b"\r") {
            nick = rest;
        }
    }
    nick.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_crlf_and_lf() {
        assert_eq!(parse_nickname(b"bob\r\n"), b"bob");
        assert_eq!(parse_nickname(b"bob\n"), b"bob");
    }

    #[test]
    fn lone_carriage_return_is_kept() {
        assert_eq!(parse_nickname(b"bob\r"), b"bob\r");
    }

    #[test]
    fn only_one_newline_is_stripped() {
        assert_eq!(parse_nickname(b"bob\n\n"), b"bob\n");
        assert_eq!(parse_nickname(b" bob \n"), b" bob ");
    }

    #[test]
    fn empty_input_gives_empty_nickname() {
        assert_eq!(parse_nickname(b""), b"");
        assert_eq!(parse_nickname(b"\r\n"), b"");
    }
}
