//! Relay wire messages
//!
//! Every byte sequence the server writes to clients is built here.

/// Sent to a client as soon as its connection is accepted. No newline.
pub const NICK_PROMPT: &[u8] = b"Type your nick: ";

/// Broadcast to every client when server-wide shutdown begins.
pub const SHUTDOWN_NOTICE: &[u8] = b"Server is going down...\n";

/// `<nickname> joined server.\n`
pub fn joined(nickname: &[u8]) -> Vec<u8> {
    announce(nickname, b" joined server.\n")
}

/// `<nickname> left server.\n`
pub fn left(nickname: &[u8]) -> Vec<u8> {
    announce(nickname, b" left server.\n")
}

/// `<nickname>: <data>` with `data` copied verbatim.
pub fn chat(nickname: &[u8], data: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(nickname.len() + 2 + data.len());
    msg.extend_from_slice(nickname);
    msg.extend_from_slice(b": ");
    msg.extend_from_slice(data);
    msg
}

fn announce(nickname: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(nickname.len() + suffix.len());
    msg.extend_from_slice(nickname);
    msg.extend_from_slice(suffix);
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcements() {
        assert_eq!(joined(b"bob"), b"bob joined server.\n");
        assert_eq!(left(b"bob"), b"bob left server.\n");
        assert_eq!(joined(b""), b" joined server.\n");
    }

    #[test]
    fn chat_keeps_raw_bytes() {
        assert_eq!(chat(b"bob", b"hello"), b"bob: hello");
        assert_eq!(chat(b"bob", b"a\nb\r\n\xff"), b"bob: a\nb\r\n\xff");
    }
}
