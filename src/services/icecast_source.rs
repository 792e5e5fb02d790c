//! Icecast source-client transport for the Streaming Engine (§4.E).
//!
//! Implements Icecast2's push-based source protocol directly over a
//! blocking `TcpStream`: one HTTP PUT request carrying `ice-*` headers,
//! followed by a continuous MP3 body. The write call blocks, which is the
//! literal mechanism behind the Engine's backpressure pacing — this
//! socket lives entirely inside the dedicated streaming thread (§5) and
//! is never touched from async code.

use crate::config::Config;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

pub struct IcecastSource {
    stream: TcpStream,
}

impl IcecastSource {
    /// Open the source connection and complete the PUT handshake,
    /// returning once Icecast has accepted the stream (first response
    /// line is `HTTP/1.x 2xx`).
    pub fn connect(config: &Config) -> std::io::Result<Self> {
        let addr = format!("{}:{}", config.icecast_host, config.icecast_port);
        let mut stream = TcpStream::connect(&addr)?;
        stream.set_write_timeout(Some(Duration::from_secs(10)))?;
        stream.set_read_timeout(Some(Duration::from_secs(10)))?;

        let auth = base64_basic(&config.icecast_user, &config.icecast_pass);
        let request = format!(
            "PUT {mount} HTTP/1.1\r\n\
             Host: {host}:{port}\r\n\
             Authorization: Basic {auth}\r\n\
             User-Agent: wvoid-radio\r\n\
             Content-Type: audio/mpeg\r\n\
             ice-name: WVOID-FM\r\n\
             ice-public: 0\r\n\
             Transfer-Encoding: chunked\r\n\
             Expect: 100-continue\r\n\
             \r\n",
            mount = config.icecast_mount,
            host = config.icecast_host,
            port = config.icecast_port,
        );
        stream.write_all(request.as_bytes())?;

        let mut reader = BufReader::new(stream.try_clone()?);
        let mut status_line = String::new();
        reader.read_line(&mut status_line)?;
        if !status_line.contains("200") && !status_line.contains("100") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("icecast rejected source connection: {}", status_line.trim()),
            ));
        }
        // Drain the rest of the header block, if any, before streaming.
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 || line == "\r\n" {
                break;
            }
        }

        Ok(Self { stream })
    }

    /// Push one already-encoded MP3 chunk. Blocks until the OS socket
    /// buffer accepts the bytes, which paces the encoder to roughly
    /// real-time since Icecast itself only drains at playback rate.
    pub fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        let header = format!("{:x}\r\n", data.len());
        self.stream.write_all(header.as_bytes())?;
        self.stream.write_all(data)?;
        self.stream.write_all(b"\r\n")?;
        Ok(())
    }

    pub fn close(mut self) -> std::io::Result<()> {
        self.stream.write_all(b"0\r\n\r\n")?;
        self.stream.flush()
    }
}

fn base64_basic(user: &str, pass: &str) -> String {
    use std::fmt::Write as _;
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let input = format!("{}:{}", user, pass);
    let bytes = input.as_bytes();
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let n = ((b0 as u32) << 16) | ((b1 as u32) << 8) | b2 as u32;
        let _ = write!(
            out,
            "{}{}{}{}",
            TABLE[(n >> 18 & 0x3F) as usize] as char,
            TABLE[(n >> 12 & 0x3F) as usize] as char,
            if chunk.len() > 1 { TABLE[(n >> 6 & 0x3F) as usize] as char } else { '=' },
            if chunk.len() > 2 { TABLE[(n & 0x3F) as usize] as char } else { '=' },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_matches_known_vector() {
        assert_eq!(base64_basic("source", "hackme"), "c291cmNlOmhhY2ttZQ==");
    }
}
