//! rtl_tcp client: connects to a tuner server, issues the startup
//! configuration commands, and hands back a plain `TcpStream` to read
//! the raw I/Q byte stream from.

use std::io::{Read, Write};
use std::net::TcpStream;

use byteorder::{BigEndian, WriteBytesExt};

use scm_core::types::{Error, Result};

const DONGLE_MAGIC: &[u8; 4] = b"RTL0";
const HEADER_LEN: usize = 12;

const CMD_SET_FREQUENCY: u8 = 0x01;
const CMD_SET_SAMPLE_RATE: u8 = 0x02;
const CMD_SET_AGC_MODE: u8 = 0x08;
const CMD_SET_OFFSET_TUNING: u8 = 0x0A;

/// A connected, configured rtl_tcp sample source.
pub struct TunerClient {
    stream: TcpStream,
}

impl TunerClient {
    /// Connect to `addr`, read and validate the dongle info header, and
    /// issue the startup configuration commands: sample rate, center
    /// frequency, offset tuning, automatic gain.
    pub fn connect(addr: &str, sample_rate: u32, center_freq: u32) -> Result<Self> {
        let mut stream = TcpStream::connect(addr)
            .map_err(|e| Error::SourceProtocol(format!("connect to {addr}: {e}")))?;

        let mut header = [0u8; HEADER_LEN];
        stream
            .read_exact(&mut header)
            .map_err(|e| Error::SourceProtocol(format!("reading dongle header: {e}")))?;
        if &header[..4] != DONGLE_MAGIC {
            return Err(Error::SourceProtocol(format!(
                "unexpected dongle magic {:?}",
                &header[..4]
            )));
        }

        let mut client = TunerClient { stream };
        client.send_command(CMD_SET_SAMPLE_RATE, sample_rate)?;
        client.send_command(CMD_SET_FREQUENCY, center_freq)?;
        client.send_command(CMD_SET_OFFSET_TUNING, 1)?;
        client.send_command(CMD_SET_AGC_MODE, 1)?;
        Ok(client)
    }

    fn send_command(&mut self, cmd: u8, param: u32) -> Result<()> {
        let mut buf = Vec::with_capacity(5);
        buf.push(cmd);
        buf.write_u32::<BigEndian>(param)
            .expect("write to Vec cannot fail");
        self.stream
            .write_all(&buf)
            .map_err(|e| Error::SourceProtocol(format!("sending command {cmd:#x}: {e}")))
    }
}

impl Read for TunerClient {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_connect_rejects_bad_magic() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"NOPE12345678").unwrap();
            let mut discard = [0u8; 64];
            let _ = sock.read(&mut discard);
        });
        let err = TunerClient::connect(&addr, 2_048_000, 920_299_072).unwrap_err();
        assert!(matches!(err, Error::SourceProtocol(_)));
    }

    #[test]
    fn test_connect_sends_four_commands() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"RTL0\0\0\0\0\0\0\0\0").unwrap();
            let mut commands = [0u8; 20];
            sock.read_exact(&mut commands).unwrap();
            commands
        });
        let _client = TunerClient::connect(&addr, 2_048_000, 920_299_072).unwrap();
        let commands = handle.join().unwrap();
        assert_eq!(commands[0], CMD_SET_SAMPLE_RATE);
        assert_eq!(commands[5], CMD_SET_FREQUENCY);
        assert_eq!(commands[10], CMD_SET_OFFSET_TUNING);
        assert_eq!(commands[15], CMD_SET_AGC_MODE);
    }
}
