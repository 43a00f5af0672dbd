//! Authenticated symmetric encryption layer (§4.6): wraps the (possibly
//! already-compressed) byte stream with ChaCha20-Poly1305, one random
//! 8-byte prefix per job followed by length-prefixed, independently-keyed
//! ciphertext frames. The key lives only in the request for the duration of
//! this write and is never logged or persisted.

use std::io::{self, Write};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use crate::error::{OutputError, SimResult};

use super::writer::Layer;

const KEY_LEN: usize = 32;
const FRAME_PLAINTEXT_SIZE: usize = 64 * 1024;

pub struct EncryptingWriter<W: Write + Send> {
    inner: W,
    cipher: ChaCha20Poly1305,
    prefix: [u8; 8],
    counter: u32,
    buffer: Vec<u8>,
    wrote_prefix: bool,
}

impl<W: Write + Send> EncryptingWriter<W> {
    fn new(inner: W, key: &[u8]) -> SimResult<Self> {
        if key.len() != KEY_LEN {
            return Err(OutputError::Encryption(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                key.len()
            ))
            .into());
        }
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
        let mut prefix = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut prefix);
        Ok(Self {
            inner,
            cipher,
            prefix,
            counter: 0,
            buffer: Vec::with_capacity(FRAME_PLAINTEXT_SIZE),
            wrote_prefix: false,
        })
    }

    fn encrypt_and_emit(&mut self, plaintext: &[u8]) -> io::Result<()> {
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes[..8].copy_from_slice(&self.prefix);
        nonce_bytes[8..].copy_from_slice(&self.counter.to_be_bytes());
        self.counter += 1;

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("encryption failed: {e}")))?;

        let len = ciphertext.len() as u32;
        self.inner.write_all(&len.to_be_bytes())?;
        self.inner.write_all(&ciphertext)
    }
}

impl<W: Write + Send> Write for EncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_prefix {
            self.inner.write_all(&self.prefix)?;
            self.wrote_prefix = true;
        }
        self.buffer.extend_from_slice(buf);
        while self.buffer.len() >= FRAME_PLAINTEXT_SIZE {
            let chunk: Vec<u8> = self.buffer.drain(..FRAME_PLAINTEXT_SIZE).collect();
            self.encrypt_and_emit(&chunk)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let chunk = std::mem::take(&mut self.buffer);
            self.encrypt_and_emit(&chunk)?;
        }
        self.inner.flush()
    }
}

impl<W: Write + Send + 'static> Layer for EncryptingWriter<W> {
    fn finish_layer(mut self: Box<Self>) -> io::Result<Box<dyn Write + Send>> {
        self.flush()?;
        Ok(Box::new(self.inner))
    }
}

pub fn wrap(inner: Box<dyn Layer>, key: &[u8]) -> SimResult<Box<dyn Layer>> {
    Ok(Box::new(EncryptingWriter::new(inner, key)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::writer::FileLayer;

    #[test]
    fn test_rejects_wrong_length_key() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.reopen().unwrap();
        let base: Box<dyn Layer> = Box::new(FileLayer(file));
        let err = wrap(base, b"too-short").unwrap_err();
        assert!(err.to_string().contains("encryption"));
    }

    #[test]
    fn test_round_trip_decrypts_to_original_plaintext() {
        let key = [7u8; KEY_LEN];
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.reopen().unwrap();
        let base: Box<dyn Layer> = Box::new(FileLayer(file));
        let mut enc = wrap(base, &key).unwrap();
        enc.write_all(b"synthetic casualty payload").unwrap();
        let remaining = enc.finish_layer().unwrap();
        drop(remaining);

        let mut raw = Vec::new();
        std::io::Read::read_to_end(&mut std::fs::File::open(tmp.path()).unwrap(), &mut raw).unwrap();

        let prefix: [u8; 8] = raw[0..8].try_into().unwrap();
        let len = u32::from_be_bytes(raw[8..12].try_into().unwrap()) as usize;
        let ciphertext = &raw[12..12 + len];

        let mut nonce_bytes = [0u8; 12];
        nonce_bytes[..8].copy_from_slice(&prefix);
        nonce_bytes[8..].copy_from_slice(&0u32.to_be_bytes());

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
            .unwrap();
        assert_eq!(plaintext, b"synthetic casualty payload");
    }
}
