//! Streaming gzip compression layer (§4.6): wraps the plaintext record
//! stream so frame boundaries align with the writer's flush points.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;

use super::writer::Layer;

impl<W: Write + Send + 'static> Layer for GzEncoder<W> {
    fn finish_layer(self: Box<Self>) -> io::Result<Box<dyn Write + Send>> {
        let inner = (*self).finish()?;
        Ok(Box::new(inner))
    }
}

pub fn wrap(inner: Box<dyn Layer>) -> Box<dyn Layer> {
    Box::new(GzEncoder::new(inner, Compression::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::writer::FileLayer;
    use std::io::Read;

    #[test]
    fn test_compressed_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.reopen().unwrap();
        let base: Box<dyn Layer> = Box::new(FileLayer(file));
        let mut gz = wrap(base);
        gz.write_all(b"hello casualty stream").unwrap();
        let inner = gz.finish_layer().unwrap();
        drop(inner);

        let mut compressed = Vec::new();
        std::fs::File::open(tmp.path())
            .unwrap()
            .read_to_end(&mut compressed)
            .unwrap();
        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello casualty stream");
    }
}
