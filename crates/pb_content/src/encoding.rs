use std::io::{self, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::read::DecoderReader;
use base64::write::EncoderWriter;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::{ContentError, ContentRegistry};

/// Boxed single-pass byte source.
pub type BoxRead<'a> = Box<dyn Read + Send + 'a>;

/// Boxed writer chain.
pub type BoxWriter<'a> = Box<dyn EntityWriter + 'a>;

// -----------------------------------------------------------------------------
// EntityWriter

/// A [`Write`] that must be closed to flush trailing data.
///
/// Layered writers close themselves and then the writer they wrap, so
/// closing the outermost layer finishes the whole chain.
pub trait EntityWriter: Write {
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Terminates a writer chain over any plain [`Write`]; closing flushes.
#[derive(Debug)]
pub struct SinkWriter<W>(pub W);

impl<W: Write> Write for SinkWriter<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> EntityWriter for SinkWriter<W> {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

// -----------------------------------------------------------------------------
// Encoder

/// A named byte transformation, such as compression.
pub trait Encoder: Send + Sync + 'static {
    /// Wraps `source` so that reads yield decoded bytes.
    fn reader<'a>(&self, source: BoxRead<'a>) -> Result<BoxRead<'a>, ContentError>;

    /// Wraps `sink` so that written bytes are encoded before reaching it.
    fn writer<'a>(&self, sink: BoxWriter<'a>) -> Result<BoxWriter<'a>, ContentError>;
}

/// Gzip at best compression.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipEncoder;

struct GzipWriter<'a>(GzEncoder<BoxWriter<'a>>);

impl Write for GzipWriter<'_> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl EntityWriter for GzipWriter<'_> {
    fn close(self: Box<Self>) -> io::Result<()> {
        self.0.finish()?.close()
    }
}

impl Encoder for GzipEncoder {
    fn reader<'a>(&self, source: BoxRead<'a>) -> Result<BoxRead<'a>, ContentError> {
        Ok(Box::new(GzDecoder::new(source)))
    }

    fn writer<'a>(&self, sink: BoxWriter<'a>) -> Result<BoxWriter<'a>, ContentError> {
        Ok(Box::new(GzipWriter(GzEncoder::new(sink, Compression::best()))))
    }
}

/// Standard padded base64.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Encoder;

struct Base64Writer<'a>(EncoderWriter<'static, base64::engine::GeneralPurpose, BoxWriter<'a>>);

impl Write for Base64Writer<'_> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl EntityWriter for Base64Writer<'_> {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.0.finish()?.close()
    }
}

impl Encoder for Base64Encoder {
    fn reader<'a>(&self, source: BoxRead<'a>) -> Result<BoxRead<'a>, ContentError> {
        Ok(Box::new(DecoderReader::new(source, &STANDARD)))
    }

    fn writer<'a>(&self, sink: BoxWriter<'a>) -> Result<BoxWriter<'a>, ContentError> {
        Ok(Box::new(Base64Writer(EncoderWriter::new(sink, &STANDARD))))
    }
}

// -----------------------------------------------------------------------------
// Encoding

/// Ordered list of encoder names.
///
/// Writers and readers are both wrapped in list order, so the last encoder
/// is the outermost layer on either side and a chain always reads back what
/// it wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding(Vec<String>);

impl Encoding {
    #[inline]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses a comma separated header value such as `"gzip, base64"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pb_content::Encoding;
    ///
    /// let encoding = Encoding::parse("gzip, base64");
    /// assert_eq!(encoding.names(), ["gzip", "base64"]);
    /// assert!(Encoding::parse("").is_empty());
    /// ```
    pub fn parse(header: &str) -> Self {
        header
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn push(&mut self, name: impl Into<String>) {
        self.0.push(name.into());
    }

    /// Wraps `sink` with every encoder in the chain.
    pub fn writer<'a>(
        &self,
        registry: &ContentRegistry,
        sink: BoxWriter<'a>,
    ) -> Result<BoxWriter<'a>, ContentError> {
        self.0
            .iter()
            .try_fold(sink, |writer, name| registry.encoder(name)?.writer(writer))
    }

    /// Wraps `source` with every decoder in the chain.
    pub fn reader<'a>(
        &self,
        registry: &ContentRegistry,
        source: BoxRead<'a>,
    ) -> Result<BoxRead<'a>, ContentError> {
        self.0
            .iter()
            .try_fold(source, |reader, name| registry.encoder(name)?.reader(reader))
    }
}

impl<S: Into<String>> FromIterator<S> for Encoding {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl core::fmt::Display for Encoding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::{Encoding, SinkWriter};
    use crate::{ContentError, ContentRegistry};

    fn encode(encoding: &Encoding, data: &[u8]) -> Vec<u8> {
        let registry = ContentRegistry::default();
        let mut buffer = Vec::new();
        let mut writer = encoding
            .writer(&registry, Box::new(SinkWriter(&mut buffer)))
            .unwrap();
        writer.write_all(data).unwrap();
        writer.close().unwrap();
        buffer
    }

    fn decode(encoding: &Encoding, data: &[u8]) -> Vec<u8> {
        let registry = ContentRegistry::default();
        let mut reader = encoding.reader(&registry, Box::new(data)).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn gzip_round_trip() {
        let encoding = Encoding::from_iter(["gzip"]);
        let encoded = encode(&encoding, b"ABC");
        assert_ne!(encoded, b"ABC");
        assert_eq!(decode(&encoding, &encoded), b"ABC");
    }

    #[test]
    fn base64_writes_padded_text() {
        let encoding = Encoding::from_iter(["base64"]);
        assert_eq!(encode(&encoding, b"ABCD"), b"QUJDRA==");
        assert_eq!(decode(&encoding, b"QUJDRA=="), b"ABCD");
    }

    #[test]
    fn chained_round_trip() {
        let encoding = Encoding::from_iter(["gzip", "base64"]);
        let data = b"port binding payload".repeat(8);
        let encoded = encode(&encoding, &data);
        assert_eq!(decode(&encoding, &encoded), data);
    }

    #[test]
    fn unknown_encoder() {
        let registry = ContentRegistry::default();
        let encoding = Encoding::from_iter(["zstd"]);
        let err = encoding.reader(&registry, Box::new(&b""[..])).err();
        assert!(matches!(err, Some(ContentError::UnknownEncoder(name)) if name == "zstd"));
    }
}
