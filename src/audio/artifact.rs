use std::fmt;

use serde::{Deserialize, Serialize};

/// MIME-style codec tag reported by the capture device, e.g.
/// `audio/webm;codecs=opus` or `audio/wav;codecs=pcm_s16le;rate=48000`.
///
/// The tag travels with the recording so downstream stages never have to
/// guess what the device produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecTag {
    pub mime: String,
}

impl CodecTag {
    pub fn new(mime: impl Into<String>) -> Self {
        Self { mime: mime.into() }
    }

    /// The essence type without parameters, e.g. `audio/webm`.
    pub fn essence(&self) -> &str {
        self.mime.split(';').next().unwrap_or(&self.mime).trim()
    }

    /// Conventional file extension for the essence type, if known.
    pub fn extension(&self) -> Option<&'static str> {
        match self.essence() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
            "audio/webm" | "video/webm" => Some("webm"),
            "audio/ogg" | "application/ogg" => Some("ogg"),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some("m4a"),
            "audio/mpeg" | "audio/mp3" => Some("mp3"),
            "audio/flac" | "audio/x-flac" => Some("flac"),
            _ => None,
        }
    }
}

impl fmt::Display for CodecTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime)
    }
}

/// A finalized recording: immutable encoded bytes plus the codec tag the
/// device reported for them.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub codec: CodecTag,
}

impl EncodedAudio {
    pub fn new(bytes: Vec<u8>, codec: CodecTag) -> Self {
        Self { bytes, codec }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
