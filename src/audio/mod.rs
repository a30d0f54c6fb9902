pub mod artifact;
pub mod decode;
pub mod pcm;

pub use artifact::{CodecTag, EncodedAudio};
pub use decode::decode_to_pcm;
pub use pcm::{PcmBuffer, TARGET_SAMPLE_RATE};
