//! WAV renderer — turns stereo buffers into 16-bit PCM and WAV bytes.

use super::engine::{ChordGenerator, ChordRequest};
use super::mixer::StereoBuffer;

/// Chord length used by the one-shot WAV export, in milliseconds.
pub const EXPORT_DURATION_MS: f64 = 2000.0;

/// Interleave a stereo buffer as 16-bit PCM (L, R, L, R, ...), clamping to
/// [-1, 1] before scaling by 32767.
pub fn to_pcm_i16(buffer: &StereoBuffer) -> Vec<i16> {
    let to_i16 = |s: f64| (s.clamp(-1.0, 1.0) * 32767.0) as i16;
    buffer
        .left
        .iter()
        .zip(&buffer.right)
        .flat_map(|(&l, &r)| [to_i16(l), to_i16(r)])
        .collect()
}

/// Encode a stereo buffer as a 16-bit stereo WAV file.
pub fn render_wav(buffer: &StereoBuffer, sample_rate: u32) -> Vec<u8> {
    encode_wav(&to_pcm_i16(buffer), sample_rate, 2)
}

/// Render `request` for [`EXPORT_DURATION_MS`] and encode it as WAV.
pub fn export_chord_wav(generator: &ChordGenerator, request: &ChordRequest) -> Vec<u8> {
    let request = ChordRequest {
        duration_ms: EXPORT_DURATION_MS,
        ..request.clone()
    };
    let buffer = generator.generate_chord(&request);
    tracing::debug!(frames = buffer.frames(), "chord exported as WAV");
    render_wav(&buffer, generator.sample_rate)
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::engine::Note;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn pcm_is_interleaved_and_clamped() {
        let buffer = StereoBuffer {
            left: vec![0.0, 1.0, 2.0],
            right: vec![-1.0, 0.5, -3.0],
        };
        assert_eq!(to_pcm_i16(&buffer), vec![0, -32767, 32767, 16383, 32767, -32767]);
    }

    #[test]
    fn wav_header_valid() {
        let buffer = StereoBuffer::silence(100);
        let wav = render_wav(&buffer, 44100);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 24), 44100, "sample rate");
        assert_eq!(u32_at(&wav, 28), 44100 * 4, "byte rate");
        assert_eq!(u32_at(&wav, 40), 400, "data size");
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);
        assert_eq!(wav.len(), 44 + 400);
    }

    #[test]
    fn export_renders_two_seconds() {
        let generator = ChordGenerator::new();
        let request = ChordRequest::new(4, vec![Note::new("C"), Note::new("E"), Note::new("G")], 500.0);
        let wav = export_chord_wav(&generator, &request);
        // 2000 ms + 100 ms fade at 44.1 kHz, two 16-bit channels.
        assert_eq!(u32_at(&wav, 40) as usize, 92610 * 4);
        assert!(wav[44..].iter().any(|&b| b != 0));
    }
}
