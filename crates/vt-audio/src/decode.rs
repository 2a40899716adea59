use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

/// Recordings below this rate are analysed but flagged in the log.
pub const RECOMMENDED_SAMPLE_RATE: u32 = 44_100;

/// Mono PCM decoded from a file.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    /// Mono samples, f32 in [-1, 1].
    pub samples: Vec<f32>,
    /// Native sample rate (no resampling).
    pub sample_rate: u32,
    /// Channel count of the source before downmix.
    pub channels: usize,
}

impl DecodedAudio {
    /// Length in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode an audio file into mono f32 samples at its native rate.
///
/// Supports WAV, MP3, FLAC, OGG via symphonia. Jitter and shimmer need the
/// full sample resolution, so nothing is decimated.
///
/// # Errors
/// Returns an error if the file cannot be opened, recognised as audio, or yields no samples.
///
/// # Example
/// ```no_run
/// use vt_audio::decode::decode_file;
/// let audio = decode_file("baseline/vowel.wav").unwrap();
/// println!("{} samples @ {}Hz", audio.samples.len(), audio.sample_rate);
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedAudio, AudioError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut format = detected.format;
    let track = format.default_track().ok_or(AudioError::NoAudioTrack)?;

    let sample_rate = declared_rate(track.codec_params.sample_rate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let track_id = track.id;
    let mut all_samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;
    let mut last_error: Option<String> = None;
    let mut channels: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Audio decode packet error in {}: {e}", path.display());
                last_error = Some(e.to_string());
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Audio decode frame error in {}: {e}", path.display());
                last_error = Some(e.to_string());
                continue;
            }
        };

        let signal_spec = *decoded.spec();
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, signal_spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        channels = signal_spec.channels.count().max(1);

        // Downmix to mono
        for chunk in buf.samples().chunks(channels) {
            all_samples.push(chunk.iter().sum::<f32>() / channels as f32);
        }
    }

    if all_samples.is_empty() {
        return Err(match last_error {
            Some(msg) => AudioError::DecodeError(msg),
            None => AudioError::Empty,
        });
    }

    if sample_rate < RECOMMENDED_SAMPLE_RATE {
        log::warn!(
            "{} is sampled at {sample_rate}Hz, below the recommended {RECOMMENDED_SAMPLE_RATE}Hz",
            path.display()
        );
    }

    log::info!(
        "Decoded {} samples @ {}Hz ({} ch) from {}",
        all_samples.len(),
        sample_rate,
        channels,
        path.display()
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels,
    })
}

/// Stream rate as declared by the container; guessing would skew every F0.
fn declared_rate(rate: Option<u32>) -> Result<u32, AudioError> {
    match rate {
        Some(r) if r > 0 => Ok(r),
        _ => Err(AudioError::UnsupportedFormat(
            "stream does not declare a sample rate".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sine, write_interleaved, write_wav};

    #[test]
    fn decodes_pcm_wav_at_native_rate() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tone.wav");
        let samples = sine(220.0, 48_000, 0.5, 0.5);
        write_wav(&path, &samples, 48_000)?;

        let audio = decode_file(&path)?;
        assert_eq!(audio.sample_rate, 48_000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples.len(), samples.len());
        assert!((audio.duration_secs() - 0.5).abs() < 1e-6);
        let peak = audio.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.01, "peak {peak}");
        Ok(())
    }

    #[test]
    fn stereo_is_downmixed_with_decoded_channel_count() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("stereo.wav");
        // left 0.5, right -0.1 for 1000 frames
        let interleaved: Vec<f32> = (0..2000).map(|i| if i % 2 == 0 { 0.5 } else { -0.1 }).collect();
        write_interleaved(&path, &interleaved, 2, 44_100)?;

        let audio = decode_file(&path)?;
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.samples.len(), 1000);
        assert!(audio.samples.iter().all(|s| (s - 0.2).abs() < 1e-3));
        Ok(())
    }

    #[test]
    fn undeclared_sample_rate_is_rejected() {
        assert!(matches!(declared_rate(None), Err(AudioError::UnsupportedFormat(_))));
        assert!(matches!(declared_rate(Some(0)), Err(AudioError::UnsupportedFormat(_))));
        assert_eq!(declared_rate(Some(22_050)).ok(), Some(22_050));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            decode_file("/nonexistent/voice.wav"),
            Err(AudioError::Io(_))
        ));
    }

    #[test]
    fn garbage_is_unsupported() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"this is not a riff file at all")?;
        assert!(decode_file(&path).is_err());
        Ok(())
    }
}
