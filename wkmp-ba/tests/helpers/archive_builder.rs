//! Archive Test Fixture Builder
//!
//! Generates short WAV recordings with hound and packs them, together with
//! arbitrary other members, into tar archives.

use std::io::Cursor;
use std::path::Path;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 0.1,
            sample_rate: 8000,
            channels: 1,
            frequency: 440.0,
        }
    }
}

/// Encode a sine tone as a complete WAV file in memory
pub fn wav_bytes(config: &AudioConfig) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

        for i in 0..total_samples {
            let t = i as f32 / config.sample_rate as f32;
            let sample = (0.3 * (2.0 * std::f32::consts::PI * config.frequency * t).sin()
                * i16::MAX as f32) as i16;
            for _ in 0..config.channels {
                writer.write_sample(sample).unwrap();
            }
        }

        writer.finalize().unwrap();
    }

    cursor.into_inner()
}

/// Tar archive under construction
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    members: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a valid WAV member with default audio settings
    pub fn wav(self, name: &str) -> Self {
        self.file(name, wav_bytes(&AudioConfig::default()))
    }

    /// Add a member with arbitrary content
    pub fn file(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.members.push((name.to_string(), data.into()));
        self
    }

    /// Write the archive to `path`, creating parent directories
    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }

        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(file);
        for (name, data) in &self.members {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_slice()).unwrap();
        }
        builder.finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_bytes_decodes() {
        let bytes = wav_bytes(&AudioConfig::default());
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.len(), 800);
    }
}
