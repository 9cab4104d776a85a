// Noise pool - background clips mixed into items for noise augmentation
//
// The pool is loaded once per dataset from an index file listing one WAV
// path per line and is read-only afterwards, so a single instance can be
// shared by every worker. Sampling reads `target_length` samples cyclically
// from the chosen clip, starting at a fractional offset, and applies a gain.

use std::fs;
use std::path::{Path, PathBuf};

use crate::decoded::decode;
use crate::error::{ErrorCode, EtlError};

/// Source of additive noise segments
pub trait NoiseSource: Send + Sync {
    /// Number of clips available
    fn clip_count(&self) -> usize;

    /// Produce a noise segment of `target_length` samples
    ///
    /// Returns `Ok(None)` when no clips are configured. An index beyond the
    /// loaded clips is an error.
    fn sample(
        &self,
        clip_index: u32,
        offset_fraction: f32,
        gain: f32,
        target_length: usize,
    ) -> Result<Option<Vec<f32>>, EtlError>;
}

/// In-memory pool of mono noise clips
#[derive(Debug, Clone, Default)]
pub struct NoisePool {
    clips: Vec<Vec<f32>>,
}

impl NoisePool {
    /// Pool with no clips; sampling is a no-op
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a pool from already-decoded mono clips
    pub fn from_clips(clips: Vec<Vec<f32>>) -> Result<Self, EtlError> {
        if let Some(index) = clips.iter().position(|clip| clip.is_empty()) {
            return Err(EtlError::NoisePoolLoad {
                path: format!("clip #{}", index),
                reason: "noise clip contains no samples".to_string(),
            });
        }
        Ok(Self { clips })
    }

    /// Load the clips listed in `index_file`, or an empty pool for `None`
    ///
    /// Blank lines and lines starting with `#` are skipped. Relative paths
    /// are resolved against the index file's directory. An index file that
    /// lists no clips is an error.
    pub fn open(index_file: Option<&Path>) -> Result<Self, EtlError> {
        let Some(index_file) = index_file else {
            return Ok(Self::empty());
        };

        let contents = fs::read_to_string(index_file).map_err(|err| EtlError::NoisePoolLoad {
            path: index_file.display().to_string(),
            reason: err.to_string(),
        })?;
        let base = index_file.parent().unwrap_or_else(|| Path::new("."));

        let clips = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let path = PathBuf::from(line);
                let path = if path.is_relative() {
                    base.join(path)
                } else {
                    path
                };
                load_clip(&path)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if clips.is_empty() {
            return Err(EtlError::NoisePoolLoad {
                path: index_file.display().to_string(),
                reason: "index file lists no noise clips".to_string(),
            });
        }

        tracing::info!(
            "[NoisePool] Loaded {} noise clips from {:?}",
            clips.len(),
            index_file
        );
        Self::from_clips(clips)
    }

    pub fn clips(&self) -> &[Vec<f32>] {
        &self.clips
    }
}

impl NoiseSource for NoisePool {
    fn clip_count(&self) -> usize {
        self.clips.len()
    }

    fn sample(
        &self,
        clip_index: u32,
        offset_fraction: f32,
        gain: f32,
        target_length: usize,
    ) -> Result<Option<Vec<f32>>, EtlError> {
        if self.clips.is_empty() {
            return Ok(None);
        }

        let clip = self
            .clips
            .get(clip_index as usize)
            .ok_or(EtlError::NoiseClipOutOfRange {
                index: clip_index,
                available: self.clips.len(),
            })?;

        let offset =
            ((offset_fraction.clamp(0.0, 1.0) * clip.len() as f32) as usize) % clip.len();
        let segment = clip
            .iter()
            .cycle()
            .skip(offset)
            .take(target_length)
            .map(|&sample| sample * gain)
            .collect();

        Ok(Some(segment))
    }
}

fn load_clip(path: &Path) -> Result<Vec<f32>, EtlError> {
    let load_error = |reason: String| EtlError::NoisePoolLoad {
        path: path.display().to_string(),
        reason,
    };

    let bytes = fs::read(path).map_err(|err| load_error(err.to_string()))?;
    let decoded = decode(&bytes).map_err(|err| load_error(err.message()))?;

    // Downmix to mono
    let channels = decoded.num_channels() as f32;
    let mono: Vec<f32> = decoded
        .time_data()
        .rows()
        .into_iter()
        .map(|frame| frame.sum() / channels)
        .collect();

    if mono.is_empty() {
        return Err(load_error("noise clip contains no samples".to_string()));
    }
    Ok(mono)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pool() -> NoisePool {
        NoisePool::from_clips(vec![vec![1.0, 2.0, 3.0, 4.0], vec![-1.0; 3]]).unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("audio_etl_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_wav(path: &Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &sample in samples {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        fs::write(path, cursor.into_inner()).unwrap();
    }

    #[test]
    fn test_empty_pool_is_noop() {
        let pool = NoisePool::empty();
        assert_eq!(pool.clip_count(), 0);
        assert_eq!(pool.sample(5, 0.5, 1.0, 100).unwrap(), None);
    }

    #[test]
    fn test_sample_wraps_from_offset() {
        let segment = pool().sample(0, 0.5, 1.0, 6).unwrap().unwrap();
        assert_eq!(segment, vec![3.0, 4.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sample_applies_gain() {
        let segment = pool().sample(0, 0.0, 0.5, 3).unwrap().unwrap();
        assert_eq!(segment, vec![0.5, 1.0, 1.5]);

        let silent = pool().sample(1, 0.3, 0.0, 4).unwrap().unwrap();
        assert!(silent.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_full_offset_wraps_to_start() {
        let segment = pool().sample(0, 1.0, 1.0, 2).unwrap().unwrap();
        assert_eq!(segment, vec![1.0, 2.0]);
    }

    #[test]
    fn test_out_of_range_index_is_error() {
        let err = pool().sample(2, 0.0, 1.0, 4).unwrap_err();
        assert_eq!(
            err,
            EtlError::NoiseClipOutOfRange {
                index: 2,
                available: 2
            }
        );
    }

    #[test]
    fn test_rejects_empty_clip() {
        assert!(NoisePool::from_clips(vec![vec![0.1], vec![]]).is_err());
    }

    #[test]
    fn test_open_without_index_file() {
        let pool = NoisePool::open(None).unwrap();
        assert_eq!(pool.clip_count(), 0);
    }

    #[test]
    fn test_open_index_file() {
        let dir = temp_dir("noise_index");
        write_wav(&dir.join("hum.wav"), &[1000, -1000, 1000, -1000]);
        write_wav(&dir.join("hiss.wav"), &[50; 10]);
        let index = dir.join("noise_index.txt");
        fs::write(&index, "# background clips\nhum.wav\n\nhiss.wav\n").unwrap();

        let pool = NoisePool::open(Some(&index)).unwrap();
        assert_eq!(pool.clip_count(), 2);
        assert_eq!(pool.clips()[0].len(), 4);
        assert_eq!(pool.clips()[1].len(), 10);
        assert!(pool.clips()[0][0] > 0.0 && pool.clips()[0][1] < 0.0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_index_without_clips_is_error() {
        let dir = temp_dir("noise_no_clips");
        let index = dir.join("noise_index.txt");
        fs::write(&index, "# nothing here\n\n").unwrap();

        let err = NoisePool::open(Some(&index)).unwrap_err();
        assert!(matches!(
            err,
            EtlError::NoisePoolLoad { ref reason, .. } if reason.contains("no noise clips")
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_missing_clip_is_error() {
        let dir = temp_dir("noise_missing");
        let index = dir.join("noise_index.txt");
        fs::write(&index, "does_not_exist.wav\n").unwrap();

        assert!(matches!(
            NoisePool::open(Some(&index)),
            Err(EtlError::NoisePoolLoad { .. })
        ));

        let _ = fs::remove_dir_all(&dir);
    }
}
