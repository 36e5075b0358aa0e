//! PCM16 sample shaping between devices and room tracks.

/// Averages interleaved `channels` down to one channel. A trailing partial
/// frame is averaged over the samples it has.
pub fn downmix(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().copied().map(i32::from).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Nearest-sample rate conversion of a mono block.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }
    let out_len = (samples.len() as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    (0..out_len)
        .map(|i| {
            let src = (i as u64 * u64::from(from_rate) / u64::from(to_rate)) as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        assert_eq!(downmix(&[100, 300, -50, 50], 2), vec![200, 0]);
        assert_eq!(downmix(&[i16::MAX, i16::MAX], 2), vec![i16::MAX]);
        assert_eq!(downmix(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_downmix_keeps_partial_trailing_frame() {
        assert_eq!(downmix(&[10, 20, 30, 40, 90], 2), vec![15, 35, 90]);
    }

    #[test]
    fn test_resample_changes_length_by_rate() {
        let block: Vec<i16> = (0..480).collect();
        assert_eq!(resample(&block, 48_000, 44_100).len(), 441);
        assert_eq!(resample(&block, 48_000, 16_000).len(), 160);
        assert_eq!(resample(&block, 48_000, 16_000)[1], 3);
        assert_eq!(resample(&block, 48_000, 48_000), block);
    }

    #[test]
    fn test_resample_upsamples_by_repeating() {
        assert_eq!(resample(&[1, 2], 8_000, 16_000), vec![1, 1, 2, 2]);
        assert!(resample(&[], 8_000, 16_000).is_empty());
    }
}
