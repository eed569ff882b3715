//! µ-law ⇄ linear PCM transcoding (§4.1).
//!
//! `media_to_model` upsamples narrowband 8 kHz µ-law into wideband 16 kHz
//! linear PCM for the model leg. `model_to_media` downsamples the model's
//! 24 kHz linear PCM back to narrowband 8 kHz µ-law for the telephony leg.
//! Both are pure functions — no shared state, so each leg can call them
//! directly from its own task without synchronization.

use crate::error::GatewayError;

/// ITU-T G.711 µ-law bias, added to the linear magnitude before segment
/// lookup. Encode and decode share this constant so the codebook round-trips.
const BIAS: i32 = 0x84;

/// Linear magnitude ceiling before companding — keeps `magnitude + BIAS`
/// clamped within 15 bits before segment lookup.
const CLIP: i32 = 32_635;

/// Upper bound of each of the 8 µ-law segments, used to find the exponent.
const SEGMENT_END: [i32; 8] = [0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF, 0x1FFF, 0x3FFF, 0x7FFF];

fn ulaw_decode_sample(byte: u8) -> i16 {
    let inverted = !byte;
    let sign = inverted & 0x80;
    let exponent = ((inverted >> 4) & 0x07) as i32;
    let mantissa = (inverted & 0x0F) as i32;

    let mut sample = ((mantissa << 3) + BIAS) << exponent;
    sample -= BIAS;
    if sign != 0 {
        sample = -sample;
    }
    sample as i16
}

fn ulaw_encode_sample(pcm: i16) -> u8 {
    // INT16_MIN has no positive counterpart; treat it as INT16_MAX before
    // taking the magnitude so the negation below never overflows.
    let pcm = if pcm == i16::MIN { i16::MAX } else { pcm };

    let sign: i32 = if pcm < 0 { 0x80 } else { 0x00 };
    let mut magnitude = (pcm as i32).abs();
    if magnitude > CLIP {
        magnitude = CLIP;
    }
    magnitude += BIAS;

    let exponent = SEGMENT_END
        .iter()
        .position(|&end| magnitude <= end)
        .unwrap_or(7) as i32;
    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;

    !((sign | (exponent << 4) | mantissa) as u8)
}

fn pcm_bytes_to_samples(bytes: &[u8]) -> Result<Vec<i16>, GatewayError> {
    if bytes.is_empty() {
        return Err(GatewayError::InvalidFrame("empty PCM frame".into()));
    }
    if bytes.len() % 2 != 0 {
        return Err(GatewayError::InvalidFrame(
            "PCM frame byte length is not a multiple of two".into(),
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

fn samples_to_pcm_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// 2x upsample by linear interpolation: the even output sample equals the
/// input sample; the odd output sample is the integer mean of successive
/// input samples. The final sample is held — no synthesized tail.
fn upsample_2x(samples: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for (i, &s) in samples.iter().enumerate() {
        out.push(s);
        let next = samples.get(i + 1).copied().unwrap_or(s);
        out.push(((s as i32 + next as i32) / 2) as i16);
    }
    out
}

/// 3:1 decimation using a uniform 3-tap box filter: the integer mean of
/// each non-overlapping window of three samples. A trailing partial window
/// averages whatever samples remain.
fn downsample_3to1(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks(3)
        .map(|window| {
            let sum: i32 = window.iter().map(|&s| s as i32).sum();
            (sum / window.len() as i32) as i16
        })
        .collect()
}

/// Narrowband µ-law @ 8 kHz → wideband linear PCM16 LE @ 16 kHz.
pub fn media_to_model(frame: &[u8]) -> Result<Vec<u8>, GatewayError> {
    if frame.is_empty() {
        return Err(GatewayError::InvalidFrame("empty µ-law frame".into()));
    }
    let samples: Vec<i16> = frame.iter().map(|&b| ulaw_decode_sample(b)).collect();
    Ok(samples_to_pcm_bytes(&upsample_2x(&samples)))
}

/// Wideband linear PCM16 LE @ 24 kHz → narrowband µ-law @ 8 kHz.
pub fn model_to_media(frame: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let samples = pcm_bytes_to_samples(frame)?;
    let decimated = downsample_3to1(&samples);
    Ok(decimated.into_iter().map(ulaw_encode_sample).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn media_to_model_rejects_empty_frame() {
        assert!(matches!(
            media_to_model(&[]),
            Err(GatewayError::InvalidFrame(_))
        ));
    }

    #[test]
    fn model_to_media_rejects_empty_frame() {
        assert!(matches!(
            model_to_media(&[]),
            Err(GatewayError::InvalidFrame(_))
        ));
    }

    #[test]
    fn model_to_media_rejects_odd_byte_length() {
        assert!(matches!(
            model_to_media(&[0x01, 0x02, 0x03]),
            Err(GatewayError::InvalidFrame(_))
        ));
    }

    #[test]
    fn media_to_model_doubles_sample_count() {
        let frame = vec![0xFFu8; 10];
        let out = media_to_model(&frame).unwrap();
        assert_eq!(out.len(), 10 * 2 * 2); // 2x samples, 2 bytes/sample
    }

    #[test]
    fn int16_min_encodes_without_overflow() {
        let byte = ulaw_encode_sample(i16::MIN);
        // Near-maximum-magnitude code: decoding it should be close to ±MAX.
        let decoded = ulaw_decode_sample(byte);
        assert!(decoded.unsigned_abs() as i32 > 30_000);
    }

    proptest! {
        /// µ-law is its own inverse code book: every byte round-trips
        /// through decode → encode back to itself.
        #[test]
        fn ulaw_byte_round_trips_through_decode_encode(byte: u8) {
            let decoded = ulaw_decode_sample(byte);
            let reencoded = ulaw_encode_sample(decoded);
            prop_assert_eq!(reencoded, byte);
        }

        /// mediaToModel on a decoded-then-reencoded µ-law input equals
        /// mediaToModel on the original, since the µ-law codebook is its
        /// own inverse.
        #[test]
        fn media_to_model_stable_under_ulaw_reencode(frame in prop::collection::vec(any::<u8>(), 1..64)) {
            let reencoded: Vec<u8> = frame
                .iter()
                .map(|&b| ulaw_encode_sample(ulaw_decode_sample(b)))
                .collect();
            prop_assert_eq!(media_to_model(&frame).unwrap(), media_to_model(&reencoded).unwrap());
        }

        /// Round trip through both directions stays within a small RMS
        /// tolerance in µ-law code space — the resampling steps are lossy
        /// by construction, so exact bit-equality is not expected.
        #[test]
        fn round_trip_is_within_tolerance(frame in prop::collection::vec(any::<u8>(), 3..90)) {
            let widened = media_to_model(&frame).unwrap();
            let narrowed = model_to_media(&widened).unwrap();

            let original: Vec<i16> = frame.iter().map(|&b| ulaw_decode_sample(b)).collect();
            let roundtripped: Vec<i16> = narrowed.iter().map(|&b| ulaw_decode_sample(b)).collect();

            let n = original.len().min(roundtripped.len());
            prop_assume!(n > 0);
            let mse: f64 = (0..n)
                .map(|i| {
                    let d = original[i] as f64 - roundtripped[i] as f64;
                    d * d
                })
                .sum::<f64>() / n as f64;
            let rms = mse.sqrt();
            // Generous bound: two lossy resampling stages plus mismatched
            // decimation ratios can move the signal substantially; this
            // guards against gross corruption (wraparound, channel swap),
            // not perceptual fidelity.
            prop_assert!(rms < 20_000.0);
        }
    }
}
