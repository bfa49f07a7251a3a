//! SMPTE timecode value type
//!
//! A [`Timecode`] is an hour:minute:second:frame position within one day.
//! It packs to and unpacks from the 64-bit LTC payload, and supports
//! frame arithmetic that wraps at 24 hours in both directions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::constants::LTC_FRAME_BITS;
use crate::error::TimecodeError;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Frame rate of an LTC stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameRate {
    /// 24 fps (film)
    #[serde(rename = "24")]
    Fps24,
    /// 25 fps (PAL)
    #[serde(rename = "25")]
    Fps25,
    /// 29.97 fps drop-frame (NTSC)
    #[serde(rename = "29.97df")]
    Fps2997Df,
    /// 30 fps
    #[default]
    #[serde(rename = "30")]
    Fps30,
}

impl FrameRate {
    /// Frame labels per timecode second (the frame field runs `0..nominal_fps`)
    pub fn nominal_fps(self) -> u32 {
        match self {
            FrameRate::Fps24 => 24,
            FrameRate::Fps25 => 25,
            FrameRate::Fps2997Df | FrameRate::Fps30 => 30,
        }
    }

    /// Actual frames per wall-clock second
    pub fn as_f64(self) -> f64 {
        match self {
            FrameRate::Fps2997Df => 30_000.0 / 1001.0,
            other => other.nominal_fps() as f64,
        }
    }

    /// Whether timecodes at this rate carry the drop-frame flag by default
    pub fn drop_frame(self) -> bool {
        matches!(self, FrameRate::Fps2997Df)
    }

    /// Number of distinct frame labels in one day
    pub fn frames_per_day(self) -> u32 {
        self.nominal_fps() * SECONDS_PER_DAY
    }

    /// Length of one LTC bit in samples at the given sample rate
    pub fn samples_per_bit(self, sample_rate: u32) -> f64 {
        sample_rate as f64 / (self.as_f64() * LTC_FRAME_BITS as f64)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRate::Fps24 => write!(f, "24"),
            FrameRate::Fps25 => write!(f, "25"),
            FrameRate::Fps2997Df => write!(f, "29.97df"),
            FrameRate::Fps30 => write!(f, "30"),
        }
    }
}

/// SMPTE timecode
///
/// Equality and ordering look at hours, minutes, seconds and frames only;
/// the drop-frame flag and the frame rate are carried along but not compared.
#[derive(Debug, Clone, Copy)]
pub struct Timecode {
    hours: u8,
    minutes: u8,
    seconds: u8,
    frames: u8,
    drop_frame: bool,
    frame_rate: FrameRate,
}

fn check_range(field: &'static str, value: u32, max: u32) -> Result<(), TimecodeError> {
    if value > max {
        return Err(TimecodeError::OutOfRange { field, value, max });
    }
    Ok(())
}

impl Timecode {
    /// Create a validated timecode. The drop-frame flag follows the frame rate.
    pub fn new(
        hours: u8,
        minutes: u8,
        seconds: u8,
        frames: u8,
        frame_rate: FrameRate,
    ) -> Result<Self, TimecodeError> {
        check_range("hours", hours as u32, 23)?;
        check_range("minutes", minutes as u32, 59)?;
        check_range("seconds", seconds as u32, 59)?;
        check_range("frames", frames as u32, frame_rate.nominal_fps() - 1)?;

        Ok(Self {
            hours,
            minutes,
            seconds,
            frames,
            drop_frame: frame_rate.drop_frame(),
            frame_rate,
        })
    }

    /// 00:00:00:00 at the given rate
    pub fn zero(frame_rate: FrameRate) -> Self {
        Self {
            hours: 0,
            minutes: 0,
            seconds: 0,
            frames: 0,
            drop_frame: frame_rate.drop_frame(),
            frame_rate,
        }
    }

    /// Override the drop-frame flag
    pub fn with_drop_frame(mut self, drop_frame: bool) -> Self {
        self.drop_frame = drop_frame;
        self
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn frames(&self) -> u8 {
        self.frames
    }

    pub fn drop_frame(&self) -> bool {
        self.drop_frame
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Unpack the 64 payload bits of an LTC frame.
    ///
    /// Each 16-bit group holds a BCD units digit in bits 0-3 and the tens
    /// digit from bit 8 up; bit 10 of the frame group is the drop-frame flag.
    /// Payloads whose digits fall outside the field ranges are rejected.
    pub fn unpack(payload: u64, frame_rate: FrameRate) -> Result<Self, TimecodeError> {
        let group = |index: u32| ((payload >> (index * 16)) & 0xFFFF) as u16;

        let digits = |name: &'static str, group: u16, tens_mask: u16| {
            let units = (group & 0xF) as u32;
            check_range(name, units, 9)?;
            Ok::<u32, TimecodeError>(units + ((group >> 8) & tens_mask) as u32 * 10)
        };

        let frames = digits("frame units", group(0), 0x3)?;
        let seconds = digits("second units", group(1), 0x7)?;
        let minutes = digits("minute units", group(2), 0x7)?;
        let hours = digits("hour units", group(3), 0x3)?;
        let drop_frame = (group(0) >> 10) & 1 == 1;

        // Each digit pair is at most 39 or 79, so the narrowing casts are lossless
        Ok(Self::new(hours as u8, minutes as u8, seconds as u8, frames as u8, frame_rate)?
            .with_drop_frame(drop_frame))
    }

    /// Pack into the 64 payload bits of an LTC frame (inverse of [`Timecode::unpack`])
    pub fn pack(&self) -> u64 {
        let bcd = |value: u8| u64::from(value % 10) | (u64::from(value / 10) << 8);

        let mut payload = bcd(self.frames)
            | (bcd(self.seconds) << 16)
            | (bcd(self.minutes) << 32)
            | (bcd(self.hours) << 48);
        if self.drop_frame {
            payload |= 1 << 10;
        }
        payload
    }

    /// Frames since midnight
    pub fn total_frames(&self) -> u32 {
        let fps = self.frame_rate.nominal_fps();
        ((self.hours as u32 * 60 + self.minutes as u32) * 60 + self.seconds as u32) * fps
            + self.frames as u32
    }

    /// Timecode seconds since midnight
    pub fn total_seconds(&self) -> f64 {
        self.total_frames() as f64 / self.frame_rate.nominal_fps() as f64
    }

    /// Signed frame difference `self - other`
    pub fn frames_since(&self, other: &Timecode) -> i64 {
        self.total_frames() as i64 - other.total_frames() as i64
    }

    /// Build from a frame count, wrapping into one day
    pub fn from_total_frames(total: u32, frame_rate: FrameRate) -> Self {
        let mut tc = Self::zero(frame_rate);
        tc.assign_total_frames(total);
        tc
    }

    /// Build from timecode seconds, wrapping into one day in both directions
    pub fn from_seconds(seconds: f64, frame_rate: FrameRate) -> Self {
        let fps = frame_rate.nominal_fps() as f64;
        // Nudge up so values produced by `total_seconds` land on their own frame
        let frames = (seconds * fps + 1e-6).floor() as i64;
        let total = frames.rem_euclid(frame_rate.frames_per_day() as i64);
        Self::from_total_frames(total as u32, frame_rate)
    }

    fn assign_total_frames(&mut self, total: u32) {
        let fps = self.frame_rate.nominal_fps();
        let total = total % self.frame_rate.frames_per_day();
        let seconds = total / fps;

        self.frames = (total % fps) as u8;
        self.seconds = (seconds % 60) as u8;
        self.minutes = (seconds / 60 % 60) as u8;
        self.hours = (seconds / 3600) as u8;
    }

    /// Advance by `frames`, carrying into seconds/minutes/hours and wrapping at 24h
    pub fn add_frames(&mut self, frames: u32) {
        let day = self.frame_rate.frames_per_day();
        let total = (self.total_frames() as u64 + (frames % day) as u64) % day as u64;
        self.assign_total_frames(total as u32);
    }

    /// Step back by `frames`, borrowing from seconds/minutes/hours and wrapping at 24h
    pub fn subtract_frames(&mut self, frames: u32) {
        let day = self.frame_rate.frames_per_day();
        let total = (self.total_frames() + day - frames % day) % day;
        self.assign_total_frames(total);
    }

    /// Back to 00:00:00:00, keeping rate and drop-frame flag
    pub fn reset(&mut self) {
        self.assign_total_frames(0);
    }

    /// Replace all four fields. Out-of-range values leave the timecode unchanged.
    pub fn set(
        &mut self,
        hours: u8,
        minutes: u8,
        seconds: u8,
        frames: u8,
    ) -> Result<(), TimecodeError> {
        let updated = Self::new(hours, minutes, seconds, frames, self.frame_rate)?;
        self.hours = updated.hours;
        self.minutes = updated.minutes;
        self.seconds = updated.seconds;
        self.frames = updated.frames;
        Ok(())
    }

    /// Parse `HH:MM:SS:FF`; `;` or `.` are accepted as separators and `;`
    /// marks the value as drop-frame.
    pub fn parse(input: &str, frame_rate: FrameRate) -> Result<Self, TimecodeError> {
        let input = input.trim();
        let fields: Vec<&str> = input.split([':', ';', '.']).collect();
        if fields.len() != 4 {
            return Err(TimecodeError::Parse(format!(
                "expected HH:MM:SS:FF, got {:?}",
                input
            )));
        }

        let mut values = [0u8; 4];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field
                .parse()
                .map_err(|_| TimecodeError::Parse(format!("invalid field {:?} in {:?}", field, input)))?;
        }

        let drop_frame = frame_rate.drop_frame() || input.contains(';');
        Ok(Self::new(values[0], values[1], values[2], values[3], frame_rate)?
            .with_drop_frame(drop_frame))
    }

    fn key(&self) -> (u8, u8, u8, u8) {
        (self.hours, self.minutes, self.seconds, self.frames)
    }
}

impl PartialEq for Timecode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Timecode {}

impl PartialOrd for Timecode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timecode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.drop_frame { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hours, self.minutes, self.seconds, separator, self.frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tc(h: u8, m: u8, s: u8, f: u8) -> Timecode {
        Timecode::new(h, m, s, f, FrameRate::Fps30).unwrap()
    }

    #[test]
    fn test_add_wraps_at_midnight() {
        let mut t = tc(23, 59, 59, 29);
        t.add_frames(1);
        assert_eq!(t, tc(0, 0, 0, 0));
    }

    #[test]
    fn test_subtract_wraps_at_midnight() {
        let mut t = tc(0, 0, 0, 0);
        t.subtract_frames(1);
        assert_eq!(t, tc(23, 59, 59, 29));

        let mut t = Timecode::zero(FrameRate::Fps25);
        t.subtract_frames(1);
        assert_eq!(t.frames(), 24);
    }

    #[test]
    fn test_carry_and_borrow() {
        let mut t = tc(0, 59, 59, 29);
        t.add_frames(2);
        assert_eq!(t, tc(1, 0, 0, 1));

        t.subtract_frames(32);
        assert_eq!(t, tc(0, 59, 59, 0));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(Timecode::new(24, 0, 0, 0, FrameRate::Fps30).is_err());
        assert!(Timecode::new(0, 60, 0, 0, FrameRate::Fps30).is_err());
        assert!(Timecode::new(0, 0, 60, 0, FrameRate::Fps30).is_err());
        assert!(Timecode::new(0, 0, 0, 25, FrameRate::Fps25).is_err());
        assert!(Timecode::new(0, 0, 0, 24, FrameRate::Fps25).is_ok());
    }

    #[test]
    fn test_set_is_noop_on_invalid() {
        let mut t = tc(1, 2, 3, 4);
        assert!(t.set(1, 2, 3, 30).is_err());
        assert_eq!(t, tc(1, 2, 3, 4));

        t.set(5, 6, 7, 8).unwrap();
        assert_eq!(t, tc(5, 6, 7, 8));

        t.reset();
        assert_eq!(t, tc(0, 0, 0, 0));
    }

    #[test]
    fn test_equality_ignores_drop_frame() {
        let a = tc(1, 2, 3, 4);
        let b = a.with_drop_frame(true);
        assert_eq!(a, b);
        assert!(b.drop_frame());
    }

    #[test]
    fn test_pack_layout() {
        let t = tc(12, 34, 56, 29).with_drop_frame(true);
        let payload = t.pack();

        assert_eq!(payload & 0xF, 9);
        assert_eq!((payload >> 8) & 0x3, 2);
        assert_eq!((payload >> 10) & 1, 1);
        assert_eq!((payload >> 16) & 0xF, 6);
        assert_eq!((payload >> 24) & 0x7, 5);
        assert_eq!((payload >> 32) & 0xF, 4);
        assert_eq!((payload >> 40) & 0x7, 3);
        assert_eq!((payload >> 48) & 0xF, 2);
        assert_eq!((payload >> 56) & 0x3, 1);
    }

    #[test]
    fn test_unpack_ignores_user_bits() {
        // User bits live in the upper nibble of each byte
        let payload = tc(10, 20, 30, 15).pack() | 0xF0F0_F0F0_F0F0_F0F0;
        let t = Timecode::unpack(payload, FrameRate::Fps30).unwrap();
        assert_eq!(t, tc(10, 20, 30, 15));
    }

    #[test]
    fn test_unpack_rejects_invalid_bcd() {
        assert!(Timecode::unpack(0x000A, FrameRate::Fps30).is_err());
        // 39 frames
        assert!(Timecode::unpack(0x0309, FrameRate::Fps30).is_err());
    }

    #[test]
    fn test_total_seconds_and_back() {
        let t = tc(0, 0, 10, 1);
        assert_eq!(t.total_frames(), 301);
        assert!((t.total_seconds() - 301.0 / 30.0).abs() < 1e-9);
        assert_eq!(Timecode::from_seconds(t.total_seconds(), FrameRate::Fps30), t);
    }

    #[test]
    fn test_from_seconds_wraps() {
        assert_eq!(Timecode::from_seconds(-1.0 / 30.0, FrameRate::Fps30), tc(23, 59, 59, 29));
        assert_eq!(Timecode::from_seconds(86_400.5, FrameRate::Fps30), tc(0, 0, 0, 15));
    }

    #[test]
    fn test_ordering() {
        assert!(tc(0, 0, 10, 0) < tc(0, 0, 20, 0));
        assert!(tc(1, 0, 0, 0) > tc(0, 59, 59, 29));
        assert_eq!(tc(0, 0, 1, 0).frames_since(&tc(0, 0, 0, 0)), 30);
    }

    #[test]
    fn test_display_and_parse() {
        let t = tc(1, 2, 3, 4);
        assert_eq!(t.to_string(), "01:02:03:04");
        assert_eq!(t.with_drop_frame(true).to_string(), "01:02:03;04");

        let parsed = Timecode::parse("01:02:03;04", FrameRate::Fps30).unwrap();
        assert_eq!(parsed, t);
        assert!(parsed.drop_frame());

        assert!(Timecode::parse("01:02:03", FrameRate::Fps30).is_err());
        assert!(Timecode::parse("aa:02:03:04", FrameRate::Fps30).is_err());
        assert!(Timecode::parse("25:00:00:00", FrameRate::Fps30).is_err());
    }

    proptest! {
        #[test]
        fn prop_pack_unpack_roundtrip(
            h in 0u8..24,
            m in 0u8..60,
            s in 0u8..60,
            f in 0u8..30,
            drop_frame in any::<bool>(),
        ) {
            let t = tc(h, m, s, f).with_drop_frame(drop_frame);
            let back = Timecode::unpack(t.pack(), FrameRate::Fps30).unwrap();
            prop_assert_eq!(back, t);
            prop_assert_eq!(back.drop_frame(), drop_frame);
        }

        #[test]
        fn prop_add_then_subtract_is_identity(
            start in 0u32..FrameRate::Fps25.frames_per_day(),
            delta in 0u32..5_000_000,
        ) {
            let original = Timecode::from_total_frames(start, FrameRate::Fps25);
            let mut t = original;
            t.add_frames(delta);
            t.subtract_frames(delta);
            prop_assert_eq!(t, original);
        }
    }
}
