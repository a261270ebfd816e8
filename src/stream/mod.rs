//! Exposure command stream: the sole exported artifact.
//!
//! A [`Stream`] is a flat, time-ordered sequence of `(dwell, x, y)`
//! commands in working units (ms, px) together with the device constraints
//! it must satisfy. Validation runs before any export; writing an invalid
//! stream is a fatal error, never a silent clamp.
//!
//! File format: header lines `s16`, `1`, command count; then one
//! `dwell x y` integer triple per line with the dwell in device time units
//! (0.1 us, factor 10000 from ms); one trailing blanking command `0`.

pub mod builder;

pub use builder::StreamBuilder;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::StreamError;

/// Conversion factor from working time units (ms) to device time units
/// (0.1 us resolution).
pub const DEVICE_UNITS_PER_MS: f64 = 10_000.0;

/// One beam visit: dwell time in ms, position in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellCommand {
    /// Dwell time, ms.
    pub dwell: f64,
    /// X position, px.
    pub x: f64,
    /// Y position, px.
    pub y: f64,
}

/// An exposure stream plus the device constraints it is checked against.
#[derive(Debug, Clone)]
pub struct Stream {
    dwells: Vec<DwellCommand>,
    addressable_pixels: [u32; 2],
    max_dwell: f64,
}

impl Stream {
    /// Wraps raw commands with device constraints.
    pub fn new(dwells: Vec<DwellCommand>, addressable_pixels: [u32; 2], max_dwell: f64) -> Self {
        Self {
            dwells,
            addressable_pixels,
            max_dwell,
        }
    }

    /// The commands, in execution order.
    #[inline]
    pub fn dwells(&self) -> &[DwellCommand] {
        &self.dwells
    }

    /// Number of commands.
    #[inline]
    pub fn len(&self) -> usize {
        self.dwells.len()
    }

    /// Whether the stream carries no commands.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dwells.is_empty()
    }

    /// In-plane bounds `[[min_x, max_x], [min_y, max_y]]`, or `None` for an
    /// empty stream.
    pub fn limits(&self) -> Option<[[f64; 2]; 2]> {
        if self.dwells.is_empty() {
            return None;
        }
        let mut lim = [[f64::INFINITY, f64::NEG_INFINITY]; 2];
        for c in &self.dwells {
            lim[0][0] = lim[0][0].min(c.x);
            lim[0][1] = lim[0][1].max(c.x);
            lim[1][0] = lim[1][0].min(c.y);
            lim[1][1] = lim[1][1].max(c.y);
        }
        Some(lim)
    }

    /// Checks every command against the device constraints, reporting the
    /// first violation.
    pub fn validate(&self) -> Result<(), StreamError> {
        for c in &self.dwells {
            let in_x = c.x >= 0.0 && c.x <= f64::from(self.addressable_pixels[0]);
            let in_y = c.y >= 0.0 && c.y <= f64::from(self.addressable_pixels[1]);
            if !(in_x && in_y) {
                return Err(StreamError::PointOutOfBounds {
                    x: c.x,
                    y: c.y,
                    bounds: self.addressable_pixels,
                });
            }
            if c.dwell > self.max_dwell {
                return Err(StreamError::DwellTooLong {
                    dwell: c.dwell,
                    max: self.max_dwell,
                });
            }
        }
        Ok(())
    }

    /// Whether the stream passes validation.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Shifts all commands so the bounding-box centre lands on `target`
    /// (screen centre when `None`). No-op on an empty stream.
    pub fn recentre(&mut self, target: Option<[f64; 2]>) {
        let Some(lim) = self.limits() else { return };
        let centre = [
            (lim[0][0] + lim[0][1]) / 2.0,
            (lim[1][0] + lim[1][1]) / 2.0,
        ];
        let target = target.unwrap_or([
            f64::from(self.addressable_pixels[0]) / 2.0,
            f64::from(self.addressable_pixels[1]) / 2.0,
        ]);
        let shift = [target[0] - centre[0], target[1] - centre[1]];
        for c in &mut self.dwells {
            c.x += shift[0];
            c.y += shift[1];
        }
    }

    /// Total exposure time in ms.
    pub fn total_time(&self) -> f64 {
        self.dwells.iter().map(|c| c.dwell).sum()
    }

    /// Validates, then writes the stream file to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), StreamError> {
        self.validate()?;
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Validates, then writes the stream file to an arbitrary writer.
    pub fn write_to(&self, w: &mut impl Write) -> Result<(), StreamError> {
        self.validate()?;
        writeln!(w, "s16")?;
        writeln!(w, "1")?;
        writeln!(w, "{}", self.dwells.len())?;
        for c in &self.dwells {
            writeln!(
                w,
                "{} {} {}",
                (c.dwell * DEVICE_UNITS_PER_MS).round() as i64,
                c.x.round() as i64,
                c.y.round() as i64,
            )?;
        }
        // trailing blanking command
        write!(w, "0")?;
        Ok(())
    }

    /// Reads a stream file back, converting device time units to ms.
    pub fn read(
        path: impl AsRef<Path>,
        addressable_pixels: [u32; 2],
        max_dwell: f64,
    ) -> Result<Self, StreamError> {
        Self::read_from(BufReader::new(File::open(path)?), addressable_pixels, max_dwell)
    }

    /// Reads a stream from an arbitrary reader.
    pub fn read_from(
        r: impl BufRead,
        addressable_pixels: [u32; 2],
        max_dwell: f64,
    ) -> Result<Self, StreamError> {
        let mut lines = r.lines().enumerate();
        let mut expect_line = |what: &str| -> Result<(usize, String), StreamError> {
            match lines.next() {
                Some((i, Ok(line))) => Ok((i, line)),
                Some((i, Err(e))) => Err(StreamError::MalformedStreamFile {
                    line: i + 1,
                    detail: e.to_string(),
                }),
                None => Err(StreamError::MalformedStreamFile {
                    line: 0,
                    detail: format!("unexpected end of file, expected {what}"),
                }),
            }
        };

        let (i, magic) = expect_line("header magic")?;
        if magic.trim() != "s16" {
            return Err(StreamError::MalformedStreamFile {
                line: i + 1,
                detail: format!("expected header `s16`, found `{}`", magic.trim()),
            });
        }
        expect_line("repeat count")?;
        let (i, count_line) = expect_line("command count")?;
        let count: usize = count_line.trim().parse().map_err(|_| {
            StreamError::MalformedStreamFile {
                line: i + 1,
                detail: format!("invalid command count `{}`", count_line.trim()),
            }
        })?;

        let mut dwells = Vec::with_capacity(count);
        for _ in 0..count {
            let (i, line) = expect_line("dwell command")?;
            let mut it = line.split_whitespace();
            let mut field = |name: &str| -> Result<f64, StreamError> {
                it.next()
                    .and_then(|tok| tok.parse::<f64>().ok())
                    .ok_or_else(|| StreamError::MalformedStreamFile {
                        line: i + 1,
                        detail: format!("missing or invalid {name}"),
                    })
            };
            let dwell = field("dwell time")? / DEVICE_UNITS_PER_MS;
            let x = field("x coordinate")?;
            let y = field("y coordinate")?;
            dwells.push(DwellCommand { dwell, x, y });
        }
        Ok(Self::new(dwells, addressable_pixels, max_dwell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cmd(dwell: f64, x: f64, y: f64) -> DwellCommand {
        DwellCommand { dwell, x, y }
    }

    fn small_stream() -> Stream {
        Stream::new(
            vec![cmd(0.5, 10.0, 20.0), cmd(1.5, 30.0, 40.0)],
            [100, 100],
            5.0,
        )
    }

    #[test]
    fn valid_stream_passes() {
        assert!(small_stream().is_valid());
    }

    #[test]
    fn out_of_bounds_point_fails() {
        let s = Stream::new(vec![cmd(0.5, 150.0, 20.0)], [100, 100], 5.0);
        assert!(matches!(
            s.validate(),
            Err(StreamError::PointOutOfBounds { .. })
        ));
    }

    #[test]
    fn negative_coordinate_fails() {
        let s = Stream::new(vec![cmd(0.5, -1.0, 20.0)], [100, 100], 5.0);
        assert!(!s.is_valid());
    }

    #[test]
    fn overlong_dwell_fails() {
        let s = Stream::new(vec![cmd(6.0, 10.0, 20.0)], [100, 100], 5.0);
        assert!(matches!(s.validate(), Err(StreamError::DwellTooLong { .. })));
    }

    #[test]
    fn write_refuses_invalid_stream() {
        let s = Stream::new(vec![cmd(0.5, 150.0, 20.0)], [100, 100], 5.0);
        let mut buf = Vec::new();
        assert!(s.write_to(&mut buf).is_err());
        assert!(buf.is_empty(), "nothing may be written for invalid streams");
    }

    #[test]
    fn recentre_moves_bbox_centre_to_screen_centre() {
        let mut s = small_stream();
        s.recentre(None);
        let lim = s.limits().unwrap();
        assert_relative_eq!((lim[0][0] + lim[0][1]) / 2.0, 50.0);
        assert_relative_eq!((lim[1][0] + lim[1][1]) / 2.0, 50.0);
    }

    #[test]
    fn recentre_to_explicit_target() {
        let mut s = small_stream();
        s.recentre(Some([25.0, 75.0]));
        let lim = s.limits().unwrap();
        assert_relative_eq!((lim[0][0] + lim[0][1]) / 2.0, 25.0);
        assert_relative_eq!((lim[1][0] + lim[1][1]) / 2.0, 75.0);
    }

    #[test]
    fn round_trip_preserves_commands_within_quantization() {
        let s = small_stream();
        let mut buf = Vec::new();
        s.write_to(&mut buf).unwrap();
        let back = Stream::read_from(&buf[..], [100, 100], 5.0).unwrap();
        assert_eq!(back.len(), s.len());
        for (a, b) in s.dwells().iter().zip(back.dwells()) {
            assert_relative_eq!(a.dwell, b.dwell, epsilon = 1.0 / DEVICE_UNITS_PER_MS);
            assert!((a.x - b.x).abs() <= 1.0);
            assert!((a.y - b.y).abs() <= 1.0);
        }
    }

    #[test]
    fn file_layout_matches_format() {
        let s = small_stream();
        let mut buf = Vec::new();
        s.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "s16");
        assert_eq!(lines[1], "1");
        assert_eq!(lines[2], "2");
        assert_eq!(lines[3], "5000 10 20");
        assert_eq!(*lines.last().unwrap(), "0");
    }

    #[test]
    fn malformed_header_is_reported() {
        let err = Stream::read_from("bogus\n1\n0\n0".as_bytes(), [100, 100], 5.0).unwrap_err();
        assert!(matches!(err, StreamError::MalformedStreamFile { line: 1, .. }));
    }

    #[test]
    fn truncated_body_is_reported() {
        let err = Stream::read_from("s16\n1\n3\n100 1 2\n".as_bytes(), [100, 100], 5.0)
            .unwrap_err();
        assert!(matches!(err, StreamError::MalformedStreamFile { .. }));
    }

    #[test]
    fn total_time_sums_dwells() {
        assert_relative_eq!(small_stream().total_time(), 2.0);
    }
}
