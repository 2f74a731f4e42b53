//! Post-simulation check of the segment pattern

use std::io::{self, Write};

use crate::buffer::expected_value;
use crate::error::VerifyError;

/// Walk the buffer in order, printing each byte, and stop at the first one
/// that does not match the pattern.
///
/// Output is best-effort: a failing writer does not change the result. The
/// first write failure is logged, later ones are not.
pub fn verify_buffer<W: Write>(data: &[u8], length: u32, out: &mut W) -> Result<(), VerifyError> {
    let mut report = Report {
        out,
        failed: false,
    };
    for (offset, &got) in data.iter().enumerate() {
        let expected = expected_value(length, offset);
        if expected != got {
            let err = VerifyError {
                offset,
                expected,
                got,
            };
            report.line(format_args!("{}", err));
            report.flush();
            return Err(err);
        }
        report.line(format_args!("{}: {}", offset, got));
    }
    report.flush();
    Ok(())
}

/// Output sink that logs its first failure and then keeps going
struct Report<'a, W: Write> {
    out: &'a mut W,
    failed: bool,
}

impl<W: Write> Report<'_, W> {
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        let result = writeln!(self.out, "{}", args);
        self.check(result);
    }

    fn flush(&mut self) {
        let result = self.out.flush();
        self.check(result);
    }

    fn check(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if !self.failed {
                self.failed = true;
                crate::log_warning!("Failed to print verification output: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFORMED: [u8; 15] = [11, 22, 33, 44, 55, 12, 23, 34, 45, 56, 14, 25, 36, 47, 58];

    #[test]
    fn test_transformed_buffer_passes() {
        let mut out = Vec::new();
        verify_buffer(&TRANSFORMED, 5, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0], "0: 11");
        assert_eq!(lines[7], "7: 34");
        assert_eq!(lines[14], "14: 58");
    }

    #[test]
    fn test_stops_at_first_mismatch() {
        let mut data = TRANSFORMED;
        data[7] = 99;
        data[12] = 0;

        let mut out = Vec::new();
        let err = verify_buffer(&data, 5, &mut out).unwrap_err();
        assert_eq!(
            err,
            VerifyError {
                offset: 7,
                expected: 34,
                got: 99
            }
        );

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 8);
        assert_eq!(text.lines().last(), Some("check error 7: 34 99"));
        assert!(!text.contains("8: "));
    }

    /// Writer whose every call fails, like a closed stdout
    struct Closed {
        writes: usize,
    }

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_failing_writer_does_not_change_result() {
        let mut out = Closed { writes: 0 };
        assert_eq!(verify_buffer(&TRANSFORMED, 5, &mut out), Ok(()));
        // Every line is still attempted after the first failure
        assert_eq!(out.writes, 15);

        let mut data = TRANSFORMED;
        data[7] = 99;
        let mut out = Closed { writes: 0 };
        let err = verify_buffer(&data, 5, &mut out).unwrap_err();
        assert_eq!(err.offset, 7);
        assert_eq!(out.writes, 8);
    }

    #[test]
    fn test_untouched_buffer_fails_at_second_segment() {
        let data = [11, 22, 33, 44, 55, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = verify_buffer(&data, 5, &mut std::io::sink()).unwrap_err();
        assert_eq!(err.offset, 5);
        assert_eq!(err.expected, 12);
        assert_eq!(err.got, 0);
    }
}
