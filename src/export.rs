// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Text export of the metric tree
//!
//! One line per node, indented with tabs by depth:
//!
//! ```text
//! resource: i-1 type: instance metrics: 1
//! 	metric: CPUUtilization counters: 1
//! 		counter: average interval: 20000 seq: 3 dimensions: 1
//! 			dimension: default values: 2
//! 				1344056910424 YES 33.300000
//! 				1344056930424  NO -1.000000
//! ```
//!
//! Unavailable samples print [`UNAVAILABLE_PLACEHOLDER`] instead of their
//! payload.

use std::fmt::{self, Write};

use crate::history::Value;
use crate::store::Resource;

/// Printed in place of an unavailable sample's payload
pub const UNAVAILABLE_PLACEHOLDER: &str = "-1.000000";

/// Outcome of [`format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    /// The whole tree fit. `written` excludes the terminator.
    Complete { written: usize },
    /// The buffer was too small. `needed` is the capacity a retry needs,
    /// terminator included.
    Truncated { needed: usize },
}

impl ExportStatus {
    /// Check if the whole tree was written
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Incremental sink over a fixed byte buffer
///
/// Accepts at most `capacity - 1` bytes, leaving room for a NUL terminator,
/// and keeps counting past the end so the caller learns the full size.
/// Output is cut on a byte boundary, so the last line may be partial.
#[derive(Debug)]
pub struct BoundedWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
    required: usize,
}

impl<'a> BoundedWriter<'a> {
    /// Wrap `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            written: 0,
            required: 0,
        }
    }

    /// Bytes the buffer can hold besides the terminator
    pub fn limit(&self) -> usize {
        self.buf.len().saturating_sub(1)
    }

    /// Bytes stored so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Bytes offered so far, stored or not
    pub fn required(&self) -> usize {
        self.required
    }

    /// Check if some output did not fit
    pub fn is_truncated(&self) -> bool {
        self.required > self.written || self.buf.is_empty()
    }

    /// Write the terminator and report the outcome
    pub fn finish(self) -> ExportStatus {
        let truncated = self.is_truncated();
        if let Some(end) = self.buf.get_mut(self.written) {
            *end = 0;
        }
        if truncated {
            ExportStatus::Truncated {
                needed: self.required + 1,
            }
        } else {
            ExportStatus::Complete {
                written: self.written,
            }
        }
    }
}

impl Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        self.required += bytes.len();

        let room = self.limit() - self.written;
        let take = bytes.len().min(room);
        self.buf[self.written..self.written + take].copy_from_slice(&bytes[..take]);
        self.written += take;
        Ok(())
    }
}

/// Write the tree into `buf`, NUL-terminated
pub fn format(buf: &mut [u8], resources: &[Resource]) -> ExportStatus {
    let mut writer = BoundedWriter::new(buf);
    // BoundedWriter never reports an error
    let _ = write_tree(&mut writer, resources);
    writer.finish()
}

/// Render the tree into a string
pub fn render(resources: &[Resource]) -> String {
    let mut out = String::new();
    let _ = write_tree(&mut out, resources);
    out
}

/// Write the tree to any formatter sink
pub fn write_tree<W: Write>(out: &mut W, resources: &[Resource]) -> fmt::Result {
    for resource in resources {
        writeln!(
            out,
            "resource: {} type: {} metrics: {}",
            resource.name,
            resource.resource_type,
            resource.metrics.len()
        )?;
        for metric in &resource.metrics {
            writeln!(
                out,
                "\tmetric: {} counters: {}",
                metric.name,
                metric.counters.len()
            )?;
            for counter in &metric.counters {
                writeln!(
                    out,
                    "\t\tcounter: {} interval: {} seq: {} dimensions: {}",
                    counter.kind,
                    counter.collection_interval_ms,
                    counter.sequence_num,
                    counter.dimensions.len()
                )?;
                for dimension in &counter.dimensions {
                    writeln!(
                        out,
                        "\t\t\tdimension: {} values: {}",
                        dimension.name,
                        dimension.history.len()
                    )?;
                    for value in dimension.history.iter() {
                        write_value(out, value)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn write_value<W: Write>(out: &mut W, value: &Value) -> fmt::Result {
    match value.reading() {
        Some(v) => writeln!(out, "\t\t\t\t{} YES {:.6}", value.timestamp_ms, v),
        None => writeln!(
            out,
            "\t\t\t\t{}  NO {}",
            value.timestamp_ms, UNAVAILABLE_PLACEHOLDER
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CounterKind;
    use crate::store::{Counter, Dimension, Metric};

    fn sample_tree() -> Vec<Resource> {
        vec![Resource::new("i-1", "instance").with_metric(
            Metric::new("CPUUtilization").with_counter(
                Counter::new(CounterKind::Average, 20_000).with_dimension(Dimension::with_values(
                    "default",
                    vec![Value::new(1000, 33.3), Value::unavailable(2000)],
                )),
            ),
        )]
    }

    const EXPECTED: &str = "resource: i-1 type: instance metrics: 1\n\
                            \tmetric: CPUUtilization counters: 1\n\
                            \t\tcounter: average interval: 20000 seq: 0 dimensions: 1\n\
                            \t\t\tdimension: default values: 2\n\
                            \t\t\t\t1000 YES 33.300000\n\
                            \t\t\t\t2000  NO -1.000000\n";

    #[test]
    fn test_render_layout() {
        assert_eq!(render(&sample_tree()), EXPECTED);
    }

    #[test]
    fn test_format_complete() {
        let mut buf = vec![0xAAu8; 512];
        let status = format(&mut buf, &sample_tree());

        assert_eq!(status, ExportStatus::Complete { written: EXPECTED.len() });
        assert_eq!(&buf[..EXPECTED.len()], EXPECTED.as_bytes());
        assert_eq!(buf[EXPECTED.len()], 0);
    }

    #[test]
    fn test_format_exact_fit() {
        let mut buf = vec![0xAAu8; EXPECTED.len() + 1];
        let status = format(&mut buf, &sample_tree());
        assert!(status.is_complete());
        assert_eq!(buf[EXPECTED.len()], 0);
    }

    #[test]
    fn test_format_one_byte_short() {
        let mut buf = vec![0xAAu8; EXPECTED.len()];
        let status = format(&mut buf, &sample_tree());
        assert_eq!(
            status,
            ExportStatus::Truncated {
                needed: EXPECTED.len() + 1
            }
        );
        assert_eq!(&buf[..EXPECTED.len() - 1], &EXPECTED.as_bytes()[..EXPECTED.len() - 1]);
        assert_eq!(buf[EXPECTED.len() - 1], 0);
    }

    #[test]
    fn test_format_capacity_one() {
        let mut buf = [0xAAu8; 1];
        let status = format(&mut buf, &sample_tree());
        assert_eq!(
            status,
            ExportStatus::Truncated {
                needed: EXPECTED.len() + 1
            }
        );
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn test_format_capacity_zero() {
        let mut buf: [u8; 0] = [];
        let status = format(&mut buf, &sample_tree());
        assert!(!status.is_complete());
    }

    #[test]
    fn test_retry_with_reported_size() {
        let tree = sample_tree();
        let mut small = [0u8; 16];
        let ExportStatus::Truncated { needed } = format(&mut small, &tree) else {
            panic!("expected truncation");
        };
        let mut buf = vec![0u8; needed];
        assert!(format(&mut buf, &tree).is_complete());
    }

    #[test]
    fn test_empty_tree() {
        let mut buf = [0xAAu8; 1];
        assert_eq!(format(&mut buf, &[]), ExportStatus::Complete { written: 0 });
        assert_eq!(buf[0], 0);
    }
}
