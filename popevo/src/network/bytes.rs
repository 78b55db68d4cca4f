use std::fmt;

const UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];

/// A byte count displayed with a decimal (SI) unit,
/// e.g. `520 B`, `12.3 kB` or `4.0 GB`.
///
/// # Examples
/// ```
/// use popevo::ByteSize;
///
/// assert_eq!(ByteSize(999).to_string(), "999 B");
/// assert_eq!(ByteSize(12_345).to_string(), "12.3 kB");
/// assert_eq!(ByteSize(4_000_000_000).to_string(), "4.0 GB");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub usize);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 1000 {
            return write!(f, "{} B", self.0);
        }
        let mut value = self.0 as f64;
        let mut unit = 0;
        while value >= 1000.0 && unit < UNITS.len() - 1 {
            value /= 1000.0;
            unit += 1;
        }
        write!(f, "{:.1} {}", value, UNITS[unit])
    }
}
