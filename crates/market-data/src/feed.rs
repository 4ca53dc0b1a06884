// In crates/market-data/src/feed.rs

use crate::Result;
use core_types::Bar;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// The boundary through which the engine receives bars.
///
/// The engine does not manage connections, reconnection, or symbol
/// subscription; it only consumes whatever sequence the feed yields and
/// validates ordering at the store.
pub trait MarketFeed {
    /// The name of the feed (e.g., "CsvFeed").
    fn name(&self) -> &'static str;

    /// Pulls the next bar, or `None` once the feed is exhausted.
    fn next_bar(&mut self) -> Result<Option<Bar>>;
}

/// One OHLCV row as it appears in a replay file.
#[derive(Debug, Deserialize)]
struct CsvBarRecord {
    open_time: i64,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

impl From<CsvBarRecord> for Bar {
    fn from(rec: CsvBarRecord) -> Self {
        Bar {
            open_time: rec.open_time,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close: rec.close,
            volume: rec.volume,
        }
    }
}

/// A replay feed that reads bars from a headered CSV file
/// (`open_time,open,high,low,close,volume`).
pub struct CsvFeed {
    reader: csv::DeserializeRecordsIntoIter<File, CsvBarRecord>,
}

impl CsvFeed {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = csv::Reader::from_reader(file).into_deserialize();
        Ok(Self { reader })
    }
}

impl MarketFeed for CsvFeed {
    fn name(&self) -> &'static str {
        "CsvFeed"
    }

    fn next_bar(&mut self) -> Result<Option<Bar>> {
        match self.reader.next() {
            Some(row) => {
                let bar: Bar = row.map(CsvBarRecord::into)?;
                bar.validate()?;
                Ok(Some(bar))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_feed_yields_bars_in_file_order() {
        let mut file = tempfile_path("feed_order.csv");
        writeln!(file.1, "open_time,open,high,low,close,volume").unwrap();
        writeln!(file.1, "1000,1.0710,1.0720,1.0705,1.0715,120").unwrap();
        writeln!(file.1, "61000,1.0715,1.0730,1.0710,1.0728,98").unwrap();
        file.1.flush().unwrap();

        let mut feed = CsvFeed::open(&file.0).unwrap();
        let first = feed.next_bar().unwrap().unwrap();
        let second = feed.next_bar().unwrap().unwrap();
        assert_eq!(first.open_time, 1000);
        assert_eq!(second.open_time, 61000);
        assert!(feed.next_bar().unwrap().is_none());

        std::fs::remove_file(file.0).ok();
    }

    #[test]
    fn csv_feed_rejects_inconsistent_bar() {
        let mut file = tempfile_path("feed_malformed.csv");
        writeln!(file.1, "open_time,open,high,low,close,volume").unwrap();
        // high below low
        writeln!(file.1, "1000,1.0710,1.0600,1.0705,1.0715,120").unwrap();
        file.1.flush().unwrap();

        let mut feed = CsvFeed::open(&file.0).unwrap();
        assert!(matches!(
            feed.next_bar(),
            Err(crate::Error::MalformedBar(_))
        ));

        std::fs::remove_file(file.0).ok();
    }

    fn tempfile_path(name: &str) -> (std::path::PathBuf, File) {
        let path = std::env::temp_dir().join(name);
        let file = File::create(&path).unwrap();
        (path, file)
    }
}
