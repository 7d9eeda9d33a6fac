//! cfx-report
//!
//! Reporting sink: renders a fixed-layout summary image (total count, top 5
//! by estimated GDP, refresh timestamp) after each refresh and makes it
//! retrievable.
//!
//! Rendering is best-effort from the engine's point of view; a failure here
//! is reported as a [`ReportError`] and never alters a refresh outcome.

pub mod canvas;

use std::fmt;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use cfx_schemas::CountryRecord;
use image::{ImageFormat, RgbImage};
use tracing::info;

use crate::canvas::{draw_text, BLACK, BLUE, GRAY, WHITE};

pub const IMAGE_WIDTH: u32 = 800;
pub const IMAGE_HEIGHT: u32 = 500;
pub const SUMMARY_FILE: &str = "summary.png";
pub const TOP_N: usize = 5;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Encode(image::ImageError),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "summary image io error: {e}"),
            ReportError::Encode(e) => write!(f, "summary image encode error: {e}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io(e) => Some(e),
            ReportError::Encode(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self {
        ReportError::Io(e)
    }
}

impl From<image::ImageError> for ReportError {
    fn from(e: image::ImageError) -> Self {
        ReportError::Encode(e)
    }
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Where refresh summaries go.
pub trait ReportSink: Send + Sync {
    /// Render a summary of `records` stamped with `refreshed_at`; returns the
    /// artifact location.
    fn render(&self, records: &[CountryRecord], refreshed_at: DateTime<Utc>) -> Result<PathBuf, ReportError>;

    /// Location of the last rendered artifact, or `None` if none exists.
    fn path_of(&self) -> Option<PathBuf>;
}

// ---------------------------------------------------------------------------
// Summary content
// ---------------------------------------------------------------------------

/// The text content of one summary, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    /// `(name, estimated_gdp)`, highest first, at most [`TOP_N`].
    pub top: Vec<(String, f64)>,
    pub refreshed_at: DateTime<Utc>,
}

impl Summary {
    pub fn from_records(records: &[CountryRecord], refreshed_at: DateTime<Utc>) -> Self {
        let mut ranked: Vec<&CountryRecord> = records
            .iter()
            .filter(|r| r.estimated_gdp.is_finite())
            .collect();
        ranked.sort_by(|a, b| {
            b.estimated_gdp
                .total_cmp(&a.estimated_gdp)
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            total: records.len(),
            top: ranked
                .into_iter()
                .take(TOP_N)
                .map(|r| (r.name.clone(), r.estimated_gdp))
                .collect(),
            refreshed_at,
        }
    }

    pub fn title(&self) -> &'static str {
        "Country API Summary"
    }

    pub fn total_line(&self) -> String {
        format!("Total Countries In DB: {}", self.total)
    }

    pub fn top_lines(&self) -> Vec<String> {
        self.top
            .iter()
            .enumerate()
            .map(|(i, (name, gdp))| format!("{}. {}: ${}", i + 1, name, format_gdp(*gdp)))
            .collect()
    }

    pub fn timestamp_line(&self) -> String {
        format!(
            "Last Refreshed: {}",
            self.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    /// Draw onto a fresh fixed-size canvas.
    pub fn draw(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, WHITE);

        draw_text(&mut img, 50, 30, self.title(), 3, BLACK);
        draw_text(&mut img, 50, 90, &self.total_line(), 2, BLUE);
        draw_text(&mut img, 50, 140, "Top 5 Countries by Estimated GDP (USD):", 2, BLUE);

        let mut y = 180;
        for line in self.top_lines() {
            draw_text(&mut img, 70, y, &line, 2, BLACK);
            y += 30;
        }

        draw_text(&mut img, 50, IMAGE_HEIGHT - 60, &self.timestamp_line(), 2, GRAY);
        img
    }
}

/// Whole-unit GDP with thousands separators; `N/A` when there is no estimate.
pub fn format_gdp(gdp: f64) -> String {
    if !gdp.is_finite() || gdp == 0.0 {
        return "N/A".to_string();
    }
    let raw = format!("{gdp:.0}");
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{sign}{out}")
}

// ---------------------------------------------------------------------------
// PNG file sink
// ---------------------------------------------------------------------------

/// Writes `<cache_dir>/summary.png`.
#[derive(Debug, Clone)]
pub struct PngSummarySink {
    cache_dir: PathBuf,
}

impl PngSummarySink {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn image_path(&self) -> PathBuf {
        self.cache_dir.join(SUMMARY_FILE)
    }
}

impl ReportSink for PngSummarySink {
    fn render(&self, records: &[CountryRecord], refreshed_at: DateTime<Utc>) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(&self.cache_dir)?;

        let summary = Summary::from_records(records, refreshed_at);
        let img = summary.draw();

        // Write beside the target then rename, so readers never see a partial file.
        let path = self.image_path();
        let tmp = self.cache_dir.join(format!("{SUMMARY_FILE}.tmp"));
        img.save_with_format(&tmp, ImageFormat::Png)?;
        fs::rename(&tmp, &path)?;

        info!(path = %path.display(), total = summary.total, "summary image written");
        Ok(path)
    }

    fn path_of(&self) -> Option<PathBuf> {
        let path = self.image_path();
        path.is_file().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(name: &str, gdp: f64) -> CountryRecord {
        CountryRecord {
            id: 0,
            name: name.to_string(),
            capital: "N/A".to_string(),
            region: "Somewhere".to_string(),
            population: 1,
            currency_code: None,
            exchange_rate: None,
            estimated_gdp: gdp,
            flag_url: String::new(),
            last_refreshed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn gdp_formatting() {
        assert_eq!(format_gdp(0.0), "N/A");
        assert_eq!(format_gdp(f64::NAN), "N/A");
        assert_eq!(format_gdp(999.4), "999");
        assert_eq!(format_gdp(1000.0), "1,000");
        assert_eq!(format_gdp(1_234_567.6), "1,234,568");
        assert_eq!(format_gdp(-12_345.0), "-12,345");
    }

    #[test]
    fn summary_takes_top_five_by_gdp() {
        let records: Vec<CountryRecord> = [
            ("A", 1.0),
            ("B", 6.0),
            ("C", 3.0),
            ("D", 0.0),
            ("E", 5.0),
            ("F", 4.0),
            ("G", 2.0),
        ]
        .into_iter()
        .map(|(n, g)| rec(n, g))
        .collect();
        let ts = Utc.with_ymd_and_hms(2025, 10, 19, 8, 30, 0).unwrap();

        let s = Summary::from_records(&records, ts);
        assert_eq!(s.total, 7);
        let names: Vec<&str> = s.top.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["B", "E", "F", "C", "G"]);
        assert_eq!(s.top_lines()[0], "1. B: $6");
        assert_eq!(s.timestamp_line(), "Last Refreshed: 2025-10-19 08:30:00 UTC");
        assert_eq!(s.total_line(), "Total Countries In DB: 7");
    }

    #[test]
    fn empty_store_renders_zero_total() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let s = Summary::from_records(&[], ts);
        assert_eq!(s.total, 0);
        assert!(s.top_lines().is_empty());
        assert_eq!(s.draw().dimensions(), (IMAGE_WIDTH, IMAGE_HEIGHT));
    }
}
