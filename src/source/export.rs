//! Per-test CSV exports.
//!
//! Column names differ between publishers, so every column is located by a
//! configured name first and then by a list of common aliases
//! (case-insensitive). At minimum a file needs a codec column, a bitrate
//! column, the metric column, and either `width`/`height` or a combined
//! `resolution` column (`1920x1080`).
//!
//! ```rust,ignore
//! use vq_curves::source::{CsvSampleReader, CsvSchema};
//!
//! let schema = CsvSchema::builder().codec_column("encoder").bitrate_column("kbps").build();
//! let batch = CsvSampleReader::new(schema, Metric::Vmaf).read(&bytes)?;
//! ```

use csv::StringRecord;
use tracing::{debug, warn};

use crate::curve::{CurveGroupKey, Metric, RawSample, SampleBatch};
use crate::error::{Error, Result};

/// Schema for CSV exports.
#[derive(Debug, Clone)]
pub struct CsvSchema {
    /// Column name for the codec.
    pub codec_column: Option<String>,
    /// Column name for frame width.
    pub width_column: Option<String>,
    /// Column name for frame height.
    pub height_column: Option<String>,
    /// Column name for a combined `WxH` resolution.
    pub resolution_column: Option<String>,
    /// Column name for frame rate.
    pub fps_column: Option<String>,
    /// Column name for the content identifier.
    pub content_column: Option<String>,
    /// Column name for bitrate.
    pub bitrate_column: Option<String>,
    /// Column name for the metric value.
    pub value_column: Option<String>,
    /// Multiplier turning the bitrate column into kbps (e.g. `0.001` for bps).
    pub bitrate_scale: f64,
}

impl Default for CsvSchema {
    fn default() -> Self {
        Self {
            codec_column: None,
            width_column: None,
            height_column: None,
            resolution_column: None,
            fps_column: None,
            content_column: None,
            bitrate_column: None,
            value_column: None,
            bitrate_scale: 1.0,
        }
    }
}

impl CsvSchema {
    /// Create a schema builder.
    #[must_use]
    pub fn builder() -> CsvSchemaBuilder {
        CsvSchemaBuilder::default()
    }

    /// Schema relying on alias detection only.
    #[must_use]
    pub fn auto_detect() -> Self {
        Self::default()
    }
}

/// Builder for [`CsvSchema`].
#[derive(Debug, Default)]
pub struct CsvSchemaBuilder {
    schema: CsvSchema,
}

impl CsvSchemaBuilder {
    /// Set the codec column name.
    #[must_use]
    pub fn codec_column(mut self, name: impl Into<String>) -> Self {
        self.schema.codec_column = Some(name.into());
        self
    }

    /// Set the width column name.
    #[must_use]
    pub fn width_column(mut self, name: impl Into<String>) -> Self {
        self.schema.width_column = Some(name.into());
        self
    }

    /// Set the height column name.
    #[must_use]
    pub fn height_column(mut self, name: impl Into<String>) -> Self {
        self.schema.height_column = Some(name.into());
        self
    }

    /// Set the combined resolution column name.
    #[must_use]
    pub fn resolution_column(mut self, name: impl Into<String>) -> Self {
        self.schema.resolution_column = Some(name.into());
        self
    }

    /// Set the frame-rate column name.
    #[must_use]
    pub fn fps_column(mut self, name: impl Into<String>) -> Self {
        self.schema.fps_column = Some(name.into());
        self
    }

    /// Set the content column name.
    #[must_use]
    pub fn content_column(mut self, name: impl Into<String>) -> Self {
        self.schema.content_column = Some(name.into());
        self
    }

    /// Set the bitrate column name.
    #[must_use]
    pub fn bitrate_column(mut self, name: impl Into<String>) -> Self {
        self.schema.bitrate_column = Some(name.into());
        self
    }

    /// Set the metric value column name.
    #[must_use]
    pub fn value_column(mut self, name: impl Into<String>) -> Self {
        self.schema.value_column = Some(name.into());
        self
    }

    /// Set the bitrate multiplier.
    #[must_use]
    pub fn bitrate_scale(mut self, scale: f64) -> Self {
        self.schema.bitrate_scale = scale;
        self
    }

    /// Build the schema.
    #[must_use]
    pub fn build(self) -> CsvSchema {
        self.schema
    }
}

/// Located columns shared by sample exports and VMAF indexes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupColumns {
    codec: usize,
    size: SizeColumns,
    fps: Option<usize>,
    content: Option<usize>,
    bitrate: usize,
    bitrate_scale: f64,
}

#[derive(Debug, Clone, Copy)]
enum SizeColumns {
    Split { width: usize, height: usize },
    Combined(usize),
}

impl GroupColumns {
    pub(crate) fn locate(schema: &CsvSchema, headers: &[&str]) -> Result<Self> {
        let codec = find_column(
            headers,
            schema.codec_column.as_deref(),
            &["codec", "encoder", "format", "preset_codec"],
        )
        .ok_or_else(|| Error::MissingColumn("codec/encoder".to_string()))?;

        let width = find_column(headers, schema.width_column.as_deref(), &["width", "w"]);
        let height = find_column(headers, schema.height_column.as_deref(), &["height", "h"]);
        let size = match (width, height) {
            (Some(width), Some(height)) => SizeColumns::Split { width, height },
            _ => SizeColumns::Combined(
                find_column(
                    headers,
                    schema.resolution_column.as_deref(),
                    &["resolution", "res", "size", "dimensions"],
                )
                .ok_or_else(|| Error::MissingColumn("width/height or resolution".to_string()))?,
            ),
        };

        let bitrate = find_column(
            headers,
            schema.bitrate_column.as_deref(),
            &["bitrate_kbps", "kbps", "bitrate", "bitrate (kbps)", "rate"],
        )
        .ok_or_else(|| Error::MissingColumn("bitrate".to_string()))?;

        Ok(Self {
            codec,
            size,
            fps: find_column(
                headers,
                schema.fps_column.as_deref(),
                &["fps", "framerate", "frame_rate", "frame rate"],
            ),
            content: find_column(
                headers,
                schema.content_column.as_deref(),
                &["content", "clip", "video", "source", "sequence", "title"],
            ),
            bitrate,
            bitrate_scale: schema.bitrate_scale,
        })
    }

    /// Parse the curve group and bitrate (kbps) of one record.
    pub(crate) fn parse(&self, record: &StringRecord) -> std::result::Result<(CurveGroupKey, f64), String> {
        let codec = field(record, self.codec).ok_or("empty codec")?;
        let (width, height) = match self.size {
            SizeColumns::Split { width, height } => (
                parse_dimension(record, width, "width")?,
                parse_dimension(record, height, "height")?,
            ),
            SizeColumns::Combined(idx) => {
                let text = field(record, idx).ok_or("empty resolution")?;
                parse_resolution(text).ok_or_else(|| format!("bad resolution {text:?}"))?
            }
        };

        let mut group = CurveGroupKey::new(codec, width, height);
        if let Some(text) = self.fps.and_then(|i| field(record, i)) {
            let fps: f64 = text.parse().map_err(|_| format!("bad fps {text:?}"))?;
            if !(fps.is_finite() && fps > 0.0) {
                return Err(format!("fps out of range: {fps}"));
            }
            group = group.with_fps(fps);
        }
        if let Some(content) = self.content.and_then(|i| field(record, i)) {
            group = group.with_content(content);
        }

        let text = field(record, self.bitrate).ok_or("empty bitrate")?;
        let bitrate: f64 = text.parse().map_err(|_| format!("bad bitrate {text:?}"))?;
        let bitrate = bitrate * self.bitrate_scale;
        if !(bitrate.is_finite() && bitrate > 0.0) {
            return Err(format!("bitrate out of range: {bitrate}"));
        }

        Ok((group, bitrate))
    }
}

/// Reads [`RawSample`]s for one metric out of a CSV export.
#[derive(Debug, Clone)]
pub struct CsvSampleReader {
    schema: CsvSchema,
    metric: Metric,
}

impl CsvSampleReader {
    /// Create a reader for `metric` values.
    #[must_use]
    pub fn new(schema: CsvSchema, metric: Metric) -> Self {
        Self { schema, metric }
    }

    /// Reader relying on alias detection only.
    #[must_use]
    pub fn auto_detect(metric: Metric) -> Self {
        Self::new(CsvSchema::auto_detect(), metric)
    }

    /// Extract samples from CSV bytes.
    ///
    /// Missing required columns fail the whole read. Individual rows that
    /// cannot be parsed are skipped and counted in [`SampleBatch::skipped`].
    pub fn read(&self, data: &[u8]) -> Result<SampleBatch> {
        let mut reader = csv_reader(data);
        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

        let columns = GroupColumns::locate(&self.schema, &header_refs)?;
        let value_aliases: &[&str] = match self.metric {
            Metric::Vmaf => &["vmaf", "vmaf_mean", "vmaf_score", "vmaf score"],
            Metric::Ssim => &["ssim", "float_ssim", "ssim_mean", "all_ssim"],
        };
        let value_idx = find_column(&header_refs, self.schema.value_column.as_deref(), value_aliases)
            .ok_or_else(|| Error::MissingColumn(self.metric.name().to_string()))?;

        let mut batch = SampleBatch::default();
        for (line_num, record) in reader.records().enumerate() {
            let line = line_num + 2; // 1-based, after the header
            let parsed = record
                .map_err(|e| e.to_string())
                .and_then(|record| {
                    let (group, bitrate) = columns.parse(&record)?;
                    let text = field(&record, value_idx).ok_or("empty metric value")?;
                    let value: f64 = text.parse().map_err(|_| format!("bad metric value {text:?}"))?;
                    Ok((group, RawSample::new(bitrate, value)))
                });

            match parsed {
                Ok((group, sample)) => batch.push(group, sample),
                Err(reason) => {
                    warn!("{}", Error::MalformedRecord { line, reason });
                    batch.skipped += 1;
                }
            }
        }

        debug!(
            metric = %self.metric,
            samples = batch.len(),
            skipped = batch.skipped,
            "read CSV export"
        );
        Ok(batch)
    }
}

pub(crate) fn csv_reader(data: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data)
}

/// Non-empty field at `idx`.
pub(crate) fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).filter(|s| !s.is_empty())
}

fn parse_dimension(record: &StringRecord, idx: usize, name: &str) -> std::result::Result<u32, String> {
    let text = field(record, idx).ok_or_else(|| format!("empty {name}"))?;
    match text.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(format!("bad {name} {text:?}")),
    }
}

/// Parse `1920x1080`, `1920X1080` or `1920×1080`.
fn parse_resolution(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text
        .split_once(['x', 'X', '×'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Try the configured column name, then the aliases.
pub(crate) fn find_column(headers: &[&str], primary: Option<&str>, aliases: &[&str]) -> Option<usize> {
    if let Some(name) = primary {
        if let Some(idx) = find_header_index(headers, name) {
            return Some(idx);
        }
    }
    aliases
        .iter()
        .find_map(|alias| find_header_index(headers, alias))
}

/// Find a header index by name (case-insensitive).
fn find_header_index(headers: &[&str], name: &str) -> Option<usize> {
    let name_lower = name.to_lowercase();
    headers.iter().position(|h| h.to_lowercase() == name_lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder() {
        let schema = CsvSchema::builder()
            .codec_column("enc")
            .bitrate_column("bps")
            .bitrate_scale(0.001)
            .build();

        assert_eq!(schema.codec_column, Some("enc".to_string()));
        assert_eq!(schema.bitrate_column, Some("bps".to_string()));
        assert_eq!(schema.bitrate_scale, 0.001);
    }

    #[test]
    fn test_find_header_index() {
        let headers = ["Codec", "Width", "Bitrate_Kbps", "VMAF"];
        assert_eq!(find_header_index(&headers, "codec"), Some(0));
        assert_eq!(find_header_index(&headers, "VMAF"), Some(3));
        assert_eq!(find_header_index(&headers, "unknown"), None);
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_resolution("1280 X 720"), Some((1280, 720)));
        assert_eq!(parse_resolution("640×360"), Some((640, 360)));
        assert_eq!(parse_resolution("0x360"), None);
        assert_eq!(parse_resolution("1080p"), None);
    }

    #[test]
    fn test_read_split_dimensions() {
        let csv = "codec,width,height,fps,bitrate_kbps,vmaf\n\
                   x264,1920,1080,30,1000,40.5\n\
                   x264,1920,1080,30,2000,55\n";
        let batch = CsvSampleReader::auto_detect(Metric::Vmaf).read(csv.as_bytes()).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.skipped, 0);
        let (group, sample) = &batch.samples[0];
        assert_eq!(*group, CurveGroupKey::new("x264", 1920, 1080).with_fps(30.0));
        assert_eq!(*sample, RawSample::new(1000.0, 40.5));
    }

    #[test]
    fn test_read_combined_resolution_and_content() {
        let csv = "Encoder,Resolution,Clip,Kbps,SSIM\n\
                   vp9,1280x720,Big Buck Bunny,800,0.93\n";
        let batch = CsvSampleReader::auto_detect(Metric::Ssim).read(csv.as_bytes()).unwrap();

        let (group, sample) = &batch.samples[0];
        assert_eq!(group.content.as_deref(), Some("Big Buck Bunny"));
        assert_eq!((group.width, group.height), (1280, 720));
        assert_eq!(sample.value, 0.93);
    }

    #[test]
    fn test_read_skips_malformed_rows() {
        let csv = "codec,resolution,bitrate,vmaf\n\
                   x264,1920x1080,1000,40\n\
                   x264,1920x1080,abc,41\n\
                   x264,garbage,2000,50\n\
                   ,1920x1080,3000,60\n\
                   x264,1920x1080,-5,60\n\
                   x264,1920x1080,4000,\n\
                   x264,1920x1080\n\
                   x264,1920x1080,5000,70\n";
        let batch = CsvSampleReader::auto_detect(Metric::Vmaf).read(csv.as_bytes()).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.skipped, 6);
    }

    #[test]
    fn test_read_bitrate_scale() {
        let csv = "codec,resolution,bps,vmaf\nx265,3840x2160,4500000,90\n";
        let schema = CsvSchema::builder()
            .bitrate_column("bps")
            .bitrate_scale(0.001)
            .build();
        let batch = CsvSampleReader::new(schema, Metric::Vmaf).read(csv.as_bytes()).unwrap();

        assert_eq!(batch.samples[0].1.bitrate_kbps, 4500.0);
    }

    #[test]
    fn test_read_missing_columns() {
        let no_metric = "codec,resolution,bitrate\nx264,1920x1080,1000\n";
        assert!(matches!(
            CsvSampleReader::auto_detect(Metric::Vmaf).read(no_metric.as_bytes()),
            Err(Error::MissingColumn(_))
        ));

        let no_size = "codec,bitrate,vmaf\nx264,1000,40\n";
        assert!(matches!(
            CsvSampleReader::auto_detect(Metric::Vmaf).read(no_size.as_bytes()),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_configured_column_wins_over_alias() {
        let csv = "codec,resolution,bitrate,vmaf,vmaf_neg\nx264,1920x1080,1000,40,38\n";
        let schema = CsvSchema::builder().value_column("vmaf_neg").build();
        let batch = CsvSampleReader::new(schema, Metric::Vmaf).read(csv.as_bytes()).unwrap();

        assert_eq!(batch.samples[0].1.value, 38.0);
    }
}
