//! libvmaf JSON reports and the CSV index that lists them.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use super::export::{CsvSchema, GroupColumns, csv_reader, field, find_column};
use crate::curve::{CurveGroupKey, Metric, RawSample, SampleBatch};
use crate::error::{Error, Result};

/// The parts of a libvmaf JSON report that are read.
#[derive(Debug, Default, Deserialize)]
pub struct VmafReport {
    /// Per-frame scores.
    #[serde(default)]
    pub frames: Vec<VmafFrame>,
    /// Pooled scores keyed by metric feature name.
    #[serde(default)]
    pub pooled_metrics: HashMap<String, PooledMetric>,
}

/// One frame entry.
#[derive(Debug, Default, Deserialize)]
pub struct VmafFrame {
    /// Frame index.
    #[serde(rename = "frameNum", default)]
    pub frame_num: u64,
    /// Feature name to score. Null scores are kept as `None`.
    #[serde(default)]
    pub metrics: HashMap<String, Option<f64>>,
}

/// Pooled statistics for one feature.
#[derive(Debug, Default, Deserialize)]
pub struct PooledMetric {
    /// Mean over frames.
    pub mean: Option<f64>,
}

impl VmafReport {
    /// Parse a report from JSON bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Mean of the finite per-frame values of `metric`.
    ///
    /// The first feature name in [`Metric::report_keys`] that has any frame
    /// values is used. Without frames, falls back to the pooled mean.
    #[must_use]
    pub fn score(&self, metric: Metric) -> Option<f64> {
        for key in metric.report_keys() {
            let values: Vec<f64> = self
                .frames
                .iter()
                .filter_map(|f| f.metrics.get(*key).copied().flatten())
                .collect();
            if let Some(mean) = crate::stats::mean(&values) {
                return Some(mean);
            }
        }

        metric
            .report_keys()
            .iter()
            .filter_map(|key| self.pooled_metrics.get(*key))
            .find_map(|p| p.mean.filter(|m| m.is_finite()))
    }
}

/// One encode listed in a VMAF index.
#[derive(Debug, Clone, PartialEq)]
pub struct VmafIndexEntry {
    /// Curve group of the encode.
    pub group: CurveGroupKey,
    /// Encoded bitrate in kbps.
    pub bitrate_kbps: f64,
    /// Path or URL of the frame report.
    pub report: String,
}

/// Entries of a VMAF index plus the number of malformed rows skipped.
#[derive(Debug, Clone, Default)]
pub struct VmafIndex {
    /// Encodes, in file order.
    pub entries: Vec<VmafIndexEntry>,
    /// Rows that could not be parsed.
    pub skipped: usize,
}

impl VmafIndex {
    /// Read an index CSV (`content, codec, width, height, fps?, bitrate_kbps, report`).
    ///
    /// The content column is required here; per-clip curves are keyed on it.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut reader = csv_reader(data);
        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

        let columns = GroupColumns::locate(&CsvSchema::auto_detect(), &header_refs)?;
        let report_idx = find_column(&header_refs, None, &["report", "report_url", "json", "vmaf_json", "log"])
            .ok_or_else(|| Error::MissingColumn("report".to_string()))?;

        let mut index = Self::default();
        for (line_num, record) in reader.records().enumerate() {
            let line = line_num + 2;
            let parsed = record.map_err(|e| e.to_string()).and_then(|record| {
                let (group, bitrate_kbps) = columns.parse(&record)?;
                if group.content.is_none() {
                    return Err("empty content".to_string());
                }
                let report = field(&record, report_idx).ok_or("empty report location")?;
                Ok(VmafIndexEntry {
                    group,
                    bitrate_kbps,
                    report: report.to_string(),
                })
            });

            match parsed {
                Ok(entry) => index.entries.push(entry),
                Err(reason) => {
                    warn!("{}", Error::MalformedRecord { line, reason });
                    index.skipped += 1;
                }
            }
        }

        debug!(entries = index.entries.len(), skipped = index.skipped, "read VMAF index");
        Ok(index)
    }

    /// Report locations, in entry order.
    #[must_use]
    pub fn locations(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.report.as_str()).collect()
    }

    /// Turn fetched report bodies (in entry order) into samples.
    ///
    /// A report that does not parse or carries no usable score fails the run
    /// with [`Error::SourceUnavailable`] naming the report.
    pub fn samples(&self, reports: &[Vec<u8>], metric: Metric) -> Result<SampleBatch> {
        if reports.len() != self.entries.len() {
            return Err(Error::InvalidConfig(format!(
                "{} reports for {} index entries",
                reports.len(),
                self.entries.len()
            )));
        }

        let mut batch = SampleBatch {
            samples: Vec::with_capacity(self.entries.len()),
            skipped: self.skipped,
        };
        for (entry, body) in self.entries.iter().zip(reports) {
            let unavailable = |reason: String| Error::SourceUnavailable {
                resource: entry.report.clone(),
                attempts: 1,
                reason,
            };
            let report = VmafReport::parse(body).map_err(|e| unavailable(e.to_string()))?;
            let value = report
                .score(metric)
                .ok_or_else(|| unavailable(format!("no {metric} scores in report")))?;
            batch.push(entry.group.clone(), RawSample::new(entry.bitrate_kbps, value));
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "version": "2.3.1",
        "frames": [
            {"frameNum": 0, "metrics": {"vmaf": 80.0, "float_ssim": 0.95}},
            {"frameNum": 1, "metrics": {"vmaf": 90.0, "float_ssim": 0.97}},
            {"frameNum": 2, "metrics": {"vmaf": null}}
        ],
        "pooled_metrics": {"vmaf": {"min": 80.0, "max": 90.0, "mean": 85.5}}
    }"#;

    #[test]
    fn test_score_averages_frames() {
        let report = VmafReport::parse(REPORT.as_bytes()).unwrap();
        assert_eq!(report.frames.len(), 3);
        assert_eq!(report.score(Metric::Vmaf), Some(85.0));
        assert!((report.score(Metric::Ssim).unwrap() - 0.96).abs() < 1e-12);
    }

    #[test]
    fn test_score_falls_back_to_pooled() {
        let json = r#"{"pooled_metrics": {"vmaf": {"mean": 72.25}}}"#;
        let report = VmafReport::parse(json.as_bytes()).unwrap();
        assert_eq!(report.score(Metric::Vmaf), Some(72.25));
        assert_eq!(report.score(Metric::Ssim), None);
    }

    #[test]
    fn test_read_index() {
        let csv = "content,codec,width,height,fps,bitrate_kbps,report\n\
                   Big Buck Bunny,x264,1920,1080,24,1500,bbb/1500.json\n\
                   Big Buck Bunny,x264,1920,1080,24,abc,bbb/bad.json\n\
                   ,x264,1920,1080,24,1500,orphan.json\n\
                   Sintel,x264,1920,1080,,3000,https://example.org/sintel.json\n";
        let index = VmafIndex::read(csv.as_bytes()).unwrap();

        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.skipped, 2);
        assert_eq!(index.locations(), vec!["bbb/1500.json", "https://example.org/sintel.json"]);
        assert_eq!(index.entries[0].group.fps, Some(24.0));
        assert_eq!(index.entries[1].group.fps, None);
    }

    #[test]
    fn test_samples_from_reports() {
        let csv = "content,codec,width,height,bitrate_kbps,report\n\
                   clip,x264,1280,720,800,a.json\n\
                   clip,x264,1280,720,800,b.json\n";
        let index = VmafIndex::read(csv.as_bytes()).unwrap();
        let reports = vec![
            br#"{"frames":[{"frameNum":0,"metrics":{"vmaf":60.0}}]}"#.to_vec(),
            br#"{"frames":[{"frameNum":0,"metrics":{"vmaf":64.0}}]}"#.to_vec(),
        ];

        let batch = index.samples(&reports, Metric::Vmaf).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.samples[1].1, RawSample::new(800.0, 64.0));
    }

    #[test]
    fn test_unusable_report_is_fatal() {
        let csv = "content,codec,width,height,bitrate_kbps,report\nclip,x264,1280,720,800,a.json\n";
        let index = VmafIndex::read(csv.as_bytes()).unwrap();

        let err = index.samples(&[b"{\"frames\":[]}".to_vec()], Metric::Vmaf).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { ref resource, .. } if resource == "a.json"));

        let err = index.samples(&[b"not json".to_vec()], Metric::Vmaf).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }
}
