//! Quicktime review renders of a whole sequence.
//!
//! The host does the encoding. This module fixes the encoder parameters and
//! hands them to a [`SequenceExporter`].

use std::path::{Path, PathBuf};

use editmark_timeline::{Project, Sequence};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PublishError, Result};

// ── Encoder parameters ──────────────────────────────────────────

/// Fixed H.264 settings of a review render. Only the audio switch varies.
const H264_PARAMS: &[(&str, &str)] = &[
    ("Audio Codec", "linear PCM (wav)"),
    ("B Frames", "0"),
    ("Bit Depth", "32 bit(float)"),
    ("Bitrate", "28000.0"),
    ("Bitrate Tolerance", "0"),
    ("Codec", "H.264"),
    ("Codec Profile", "High 4:2:0 8-bit"),
    ("Data Range", "Video Range"),
    ("Fast Start", "True"),
    ("Format_height", "720"),
    ("Format_name", "HD_720"),
    ("Format_pixelAspect", "1.0"),
    ("Format_width", "1280"),
    ("GOP Size", "12"),
    ("Include Audio", "True"),
    ("Include Annotations", "False"),
    ("Output Channels", "stereo"),
    ("Quality", "High"),
    ("Quantizer Max", "3"),
    ("Quantizer Min", "1"),
    ("Reformat", "Custom"),
    ("Sample Rate", "48000 Hz"),
    ("Views", "main"),
    ("Write Timecode", "True"),
    ("YCbCr Matrix", "Auto"),
    ("center", "True"),
    ("colorspace", "default"),
    ("ocioDisplay", "default"),
    ("ocioView", "sRGB"),
    ("resize", "width"),
    ("transformType", "colorspace"),
];

/// A quicktime render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuicktimeExport {
    /// Output movie path.
    pub output_path: PathBuf,
    /// Mix the sequence audio into the movie.
    pub include_audio: bool,
}

impl QuicktimeExport {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            include_audio: true,
        }
    }

    pub fn with_audio(mut self, include_audio: bool) -> Self {
        self.include_audio = include_audio;
        self
    }

    /// Encoder parameter dictionary passed to the host.
    pub fn params(&self) -> IndexMap<String, String> {
        H264_PARAMS
            .iter()
            .map(|&(key, value)| {
                let value = match key {
                    "Include Audio" if !self.include_audio => "False",
                    _ => value,
                };
                (key.to_string(), value.to_string())
            })
            .collect()
    }
}

// ── Exporters ───────────────────────────────────────────────────

/// Host side of a sequence render.
pub trait SequenceExporter {
    /// False when the host cannot render sequences directly.
    fn is_available(&self) -> bool {
        true
    }

    fn export_sequence(
        &mut self,
        sequence: &Sequence,
        output_path: &Path,
        params: &IndexMap<String, String>,
    ) -> Result<()>;
}

/// Render job written for a host process to pick up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub sequence: String,
    pub output_path: PathBuf,
    pub params: IndexMap<String, String>,
}

/// Exporter writing a [`RenderJob`] JSON file instead of encoding.
#[derive(Debug, Clone)]
pub struct JobFileExporter {
    job_path: PathBuf,
}

impl JobFileExporter {
    pub fn new(job_path: impl Into<PathBuf>) -> Self {
        Self {
            job_path: job_path.into(),
        }
    }

    pub fn job_path(&self) -> &Path {
        &self.job_path
    }
}

impl SequenceExporter for JobFileExporter {
    fn export_sequence(
        &mut self,
        sequence: &Sequence,
        output_path: &Path,
        params: &IndexMap<String, String>,
    ) -> Result<()> {
        let job = RenderJob {
            sequence: sequence.name.clone(),
            output_path: output_path.to_path_buf(),
            params: params.clone(),
        };
        if let Some(parent) = self.job_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.job_path, serde_json::to_vec_pretty(&job)?)?;
        Ok(())
    }
}

/// Render a sequence of the project (the active one when `sequence` is
/// `None`) to a quicktime movie.
pub fn render_sequence_as_quicktime(
    project: &Project,
    sequence: Option<&str>,
    export: &QuicktimeExport,
    exporter: &mut dyn SequenceExporter,
) -> Result<()> {
    let sequence = match sequence {
        Some(name) => project
            .sequences
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PublishError::Creator(format!("Unknown sequence to render `{name}`")))?,
        None => project
            .active_sequence()
            .ok_or_else(|| PublishError::Creator("Project has no active sequence".into()))?,
    };
    if !exporter.is_available() {
        return Err(PublishError::Unsupported(
            "Direct sequence export is not available in this host".into(),
        ));
    }
    exporter.export_sequence(sequence, &export.output_path, &export.params())?;
    info!(
        sequence = %sequence.name,
        output = %export.output_path.display(),
        audio = export.include_audio,
        "rendered sequence"
    );
    Ok(())
}
