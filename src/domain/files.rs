use serde::Deserialize;

/// A file attached to an analysis request.
///
/// Multipart uploads arrive as raw bytes; camera captures arrive as base64
/// records inside JSON. Both collapse into [`TransportFile`] before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHandle {
    Binary {
        name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    Base64 {
        name: String,
        content_type: String,
        data: String,
    },
}

impl FileHandle {
    pub fn name(&self) -> &str {
        match self {
            Self::Binary { name, .. } | Self::Base64 { name, .. } => name,
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Self::Binary { content_type, .. } | Self::Base64 { content_type, .. } => content_type,
        }
    }

    /// Size in bytes once decoded. Base64 payloads are estimated from their length.
    pub fn approx_size(&self) -> usize {
        match self {
            Self::Binary { bytes, .. } => bytes.len(),
            Self::Base64 { data, .. } => {
                let payload = data.rsplit_once("base64,").map_or(data.as_str(), |(_, b)| b);
                payload.len() / 4 * 3
            }
        }
    }
}

/// Wire shape of a captured file: `{ name, type, data }`.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub data: String,
}

impl From<CapturedFile> for FileHandle {
    fn from(f: CapturedFile) -> Self {
        // Cameras sometimes leave the type out but send a data URL
        let content_type = if f.content_type.trim().is_empty() {
            crate::pipeline::normalizer::data_url_content_type(&f.data)
                .unwrap_or_default()
                .to_string()
        } else {
            f.content_type
        };

        Self::Base64 {
            name: f.name,
            content_type,
            data: f.data,
        }
    }
}

/// A decoded file ready to become one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
