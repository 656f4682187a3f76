//! Collapses uploaded and captured files into one transport set.

use base64::Engine;

use crate::domain::{FileHandle, TransportFile};
use crate::error::{FileDecodeFailure, PipelineError};

impl FileHandle {
    /// Convert into the binary form sent to the analysis service.
    pub fn to_transport_binary(self) -> Result<TransportFile, FileDecodeFailure> {
        match self {
            Self::Binary {
                name,
                content_type,
                bytes,
            } => Ok(TransportFile {
                name,
                content_type,
                bytes,
            }),
            Self::Base64 {
                name,
                content_type,
                data,
            } => match decode_capture(&data) {
                Ok(bytes) => Ok(TransportFile {
                    name,
                    content_type,
                    bytes,
                }),
                Err(reason) => Err(FileDecodeFailure { name, reason }),
            },
        }
    }
}

/// Decode every file, or fail with one entry per file that could not be decoded.
pub fn normalize(files: Vec<FileHandle>) -> Result<Vec<TransportFile>, PipelineError> {
    let mut decoded = Vec::with_capacity(files.len());
    let mut failures = Vec::new();

    for file in files {
        match file.to_transport_binary() {
            Ok(f) => decoded.push(f),
            Err(failure) => {
                tracing::warn!(file = %failure.name, reason = %failure.reason, "File decode failed");
                failures.push(failure);
            }
        }
    }

    if failures.is_empty() {
        Ok(decoded)
    } else {
        Err(PipelineError::FileDecode(failures))
    }
}

/// Decode a capture payload, tolerating a `data:<mime>;base64,` prefix and
/// line-wrapped base64.
fn decode_capture(data: &str) -> Result<Vec<u8>, String> {
    let payload = match data.split_once("base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if compact.is_empty() {
        return Err("empty data".to_string());
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64: {e}"))?;

    if bytes.is_empty() {
        return Err("empty data".to_string());
    }

    Ok(bytes)
}

/// Content type declared by a data URL prefix, if any.
pub fn data_url_content_type(data: &str) -> Option<&str> {
    let rest = data.strip_prefix("data:")?;
    let (mime, _) = rest.split_once(';')?;
    (!mime.is_empty()).then_some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn capture(name: &str, data: String) -> FileHandle {
        FileHandle::Base64 {
            name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data,
        }
    }

    #[test]
    fn test_captured_file_round_trips_byte_for_byte() {
        let original: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let files = vec![capture("foto.jpg", STANDARD.encode(&original))];

        let out = normalize(files).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes, original);
        assert_eq!(out[0].name, "foto.jpg");
        assert_eq!(out[0].content_type, "image/jpeg");
    }

    #[test]
    fn test_accepts_data_url_and_wrapped_lines() {
        let encoded = STANDARD.encode(b"tebligat icerigi");
        let wrapped = format!("data:image/jpeg;base64,{}\n{}", &encoded[..8], &encoded[8..]);

        let out = normalize(vec![capture("kamera.jpg", wrapped)]).unwrap();
        assert_eq!(out[0].bytes, b"tebligat icerigi");
    }

    #[test]
    fn test_binary_files_pass_through_in_order() {
        let files = vec![
            FileHandle::Binary {
                name: "a.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: vec![1, 2, 3],
            },
            capture("b.jpg", STANDARD.encode([9u8, 8, 7])),
        ];

        let out = normalize(files).unwrap();
        assert_eq!(out[0].bytes, vec![1, 2, 3]);
        assert_eq!(out[1].bytes, vec![9, 8, 7]);
    }

    #[test]
    fn test_reports_every_bad_file() {
        let files = vec![
            capture("bos.jpg", String::new()),
            capture("iyi.jpg", STANDARD.encode(b"ok")),
            capture("bozuk.jpg", "@@not-base64@@".to_string()),
        ];

        match normalize(files).unwrap_err() {
            PipelineError::FileDecode(failures) => {
                let names: Vec<_> = failures.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, vec!["bos.jpg", "bozuk.jpg"]);
                assert_eq!(failures[0].reason, "empty data");
            }
            other => panic!("expected FileDecode, got {other:?}"),
        }
    }

    #[test]
    fn test_data_url_content_type() {
        assert_eq!(data_url_content_type("data:image/png;base64,AAAA"), Some("image/png"));
        assert_eq!(data_url_content_type("AAAA"), None);
    }
}
