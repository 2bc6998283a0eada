use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Photo,
    Signature,
    IdProof,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Photo => "photo",
            DocumentType::Signature => "signature",
            DocumentType::IdProof => "id_proof",
        }
    }
}

/// Upload policy for one document type.
pub struct DocSpec {
    pub mime_types: &'static [&'static str],
    pub max_bytes: usize,
    /// Exact pixel dimensions, when the type requires them.
    pub dimensions: Option<(usize, usize)>,
}

pub fn spec_for(doc_type: DocumentType) -> &'static DocSpec {
    match doc_type {
        DocumentType::Photo => &DocSpec {
            mime_types: &["image/jpeg"],
            max_bytes: 50 * 1024,
            dimensions: Some((350, 450)),
        },
        DocumentType::Signature => &DocSpec {
            mime_types: &["image/png", "image/jpeg"],
            max_bytes: 30 * 1024,
            dimensions: Some((600, 300)),
        },
        DocumentType::IdProof => &DocSpec {
            mime_types: &["image/jpeg", "image/png", "application/pdf"],
            max_bytes: 500 * 1024,
            dimensions: None,
        },
    }
}

pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// MIME check shared by the direct upload and the presigned-URL mint.
pub fn validate_mime(doc_type: DocumentType, content_type: &str) -> Result<(), ApiError> {
    let spec = spec_for(doc_type);
    if !spec.mime_types.contains(&content_type) {
        return Err(ApiError::Upload {
            code: "INVALID_FILE_TYPE",
            error: format!(
                "Invalid file type for {}. Allowed: {}",
                doc_type.as_str(),
                spec.mime_types.join(", ")
            ),
        });
    }
    Ok(())
}

/// Full policy check against the uploaded bytes. Nothing is written to
/// storage unless this passes.
pub fn validate_file(
    doc_type: DocumentType,
    content_type: &str,
    bytes: &[u8],
) -> Result<(), ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::Upload {
            code: "NO_FILE",
            error: "No file was uploaded".into(),
        });
    }
    validate_mime(doc_type, content_type)?;
    let spec = spec_for(doc_type);
    if bytes.len() > spec.max_bytes {
        return Err(ApiError::Upload {
            code: "FILE_TOO_LARGE",
            error: format!(
                "File exceeds the {} KB limit for {}",
                spec.max_bytes / 1024,
                doc_type.as_str()
            ),
        });
    }
    if let Some((width, height)) = spec.dimensions {
        let size = imagesize::blob_size(bytes).map_err(|_| ApiError::Upload {
            code: "DIMENSION_READ_ERROR",
            error: "Could not read image dimensions".into(),
        })?;
        if size.width != width || size.height != height {
            return Err(ApiError::Upload {
                code: "INVALID_DIMENSIONS",
                error: format!(
                    "{} must be exactly {width}x{height} px, got {}x{}",
                    doc_type.as_str(),
                    size.width,
                    size.height
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(err: ApiError) -> &'static str {
        match err {
            ApiError::Upload { code, .. } => code,
            other => panic!("expected upload error, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_is_no_file() {
        let err = validate_file(DocumentType::Photo, "image/jpeg", &[]).unwrap_err();
        assert_eq!(code(err), "NO_FILE");
    }

    #[test]
    fn photo_only_accepts_jpeg() {
        let err = validate_file(DocumentType::Photo, "image/png", &[1, 2, 3]).unwrap_err();
        assert_eq!(code(err), "INVALID_FILE_TYPE");
    }

    #[test]
    fn oversized_id_proof_is_rejected() {
        let bytes = vec![0u8; 500 * 1024 + 1];
        let err = validate_file(DocumentType::IdProof, "application/pdf", &bytes).unwrap_err();
        assert_eq!(code(err), "FILE_TOO_LARGE");
    }

    #[test]
    fn id_proof_skips_dimension_checks() {
        // %PDF header, not an image; must still pass since id_proof has no
        // dimension rule.
        let bytes = b"%PDF-1.4 minimal".to_vec();
        assert!(validate_file(DocumentType::IdProof, "application/pdf", &bytes).is_ok());
    }

    #[test]
    fn garbage_photo_bytes_fail_dimension_read() {
        let err = validate_file(DocumentType::Photo, "image/jpeg", &[0xFF; 64]).unwrap_err();
        assert_eq!(code(err), "DIMENSION_READ_ERROR");
    }

    #[test]
    fn signature_with_wrong_dimensions_is_rejected() {
        // 1x1 PNG.
        let png: &[u8] = &[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
            0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
            0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78,
            0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
            0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
        ];
        let err = validate_file(DocumentType::Signature, "image/png", png).unwrap_err();
        assert_eq!(code(err), "INVALID_DIMENSIONS");
    }
}
