use std::path::Path;
use std::sync::Arc;

use crate::error::AttachmentError;
use crate::preview::{PreviewId, PreviewStore};

/// The file currently staged in the composer, plus its live preview handle.
#[derive(Clone, Debug)]
pub struct StagedAttachment {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
    pub mime: String,
    pub preview: PreviewId,
}

/// The raw payload handed to the dispatcher once an attachment is consumed.
/// Its composer preview handle has already been revoked by then; the
/// transcript bubble gets a handle of its own.
#[derive(Clone, Debug)]
pub struct AttachmentPayload {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
    pub mime: String,
}

// Owns at most one staged attachment per composition cycle. Every
// successful attach revokes the previous preview handle before creating the
// next one, so exactly one composer handle is ever live.
pub struct AttachmentManager {
    previews: Arc<PreviewStore>,
    current: Option<StagedAttachment>,
}

impl AttachmentManager {
    pub fn new(previews: Arc<PreviewStore>) -> Self {
        Self {
            previews,
            current: None,
        }
    }

    /// Stages a file for the next send. Non-image MIME types are rejected
    /// and the current attachment is left untouched.
    pub fn attach(
        &mut self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: impl Into<String>,
    ) -> Result<StagedAttachment, AttachmentError> {
        let mime = mime.into();
        if !mime.starts_with("image/") {
            log::warn!("Rejected attachment with MIME type {}", mime);
            return Err(AttachmentError::InvalidAttachment { mime });
        }

        // Release the previous handle before acquiring the next one.
        if let Some(prior) = self.current.take() {
            self.previews.revoke(prior.preview);
        }

        let bytes = Arc::new(bytes);
        let preview = self.previews.create(Arc::clone(&bytes), mime.clone());
        let file_name = file_name.into();
        log::info!(
            "Staged attachment '{}' ({} bytes, {})",
            file_name,
            bytes.len(),
            mime
        );

        let staged = StagedAttachment {
            file_name,
            bytes,
            mime,
            preview,
        };
        self.current = Some(staged.clone());
        Ok(staged)
    }

    /// Drops the staged attachment and revokes its preview handle. No-op
    /// when nothing is staged.
    pub fn clear(&mut self) {
        if let Some(prior) = self.current.take() {
            self.previews.revoke(prior.preview);
        }
    }

    pub fn current(&self) -> Option<&StagedAttachment> {
        self.current.as_ref()
    }

    /// Consumes the staged attachment for a send: revokes the composer's
    /// preview handle and hands the payload to the caller.
    pub fn take(&mut self) -> Option<AttachmentPayload> {
        let staged = self.current.take()?;
        self.previews.revoke(staged.preview);
        Some(AttachmentPayload {
            file_name: staged.file_name,
            bytes: staged.bytes,
            mime: staged.mime,
        })
    }
}

/// Best-effort image MIME type from a file extension, for picking files off
/// disk. Anything unrecognized comes back `None` and will be rejected by
/// [`AttachmentManager::attach`].
pub fn image_mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    match ext.to_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (AttachmentManager, Arc<PreviewStore>) {
        let previews = Arc::new(PreviewStore::new());
        (AttachmentManager::new(Arc::clone(&previews)), previews)
    }

    #[test]
    fn attach_rejects_non_image_and_keeps_state() {
        let (mut mgr, previews) = manager();
        mgr.attach("shot.png", vec![1], "image/png").unwrap();

        let err = mgr
            .attach("notes.pdf", vec![2], "application/pdf")
            .unwrap_err();
        assert_eq!(
            err,
            AttachmentError::InvalidAttachment {
                mime: "application/pdf".into()
            }
        );
        // The previously staged image survives the rejection.
        assert_eq!(mgr.current().unwrap().file_name, "shot.png");
        assert_eq!(previews.live_count(), 1);
    }

    #[test]
    fn reattach_revokes_the_prior_preview() {
        let (mut mgr, previews) = manager();
        let first = mgr.attach("a.png", vec![1], "image/png").unwrap().preview;
        let second = mgr.attach("b.jpg", vec![2], "image/jpeg").unwrap().preview;

        assert_ne!(first, second);
        assert_eq!(previews.live_count(), 1);
        assert!(previews.resolve(first).is_none());
        assert!(previews.resolve(second).is_some());
    }

    #[test]
    fn clear_revokes_and_is_idempotent() {
        let (mut mgr, previews) = manager();
        mgr.attach("a.png", vec![1], "image/png").unwrap();
        mgr.clear();
        mgr.clear();
        assert!(mgr.current().is_none());
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn take_consumes_and_revokes_composer_handle() {
        let (mut mgr, previews) = manager();
        mgr.attach("a.png", vec![9, 9], "image/png").unwrap();

        let payload = mgr.take().expect("payload");
        assert_eq!(payload.file_name, "a.png");
        assert_eq!(*payload.bytes, vec![9, 9]);
        assert!(mgr.current().is_none());
        assert_eq!(previews.live_count(), 0);

        assert!(mgr.take().is_none());
    }

    #[test]
    fn mime_sniffing_covers_the_supported_extensions() {
        assert_eq!(
            image_mime_from_path(Path::new("x.PNG")),
            Some("image/png")
        );
        assert_eq!(
            image_mime_from_path(Path::new("x.jpeg")),
            Some("image/jpeg")
        );
        assert_eq!(image_mime_from_path(Path::new("x.webp")), Some("image/webp"));
        assert_eq!(image_mime_from_path(Path::new("x.pdf")), None);
        assert_eq!(image_mime_from_path(Path::new("x")), None);
    }
}
