// Conversational relay client for the FraudGuard analysis backend: an
// in-memory transcript state machine, a dual-endpoint request dispatcher,
// response normalization, and an attachment/preview lifecycle manager.
// Rendering is someone else's job; everything here is headless.

// Declare the modules
pub mod api;
pub mod attachment;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod normalize;
pub mod preview;
pub mod prompts;
pub mod transcript;

pub use api::{HttpDispatcher, RawResponse, RequestDispatcher};
pub use attachment::{image_mime_from_path, AttachmentManager, StagedAttachment};
pub use config::RelayConfig;
pub use controller::{
    ConversationController, SubmitOutcome, SubmitRejection, GREETING,
};
pub use error::{AttachmentError, DispatchError, TranscriptError};
pub use models::{
    AttachmentMeta, ConversationEvent, Message, MessageContent, MessageKind, MessageState, Role,
};
pub use normalize::{normalize, NormalizedBody};
pub use preview::{PreviewId, PreviewStore};
pub use transcript::TranscriptStore;
