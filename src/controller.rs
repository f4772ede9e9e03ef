use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::api::RequestDispatcher;
use crate::attachment::{AttachmentManager, AttachmentPayload, StagedAttachment};
use crate::config::RelayConfig;
use crate::error::AttachmentError;
use crate::models::{
    AttachmentMeta, ConversationEvent, Message, MessageContent, MessageState,
};
use crate::normalize::normalize;
use crate::preview::{PreviewId, PreviewStore};
use crate::transcript::TranscriptStore;

/// Seeded as the first transcript message of every conversation.
pub const GREETING: &str = "Hi! Paste a suspicious message, phone number, or link and I'll analyze whether it's a scam.\n\nYou can also start from one of the example prompts.";

// Fixed user-safe failure strings; the real error detail goes to the log.
pub const TEXT_FAILURE_NOTICE: &str = "Sorry, I couldn't reach the analyzer. Please try again.";
pub const UPLOAD_FAILURE_NOTICE: &str = "Upload failed. Please try again.";

/// Why a submit was ignored. Both cases are no-ops: the transcript is
/// untouched and the composer keeps its contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitRejection {
    /// No attachment staged and the draft is empty or whitespace.
    NothingToSend,
    /// A previous send has not resolved yet (single-flight rule).
    AlreadyInFlight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The cycle ran to completion; the placeholder with this id is now
    /// `Final` or `Error`.
    Completed { message_id: Uuid },
    Rejected(SubmitRejection),
}

// Orchestrates one send cycle: read the composer, append the user message
// and a pending placeholder, dispatch, normalize, resolve. One conversation
// per controller, created once per session and torn down with the view.
pub struct ConversationController {
    transcript: Arc<Mutex<TranscriptStore>>,
    attachments: Mutex<AttachmentManager>,
    previews: Arc<PreviewStore>,
    dispatcher: Arc<dyn RequestDispatcher>,
    timeout: Duration,
    in_flight: AtomicBool,
    draft: Mutex<String>,
    // Bubble preview handles owned by the conversation, released at teardown.
    bubble_previews: Mutex<Vec<PreviewId>>,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationController {
    pub fn new(dispatcher: Arc<dyn RequestDispatcher>, config: &RelayConfig) -> Self {
        let previews = Arc::new(PreviewStore::new());
        let mut transcript = TranscriptStore::new();
        transcript.append(Message::assistant_final(GREETING));
        let (events, _) = broadcast::channel(64);

        Self {
            transcript: Arc::new(Mutex::new(transcript)),
            attachments: Mutex::new(AttachmentManager::new(Arc::clone(&previews))),
            previews,
            dispatcher,
            timeout: config.timeout,
            in_flight: AtomicBool::new(false),
            draft: Mutex::new(String::new()),
            bubble_previews: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Subscribe to transcript change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Ordered copy of the transcript for rendering.
    pub async fn transcript(&self) -> Vec<Message> {
        self.transcript.lock().await.snapshot()
    }

    /// Resolver for preview handles referenced by image bubbles.
    pub fn previews(&self) -> &Arc<PreviewStore> {
        &self.previews
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        *self.draft.lock().await = text.into();
    }

    pub async fn draft(&self) -> String {
        self.draft.lock().await.clone()
    }

    /// Stages an image attachment for the next send.
    pub async fn attach(
        &self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: impl Into<String>,
    ) -> Result<StagedAttachment, AttachmentError> {
        let mut attachments = self.attachments.lock().await;
        attachments.attach(file_name, bytes, mime)
    }

    pub async fn clear_attachment(&self) {
        self.attachments.lock().await.clear();
    }

    pub async fn current_attachment(&self) -> Option<StagedAttachment> {
        self.attachments.lock().await.current().cloned()
    }

    fn emit(&self, event: ConversationEvent) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }

    /// Runs one send cycle. An attachment takes precedence over the draft;
    /// the draft text is discarded for an image cycle. Rejections are
    /// no-ops, not errors.
    pub async fn submit(&self) -> SubmitOutcome {
        // Single-flight: claim the in-flight slot or bail out.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::info!("Submit ignored: a send is already in flight");
            return SubmitOutcome::Rejected(SubmitRejection::AlreadyInFlight);
        }

        // Pick the payload. Consuming the attachment clears the composer
        // immediately, before the outcome is known, so a stale file can
        // never be resent.
        let attachment: Option<AttachmentPayload> = {
            let mut attachments = self.attachments.lock().await;
            attachments.take()
        };

        let text = match &attachment {
            Some(_) => None,
            None => {
                let mut draft = self.draft.lock().await;
                let trimmed = draft.trim().to_string();
                if trimmed.is_empty() {
                    self.in_flight.store(false, Ordering::SeqCst);
                    return SubmitOutcome::Rejected(SubmitRejection::NothingToSend);
                }
                // Clear the draft on accept, not on resolution, so composing
                // the next message is never blocked by a slow reply.
                draft.clear();
                Some(trimmed)
            }
        };

        // Optimistic append: user message, then the pending placeholder.
        let pending_id = {
            let mut transcript = self.transcript.lock().await;

            let user_message = match &attachment {
                Some(payload) => {
                    // A second handle for the bubble: clearing the composer
                    // must never blank an already-sent thumbnail.
                    let preview = self
                        .previews
                        .create(Arc::clone(&payload.bytes), payload.mime.clone());
                    self.bubble_previews.lock().await.push(preview);
                    Message::user_image(AttachmentMeta {
                        preview,
                        file_name: payload.file_name.clone(),
                        size_bytes: payload.bytes.len() as u64,
                    })
                }
                None => Message::user_text(text.as_deref().unwrap_or_default()),
            };

            let user_id = transcript.append(user_message);
            self.emit(ConversationEvent::MessageAppended(user_id));

            let pending_id = transcript.append(Message::pending_placeholder());
            self.emit(ConversationEvent::MessageAppended(pending_id));
            pending_id
        };

        // The only suspension point: the backend call. No locks are held
        // here, and the single-flight guard keeps mutations serialized.
        let (result, failure_notice) = match &attachment {
            Some(payload) => (
                self.dispatcher.send_image(payload, self.timeout).await,
                UPLOAD_FAILURE_NOTICE,
            ),
            None => (
                self.dispatcher
                    .send_text(text.as_deref().unwrap_or_default(), self.timeout)
                    .await,
                TEXT_FAILURE_NOTICE,
            ),
        };

        let (state, content) = match result {
            Ok(raw) => {
                let reply = normalize(&raw.body, raw.content_type.as_deref()).into_text();
                (MessageState::Final, reply)
            }
            Err(e) => {
                log::error!("Dispatch failed, surfacing generic notice: {:?}", e);
                (MessageState::Error, failure_notice.to_string())
            }
        };

        {
            let mut transcript = self.transcript.lock().await;
            if let Err(e) =
                transcript.resolve(pending_id, state, MessageContent::Text(content))
            {
                // The placeholder is no longer pending; nothing to do but
                // note it. The first resolution stands.
                log::error!("Placeholder resolution rejected: {}", e);
            } else {
                self.emit(ConversationEvent::MessageResolved(pending_id));
            }
        }

        self.in_flight.store(false, Ordering::SeqCst);
        SubmitOutcome::Completed {
            message_id: pending_id,
        }
    }

    /// Releases every preview handle the conversation still owns: the
    /// composer's staged attachment and all sent image bubbles. Call when
    /// the owning view goes away.
    pub async fn teardown(&self) {
        self.attachments.lock().await.clear();
        let mut bubbles = self.bubble_previews.lock().await;
        for preview in bubbles.drain(..) {
            self.previews.revoke(preview);
        }
        log::info!("Conversation torn down, all preview handles released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawResponse;
    use crate::error::DispatchError;
    use crate::models::{MessageKind, Role};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Sent {
        Text(String),
        Image { file_name: String, mime: String },
    }

    // Scripted dispatcher: records what was sent and plays back a fixed
    // result, optionally waiting for a release signal first.
    struct ScriptedDispatcher {
        sent: StdMutex<Vec<Sent>>,
        result: Box<dyn Fn() -> Result<RawResponse, DispatchError> + Send + Sync>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedDispatcher {
        fn replying(body: &str, content_type: &str) -> Self {
            let body = body.to_string();
            let content_type = content_type.to_string();
            Self {
                sent: StdMutex::new(Vec::new()),
                result: Box::new(move || {
                    Ok(RawResponse {
                        body: body.clone(),
                        content_type: Some(content_type.clone()),
                    })
                }),
                gate: None,
            }
        }

        fn failing(make: impl Fn() -> DispatchError + Send + Sync + 'static) -> Self {
            Self {
                sent: StdMutex::new(Vec::new()),
                result: Box::new(move || Err(make())),
                gate: None,
            }
        }

        fn gated(body: &str, gate: Arc<Notify>) -> Self {
            let mut this = Self::replying(body, "text/plain");
            this.gate = Some(gate);
            this
        }

        async fn run(&self) -> Result<RawResponse, DispatchError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            (self.result)()
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RequestDispatcher for ScriptedDispatcher {
        async fn send_text(
            &self,
            message: &str,
            _timeout: Duration,
        ) -> Result<RawResponse, DispatchError> {
            self.sent.lock().unwrap().push(Sent::Text(message.to_string()));
            self.run().await
        }

        async fn send_image(
            &self,
            payload: &AttachmentPayload,
            _timeout: Duration,
        ) -> Result<RawResponse, DispatchError> {
            self.sent.lock().unwrap().push(Sent::Image {
                file_name: payload.file_name.clone(),
                mime: payload.mime.clone(),
            });
            self.run().await
        }
    }

    fn controller(dispatcher: ScriptedDispatcher) -> (ConversationController, Arc<ScriptedDispatcher>) {
        let dispatcher = Arc::new(dispatcher);
        let controller =
            ConversationController::new(dispatcher.clone(), &RelayConfig::default());
        (controller, dispatcher)
    }

    #[tokio::test]
    async fn text_send_happy_path() {
        let (controller, dispatcher) =
            controller(ScriptedDispatcher::replying(r#"{"reply":"Looks safe"}"#, "application/json"));

        controller.set_draft("Hello").await;
        let outcome = controller.submit().await;

        let transcript = controller.transcript().await;
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].state, MessageState::Final); // greeting
        assert_eq!(transcript[1].role, Role::User);
        assert_eq!(transcript[1].content, MessageContent::Text("Hello".into()));
        let tail = &transcript[2];
        assert_eq!(tail.role, Role::Assistant);
        assert_eq!(tail.state, MessageState::Final);
        assert_eq!(tail.content, MessageContent::Text("Looks safe".into()));
        assert_eq!(outcome, SubmitOutcome::Completed { message_id: tail.id });

        assert!(!controller.is_in_flight());
        assert_eq!(controller.draft().await, "");
        assert_eq!(dispatcher.sent(), vec![Sent::Text("Hello".into())]);
    }

    #[tokio::test]
    async fn http_failure_resolves_to_generic_error() {
        let (controller, _) = controller(ScriptedDispatcher::failing(|| DispatchError::Http {
            status: 500,
            body: "internal".into(),
        }));

        controller.set_draft("Is this a scam?").await;
        controller.submit().await;

        let transcript = controller.transcript().await;
        let tail = transcript.last().unwrap();
        assert_eq!(tail.state, MessageState::Error);
        assert_eq!(
            tail.content,
            MessageContent::Text(TEXT_FAILURE_NOTICE.into())
        );
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn timeout_resolves_to_error_and_frees_the_slot() {
        let (controller, _) = controller(ScriptedDispatcher::failing(|| {
            DispatchError::Timeout { elapsed_secs: 60 }
        }));

        controller.set_draft("slow one").await;
        controller.submit().await;

        let transcript = controller.transcript().await;
        assert_eq!(transcript.last().unwrap().state, MessageState::Error);
        assert!(!controller.is_in_flight());

        // Back to idle: a fresh submit is accepted.
        controller.set_draft("again").await;
        let outcome = controller.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn empty_submit_is_a_no_op() {
        let (controller, dispatcher) =
            controller(ScriptedDispatcher::replying("All clear", "text/plain"));

        controller.set_draft("   ").await;
        let outcome = controller.submit().await;

        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(SubmitRejection::NothingToSend)
        );
        assert_eq!(controller.transcript().await.len(), 1); // greeting only
        assert!(dispatcher.sent().is_empty());
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_a_no_op() {
        let gate = Arc::new(Notify::new());
        let (controller, dispatcher) =
            controller(ScriptedDispatcher::gated("All clear", Arc::clone(&gate)));
        let controller = Arc::new(controller);

        controller.set_draft("first").await;
        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.submit().await })
        };

        // Wait until the first submit has appended its bubbles and parked
        // on the gate.
        while controller.transcript().await.len() < 3 {
            tokio::task::yield_now().await;
        }
        assert!(controller.is_in_flight());
        let len_before = 3;

        controller.set_draft("second").await;
        let outcome = controller.submit().await;
        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(SubmitRejection::AlreadyInFlight)
        );
        assert_eq!(controller.transcript().await.len(), len_before);
        // The rejected draft is kept for a retry.
        assert_eq!(controller.draft().await, "second");

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert_eq!(dispatcher.sent(), vec![Sent::Text("first".into())]);
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn attachment_takes_precedence_and_is_cleared() {
        let (controller, dispatcher) =
            controller(ScriptedDispatcher::replying(r#"{"output":"Screenshot shows a phishing page"}"#, "application/json"));

        controller
            .attach("scam.png", vec![137, 80, 78, 71], "image/png")
            .await
            .unwrap();
        controller.set_draft("typed but discarded").await;
        controller.submit().await;

        // The image endpoint was called; the typed text never left.
        assert_eq!(
            dispatcher.sent(),
            vec![Sent::Image {
                file_name: "scam.png".into(),
                mime: "image/png".into(),
            }]
        );

        let transcript = controller.transcript().await;
        assert_eq!(transcript.len(), 3);
        let user = &transcript[1];
        assert_eq!(user.kind(), MessageKind::Image);
        match &user.content {
            MessageContent::Image(meta) => {
                assert_eq!(meta.file_name, "scam.png");
                assert_eq!(meta.size_bytes, 4);
                // The bubble's handle stays live after the composer cleared.
                assert!(controller.previews().resolve(meta.preview).is_some());
            }
            other => panic!("expected image content, got {:?}", other),
        }
        assert_eq!(
            transcript[2].content,
            MessageContent::Text("Screenshot shows a phishing page".into())
        );

        assert!(controller.current_attachment().await.is_none());
        // Composer handle gone, bubble handle live.
        assert_eq!(controller.previews().live_count(), 1);
        // The draft is not consumed by an image send.
        assert_eq!(controller.draft().await, "typed but discarded");
    }

    #[tokio::test]
    async fn failed_upload_still_clears_the_attachment() {
        let (controller, _) = controller(ScriptedDispatcher::failing(|| DispatchError::Http {
            status: 502,
            body: "bad gateway".into(),
        }));

        controller
            .attach("scam.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        controller.submit().await;

        assert!(controller.current_attachment().await.is_none());
        let transcript = controller.transcript().await;
        assert_eq!(
            transcript.last().unwrap().content,
            MessageContent::Text(UPLOAD_FAILURE_NOTICE.into())
        );
    }

    #[tokio::test]
    async fn plain_text_response_is_verbatim() {
        let (controller, _) = controller(ScriptedDispatcher::replying(
            "All clear",
            "text/plain; charset=utf-8",
        ));

        controller.set_draft("check this").await;
        controller.submit().await;

        assert_eq!(
            controller.transcript().await.last().unwrap().content,
            MessageContent::Text("All clear".into())
        );
    }

    #[tokio::test]
    async fn teardown_releases_every_preview_handle() {
        let (controller, _) =
            controller(ScriptedDispatcher::replying("ok", "text/plain"));

        // One sent bubble plus one staged-but-unsent attachment.
        controller
            .attach("first.png", vec![1], "image/png")
            .await
            .unwrap();
        controller.submit().await;
        controller
            .attach("second.png", vec![2], "image/png")
            .await
            .unwrap();
        assert_eq!(controller.previews().live_count(), 2);

        controller.teardown().await;
        assert_eq!(controller.previews().live_count(), 0);
    }

    #[tokio::test]
    async fn events_follow_the_append_and_resolve_order() {
        let (controller, _) = controller(ScriptedDispatcher::replying(
            r#"{"reply":"fine"}"#,
            "application/json",
        ));
        let mut events = controller.subscribe();

        controller.set_draft("hi").await;
        controller.submit().await;

        let transcript = controller.transcript().await;
        let user_id = transcript[1].id;
        let pending_id = transcript[2].id;

        assert_eq!(
            events.recv().await.unwrap(),
            ConversationEvent::MessageAppended(user_id)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ConversationEvent::MessageAppended(pending_id)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ConversationEvent::MessageResolved(pending_id)
        );
    }
}
