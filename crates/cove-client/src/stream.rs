//! Live, ordered view of one conversation.
//!
//! A [`ConversationView`] is a handle to a single task that owns all view
//! state: the current message list, resolved avatars and the translation
//! overlay. Live deliveries, enrichment results and user commands are all
//! applied by that task, and every change is published as a fresh
//! [`StreamSnapshot`] on a watch channel.
//!
//! Each opened conversation gets a new generation number. Enrichment tasks
//! carry the generation they were started under, and results from an older
//! generation are dropped, so a slow avatar lookup for the previous
//! conversation can never land in the current one.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use cove_shared::constants::{CHATS, UNKNOWN, USER_DETAILS};
use cove_shared::models::{Message, UserProfile};
use cove_shared::query::{CollectionPath, Direction, Document, Query};
use cove_shared::time::{format_minute, now_iso, parse_timestamp};
use cove_shared::types::{ConversationKey, MessageId, UserId};
use cove_shared::{CoveError, DocumentStore, LiveQuery, Result};

use crate::context::ClientContext;
use crate::live::decode_all;
use crate::translation::{detect_or_unknown, ToggleStep, TranslationOverlay};

const COMMAND_BUFFER: usize = 32;

// ---------------------------------------------------------------------------
// Published state
// ---------------------------------------------------------------------------

/// One message as the UI should draw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    /// The stored message, with `profile_picture` replaced by the enriched
    /// avatar once it resolves.
    pub message: Message,
    /// Body text or its translation, depending on the toggle state.
    pub text: String,
    pub translated: bool,
    /// A translation request for this message is in flight.
    pub translating: bool,
    /// Detected language code, `None` until detection finishes.
    pub language: Option<String>,
    pub offer_translation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSnapshot {
    pub conversation: Option<ConversationKey>,
    pub generation: u64,
    /// Whether a live subscription is currently attached.
    pub live: bool,
    pub messages: Vec<MessageView>,
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Results coming back from the view's task set.
enum TaskOutput {
    Avatar {
        generation: u64,
        message: MessageId,
        url: Option<String>,
    },
    Language {
        generation: u64,
        message: MessageId,
        code: String,
    },
    Translation {
        generation: u64,
        message: MessageId,
        original: String,
        outcome: Result<String>,
        reply: oneshot::Sender<Option<String>>,
    },
}

struct ViewState {
    generation: u64,
    conversation: Option<ConversationKey>,
    messages: Vec<Message>,
    /// Only successful lookups are stored, so a later failure cannot erase
    /// an avatar that already resolved.
    avatars: HashMap<MessageId, String>,
    seen: HashSet<MessageId>,
    overlay: TranslationOverlay,
}

impl ViewState {
    fn new(locale: &str) -> Self {
        Self {
            generation: 0,
            conversation: None,
            messages: Vec::new(),
            avatars: HashMap::new(),
            seen: HashSet::new(),
            overlay: TranslationOverlay::new(locale),
        }
    }

    /// Forget everything about the previous conversation and start a new
    /// generation.
    fn reset(&mut self, conversation: Option<ConversationKey>) -> u64 {
        self.generation += 1;
        self.conversation = conversation;
        self.messages.clear();
        self.avatars.clear();
        self.seen.clear();
        self.overlay.clear();
        self.generation
    }

    /// Replace the message list with a delivered snapshot. Returns the
    /// messages not seen before in this generation.
    fn apply_snapshot(&mut self, docs: &[Document]) -> Vec<Message> {
        let mut messages = decode_all(docs, Message::from_document);
        sort_by_timestamp(&mut messages);

        let fresh = messages
            .iter()
            .filter(|m| self.seen.insert(m.id.clone()))
            .cloned()
            .collect();
        self.messages = messages;
        fresh
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale result");
            return false;
        }
        true
    }

    fn apply_avatar(&mut self, generation: u64, message: MessageId, url: Option<String>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        match url {
            Some(url) => {
                self.avatars.insert(message, url);
                true
            }
            None => false,
        }
    }

    fn apply_language(&mut self, generation: u64, message: &MessageId, code: &str) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.overlay.record_detection(message, code);
        true
    }

    fn body_of(&self, message: &MessageId) -> Option<String> {
        self.messages
            .iter()
            .find(|m| &m.id == message)
            .map(|m| m.body.clone())
    }

    fn render(&self, live: bool) -> StreamSnapshot {
        let messages = self
            .messages
            .iter()
            .map(|m| {
                let mut message = m.clone();
                if let Some(url) = self.avatars.get(&m.id) {
                    message.profile_picture = Some(url.clone());
                }
                MessageView {
                    text: self.overlay.rendered(&m.id, &m.body),
                    translated: self.overlay.is_translated(&m.id),
                    translating: self.overlay.is_pending(&m.id),
                    language: self.overlay.detected(&m.id).map(str::to_string),
                    offer_translation: self.overlay.offer_translation(&m.id),
                    message,
                }
            })
            .collect();

        StreamSnapshot {
            conversation: self.conversation.clone(),
            generation: self.generation,
            live,
            messages,
        }
    }
}

/// Stable ascending sort by timestamp. Unparseable timestamps sort first;
/// equal timestamps keep snapshot order.
fn sort_by_timestamp(messages: &mut [Message]) {
    messages.sort_by_cached_key(|m| parse_timestamp(&m.timestamp));
}

// ---------------------------------------------------------------------------
// Owning task
// ---------------------------------------------------------------------------

enum ViewCommand {
    Open {
        conversation: ConversationKey,
        reply: oneshot::Sender<Result<u64>>,
    },
    ToggleTranslate {
        message: MessageId,
        reply: oneshot::Sender<Option<String>>,
    },
    Close,
}

enum Event {
    Command(Option<ViewCommand>),
    Snapshot(Option<Vec<Document>>),
    Task(std::result::Result<TaskOutput, JoinError>),
}

struct ViewActor {
    ctx: ClientContext,
    state: ViewState,
    live: Option<LiveQuery>,
    tasks: JoinSet<TaskOutput>,
    publish: watch::Sender<StreamSnapshot>,
}

async fn next_live(live: &mut Option<LiveQuery>) -> Option<Vec<Document>> {
    match live {
        Some(query) => query.next_snapshot().await,
        None => std::future::pending().await,
    }
}

impl ViewActor {
    async fn run(mut self, mut commands: mpsc::Receiver<ViewCommand>) {
        loop {
            let event = tokio::select! {
                cmd = commands.recv() => Event::Command(cmd),
                snapshot = next_live(&mut self.live) => Event::Snapshot(snapshot),
                Some(joined) = self.tasks.join_next() => Event::Task(joined),
            };

            match event {
                Event::Command(None) | Event::Command(Some(ViewCommand::Close)) => break,
                Event::Command(Some(ViewCommand::Open { conversation, reply })) => {
                    let result = self.open(conversation).await;
                    let _ = reply.send(result);
                }
                Event::Command(Some(ViewCommand::ToggleTranslate { message, reply })) => {
                    self.toggle(message, reply);
                }
                Event::Snapshot(Some(docs)) => {
                    let fresh = self.state.apply_snapshot(&docs);
                    debug!(
                        total = self.state.messages.len(),
                        new = fresh.len(),
                        "snapshot delivered"
                    );
                    for message in &fresh {
                        self.spawn_enrichment(message);
                    }
                    self.publish();
                }
                Event::Snapshot(None) => {
                    warn!(generation = self.state.generation, "live query ended");
                    self.live = None;
                    self.publish();
                }
                Event::Task(Ok(output)) => self.apply(output),
                Event::Task(Err(e)) if e.is_cancelled() => {}
                Event::Task(Err(e)) => warn!(error = %e, "enrichment task failed"),
            }
        }

        self.detach();
        info!("conversation view closed");
    }

    /// Tear down the live query and every in-flight task.
    fn detach(&mut self) {
        if let Some(mut live) = self.live.take() {
            live.cancel();
        }
        self.tasks.abort_all();
    }

    async fn open(&mut self, conversation: ConversationKey) -> Result<u64> {
        if conversation.is_blank() {
            return Err(CoveError::validation("conversation key has an empty segment"));
        }

        // The old subscription is gone before the new one exists.
        self.detach();
        let generation = self.state.reset(Some(conversation.clone()));

        let query =
            Query::new(conversation.messages_path()).order_by("timestamp", Direction::Ascending);
        let result = match self.ctx.store.watch(query).await {
            Ok(live) => {
                self.live = Some(live);
                info!(conversation = %conversation, generation, "conversation opened");
                Ok(generation)
            }
            Err(e) => {
                warn!(conversation = %conversation, error = %e, "failed to subscribe");
                Err(e)
            }
        };
        self.publish();
        result
    }

    fn toggle(&mut self, message: MessageId, reply: oneshot::Sender<Option<String>>) {
        let Some(original) = self.state.body_of(&message) else {
            let _ = reply.send(None);
            return;
        };

        match self.state.overlay.begin_toggle(&message, &original) {
            ToggleStep::InFlight(text) => {
                let _ = reply.send(Some(text));
            }
            ToggleStep::ShowOriginal(text) | ToggleStep::ShowCached(text) => {
                self.publish();
                let _ = reply.send(Some(text));
            }
            ToggleStep::NeedsTranslation => {
                self.publish();
                let generation = self.state.generation;
                let language = self.ctx.language.clone();
                let target = self.state.overlay.locale().to_string();
                self.tasks.spawn(async move {
                    let outcome = language.translate(&original, &target).await;
                    TaskOutput::Translation {
                        generation,
                        message,
                        original,
                        outcome,
                        reply,
                    }
                });
            }
        }
    }

    fn spawn_enrichment(&mut self, message: &Message) {
        let generation = self.state.generation;

        let store = self.ctx.store.clone();
        let id = message.id.clone();
        let user = message.user_id.clone();
        self.tasks.spawn(async move {
            let url = lookup_profile_picture(store.as_ref(), &user).await;
            TaskOutput::Avatar {
                generation,
                message: id,
                url,
            }
        });

        if message.body.trim().is_empty() {
            return;
        }
        let language = self.ctx.language.clone();
        let id = message.id.clone();
        let body = message.body.clone();
        self.tasks.spawn(async move {
            let code = detect_or_unknown(language.as_ref(), &body).await;
            TaskOutput::Language {
                generation,
                message: id,
                code,
            }
        });
    }

    fn apply(&mut self, output: TaskOutput) {
        let changed = match output {
            TaskOutput::Avatar {
                generation,
                message,
                url,
            } => self.state.apply_avatar(generation, message, url),
            TaskOutput::Language {
                generation,
                message,
                code,
            } => self.state.apply_language(generation, &message, &code),
            TaskOutput::Translation {
                generation,
                message,
                original,
                outcome,
                reply,
            } => {
                if !self.state.is_current(generation) {
                    return;
                }
                let text = self.state.overlay.complete(&message, &original, outcome);
                self.publish();
                let _ = reply.send(Some(text));
                false
            }
        };
        if changed {
            self.publish();
        }
    }

    fn publish(&self) {
        self.publish.send_replace(self.state.render(self.live.is_some()));
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a conversation view task, plus the compose draft.
///
/// Dropping every handle stops the task, which cancels its live query and
/// aborts outstanding enrichment.
pub struct ConversationView {
    ctx: ClientContext,
    commands: mpsc::Sender<ViewCommand>,
    snapshots: watch::Receiver<StreamSnapshot>,
    draft: Mutex<String>,
}

fn view_closed() -> CoveError {
    CoveError::unavailable("conversation view is closed")
}

impl ConversationView {
    /// Spawn the view task. No conversation is open yet.
    pub fn spawn(ctx: ClientContext) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (publish, snapshots) = watch::channel(StreamSnapshot::default());

        let actor = ViewActor {
            state: ViewState::new(&ctx.locale),
            ctx: ctx.clone(),
            live: None,
            tasks: JoinSet::new(),
            publish,
        };
        tokio::spawn(actor.run(cmd_rx));

        Self {
            ctx,
            commands: cmd_tx,
            snapshots,
            draft: Mutex::new(String::new()),
        }
    }

    /// Bind the view to a conversation, replacing any previous one. Returns
    /// the new generation.
    pub async fn open(&self, conversation: ConversationKey) -> Result<u64> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(ViewCommand::Open {
                conversation,
                reply,
            })
            .await
            .map_err(|_| view_closed())?;
        rx.await.map_err(|_| view_closed())?
    }

    /// Flip a message between original and translated text and return what
    /// is now rendered. `None` if the message is not in the view or the
    /// view moved on before the translation finished.
    pub async fn toggle_translate(&self, message: &MessageId) -> Option<String> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(ViewCommand::ToggleTranslate {
                message: message.clone(),
                reply,
            })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamSnapshot> {
        self.snapshots.clone()
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        *self.draft.lock().await = text.into();
    }

    pub async fn draft(&self) -> String {
        self.draft.lock().await.clone()
    }

    /// Send the draft to the open conversation. The draft is cleared only
    /// when the send succeeds.
    pub async fn send(&self) -> Result<MessageId> {
        let conversation = self
            .snapshot()
            .conversation
            .ok_or_else(|| CoveError::validation("no conversation is open"))?;
        let text = self.draft().await;

        let id = send_message(&self.ctx, &conversation, &text).await?;

        let mut draft = self.draft.lock().await;
        if *draft == text {
            draft.clear();
        }
        Ok(id)
    }

    pub async fn close(&self) {
        let _ = self.commands.send(ViewCommand::Close).await;
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Append a message from the signed-in user to a conversation.
///
/// Direct chats also get their `lastMessage` preview updated. Failures are
/// logged and returned; nothing is retried.
pub async fn send_message(
    ctx: &ClientContext,
    conversation: &ConversationKey,
    text: &str,
) -> Result<MessageId> {
    let result = write_message(ctx, conversation, text).await;
    match &result {
        Ok(id) => info!(conversation = %conversation, message = %id, "message sent"),
        Err(e) => warn!(conversation = %conversation, error = %e, "send failed"),
    }
    result
}

async fn write_message(
    ctx: &ClientContext,
    conversation: &ConversationKey,
    text: &str,
) -> Result<MessageId> {
    let user = ctx.require_user()?;
    if conversation.is_blank() {
        return Err(CoveError::validation("conversation key has an empty segment"));
    }
    if text.trim().is_empty() {
        return Err(CoveError::validation("message body is empty"));
    }

    let profile = ctx
        .store
        .get(&CollectionPath::root(USER_DETAILS), user.as_str())
        .await?
        .ok_or_else(|| CoveError::not_found(format!("profile {user}")))?;
    let profile = UserProfile::from_document(&profile)?;

    let timestamp = now_iso();
    let message = Message {
        id: MessageId::new(String::new()),
        name: if profile.display_name.is_empty() {
            UNKNOWN.to_string()
        } else {
            profile.display_name
        },
        user_id: user,
        body: text.to_string(),
        profile_picture: profile.profile_picture,
        formatted_timestamp: format_minute(&timestamp),
        timestamp,
    };

    let id = ctx
        .store
        .add(&conversation.messages_path(), message.to_fields())
        .await?;

    if let ConversationKey::Direct(chat) = conversation {
        let mut preview = Map::new();
        preview.insert("lastMessage".into(), Value::String(text.to_string()));
        ctx.store
            .set(&CollectionPath::root(CHATS), chat.as_str(), preview, true)
            .await?;
    }

    Ok(MessageId::new(id))
}

/// The user's `profilePicture`, or `None` when the profile is missing, has
/// no picture, or cannot be read.
pub async fn lookup_profile_picture(store: &dyn DocumentStore, user: &UserId) -> Option<String> {
    match store
        .get(&CollectionPath::root(USER_DETAILS), user.as_str())
        .await
    {
        Ok(Some(doc)) => doc
            .field("profilePicture")
            .and_then(Value::as_str)
            .map(str::to_string),
        Ok(None) => None,
        Err(e) => {
            debug!(user = %user, error = %e, "avatar lookup failed");
            None
        }
    }
}

/// Resolve every sender's avatar concurrently. A failed lookup leaves that
/// message's picture as it was.
pub async fn enrich_with_profile_pictures(
    store: &dyn DocumentStore,
    messages: Vec<Message>,
) -> Vec<Message> {
    let lookups = messages
        .iter()
        .map(|m| lookup_profile_picture(store, &m.user_id));
    let urls = join_all(lookups).await;

    messages
        .into_iter()
        .zip(urls)
        .map(|(mut message, url)| {
            if url.is_some() {
                message.profile_picture = url;
            }
            message
        })
        .collect()
}
