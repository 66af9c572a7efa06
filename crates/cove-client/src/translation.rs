//! Per-message translation toggle and detected-language bookkeeping.
//!
//! The overlay is plain state: it never calls the language service itself.
//! [`TranslationOverlay::begin_toggle`] says whether a service call is
//! needed, and the owner reports the outcome through
//! [`TranslationOverlay::complete`]. That split lets the conversation view
//! run the call on its own task set while keeping the maps single-owner.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use cove_shared::constants::UNKNOWN_LANGUAGE;
use cove_shared::types::MessageId;
use cove_shared::{LanguageService, Result};

/// What a toggle request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleStep {
    /// Flipped back to the original text.
    ShowOriginal(String),
    /// Flipped to a translation that was already cached.
    ShowCached(String),
    /// No cached translation; the caller must translate and then call
    /// [`TranslationOverlay::complete`].
    NeedsTranslation,
    /// A translation for this message is already in flight. Nothing changed.
    InFlight(String),
}

#[derive(Debug, Default)]
pub struct TranslationOverlay {
    locale: String,
    translations: HashMap<MessageId, String>,
    showing: HashSet<MessageId>,
    pending: HashSet<MessageId>,
    detected: HashMap<MessageId, String>,
}

impl TranslationOverlay {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: normalize_language_code(locale),
            ..Self::default()
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn begin_toggle(&mut self, id: &MessageId, original: &str) -> ToggleStep {
        if self.pending.contains(id) {
            return ToggleStep::InFlight(self.rendered(id, original));
        }
        if self.showing.remove(id) {
            return ToggleStep::ShowOriginal(original.to_string());
        }
        if let Some(cached) = self.translations.get(id) {
            self.showing.insert(id.clone());
            return ToggleStep::ShowCached(cached.clone());
        }
        self.pending.insert(id.clone());
        ToggleStep::NeedsTranslation
    }

    /// Record the outcome of a translation started by
    /// [`begin_toggle`](Self::begin_toggle) and return the text to render.
    ///
    /// A failed call caches the original text, so the message still enters
    /// the translated state and the service is not asked again.
    pub fn complete(&mut self, id: &MessageId, original: &str, outcome: Result<String>) -> String {
        self.pending.remove(id);
        let text = match outcome {
            Ok(translated) => translated,
            Err(e) => {
                warn!(message = %id, error = %e, "translation failed, keeping original");
                original.to_string()
            }
        };
        self.translations.insert(id.clone(), text.clone());
        self.showing.insert(id.clone());
        text
    }

    /// Toggle with the service call inline.
    pub async fn toggle(
        &mut self,
        service: &dyn LanguageService,
        id: &MessageId,
        original: &str,
    ) -> String {
        match self.begin_toggle(id, original) {
            ToggleStep::ShowOriginal(text)
            | ToggleStep::ShowCached(text)
            | ToggleStep::InFlight(text) => text,
            ToggleStep::NeedsTranslation => {
                let outcome = service.translate(original, &self.locale).await;
                self.complete(id, original, outcome)
            }
        }
    }

    pub fn rendered(&self, id: &MessageId, original: &str) -> String {
        match (self.showing.contains(id), self.translations.get(id)) {
            (true, Some(text)) => text.clone(),
            _ => original.to_string(),
        }
    }

    pub fn is_translated(&self, id: &MessageId) -> bool {
        self.showing.contains(id)
    }

    pub fn is_pending(&self, id: &MessageId) -> bool {
        self.pending.contains(id)
    }

    pub fn record_detection(&mut self, id: &MessageId, code: &str) {
        self.detected.insert(id.clone(), normalize_language_code(code));
    }

    pub fn detected(&self, id: &MessageId) -> Option<&str> {
        self.detected.get(id).map(String::as_str)
    }

    /// Translation is offered unless the message is known to be in the
    /// viewer's language.
    pub fn offer_translation(&self, id: &MessageId) -> bool {
        self.detected(id) != Some(self.locale.as_str())
    }

    pub fn clear(&mut self) {
        self.translations.clear();
        self.showing.clear();
        self.pending.clear();
        self.detected.clear();
    }
}

/// Detect the language of `text`, or `unknown` when the service fails.
pub async fn detect_or_unknown(service: &dyn LanguageService, text: &str) -> String {
    match service.detect(text).await {
        Ok(code) => normalize_language_code(&code),
        Err(e) => {
            debug!(error = %e, "language detection failed");
            UNKNOWN_LANGUAGE.to_string()
        }
    }
}

/// `" EN."` -> `en`. Blank answers become `unknown`.
pub fn normalize_language_code(raw: &str) -> String {
    let code = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase();
    if code.is_empty() {
        UNKNOWN_LANGUAGE.to_string()
    } else {
        code
    }
}
