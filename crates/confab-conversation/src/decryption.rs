//! Recursive decryption transform engine.
//!
//! Walks a heterogeneous activity tree and decrypts every encrypted field
//! and nested object, dispatching on the [`Object`] variant. Failures are
//! isolated per field: a field that cannot be decrypted degrades to a
//! configured placeholder and the traversal carries on, so one bad field
//! never aborts the tree.
//!
//! Keys inherit downward: a node's own `encryption_key_url` overrides the
//! key handed down by its parent. All sibling work inside one node fans out
//! concurrently; completion of a node only requires that every branch
//! settles, never that every branch succeeds.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::{join, FutureExt};
use serde_json::Value;
use tracing::{debug, warn};

use confab_core::{CryptoService, ScrField};

use crate::models::{
    Activity, Comment, Content, Conversation, EventObject, ExtensionData, FileObject, ImageUri,
    LinkObject, MeetingContainer, MicroappInstance, Object, Reaction, ReactionSummary, Submit,
    Thread, TranscodedContent,
};

/// Configuration for conversation decryption.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Placeholder substituted for any field that fails decryption.
    pub decryption_failure_message: String,
    /// Retain ciphertext under the `encrypted_*` shadow slot after a field
    /// is overwritten with plaintext.
    pub keep_encrypted_properties: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            decryption_failure_message: confab_core::defaults::DECRYPTION_FAILURE_MESSAGE
                .to_string(),
            keep_encrypted_properties: false,
        }
    }
}

impl ConversationConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CONFAB_DECRYPTION_FAILURE_MESSAGE` | "This message cannot be decrypted." | Placeholder text |
    /// | `CONFAB_KEEP_ENCRYPTED_PROPERTIES` | `false` | Retain ciphertext shadows |
    pub fn from_env() -> Self {
        let decryption_failure_message = std::env::var("CONFAB_DECRYPTION_FAILURE_MESSAGE")
            .unwrap_or_else(|_| confab_core::defaults::DECRYPTION_FAILURE_MESSAGE.to_string());
        let keep_encrypted_properties = std::env::var("CONFAB_KEEP_ENCRYPTED_PROPERTIES")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            decryption_failure_message,
            keep_encrypted_properties,
        }
    }
}

/// Outcome of decrypting one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOutcome {
    /// Field overwritten with plaintext.
    Decrypted,
    /// Field substituted with the failure placeholder, or left encrypted
    /// when no substitute applies. Never an error.
    Degraded,
    /// Nothing to do: field absent, empty, or already decrypted.
    Skipped,
}

/// Aggregate of every field visited by one traversal.
///
/// The engine never returns an error: failure shows up here as `degraded`
/// counts, with the affected fields replaced by the configured placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecryptStats {
    pub decrypted: usize,
    pub degraded: usize,
    pub skipped: usize,
}

impl DecryptStats {
    fn record(&mut self, outcome: FieldOutcome) {
        match outcome {
            FieldOutcome::Decrypted => self.decrypted += 1,
            FieldOutcome::Degraded => self.degraded += 1,
            FieldOutcome::Skipped => self.skipped += 1,
        }
    }

    fn absorb(&mut self, other: DecryptStats) {
        self.decrypted += other.decrypted;
        self.degraded += other.degraded;
        self.skipped += other.skipped;
    }

    /// Fields actually touched (decrypted or degraded).
    pub fn touched(&self) -> usize {
        self.decrypted + self.degraded
    }
}

/// Read a node's own key url, if its type carries one.
fn own_key_url(object: &Object) -> Option<&str> {
    match object {
        Object::Activity(a) => a.encryption_key_url.as_deref(),
        Object::Conversation(c) => c.encryption_key_url.as_deref(),
        Object::Comment(c) => c.encryption_key_url.as_deref(),
        Object::Content(c) => c.encryption_key_url.as_deref(),
        Object::File(f) => f.encryption_key_url.as_deref(),
        Object::Submit(s) => s.encryption_key_url.as_deref(),
        Object::MeetingContainer(m) => m.encryption_key_url.as_deref(),
        _ => None,
    }
}

/// Recursive decryption engine over conversation object trees.
pub struct DecryptionEngine {
    crypto: Arc<dyn CryptoService>,
    config: ConversationConfig,
}

impl DecryptionEngine {
    pub fn new(crypto: Arc<dyn CryptoService>, config: ConversationConfig) -> Self {
        Self { crypto, config }
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Decrypt a conversation and everything reachable from it.
    pub async fn decrypt_conversation(&self, conversation: &mut Conversation) -> DecryptStats {
        let stats = self.decrypt_conversation_node(None, conversation).await;
        debug!(
            decrypted = stats.decrypted,
            degraded = stats.degraded,
            "Conversation decryption complete"
        );
        stats
    }

    /// Decrypt any object node under an inherited key.
    ///
    /// The node's own `encryption_key_url` overrides `key`. Nodes without a
    /// resolvable key degrade their own text fields but still recurse.
    pub fn decrypt_object<'a>(
        &'a self,
        key: Option<&'a str>,
        object: &'a mut Object,
    ) -> BoxFuture<'a, DecryptStats> {
        async move {
            let own = own_key_url(object).map(str::to_string);
            let key = own.as_deref().or(key);

            match object {
                Object::Activity(activity) => self.decrypt_activity(key, activity).await,
                Object::Conversation(conversation) => {
                    self.decrypt_conversation_node(key, conversation).await
                }
                Object::Comment(comment) => self.decrypt_comment(key, comment).await,
                Object::Content(content) => self.decrypt_content(key, content).await,
                Object::File(file) => self.decrypt_file(key, file).await,
                Object::Link(link) => self.decrypt_link(key, link).await,
                Object::Submit(submit) => self.decrypt_submit(key, submit).await,
                Object::Reaction2(reaction) => self.decrypt_reaction(key, reaction).await,
                Object::Reaction2Summary(summary) | Object::Reaction2SelfSummary(summary) => {
                    self.decrypt_reaction_summary(key, summary).await
                }
                Object::Thread(thread) => self.decrypt_thread(thread).await,
                Object::MeetingContainer(container) => {
                    self.decrypt_meeting_container(key, container).await
                }
                Object::MicroappInstance(microapp) => {
                    self.decrypt_microapp_instance(key, microapp).await
                }
                Object::Event(event) => self.decrypt_event(key, event).await,
                Object::ImageUri(image) => self.decrypt_image_uri(key, image).await,
                Object::TranscodedContent(transcoded) => {
                    self.decrypt_transcoded_content(key, transcoded).await
                }
                Object::Unknown => DecryptStats::default(),
            }
        }
        .boxed()
    }

    // -----------------------------------------------------------------------
    // Per-type routines
    // -----------------------------------------------------------------------

    /// An activity without a key on itself or its object is left alone, even
    /// when a key was inherited. Conversations behave differently (they use
    /// an explicitly passed key); that asymmetry is intentional.
    async fn decrypt_activity(&self, key: Option<&str>, activity: &mut Activity) -> DecryptStats {
        let object_key = activity
            .object
            .as_deref()
            .and_then(own_key_url)
            .map(str::to_string);
        if activity.encryption_key_url.is_none() && object_key.is_none() {
            return DecryptStats::default();
        }

        let effective = activity
            .encryption_key_url
            .clone()
            .or(object_key)
            .or_else(|| key.map(str::to_string));
        let effective = effective.as_deref();

        let Activity {
            object, children, ..
        } = activity;

        let children_fut = join_all(
            children
                .iter_mut()
                .filter_map(|child| child.activity.as_mut())
                .map(|nested| self.decrypt_object(effective, nested)),
        );
        let object_fut = async {
            match object {
                Some(object) => self.decrypt_object(effective, object).await,
                None => DecryptStats::default(),
            }
        };

        let (child_stats, object_stats) = join!(children_fut, object_fut);
        let mut stats = DecryptStats::default();
        for child in child_stats {
            stats.absorb(child);
        }
        stats.absorb(object_stats);
        stats
    }

    async fn decrypt_conversation_node(
        &self,
        key: Option<&str>,
        conversation: &mut Conversation,
    ) -> DecryptStats {
        let usable = conversation
            .encryption_key_url
            .clone()
            .or_else(|| key.map(str::to_string));
        let usable = usable.as_deref();

        let Conversation {
            display_name,
            encrypted_display_name,
            content,
            encrypted_content,
            avatar_encryption_key_url,
            avatar,
            activities,
            previous,
            previous_value,
            ..
        } = conversation;

        // Activities resolve their own keys; the conversation key is not
        // inherited into the stream.
        let activities_fut = async {
            let mut stats = DecryptStats::default();
            if let Some(activities) = activities {
                for piece in join_all(
                    activities
                        .items
                        .iter_mut()
                        .map(|item| self.decrypt_object(None, item)),
                )
                .await
                {
                    stats.absorb(piece);
                }
            }
            stats
        };

        let names_fut = async {
            let mut stats = DecryptStats::default();
            if usable.is_some() {
                let (name, body) = join!(
                    self.decrypt_text_prop(usable, "displayName", display_name, encrypted_display_name),
                    self.decrypt_text_prop(usable, "content", content, encrypted_content),
                );
                stats.record(name);
                stats.record(body);
            }
            stats
        };

        let avatar_fut = async {
            match (avatar_encryption_key_url.as_deref(), avatar.as_deref_mut()) {
                (Some(avatar_key), Some(avatar)) => {
                    self.decrypt_object(Some(avatar_key), avatar).await
                }
                _ => DecryptStats::default(),
            }
        };

        // Rename history is attempted even without a resolvable key, in
        // which case it degrades to the placeholder.
        let history_fut = async {
            let mut stats = DecryptStats::default();
            if let Some(previous) = previous {
                stats.record(
                    self.decrypt_text_prop(
                        usable,
                        "displayName",
                        &mut previous.display_name,
                        &mut previous.encrypted_display_name,
                    )
                    .await,
                );
            }
            if let Some(previous_value) = previous_value {
                stats.record(
                    self.decrypt_text_prop(
                        usable,
                        "displayName",
                        &mut previous_value.display_name,
                        &mut previous_value.encrypted_display_name,
                    )
                    .await,
                );
            }
            stats
        };

        let (activities_stats, names_stats, avatar_stats, history_stats) =
            join!(activities_fut, names_fut, avatar_fut, history_fut);

        let mut stats = DecryptStats::default();
        stats.absorb(activities_stats);
        stats.absorb(names_stats);
        stats.absorb(avatar_stats);
        stats.absorb(history_stats);
        stats
    }

    async fn decrypt_comment(&self, key: Option<&str>, comment: &mut Comment) -> DecryptStats {
        let Comment {
            display_name,
            encrypted_display_name,
            content,
            encrypted_content,
            cards,
            ..
        } = comment;
        self.decrypt_comment_fields(
            key,
            display_name,
            encrypted_display_name,
            content,
            encrypted_content,
            cards,
        )
        .await
    }

    /// Shared by comments and content objects: display name, body, and each
    /// card payload, all concurrently.
    #[allow(clippy::too_many_arguments)]
    async fn decrypt_comment_fields(
        &self,
        key: Option<&str>,
        display_name: &mut Option<String>,
        encrypted_display_name: &mut Option<String>,
        content: &mut Option<String>,
        encrypted_content: &mut Option<String>,
        cards: &mut [String],
    ) -> DecryptStats {
        let (name, body, card_outcomes) = join!(
            self.decrypt_text_prop(key, "displayName", display_name, encrypted_display_name),
            self.decrypt_text_prop(key, "content", content, encrypted_content),
            join_all(
                cards
                    .iter_mut()
                    .enumerate()
                    .map(|(index, card)| self.decrypt_card(key, index, card)),
            ),
        );

        let mut stats = DecryptStats::default();
        stats.record(name);
        stats.record(body);
        for outcome in card_outcomes {
            stats.record(outcome);
        }
        stats
    }

    async fn decrypt_content(&self, key: Option<&str>, content: &mut Content) -> DecryptStats {
        if content.content_category.as_deref() == Some("links") {
            self.decrypt_content_links(key, content).await
        } else {
            self.decrypt_content_files(key, content).await
        }
    }

    async fn decrypt_content_files(
        &self,
        key: Option<&str>,
        content: &mut Content,
    ) -> DecryptStats {
        let Content {
            display_name,
            encrypted_display_name,
            content: body,
            encrypted_content,
            cards,
            files,
            links,
            ..
        } = content;

        let Some(files) = files else {
            return DecryptStats::default();
        };

        let files_fut = join_all(
            files
                .items
                .iter_mut()
                .map(|item| self.decrypt_object(key, item)),
        );
        let comment_fut = self.decrypt_comment_fields(
            key,
            display_name,
            encrypted_display_name,
            body,
            encrypted_content,
            cards,
        );
        let links_fut = async {
            let mut stats = DecryptStats::default();
            if let Some(links) = links {
                for piece in join_all(
                    links
                        .items
                        .iter_mut()
                        .map(|item| self.decrypt_object(key, item)),
                )
                .await
                {
                    stats.absorb(piece);
                }
            }
            stats
        };

        let (file_stats, comment_stats, links_stats) = join!(files_fut, comment_fut, links_fut);
        let mut stats = DecryptStats::default();
        for piece in file_stats {
            stats.absorb(piece);
        }
        stats.absorb(comment_stats);
        stats.absorb(links_stats);
        stats
    }

    async fn decrypt_content_links(
        &self,
        key: Option<&str>,
        content: &mut Content,
    ) -> DecryptStats {
        let Content {
            display_name,
            encrypted_display_name,
            content: body,
            encrypted_content,
            cards,
            links,
            ..
        } = content;

        let Some(links) = links else {
            return DecryptStats::default();
        };

        let links_fut = join_all(
            links
                .items
                .iter_mut()
                .map(|item| self.decrypt_object(key, item)),
        );
        let comment_fut = self.decrypt_comment_fields(
            key,
            display_name,
            encrypted_display_name,
            body,
            encrypted_content,
            cards,
        );

        let (link_stats, comment_stats) = join!(links_fut, comment_fut);
        let mut stats = DecryptStats::default();
        for piece in link_stats {
            stats.absorb(piece);
        }
        stats.absorb(comment_stats);
        stats
    }

    async fn decrypt_file(&self, key: Option<&str>, file: &mut FileObject) -> DecryptStats {
        // Images carry their own key url; it wins over the activity key.
        let effective = file
            .encryption_key_url
            .clone()
            .or_else(|| key.map(str::to_string));
        let effective = effective.as_deref();

        let FileObject {
            display_name,
            encrypted_display_name,
            content,
            encrypted_content,
            scr,
            transcoded_collection,
            image,
            ..
        } = file;

        let transcoded_fut = async {
            let mut stats = DecryptStats::default();
            if let Some(transcoded) = transcoded_collection {
                for piece in join_all(
                    transcoded
                        .items
                        .iter_mut()
                        .map(|item| self.decrypt_object(effective, item)),
                )
                .await
                {
                    stats.absorb(piece);
                }
            }
            stats
        };
        let image_fut = async {
            match image {
                Some(image) => {
                    self.decrypt_scr_prop(effective, "image.scr", &mut image.scr)
                        .await
                }
                None => FieldOutcome::Skipped,
            }
        };

        let (transcoded_stats, scr_outcome, name_outcome, content_outcome, image_outcome) = join!(
            transcoded_fut,
            self.decrypt_scr_prop(effective, "scr", scr),
            self.decrypt_text_prop(effective, "displayName", display_name, encrypted_display_name),
            self.decrypt_text_prop(effective, "content", content, encrypted_content),
            image_fut,
        );

        let mut stats = DecryptStats::default();
        stats.absorb(transcoded_stats);
        stats.record(scr_outcome);
        stats.record(name_outcome);
        stats.record(content_outcome);
        stats.record(image_outcome);
        stats
    }

    async fn decrypt_link(&self, key: Option<&str>, link: &mut LinkObject) -> DecryptStats {
        let LinkObject {
            display_name,
            encrypted_display_name,
            sslr,
            ..
        } = link;

        let (sslr_outcome, name_outcome) = join!(
            self.decrypt_scr_prop(key, "sslr", sslr),
            self.decrypt_text_prop(key, "displayName", display_name, encrypted_display_name),
        );

        let mut stats = DecryptStats::default();
        stats.record(sslr_outcome);
        stats.record(name_outcome);
        stats
    }

    /// Card action inputs decrypt to a JSON document. Parse failures degrade
    /// to the placeholder string; they never propagate.
    async fn decrypt_submit(&self, key: Option<&str>, submit: &mut Submit) -> DecryptStats {
        let mut stats = DecryptStats::default();
        let Some(value) = submit.inputs.as_mut() else {
            return stats;
        };
        let Value::String(ciphertext) = &*value else {
            // Already structured; nothing left to decrypt.
            return stats;
        };
        let ciphertext = ciphertext.clone();

        let outcome = match key {
            None => {
                warn!("No encryption key for card action inputs; substituting failure message");
                *value = Value::String(self.config.decryption_failure_message.clone());
                FieldOutcome::Degraded
            }
            Some(key) => {
                let decrypted = self.crypto.decrypt_text(key, &ciphertext).await;
                match decrypted.map(|plaintext| serde_json::from_str::<Value>(&plaintext)) {
                    Ok(Ok(inputs)) => {
                        *value = inputs;
                        FieldOutcome::Decrypted
                    }
                    Ok(Err(parse_err)) => {
                        warn!(error = %parse_err, "Failed to parse decrypted card action inputs");
                        *value = Value::String(self.config.decryption_failure_message.clone());
                        FieldOutcome::Degraded
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to decrypt card action inputs");
                        *value = Value::String(self.config.decryption_failure_message.clone());
                        FieldOutcome::Degraded
                    }
                }
            }
        };
        stats.record(outcome);
        stats
    }

    async fn decrypt_reaction(&self, key: Option<&str>, reaction: &mut Reaction) -> DecryptStats {
        let mut stats = DecryptStats::default();
        stats.record(
            self.decrypt_text_prop(
                key,
                "displayName",
                &mut reaction.display_name,
                &mut reaction.encrypted_display_name,
            )
            .await,
        );
        stats
    }

    async fn decrypt_reaction_summary(
        &self,
        key: Option<&str>,
        summary: &mut ReactionSummary,
    ) -> DecryptStats {
        let mut stats = DecryptStats::default();
        if summary.reactions.is_empty() {
            return stats;
        }
        for outcome in join_all(summary.reactions.iter_mut().map(|reaction| {
            self.decrypt_text_prop(
                key,
                "displayName",
                &mut reaction.display_name,
                &mut reaction.encrypted_display_name,
            )
        }))
        .await
        {
            stats.record(outcome);
        }
        stats
    }

    async fn decrypt_thread(&self, thread: &mut Thread) -> DecryptStats {
        let mut stats = DecryptStats::default();
        for piece in join_all(
            thread
                .child_activities
                .iter_mut()
                .map(|child| self.decrypt_object(None, child)),
        )
        .await
        {
            stats.absorb(piece);
        }
        stats
    }

    async fn decrypt_meeting_container(
        &self,
        key: Option<&str>,
        container: &mut MeetingContainer,
    ) -> DecryptStats {
        let usable = container
            .encryption_key_url
            .clone()
            .or_else(|| key.map(str::to_string));

        let MeetingContainer {
            display_name,
            encrypted_display_name,
            extensions,
            ..
        } = container;

        let name_fut =
            self.decrypt_text_prop(usable.as_deref(), "displayName", display_name, encrypted_display_name);

        // Recording extensions are keyed per item, not by the container.
        let extensions_fut = async {
            let mut stats = DecryptStats::default();
            let Some(extensions) = extensions else {
                return stats;
            };
            let outcomes = join_all(extensions.items.iter_mut().filter_map(|item| {
                let item_key = item.encryption_key_url.clone();
                let data = item.data.as_mut()?;
                if data.object_type.as_deref() != Some("recording") {
                    return None;
                }
                let ExtensionData {
                    topic,
                    encrypted_topic,
                    ..
                } = data;
                Some(async move {
                    self.decrypt_text_prop(item_key.as_deref(), "topic", topic, encrypted_topic)
                        .await
                })
            }))
            .await;
            for outcome in outcomes {
                stats.record(outcome);
            }
            stats
        };

        let (name_outcome, extension_stats) = join!(name_fut, extensions_fut);
        let mut stats = DecryptStats::default();
        stats.record(name_outcome);
        stats.absorb(extension_stats);
        stats
    }

    async fn decrypt_microapp_instance(
        &self,
        key: Option<&str>,
        microapp: &mut MicroappInstance,
    ) -> DecryptStats {
        let mut stats = DecryptStats::default();
        stats.record(
            self.decrypt_text_prop(
                key,
                "model",
                &mut microapp.model,
                &mut microapp.encrypted_model,
            )
            .await,
        );
        stats
    }

    async fn decrypt_event(&self, key: Option<&str>, event: &mut EventObject) -> DecryptStats {
        let EventObject {
            display_name,
            encrypted_display_name,
            location,
            encrypted_location,
            ..
        } = event;

        let name_fut = self.decrypt_text_prop(key, "displayName", display_name, encrypted_display_name);
        // A plain-text location is left alone; only the five-segment
        // encrypted locator format is decrypted.
        let location_fut = async {
            if location
                .as_deref()
                .is_some_and(|value| value.split('.').count() == 5)
            {
                self.decrypt_text_prop(key, "location", location, encrypted_location)
                    .await
            } else {
                FieldOutcome::Skipped
            }
        };

        let (name_outcome, location_outcome) = join!(name_fut, location_fut);
        let mut stats = DecryptStats::default();
        stats.record(name_outcome);
        stats.record(location_outcome);
        stats
    }

    async fn decrypt_image_uri(&self, key: Option<&str>, image: &mut ImageUri) -> DecryptStats {
        let mut stats = DecryptStats::default();
        stats.record(
            self.decrypt_text_prop(
                key,
                "location",
                &mut image.location,
                &mut image.encrypted_location,
            )
            .await,
        );
        stats
    }

    async fn decrypt_transcoded_content(
        &self,
        key: Option<&str>,
        transcoded: &mut TranscodedContent,
    ) -> DecryptStats {
        let mut stats = DecryptStats::default();
        let Some(files) = transcoded.files.as_mut() else {
            return stats;
        };
        for piece in join_all(
            files
                .items
                .iter_mut()
                .map(|item| self.decrypt_object(key, item)),
        )
        .await
        {
            stats.absorb(piece);
        }
        stats
    }

    // -----------------------------------------------------------------------
    // Field primitives
    // -----------------------------------------------------------------------

    /// Decrypt one text prop in place. Missing key or a failed service call
    /// substitutes the failure placeholder and resolves; sibling fields are
    /// unaffected.
    async fn decrypt_text_prop(
        &self,
        key: Option<&str>,
        name: &str,
        value: &mut Option<String>,
        shadow: &mut Option<String>,
    ) -> FieldOutcome {
        let Some(ciphertext) = value.clone() else {
            return FieldOutcome::Skipped;
        };
        if ciphertext.is_empty() {
            return FieldOutcome::Skipped;
        }

        let Some(key) = key else {
            warn!(field = name, "No encryption key available for field");
            *value = Some(self.config.decryption_failure_message.clone());
            return FieldOutcome::Degraded;
        };

        match self.crypto.decrypt_text(key, &ciphertext).await {
            Ok(plaintext) => {
                if self.config.keep_encrypted_properties {
                    *shadow = Some(ciphertext);
                }
                *value = Some(plaintext);
                FieldOutcome::Decrypted
            }
            Err(err) => {
                warn!(field = name, error = %err, "Failed to decrypt field");
                *value = Some(self.config.decryption_failure_message.clone());
                FieldOutcome::Degraded
            }
        }
    }

    /// Decrypt one card payload in place, substituting per index on failure.
    async fn decrypt_card(&self, key: Option<&str>, index: usize, card: &mut String) -> FieldOutcome {
        if card.is_empty() {
            return FieldOutcome::Skipped;
        }

        let Some(key) = key else {
            warn!(index = index, "No encryption key available for card");
            *card = self.config.decryption_failure_message.clone();
            return FieldOutcome::Degraded;
        };

        match self.crypto.decrypt_text(key, card).await {
            Ok(plaintext) => {
                *card = plaintext;
                FieldOutcome::Decrypted
            }
            Err(err) => {
                warn!(index = index, error = %err, "Failed to decrypt card");
                *card = self.config.decryption_failure_message.clone();
                FieldOutcome::Degraded
            }
        }
    }

    /// Decrypt an SCR/SSLR field in place. There is no meaningful
    /// placeholder for a content reference, so failures leave the
    /// ciphertext untouched.
    async fn decrypt_scr_prop(
        &self,
        key: Option<&str>,
        name: &str,
        field: &mut Option<ScrField>,
    ) -> FieldOutcome {
        let ciphertext = match field.as_ref().and_then(|scr| scr.as_encrypted()) {
            Some(ciphertext) => ciphertext.to_string(),
            None => return FieldOutcome::Skipped,
        };

        let Some(key) = key else {
            warn!(field = name, "No encryption key available for content reference");
            return FieldOutcome::Degraded;
        };

        match self.crypto.decrypt_scr(key, &ciphertext).await {
            Ok(scr) => {
                *field = Some(ScrField::Decrypted(scr));
                FieldOutcome::Decrypted
            }
            Err(err) => {
                warn!(field = name, error = %err, "Failed to decrypt content reference");
                FieldOutcome::Degraded
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use confab_core::MockCryptoService;

    const KEY: &str = "kms://keys/1";

    fn engine_with(config: ConversationConfig) -> (DecryptionEngine, Arc<MockCryptoService>) {
        let crypto = Arc::new(MockCryptoService::new());
        (DecryptionEngine::new(crypto.clone(), config), crypto)
    }

    fn engine() -> (DecryptionEngine, Arc<MockCryptoService>) {
        engine_with(ConversationConfig::default())
    }

    #[tokio::test]
    async fn text_prop_overwrites_in_place() {
        let (engine, _) = engine();
        let mut comment = Comment {
            display_name: Some(MockCryptoService::seal("hi team")),
            ..Comment::default()
        };

        let stats = engine.decrypt_comment(Some(KEY), &mut comment).await;
        assert_eq!(comment.display_name.as_deref(), Some("hi team"));
        assert_eq!(comment.encrypted_display_name, None);
        assert_eq!(stats.decrypted, 1);
    }

    #[tokio::test]
    async fn shadow_retains_ciphertext_when_configured() {
        let (engine, _) = engine_with(ConversationConfig {
            keep_encrypted_properties: true,
            ..ConversationConfig::default()
        });
        let sealed = MockCryptoService::seal("hi team");
        let mut comment = Comment {
            display_name: Some(sealed.clone()),
            ..Comment::default()
        };

        engine.decrypt_comment(Some(KEY), &mut comment).await;
        assert_eq!(comment.display_name.as_deref(), Some("hi team"));
        assert_eq!(comment.encrypted_display_name, Some(sealed));
    }

    #[tokio::test]
    async fn failed_field_degrades_and_siblings_proceed() {
        let (engine, crypto) = engine();
        let bad = MockCryptoService::seal("secret");
        crypto.poison(&bad);

        let mut comment = Comment {
            display_name: Some(MockCryptoService::seal("subject")),
            content: Some(bad),
            ..Comment::default()
        };

        let stats = engine.decrypt_comment(Some(KEY), &mut comment).await;
        assert_eq!(comment.display_name.as_deref(), Some("subject"));
        assert_eq!(
            comment.content.as_deref(),
            Some(confab_core::defaults::DECRYPTION_FAILURE_MESSAGE)
        );
        assert_eq!(stats.decrypted, 1);
        assert_eq!(stats.degraded, 1);
    }

    #[tokio::test]
    async fn missing_key_substitutes_placeholder() {
        let (engine, crypto) = engine();
        let mut comment = Comment {
            content: Some(MockCryptoService::seal("body")),
            ..Comment::default()
        };

        let stats = engine.decrypt_comment(None, &mut comment).await;
        assert_eq!(
            comment.content.as_deref(),
            Some(confab_core::defaults::DECRYPTION_FAILURE_MESSAGE)
        );
        assert_eq!(stats.degraded, 1);
        assert_eq!(crypto.total_calls(), 0, "no service call without a key");
    }

    #[tokio::test]
    async fn cards_substitute_per_index() {
        let (engine, crypto) = engine();
        let bad = MockCryptoService::seal("card two");
        crypto.poison(&bad);

        let mut comment = Comment {
            cards: vec![MockCryptoService::seal("card one"), bad],
            ..Comment::default()
        };

        engine.decrypt_comment(Some(KEY), &mut comment).await;
        assert_eq!(comment.cards[0], "card one");
        assert_eq!(
            comment.cards[1],
            confab_core::defaults::DECRYPTION_FAILURE_MESSAGE
        );
    }

    #[tokio::test]
    async fn activity_without_any_key_is_left_alone() {
        let (engine, crypto) = engine();
        let sealed = MockCryptoService::seal("text");
        let mut object = Object::Activity(Activity {
            object: Some(Box::new(Object::Comment(Comment {
                content: Some(sealed.clone()),
                ..Comment::default()
            }))),
            ..Activity::default()
        });

        // A key inherited from above does not trigger activity decryption;
        // the activity itself must carry one.
        let stats = engine.decrypt_object(Some(KEY), &mut object).await;
        assert_eq!(stats, DecryptStats::default());
        assert_eq!(crypto.total_calls(), 0);

        match object {
            Object::Activity(activity) => match *activity.object.unwrap() {
                Object::Comment(comment) => assert_eq!(comment.content.as_deref(), Some(&*sealed)),
                other => panic!("unexpected object {other:?}"),
            },
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[tokio::test]
    async fn activity_key_flows_into_object_and_children() {
        let (engine, crypto) = engine();
        let mut object = Object::Activity(Activity {
            encryption_key_url: Some(KEY.to_string()),
            object: Some(Box::new(Object::Comment(Comment {
                content: Some(MockCryptoService::seal("root")),
                ..Comment::default()
            }))),
            children: vec![crate::models::ActivityChild {
                activity: Some(Object::Activity(Activity {
                    encryption_key_url: Some(KEY.to_string()),
                    object: Some(Box::new(Object::Comment(Comment {
                        content: Some(MockCryptoService::seal("child")),
                        ..Comment::default()
                    }))),
                    ..Activity::default()
                })),
            }],
            ..Activity::default()
        });

        let stats = engine.decrypt_object(None, &mut object).await;
        assert_eq!(stats.decrypted, 2);
        assert_eq!(crypto.call_count("decrypt_text"), 2);
    }

    #[tokio::test]
    async fn submit_inputs_parse_to_json() {
        let (engine, _) = engine();
        let mut submit = Submit {
            inputs: Some(Value::String(MockCryptoService::seal(
                r#"{"choice": "yes"}"#,
            ))),
            ..Submit::default()
        };

        let stats = engine.decrypt_submit(Some(KEY), &mut submit).await;
        assert_eq!(stats.decrypted, 1);
        assert_eq!(submit.inputs.unwrap()["choice"], "yes");
    }

    #[tokio::test]
    async fn submit_unparseable_inputs_degrade_to_placeholder() {
        let (engine, _) = engine();
        let mut submit = Submit {
            inputs: Some(Value::String(MockCryptoService::seal("not json"))),
            ..Submit::default()
        };

        let stats = engine.decrypt_submit(Some(KEY), &mut submit).await;
        assert_eq!(stats.degraded, 1);
        assert_eq!(
            submit.inputs,
            Some(Value::String(
                confab_core::defaults::DECRYPTION_FAILURE_MESSAGE.to_string()
            ))
        );
    }

    #[tokio::test]
    async fn event_location_guard_requires_five_segments() {
        let (engine, crypto) = engine();
        let mut event = EventObject {
            location: Some("Building 4, floor 2".to_string()),
            ..EventObject::default()
        };

        engine.decrypt_event(Some(KEY), &mut event).await;
        assert_eq!(event.location.as_deref(), Some("Building 4, floor 2"));
        assert_eq!(crypto.total_calls(), 0);
    }

    #[tokio::test]
    async fn file_prefers_its_own_key() {
        let (engine, crypto) = engine();
        let mut file = FileObject {
            encryption_key_url: Some("kms://keys/own".to_string()),
            display_name: Some(MockCryptoService::seal("photo.png")),
            ..FileObject::default()
        };

        engine.decrypt_file(Some(KEY), &mut file).await;
        let calls = crypto.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].key_url, "kms://keys/own");
    }

    #[tokio::test]
    async fn file_inherits_ancestor_key_without_its_own() {
        let (engine, crypto) = engine();
        let mut file = FileObject {
            display_name: Some(MockCryptoService::seal("photo.png")),
            ..FileObject::default()
        };

        engine.decrypt_file(Some(KEY), &mut file).await;
        assert_eq!(crypto.calls()[0].key_url, KEY);
    }

    #[tokio::test]
    async fn scr_failure_leaves_ciphertext_in_place() {
        let (engine, crypto) = engine();
        let sealed = MockCryptoService::seal("{\"loc\": 3}");
        crypto.poison(&sealed);
        let mut file = FileObject {
            scr: Some(ScrField::Encrypted(sealed.clone())),
            ..FileObject::default()
        };

        let stats = engine.decrypt_file(Some(KEY), &mut file).await;
        assert_eq!(stats.degraded, 1);
        assert_eq!(file.scr.unwrap().as_encrypted(), Some(&*sealed));
    }

    #[tokio::test]
    async fn meeting_container_decrypts_recording_topics_with_item_keys() {
        let (engine, crypto) = engine();
        let mut container = MeetingContainer {
            extensions: Some(confab_core::ItemCollection::from(vec![
                crate::models::ExtensionItem {
                    encryption_key_url: Some("kms://keys/rec".to_string()),
                    data: Some(crate::models::ExtensionData {
                        object_type: Some("recording".to_string()),
                        topic: Some(MockCryptoService::seal("weekly sync")),
                        ..crate::models::ExtensionData::default()
                    }),
                },
                crate::models::ExtensionItem {
                    encryption_key_url: Some("kms://keys/other".to_string()),
                    data: Some(crate::models::ExtensionData {
                        object_type: Some("poll".to_string()),
                        topic: Some(MockCryptoService::seal("skipped")),
                        ..crate::models::ExtensionData::default()
                    }),
                },
            ])),
            ..MeetingContainer::default()
        };

        engine
            .decrypt_meeting_container(Some(KEY), &mut container)
            .await;

        let items = &container.extensions.as_ref().unwrap().items;
        assert_eq!(
            items[0].data.as_ref().unwrap().topic.as_deref(),
            Some("weekly sync")
        );
        // The non-recording extension stays encrypted.
        assert_ne!(
            items[1].data.as_ref().unwrap().topic.as_deref(),
            Some("skipped")
        );
        assert_eq!(crypto.calls()[0].key_url, "kms://keys/rec");
    }

    #[tokio::test]
    async fn unknown_object_is_a_noop() {
        let (engine, crypto) = engine();
        let mut object = Object::Unknown;
        let stats = engine.decrypt_object(Some(KEY), &mut object).await;
        assert_eq!(stats, DecryptStats::default());
        assert_eq!(crypto.total_calls(), 0);
    }
}
