use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tagcall_core::{ChatEntry, DEFAULT_CHAT_HISTORY};

// ── CallView ──────────────────────────────────────────────────────────────────

/// Presentation side of a call. All methods are synchronous and must not block.
pub trait CallView: Send + Sync + 'static {
    fn alert(&self, message: &str);

    /// `None` clears the preview.
    fn show_local_preview(&self, stream_id: Option<&str>);

    fn show_remote_preview(&self, stream_id: Option<&str>);

    fn append_chat(&self, entry: &ChatEntry);

    fn clear_message_input(&self);

    fn call_active_changed(&self, active: bool);
}

impl<V: CallView> CallView for Arc<V> {
    fn alert(&self, message: &str) {
        (**self).alert(message)
    }

    fn show_local_preview(&self, stream_id: Option<&str>) {
        (**self).show_local_preview(stream_id)
    }

    fn show_remote_preview(&self, stream_id: Option<&str>) {
        (**self).show_remote_preview(stream_id)
    }

    fn append_chat(&self, entry: &ChatEntry) {
        (**self).append_chat(entry)
    }

    fn clear_message_input(&self) {
        (**self).clear_message_input()
    }

    fn call_active_changed(&self, active: bool) {
        (**self).call_active_changed(active)
    }
}

// ── ChatLog ───────────────────────────────────────────────────────────────────

/// Chat history in display order, oldest entries evicted first.
#[derive(Debug, Clone)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHAT_HISTORY)
    }
}

impl ChatLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity.min(64)), capacity }
    }

    pub fn push(&mut self, entry: ChatEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.back()
    }
}

// ── ViewState ─────────────────────────────────────────────────────────────────

/// Point-in-time copy of everything a front-end renders.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub local_preview: Option<String>,
    pub remote_preview: Option<String>,
    pub chat: Vec<ChatEntry>,
    pub alerts: Vec<String>,
    pub call_active: bool,
    /// Number of times the message input was cleared.
    pub input_clears: u32,
}

impl ViewSnapshot {
    /// Label of the start/stop control.
    pub fn toggle_label(&self) -> &'static str {
        if self.call_active {
            "End Video"
        } else {
            "Start Video"
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    local_preview: Option<String>,
    remote_preview: Option<String>,
    chat: ChatLog,
    alerts: Vec<String>,
    call_active: bool,
    input_clears: u32,
}

/// Shared, lock-protected view model. Front-ends render from
/// [`snapshot`](ViewState::snapshot); the controller writes through the
/// [`CallView`] impl.
#[derive(Debug, Default)]
pub struct ViewState {
    inner: Mutex<Inner>,
}

impl ViewState {
    pub fn new(chat_history: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { chat: ChatLog::with_capacity(chat_history), ..Inner::default() }),
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let inner = self.lock();
        ViewSnapshot {
            local_preview: inner.local_preview.clone(),
            remote_preview: inner.remote_preview.clone(),
            chat: inner.chat.iter().cloned().collect(),
            alerts: inner.alerts.clone(),
            call_active: inner.call_active,
            input_clears: inner.input_clears,
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        if self.lock().call_active {
            "End Video"
        } else {
            "Start Video"
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CallView for ViewState {
    fn alert(&self, message: &str) {
        tracing::debug!("[view] alert: {}", message);
        self.lock().alerts.push(message.to_owned());
    }

    fn show_local_preview(&self, stream_id: Option<&str>) {
        self.lock().local_preview = stream_id.map(str::to_owned);
    }

    fn show_remote_preview(&self, stream_id: Option<&str>) {
        self.lock().remote_preview = stream_id.map(str::to_owned);
    }

    fn append_chat(&self, entry: &ChatEntry) {
        self.lock().chat.push(entry.clone());
    }

    fn clear_message_input(&self) {
        self.lock().input_clears += 1;
    }

    fn call_active_changed(&self, active: bool) {
        self.lock().call_active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagcall_core::ChatSender;

    #[test]
    fn chat_log_evicts_oldest() {
        let mut log = ChatLog::with_capacity(3);
        for i in 0..5 {
            log.push(ChatEntry::local(format!("m{i}")));
        }
        let texts: Vec<_> = log.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["m2", "m3", "m4"]);
        assert_eq!(log.last().map(|e| e.text.as_str()), Some("m4"));
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut log = ChatLog::with_capacity(0);
        log.push(ChatEntry::peer("a"));
        log.push(ChatEntry::peer("b"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn view_state_tracks_rendered_state() {
        let view = ViewState::new(10);
        assert_eq!(view.toggle_label(), "Start Video");

        view.call_active_changed(true);
        view.show_local_preview(Some("local"));
        view.show_remote_preview(Some("remote"));
        view.append_chat(&ChatEntry::local("hi"));
        view.append_chat(&ChatEntry::peer("hello"));
        view.clear_message_input();
        view.alert("Please enter a tag!");

        let snap = view.snapshot();
        assert_eq!(snap.toggle_label(), "End Video");
        assert_eq!(snap.local_preview.as_deref(), Some("local"));
        assert_eq!(snap.remote_preview.as_deref(), Some("remote"));
        assert_eq!(snap.chat.iter().map(|e| e.sender).collect::<Vec<_>>(), [ChatSender::Local, ChatSender::Peer]);
        assert_eq!(snap.input_clears, 1);
        assert_eq!(snap.alerts, ["Please enter a tag!"]);

        view.show_local_preview(None);
        view.call_active_changed(false);
        let snap = view.snapshot();
        assert!(snap.local_preview.is_none());
        assert_eq!(snap.toggle_label(), "Start Video");
    }
}
