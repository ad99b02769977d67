//! The transcript store: an append-and-patch log of conversation items.
//!
//! Items are never reordered. They are removed only when explicitly
//! superseded (stale schedule/plan/analysis panels, transient status
//! messages, stale action menus). The store enforces the live-item
//! discipline on every mutation: at most one non-disabled question and at
//! most one non-disabled action menu exist at any time, and disabling is
//! monotonic.

use iara_core::types::{ErrorAnalysis, Question, Schedule, WeeklyPlan};

/// Identity and insertion order of a transcript item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

/// Who produced a plain message. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// What a question item actually asks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    /// Compact-entry pseudo-question: pick a subject from a plain list.
    /// Answering it never touches the network.
    SubjectMenu { subjects: Vec<String> },
    /// A real exam question with a remote identity.
    Exam(Question),
}

/// One entry in the conversation log. A closed set: every mutation and
/// render site matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptItem {
    Message {
        id: ItemId,
        sender: Sender,
        text: String,
        /// Transient status line ("Verificando sua resposta...") that is
        /// filtered out when its replacement arrives.
        ephemeral: bool,
        disabled: bool,
    },
    Question {
        id: ItemId,
        kind: QuestionKind,
        disabled: bool,
    },
    ActionMenu {
        id: ItemId,
        disabled: bool,
    },
    Schedule {
        id: ItemId,
        schedule: Schedule,
    },
    WeeklyPlan {
        id: ItemId,
        plan: WeeklyPlan,
    },
    Analysis {
        id: ItemId,
        analysis: ErrorAnalysis,
    },
}

impl TranscriptItem {
    pub fn id(&self) -> ItemId {
        match self {
            TranscriptItem::Message { id, .. }
            | TranscriptItem::Question { id, .. }
            | TranscriptItem::ActionMenu { id, .. }
            | TranscriptItem::Schedule { id, .. }
            | TranscriptItem::WeeklyPlan { id, .. }
            | TranscriptItem::Analysis { id, .. } => *id,
        }
    }

    /// True for interactive items whose affordances are still enabled.
    pub fn is_live(&self) -> bool {
        match self {
            TranscriptItem::Question { disabled, .. }
            | TranscriptItem::ActionMenu { disabled, .. } => !disabled,
            _ => false,
        }
    }
}

/// The ordered log plus the monotonic id source.
#[derive(Debug, Default)]
pub struct TranscriptState {
    items: Vec<TranscriptItem>,
    next_id: u64,
    /// Set on every mutation; the UI collaborator drains it to scroll.
    scroll_pending: bool,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered snapshot for rendering.
    pub fn items(&self) -> &[TranscriptItem] {
        &self.items
    }

    /// Drains the scroll-to-end notification raised by mutations.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    fn alloc_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    fn append(&mut self, item: TranscriptItem) -> ItemId {
        let id = item.id();
        self.items.push(item);
        self.scroll_pending = true;
        id
    }

    /// Appends a plain message.
    pub fn push_message(&mut self, sender: Sender, text: impl Into<String>) -> ItemId {
        let id = self.alloc_id();
        self.append(TranscriptItem::Message {
            id,
            sender,
            text: text.into(),
            ephemeral: false,
            disabled: false,
        })
    }

    /// Appends a transient assistant status line.
    pub fn push_status(&mut self, text: impl Into<String>) -> ItemId {
        let id = self.alloc_id();
        self.append(TranscriptItem::Message {
            id,
            sender: Sender::Assistant,
            text: text.into(),
            ephemeral: true,
            disabled: false,
        })
    }

    /// Appends a live question, disabling any earlier live question first.
    pub fn push_question(&mut self, kind: QuestionKind) -> ItemId {
        if let Some((id, _)) = self.live_question() {
            self.disable(id);
        }
        let id = self.alloc_id();
        self.append(TranscriptItem::Question {
            id,
            kind,
            disabled: false,
        })
    }

    /// Appends a live action menu, disabling any earlier live menu first.
    pub fn push_menu(&mut self) -> ItemId {
        if let Some(id) = self.live_menu() {
            self.disable(id);
        }
        let id = self.alloc_id();
        self.append(TranscriptItem::ActionMenu {
            id,
            disabled: false,
        })
    }

    /// Replaces any stale schedule panel with a fresh one.
    pub fn push_schedule(&mut self, schedule: Schedule) -> ItemId {
        self.items
            .retain(|item| !matches!(item, TranscriptItem::Schedule { .. }));
        let id = self.alloc_id();
        self.append(TranscriptItem::Schedule { id, schedule })
    }

    /// Replaces any stale weekly-plan panel with a fresh one.
    pub fn push_weekly_plan(&mut self, plan: WeeklyPlan) -> ItemId {
        self.items
            .retain(|item| !matches!(item, TranscriptItem::WeeklyPlan { .. }));
        let id = self.alloc_id();
        self.append(TranscriptItem::WeeklyPlan { id, plan })
    }

    /// Replaces any stale analysis panel with a fresh one.
    pub fn push_analysis(&mut self, analysis: ErrorAnalysis) -> ItemId {
        self.items
            .retain(|item| !matches!(item, TranscriptItem::Analysis { .. }));
        let id = self.alloc_id();
        self.append(TranscriptItem::Analysis { id, analysis })
    }

    /// The only legal patch: marks an item disabled. Never un-disables.
    pub fn disable(&mut self, target: ItemId) {
        for item in &mut self.items {
            if item.id() != target {
                continue;
            }
            match item {
                TranscriptItem::Message { disabled, .. }
                | TranscriptItem::Question { disabled, .. }
                | TranscriptItem::ActionMenu { disabled, .. } => *disabled = true,
                _ => {}
            }
            self.scroll_pending = true;
            return;
        }
    }

    /// Removes a stale schedule panel ahead of a mutation round-trip.
    pub fn drop_schedule(&mut self) {
        self.items
            .retain(|item| !matches!(item, TranscriptItem::Schedule { .. }));
        self.scroll_pending = true;
    }

    /// Removes transient status messages.
    pub fn drop_ephemeral(&mut self) {
        self.items.retain(|item| {
            !matches!(
                item,
                TranscriptItem::Message {
                    ephemeral: true,
                    ..
                }
            )
        });
        self.scroll_pending = true;
    }

    /// Removes everything a subject change makes stale: data panels,
    /// transient status lines and action menus (a fresh menu follows).
    pub fn drop_stale_for_subject_change(&mut self) {
        self.items.retain(|item| {
            !matches!(
                item,
                TranscriptItem::Schedule { .. }
                    | TranscriptItem::WeeklyPlan { .. }
                    | TranscriptItem::Analysis { .. }
                    | TranscriptItem::ActionMenu { .. }
                    | TranscriptItem::Message {
                        ephemeral: true,
                        ..
                    }
            )
        });
        self.scroll_pending = true;
    }

    /// Most recent non-disabled question: a linear backward search over
    /// the append-only log.
    pub fn live_question(&self) -> Option<(ItemId, &QuestionKind)> {
        self.items.iter().rev().find_map(|item| match item {
            TranscriptItem::Question {
                id,
                kind,
                disabled: false,
            } => Some((*id, kind)),
            _ => None,
        })
    }

    /// Most recent non-disabled action menu.
    pub fn live_menu(&self) -> Option<ItemId> {
        self.items.iter().rev().find_map(|item| match item {
            TranscriptItem::ActionMenu {
                id,
                disabled: false,
            } => Some(*id),
            _ => None,
        })
    }

    /// Disables the most recent live question or menu, whichever is later.
    /// Used by the subject-switch protocol to guard against a superseded
    /// operation appending after its busy window.
    pub fn disable_latest_live(&mut self) {
        let latest = self
            .items
            .iter()
            .rev()
            .find(|item| item.is_live())
            .map(TranscriptItem::id);
        if let Some(id) = latest {
            self.disable(id);
        }
    }

    #[cfg(test)]
    fn live_count(&self) -> (usize, usize) {
        let questions = self
            .items
            .iter()
            .filter(|i| matches!(i, TranscriptItem::Question { disabled: false, .. }))
            .count();
        let menus = self
            .items
            .iter()
            .filter(|i| matches!(i, TranscriptItem::ActionMenu { disabled: false, .. }))
            .count();
        (questions, menus)
    }
}
