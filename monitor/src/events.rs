//! Host events and their translation into refresh triggers.
//!
//! Hosts report what happened in their own vocabulary. [`HostEvent`] is the
//! inbound boundary: everything past [`HostEvent::trigger`] talks only about
//! the three abstract triggers in [`Trigger`].

use crate::types::{DocumentHandle, Trigger};

/// Something the host reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A document became the active one.
    DocumentOpened(DocumentHandle),

    /// The active document was closed or removed.
    DocumentClosed,

    /// The editor buffer changed. Carries the full buffer text.
    TextEdited {
        doc: DocumentHandle,
        text: String,
    },

    /// A checklist item was toggled in a rendered view.
    CheckboxClicked {
        doc: DocumentHandle,
        /// Text of the toggled item, without the marker.
        item_text: String,
    },

    /// The document changed on disk outside the editor.
    MetadataChanged(DocumentHandle),

    /// The host layout changed; the view mode may have changed with it.
    LayoutChanged,
}

impl HostEvent {
    /// The abstract trigger this event maps to.
    #[must_use]
    pub fn trigger(&self) -> Trigger {
        match self {
            HostEvent::DocumentOpened(_) => Trigger::Open,
            HostEvent::TextEdited { .. } => Trigger::Edit,
            HostEvent::DocumentClosed
            | HostEvent::CheckboxClicked { .. }
            | HostEvent::MetadataChanged(_)
            | HostEvent::LayoutChanged => Trigger::ExternalChange,
        }
    }

    /// The document the event is about, if it names one.
    #[must_use]
    pub fn document(&self) -> Option<&DocumentHandle> {
        match self {
            HostEvent::DocumentOpened(doc)
            | HostEvent::MetadataChanged(doc)
            | HostEvent::TextEdited { doc, .. }
            | HostEvent::CheckboxClicked { doc, .. } => Some(doc),
            HostEvent::DocumentClosed | HostEvent::LayoutChanged => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> DocumentHandle {
        DocumentHandle::new("/vault/list.md")
    }

    #[test]
    fn open_and_edit_map_to_their_triggers() {
        assert_eq!(HostEvent::DocumentOpened(doc()).trigger(), Trigger::Open);
        assert_eq!(
            HostEvent::TextEdited {
                doc: doc(),
                text: String::new()
            }
            .trigger(),
            Trigger::Edit
        );
    }

    #[test]
    fn everything_else_is_an_external_change() {
        for event in [
            HostEvent::DocumentClosed,
            HostEvent::LayoutChanged,
            HostEvent::MetadataChanged(doc()),
            HostEvent::CheckboxClicked {
                doc: doc(),
                item_text: "x".to_string(),
            },
        ] {
            assert_eq!(event.trigger(), Trigger::ExternalChange, "{event:?}");
        }
    }

    #[test]
    fn document_is_extracted_when_present() {
        assert_eq!(HostEvent::MetadataChanged(doc()).document(), Some(&doc()));
        assert_eq!(HostEvent::LayoutChanged.document(), None);
    }
}
