//! Rendered session state as served to the browser.

use llm_core::{Epoch, SessionSnapshot};
use lyrics_core::{render, ActionAvailability, ExtractedFields, RenderedView, Variant};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub category: &'static str,
    pub label: &'static str,
    pub topic: String,
    pub loading: bool,
    pub epoch: Option<Epoch>,
    pub variants: Vec<VariantView>,
}

#[derive(Debug, Serialize)]
pub struct VariantView {
    pub variant: Variant,
    /// Launched by the current epoch.
    pub active: bool,
    pub complete: bool,
    pub text: String,
    pub display: RenderedView,
    /// Only once the session has settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ExtractedFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<ActionAvailability>,
}

impl SessionView {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let variants = Variant::ALL
            .iter()
            .map(|&variant| {
                let buffer = snapshot.buffer(variant);
                let (fields, master, actions) = if snapshot.loading {
                    (None, None, None)
                } else {
                    let fields = lyrics_core::extract_fields(&buffer.text);
                    let master = fields.master_prompt();
                    let actions = fields.availability(&buffer.text);
                    (Some(fields), Some(master), Some(actions))
                };
                VariantView {
                    variant,
                    active: snapshot.variants.contains(&variant),
                    complete: buffer.complete,
                    text: buffer.text.clone(),
                    display: render(&buffer.text, snapshot.loading),
                    fields,
                    master,
                    actions,
                }
            })
            .collect();

        Self {
            category: snapshot.category,
            label: snapshot.label,
            topic: snapshot.topic.clone(),
            loading: snapshot.loading,
            epoch: snapshot.epoch,
            variants,
        }
    }
}
