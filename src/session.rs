//! Page controller: one explicit state struct driven through a small state machine.
//!
//! ```text
//! Idle -> Picking -> Cropping -> Ready -> Saving   -> Ready
//!            ^          |          |  \-> Clearing -> Idle
//!            |          v          |
//!            |        Idle         |
//!            \---------------------/   (re-pick from Ready)
//! ```

use std::sync::Arc;

use crate::{
    assets::{ImageRef, load_image},
    compositor::Compositor,
    crop::{CropRect, crop_image},
    encode::{EncodedImage, ExportFormat},
    export::{ExportReceipt, ExportRequest, Exporter},
    foundation::error::{GlassError, GlassResult},
    notify::{Notifier, Toast},
    picker::{ImagePicker, PickOptions},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Picking,
    Cropping,
    Ready,
    Saving,
    Clearing,
}

impl Phase {
    pub fn can_transition(self, to: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, to),
            (Idle | Ready, Picking)
                | (Picking, Cropping | Idle | Ready)
                | (Cropping, Ready | Idle)
                | (Ready, Saving | Clearing)
                | (Saving, Ready)
                | (Clearing, Idle)
        )
    }
}

/// Background of the glass composite, tagged with the selection that produced it. Starts as
/// the picked image and is replaced by the crop once one is confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceImage {
    pub image: ImageRef,
    pub generation: u64,
}

/// A crop of the source with the same generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CroppedImage {
    pub image: ImageRef,
    pub rect: CropRect,
    pub source_generation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageState {
    pub phase: Phase,
    pub generation: u64,
    pub source: Option<SourceImage>,
    pub cropped: Option<CroppedImage>,
    pub preview: Option<EncodedImage>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            source: None,
            cropped: None,
            preview: None,
        }
    }
}

/// Handle for a preview render started for a particular selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewTicket {
    pub generation: u64,
    pub background: ImageRef,
}

pub struct PageController {
    state: PageState,
    picker: Box<dyn ImagePicker>,
    exporter: Box<dyn Exporter>,
    notifier: Arc<dyn Notifier>,
    compositor: Compositor,
    pick_options: PickOptions,
}

impl PageController {
    pub fn new(
        compositor: Compositor,
        picker: Box<dyn ImagePicker>,
        exporter: Box<dyn Exporter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: PageState::default(),
            picker,
            exporter,
            notifier,
            compositor,
            pick_options: PickOptions::default(),
        }
    }

    pub fn with_pick_options(mut self, opts: PickOptions) -> Self {
        self.pick_options = opts;
        self
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    fn transition(&mut self, to: Phase) -> GlassResult<()> {
        let from = self.state.phase;
        if !from.can_transition(to) {
            return Err(GlassError::InvalidTransition { from, to });
        }
        tracing::debug!(?from, ?to, "phase");
        self.state.phase = to;
        Ok(())
    }

    /// Drop everything tied to the current selection and invalidate in-flight previews.
    fn reset_selection(&mut self) {
        self.state.generation += 1;
        self.state.source = None;
        self.state.cropped = None;
        self.state.preview = None;
    }

    /// Ask the picker for an image. On success the page moves to `Cropping` and the returned
    /// ticket can be used to build the background preview.
    #[tracing::instrument(skip(self))]
    pub fn select_image(&mut self) -> GlassResult<PreviewTicket> {
        let previous = self.state.phase;
        self.transition(Phase::Picking)?;

        let picked = match self.picker.choose(&self.pick_options) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "image selection failed");
                self.notifier.toast(Toast::plain("image selection failed"));
                self.state.phase = previous;
                return Err(e);
            }
        };

        self.reset_selection();
        let generation = self.state.generation;
        self.state.source = Some(SourceImage {
            image: picked.clone(),
            generation,
        });
        self.transition(Phase::Cropping)?;
        Ok(PreviewTicket {
            generation,
            background: picked,
        })
    }

    /// Render the background-only preview for `ticket`. Does not touch page state.
    pub async fn render_preview(&self, ticket: &PreviewTicket) -> GlassResult<Option<EncodedImage>> {
        self.compositor.compose(&ticket.background, None).await
    }

    /// Store a finished preview. Returns `false` and drops it when the ticket was superseded by
    /// a later selection, crop, crop cancel or clear.
    pub fn apply_preview(&mut self, ticket: &PreviewTicket, preview: Option<EncodedImage>) -> bool {
        let current_background = self.state.source.as_ref().map(|s| &s.image);
        if ticket.generation != self.state.generation
            || current_background != Some(&ticket.background)
        {
            tracing::debug!(
                stale = ticket.generation,
                current = self.state.generation,
                "dropping stale preview"
            );
            return false;
        }
        self.state.preview = preview;
        true
    }

    /// Render and apply in one step.
    pub async fn refresh_preview(&mut self, ticket: &PreviewTicket) -> GlassResult<bool> {
        let preview = self.render_preview(ticket).await?;
        Ok(self.apply_preview(ticket, preview))
    }

    /// Crop the current source and move to `Ready`. The crop becomes the glass background too;
    /// the returned ticket re-renders the preview from it.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_crop(&mut self, rect: CropRect) -> GlassResult<PreviewTicket> {
        if self.state.phase != Phase::Cropping {
            return Err(GlassError::InvalidTransition {
                from: self.state.phase,
                to: Phase::Ready,
            });
        }
        let Some(source) = self.state.source.clone() else {
            return Err(GlassError::validation("no source image to crop"));
        };

        let cropped = match self.crop_source(&source, rect).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "crop failed");
                self.notifier.toast(Toast::plain("crop failed"));
                return Err(e);
            }
        };

        self.transition(Phase::Ready)?;
        let ticket = PreviewTicket {
            generation: source.generation,
            background: cropped.image.clone(),
        };
        self.state.source = Some(SourceImage {
            image: cropped.image.clone(),
            generation: source.generation,
        });
        self.state.cropped = Some(cropped);
        Ok(ticket)
    }

    async fn crop_source(&self, source: &SourceImage, rect: CropRect) -> GlassResult<CroppedImage> {
        let prepared = load_image(&source.image, self.compositor.load_timeout).await?;
        let encoded = crop_image(&prepared, rect, ExportFormat::Jpeg, self.compositor.quality)?;
        Ok(CroppedImage {
            image: ImageRef::encoded(encoded.bytes),
            rect,
            source_generation: source.generation,
        })
    }

    /// Abandon the pending selection.
    pub fn cancel_crop(&mut self) -> GlassResult<()> {
        if self.state.phase != Phase::Cropping {
            return Err(GlassError::InvalidTransition {
                from: self.state.phase,
                to: Phase::Idle,
            });
        }
        self.reset_selection();
        self.transition(Phase::Idle)
    }

    /// Export the composite through the platform exporter.
    #[tracing::instrument(skip(self), fields(platform = ?self.exporter.platform()))]
    pub async fn save(&mut self) -> GlassResult<ExportReceipt> {
        let (Some(source), Some(cropped)) = (self.state.source.clone(), self.state.cropped.clone())
        else {
            return Err(GlassError::InvalidTransition {
                from: self.state.phase,
                to: Phase::Saving,
            });
        };
        debug_assert_eq!(source.generation, cropped.source_generation);
        self.transition(Phase::Saving)?;

        let request = ExportRequest {
            source: &source.image,
            cropped: &cropped.image,
        };
        let result = self.exporter.export(request, &self.compositor).await;
        self.transition(Phase::Ready)?;

        match &result {
            Ok(receipt) => {
                tracing::info!(path = %receipt.path.display(), "saved");
                self.notifier.toast(Toast::success("saved"));
            }
            Err(e @ GlassError::Generate(_)) => {
                tracing::warn!(error = %e, "image generation failed");
                self.notifier.toast(Toast::plain("failed to generate image"));
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                self.notifier.toast(Toast::plain("save failed"));
            }
        }
        result
    }

    /// Drop the selection and go back to `Idle`.
    pub fn clear(&mut self) -> GlassResult<()> {
        self.transition(Phase::Clearing)?;
        self.reset_selection();
        self.transition(Phase::Idle)
    }
}
