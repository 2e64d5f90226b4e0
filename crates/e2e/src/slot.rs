//! Per-slot selection state machine
//!
//! ```text
//! Idle -> SurfaceOpened -> OptionsEnumerated -> ActionArmed -> ResponseCorrelated -> Done
//!   \___________\__________________\_________________\_______________\-----------> Failed
//! ```
//!
//! A selector runs once. Any failing step parks it in `Failed`, remembers the
//! phase it failed from and hands the original error back; nothing is retried.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cableguy_common::{
    normalize_whitespace, Error, ExtractedRecord, PlugOption, RandomPicker, Slot,
};

use crate::correlator::ResponseCorrelator;
use crate::driver::BrowserDriver;
use crate::error::E2eResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPhase {
    Idle,
    SurfaceOpened,
    OptionsEnumerated,
    ActionArmed,
    ResponseCorrelated,
    Done,
    Failed,
}

impl SlotPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SlotPhase::Done | SlotPhase::Failed)
    }
}

impl std::fmt::Display for SlotPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SlotPhase::Idle => "idle",
            SlotPhase::SurfaceOpened => "surface_opened",
            SlotPhase::OptionsEnumerated => "options_enumerated",
            SlotPhase::ActionArmed => "action_armed",
            SlotPhase::ResponseCorrelated => "response_correlated",
            SlotPhase::Done => "done",
            SlotPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a finished slot pass produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSelection {
    pub slot: Slot,
    pub option: PlugOption,
    pub record: ExtractedRecord,
}

/// Drives one slot from closed surface to correlated response
#[derive(Debug)]
pub struct SlotSelector {
    slot: Slot,
    phase: SlotPhase,
    history: Vec<SlotPhase>,
    failed_in: Option<SlotPhase>,
}

impl SlotSelector {
    pub fn new(slot: Slot) -> Self {
        Self {
            slot,
            phase: SlotPhase::Idle,
            history: vec![SlotPhase::Idle],
            failed_in: None,
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    /// Every phase entered so far, starting with `Idle`
    pub fn history(&self) -> &[SlotPhase] {
        &self.history
    }

    /// Phase the selector was in when it failed
    pub fn failed_in(&self) -> Option<SlotPhase> {
        self.failed_in
    }

    /// Run the full pass
    pub async fn run<D, R>(
        &mut self,
        driver: &D,
        picker: &mut RandomPicker<R>,
        correlator: &ResponseCorrelator,
    ) -> E2eResult<SlotSelection>
    where
        D: BrowserDriver + ?Sized,
        R: Rng + Send,
    {
        if self.phase != SlotPhase::Idle {
            return Err(Error::PreconditionViolation(format!(
                "{} slot selector already ran (phase {})",
                self.slot, self.phase
            ))
            .into());
        }

        match self.drive(driver, picker, correlator).await {
            Ok(selection) => Ok(selection),
            Err(e) => {
                self.failed_in = Some(self.phase);
                warn!("{} slot failed in phase {}: {}", self.slot, self.phase, e);
                self.enter(SlotPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive<D, R>(
        &mut self,
        driver: &D,
        picker: &mut RandomPicker<R>,
        correlator: &ResponseCorrelator,
    ) -> E2eResult<SlotSelection>
    where
        D: BrowserDriver + ?Sized,
        R: Rng + Send,
    {
        let slot = self.slot;

        driver.open_selection_surface(slot).await?;
        self.enter(SlotPhase::SurfaceOpened);

        let options = enumerate_options(driver).await?;
        if options.is_empty() {
            return Err(Error::no_options(slot).into());
        }
        self.enter(SlotPhase::OptionsEnumerated);

        let option = picker.pick_from(&options)?.clone();
        drop(options);
        info!(
            "{} slot: picked '{}' (position {})",
            slot, option.display_name, option.position
        );

        let pending = correlator.arm(driver);
        self.enter(SlotPhase::ActionArmed);

        let record = correlator
            .trigger_and_resolve(pending, driver.trigger_selection(slot, option.position))
            .await?;
        self.enter(SlotPhase::ResponseCorrelated);
        debug!(
            "{} slot record: {} plugs, {} brands, {} articles",
            slot,
            record.plug_messages.len(),
            record.brands.len(),
            record.articles_count
        );

        self.enter(SlotPhase::Done);
        Ok(SlotSelection {
            slot,
            option,
            record,
        })
    }

    fn enter(&mut self, next: SlotPhase) {
        debug!("{} slot: {} -> {}", self.slot, self.phase, next);
        self.phase = next;
        self.history.push(next);
    }
}

/// Read the rendered list fresh; positions are only good for this list
async fn enumerate_options<D: BrowserDriver + ?Sized>(driver: &D) -> E2eResult<Vec<PlugOption>> {
    let names = driver.list_rendered_options().await?;
    Ok(names
        .iter()
        .enumerate()
        .map(|(position, name)| PlugOption {
            display_name: normalize_whitespace(name),
            position,
        })
        .collect())
}
