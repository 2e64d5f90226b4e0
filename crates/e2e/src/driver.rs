//! Browser driver seam
//!
//! The workflow never touches a browser directly. Everything it needs from
//! the page goes through `BrowserDriver`, which the Playwright bridge
//! implements for live runs and tests implement with scripted pages.

use async_trait::async_trait;
use tokio::sync::broadcast;

use cableguy_common::{NetworkResponse, Slot};

use crate::error::E2eResult;

/// Stream of responses observed by the browser, in arrival order
pub type ResponseStream = broadcast::Receiver<NetworkResponse>;

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open the option picker for a slot
    async fn open_selection_surface(&self, slot: Slot) -> E2eResult<()>;

    /// Display names of the options currently rendered, in order
    async fn list_rendered_options(&self) -> E2eResult<Vec<String>>;

    /// Click the option at `index` of the currently rendered list
    async fn trigger_selection(&self, slot: Slot, index: usize) -> E2eResult<()>;

    /// Count the UI shows next to a brand
    async fn read_rendered_count(&self, brand: &str) -> E2eResult<u64>;

    /// Register a listener for network responses.
    ///
    /// Responses that arrive after this returns are delivered to the
    /// receiver; earlier ones are not.
    fn subscribe_responses(&self) -> ResponseStream;

    /// Label the slot shows once something is selected, if the driver can tell
    async fn selected_slot_label(&self, _slot: Slot) -> E2eResult<Option<String>> {
        Ok(None)
    }
}
