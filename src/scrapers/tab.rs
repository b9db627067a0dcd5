use std::ops::Deref;

use tracing::warn;

use super::error::BrowserResult;
use super::traits::{BrowserSession, PageTab};

/// A throwaway tab for one listing visit.
///
/// Dropping the guard closes the tab and hands focus back to the results tab,
/// on success and error paths alike.
pub struct ListingTab<'a, T: PageTab> {
    tab: T,
    home: &'a T,
}

impl<'a, T: PageTab> ListingTab<'a, T> {
    pub fn open<S>(session: &'a S) -> BrowserResult<Self>
    where
        S: BrowserSession<Tab = T>,
    {
        let tab = session.open_tab()?;
        Ok(Self {
            tab,
            home: session.home(),
        })
    }
}

impl<T: PageTab> Deref for ListingTab<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.tab
    }
}

impl<T: PageTab> Drop for ListingTab<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.tab.close() {
            warn!(error = %err, "Failed to close listing tab");
        }
        if let Err(err) = self.home.activate() {
            warn!(error = %err, "Failed to refocus results tab");
        }
    }
}
