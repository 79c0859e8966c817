//! Selector cascades: ordered fallback locators for one semantic target.

use crate::driver::PageDriver;
use crate::locator::{Locator, Target};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct SelectorCascade {
    pub name: String,
    pub candidates: Vec<Locator>,
}

/// The candidate a cascade settled on, with the number of matches seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub locator: Locator,
    pub count: usize,
}

impl Resolved {
    pub fn target(&self, index: usize, within: Option<&Target>) -> Target {
        Target::nth(self.locator.clone(), index).scoped(within)
    }
}

impl SelectorCascade {
    pub fn new(name: impl Into<String>, candidates: Vec<Locator>) -> Self {
        Self {
            name: name.into(),
            candidates,
        }
    }

    /// Probe candidates in order and stop at the first one with matches.
    ///
    /// A candidate whose probe fails counts as zero matches.
    pub async fn resolve(
        &self,
        page: &dyn PageDriver,
        within: Option<&Target>,
    ) -> Option<Resolved> {
        for locator in &self.candidates {
            let count = match page.count(locator, within).await {
                Ok(count) => count,
                Err(error) => {
                    debug!(
                        cascade = %self.name,
                        locator = %locator,
                        error = %format!("{:#}", error),
                        "Locator probe failed"
                    );
                    0
                }
            };

            if count > 0 {
                debug!(cascade = %self.name, locator = %locator, count, "Cascade resolved");
                return Some(Resolved {
                    locator: locator.clone(),
                    count,
                });
            }
        }

        debug!(cascade = %self.name, tried = self.candidates.len(), "Cascade found nothing");
        None
    }

    /// First match of the winning candidate.
    pub async fn first(&self, page: &dyn PageDriver, within: Option<&Target>) -> Option<Target> {
        self.resolve(page, within)
            .await
            .map(|resolved| resolved.target(0, within))
    }

    /// Text of the first match, `None` when nothing matches or the read fails.
    pub async fn read_text(
        &self,
        page: &dyn PageDriver,
        within: Option<&Target>,
    ) -> Option<String> {
        let target = self.first(page, within).await?;
        match page.text(&target).await {
            Ok(text) => text,
            Err(error) => {
                debug!(
                    cascade = %self.name,
                    target = %target,
                    error = %format!("{:#}", error),
                    "Text read failed"
                );
                None
            }
        }
    }
}
