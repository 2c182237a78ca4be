//! # Reconcile Module
//!
//! Feeds decoded images through a [`HashStore`] one at a time, in scan
//! order, and quarantines the lower-resolution file of every match.
//!
//! After each file the store holds exactly one record per cluster seen so
//! far, and that record is the highest-resolution file of its cluster.

mod decision;
mod report;

pub use decision::{decide, Decision};
pub use report::{DecisionKind, DecisionRecord, ReconcileReport};

use crate::core::quarantine::Quarantine;
use crate::core::store::{HashStore, ImageRecord};
use crate::error::QuarantineError;
use crate::events::{null_sender, Event, EventSender, ReconcileEvent};
use std::path::PathBuf;

/// Sequential owner of the store and the quarantine for one run
pub struct Reconciler<S: HashStore> {
    store: S,
    quarantine: Quarantine,
    decisions: Vec<DecisionRecord>,
    events: EventSender,
}

impl<S: HashStore> Reconciler<S> {
    pub fn new(store: S, quarantine: Quarantine) -> Self {
        Self {
            store,
            quarantine,
            decisions: Vec::new(),
            events: null_sender(),
        }
    }

    /// Report matches and quarantine results on `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn quarantine(&self) -> &Quarantine {
        &self.quarantine
    }

    pub fn decisions(&self) -> &[DecisionRecord] {
        &self.decisions
    }

    /// Record a file that never produced a fingerprint
    pub fn skip(&mut self, path: PathBuf, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(path = %path.display(), "Skipping: {}", reason);
        self.decisions.push(DecisionRecord {
            path,
            kind: DecisionKind::Skipped { reason },
        });
    }

    /// Reconcile one candidate against the store.
    ///
    /// Only a failure to create the quarantine root is returned; every
    /// other problem ends up in the decision log.
    pub fn process(
        &mut self,
        candidate: ImageRecord,
        fingerprint: &S::Fingerprint,
    ) -> Result<&DecisionRecord, QuarantineError> {
        let incumbent = self.store.query(fingerprint).cloned();
        let decision = decide(
            candidate.resolution,
            incumbent.as_ref().map(|record| record.resolution),
        );

        let incumbent = match incumbent {
            Some(incumbent) if decision.is_match() => incumbent,
            _ => {
                tracing::debug!(path = %candidate.path.display(), "New image");
                let record = DecisionRecord {
                    path: candidate.path.clone(),
                    kind: DecisionKind::Inserted {
                        resolution: candidate.resolution,
                    },
                };
                self.store.add(candidate, fingerprint);
                return Ok(self.push(record));
            }
        };

        tracing::info!(
            candidate = %candidate.path.display(),
            incumbent = %incumbent.path.display(),
            "Duplicate: {} ({}x{}) matches {} ({}x{})",
            candidate.name,
            candidate.width,
            candidate.height,
            incumbent.name,
            incumbent.width,
            incumbent.height
        );
        self.events.send(Event::Reconcile(ReconcileEvent::Matched {
            candidate: candidate.path.clone(),
            incumbent: incumbent.path.clone(),
        }));

        let candidate_path = candidate.path.clone();
        let (kept, discarded) = match decision {
            Decision::CandidateWins => {
                self.store.delete(&incumbent, fingerprint);
                self.store.add(candidate.clone(), fingerprint);
                (candidate, incumbent)
            }
            _ => (incumbent, candidate),
        };

        let outcome = self.quarantine.apply(&kept, &discarded)?;

        for error in outcome.errors() {
            self.events.send(Event::Reconcile(ReconcileEvent::Error {
                path: discarded.path.clone(),
                message: error.to_string(),
            }));
        }
        if outcome.discarded_moved() {
            self.events.send(Event::Reconcile(ReconcileEvent::Quarantined {
                kept: kept.path.clone(),
                discarded: discarded.path.clone(),
            }));
        }

        let record = DecisionRecord {
            path: candidate_path,
            kind: DecisionKind::Matched {
                decision,
                kept: kept.path,
                kept_resolution: kept.resolution,
                discarded: discarded.path,
                discarded_resolution: discarded.resolution,
                quarantine: outcome,
            },
        };
        Ok(self.push(record))
    }

    fn push(&mut self, record: DecisionRecord) -> &DecisionRecord {
        self.decisions.push(record);
        &self.decisions[self.decisions.len() - 1]
    }

    /// Hand back the decision log
    pub fn into_decisions(self) -> Vec<DecisionRecord> {
        self.decisions
    }
}
