//! Hostname reservations.
//!
//! A [`Reservation`] permanently commits a hostname against its (template, sequence number)
//! pair. Reservations are append-only: there is no update or delete path, and a second
//! reservation of the same pair fails with [`Error::AlreadyReserved`] without changing any
//! state.
//!
//! Two implementations are provided, [`memory::InMemoryReservationStore`] and
//! [`file::FileReservationStore`]. The former is not durable across restarts. The latter writes
//! its state to disk for each reservation and loads this state again on startup.

use crate::assembler::{Assembler, Params};
use crate::error::Error;
use crate::sequence::SequenceAllocator;
use crate::template::TemplateStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileReservationStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryReservationStore;

/// `DynReservationStore` is a type alias for a [`ReservationStore`] that can be used by multiple
/// read/write consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the
/// [`ReservationStore`].
#[allow(clippy::module_name_repetitions)]
pub type DynReservationStore = Arc<RwLock<dyn ReservationStore + Send + Sync>>;

/// A committed, uniquely owned (template, sequence number) pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: u64,
    pub template_id: u64,
    pub sequence_num: u64,
    pub hostname: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An async trait describing append-only storage of [`Reservation`]s.
#[async_trait::async_trait]
pub trait ReservationStore {
    /// Reserve `sequence_num` of `template_id` for `hostname`.
    ///
    /// Fails with [`Error::AlreadyReserved`], leaving the store unchanged, if the pair is
    /// already reserved.
    async fn reserve(
        &mut self,
        template_id: u64,
        sequence_num: u64,
        hostname: String,
    ) -> Result<Reservation, Error>;

    /// Get a reservation by ID.
    async fn get(&self, id: u64) -> Option<Reservation>;

    /// List reservations ordered by ID, optionally only those of one template.
    async fn list(&self, template_id: Option<u64>) -> Vec<Reservation>;

    /// The highest reserved sequence number of a template (if any).
    async fn highest_sequence(&self, template_id: u64) -> Option<u64>;
}

/// Assemble a hostname from `template_id` and `params`, allocating its sequence number, and
/// reserve it.
///
/// # Errors
///
/// Returns the errors of [`Assembler::assemble`], [`Error::NotReservable`] for templates without
/// a sequence group, and [`Error::AlreadyReserved`] if the allocated sequence number has somehow
/// been reserved already.
pub async fn reserve_hostname(
    assembler: &Assembler,
    store: &DynReservationStore,
    template_id: u64,
    params: &Params,
) -> Result<Reservation, Error> {
    let candidate = assembler.assemble(template_id, params)?;
    let Some(sequence_num) = candidate.sequence_num else {
        return Err(Error::NotReservable(template_id));
    };
    let reservation = store
        .write()
        .await
        .reserve(template_id, sequence_num, candidate.hostname)
        .await?;
    tracing::info!(
        "reserved \"{}\" as sequence {} of template {}",
        reservation.hostname,
        reservation.sequence_num,
        reservation.template_id
    );
    Ok(reservation)
}

/// Raise the allocator's counters past every reserved sequence number, so that numbers
/// reserved before a restart are never issued again.
pub async fn resume_allocator(
    templates: &TemplateStore,
    store: &DynReservationStore,
    allocator: &SequenceAllocator,
) {
    let store = store.read().await;
    for template in templates.list() {
        if let Some(highest) = store.highest_sequence(template.id).await {
            tracing::debug!("resuming template {} after sequence {highest}", template.id);
            allocator.resume(template.id, highest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{GroupDef, GroupValidator, TemplateDef, ValidationType};

    fn templates(seq_length: usize) -> Arc<TemplateStore> {
        let groups = vec![
            GroupDef {
                name: "site".into(),
                length: 3,
                is_required: true,
                validation_type: ValidationType::List,
                validation_value: Some("ams,fra".into()),
            },
            GroupDef {
                name: "seq".into(),
                length: seq_length,
                is_required: true,
                validation_type: ValidationType::Sequence,
                validation_value: None,
            },
        ];
        let unsequenced = vec![GroupDef {
            name: "name".into(),
            length: 4,
            is_required: true,
            validation_type: ValidationType::Fixed,
            validation_value: Some("core".into()),
        }];
        Arc::new(
            TemplateStore::from_defs(vec![
                TemplateDef {
                    id: 1,
                    name: "edge".into(),
                    description: None,
                    max_length: None,
                    groups,
                },
                TemplateDef {
                    id: 2,
                    name: "core".into(),
                    description: None,
                    max_length: None,
                    groups: unsequenced,
                },
            ])
            .unwrap(),
        )
    }

    fn store() -> DynReservationStore {
        Arc::new(RwLock::new(InMemoryReservationStore::default()))
    }

    fn params(site: &str) -> Params {
        Params::from([("site".to_string(), site.to_string())])
    }

    #[tokio::test]
    async fn test_reserve_hostname_commits_allocated_sequence() {
        let allocator = Arc::new(SequenceAllocator::new());
        let assembler = Assembler::new(templates(2), allocator, GroupValidator::default());
        let store = store();

        let first = reserve_hostname(&assembler, &store, 1, &params("ams"))
            .await
            .unwrap();
        let second = reserve_hostname(&assembler, &store, 1, &params("fra"))
            .await
            .unwrap();
        assert_eq!(first.hostname, "ams01");
        assert_eq!(second.hostname, "fra02");
        assert_eq!(store.read().await.list(Some(1)).await.len(), 2);
    }

    #[tokio::test]
    async fn test_overflow_creates_no_reservation() {
        let allocator = Arc::new(SequenceAllocator::new());
        allocator.resume(1, 99);
        let assembler = Assembler::new(templates(2), allocator, GroupValidator::default());
        let store = store();

        let err = reserve_hostname(&assembler, &store, 1, &params("ams"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SequenceOverflow { value: 100, .. }));
        assert!(store.read().await.list(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_unsequenced_template_is_not_reservable() {
        let assembler = Assembler::new(
            templates(2),
            Arc::new(SequenceAllocator::new()),
            GroupValidator::default(),
        );
        let err = reserve_hostname(&assembler, &store(), 2, &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotReservable(2)));
    }

    #[tokio::test]
    async fn test_resume_allocator_skips_reserved_sequences() {
        let templates = templates(3);
        let store = store();
        store
            .write()
            .await
            .reserve(1, 17, "ams017".into())
            .await
            .unwrap();
        let allocator = SequenceAllocator::new();
        resume_allocator(&templates, &store, &allocator).await;
        assert_eq!(allocator.next(1), 18);
        assert_eq!(allocator.next(2), 1);
    }
}
