//! A JSON file-backed implementation of the [`ReservationStore`][super::ReservationStore] trait.
//!
//! Wraps a [`InMemoryReservationStore`][super::memory::InMemoryReservationStore] instance,
//! persisting reservations to a JSON file on disk that can be reloaded across restarts.
use crate::error::Error;
use crate::reservation::memory::InMemoryReservationStore;
use crate::reservation::{Reservation, ReservationStore};
use std::io::ErrorKind;
use tokio::fs::File;
use tokio::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// A file-backed reservation store. After each reservation a JSON file on disk is rewritten
/// with the full state. This file is reloaded across restarts so that reservations, and the
/// sequence numbers they hold, are never lost.
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileReservationStore {
    store: InMemoryReservationStore,
    path: String,
}

impl FileReservationStore {
    /// Save the reservations as JSON to the store's configured path, or return an Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if a reservation can't be serialized to JSON.
    ///
    /// Returns [`Error::IO`] if the serialized state can't be written to the backing file path.
    pub async fn save(&self) -> Result<(), Error> {
        Self::write_state(&self.path, &self.store).await
    }

    async fn write_state(path: &str, store: &InMemoryReservationStore) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(store)?;
        let mut output_file = File::create(path).await?;
        output_file.write_all(data.as_bytes()).await?;
        output_file.flush().await?;
        Ok(())
    }

    /// Load a [`FileReservationStore`] from the JSON state located at the given path, creating
    /// an empty state file if none exists, or return an Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the JSON state file is invalid.
    ///
    /// Returns [`Error::IO`] if the path can't be opened or read.
    pub async fn try_from_file(p: &str) -> Result<Self, Error> {
        let contents = match File::open(p).await {
            Ok(mut f) => {
                let mut buf = vec![];
                f.read_to_end(&mut buf).await?;
                buf
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Self::write_empty_state(File::create(&p).await?).await?,
                _ => return Err(Error::IO(err)),
            },
        };

        let store: InMemoryReservationStore = serde_json::from_slice(&contents)?;
        Ok(Self {
            path: p.to_string(),
            store,
        })
    }

    async fn write_empty_state(mut f: File) -> io::Result<Vec<u8>> {
        let default_data = serde_json::to_string_pretty(&InMemoryReservationStore::default())?;
        let default_bytes = default_data.as_bytes();
        f.write_all(default_bytes).await?;
        f.flush().await?;
        Ok(default_bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl ReservationStore for FileReservationStore {
    async fn reserve(
        &mut self,
        template_id: u64,
        sequence_num: u64,
        hostname: String,
    ) -> Result<Reservation, Error> {
        // The reservation only becomes visible once it has been written out.
        let mut updated = self.store.clone();
        let reservation = updated
            .reserve(template_id, sequence_num, hostname)
            .await?;
        Self::write_state(&self.path, &updated).await?;
        self.store = updated;
        Ok(reservation)
    }

    async fn get(&self, id: u64) -> Option<Reservation> {
        self.store.get(id).await
    }

    async fn list(&self, template_id: Option<u64>) -> Vec<Reservation> {
        self.store.list(template_id).await
    }

    async fn highest_sequence(&self, template_id: u64) -> Option<u64> {
        self.store.highest_sequence(template_id).await
    }
}
