use crate::error::Error;
use crate::reservation::{Reservation, ReservationStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Reservation>", into = "Vec<Reservation>")]
pub struct InMemoryReservationStore {
    reservations: BTreeMap<u64, Reservation>,
    by_sequence: HashMap<(u64, u64), u64>,
}

impl From<Vec<Reservation>> for InMemoryReservationStore {
    fn from(reservations: Vec<Reservation>) -> Self {
        let by_sequence = reservations
            .iter()
            .map(|r| ((r.template_id, r.sequence_num), r.id))
            .collect();
        let reservations = reservations.into_iter().map(|r| (r.id, r)).collect();
        Self {
            reservations,
            by_sequence,
        }
    }
}

impl From<InMemoryReservationStore> for Vec<Reservation> {
    fn from(store: InMemoryReservationStore) -> Self {
        store.reservations.into_values().collect()
    }
}

#[async_trait::async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn reserve(
        &mut self,
        template_id: u64,
        sequence_num: u64,
        hostname: String,
    ) -> Result<Reservation, Error> {
        let key = (template_id, sequence_num);
        if self.by_sequence.contains_key(&key) {
            return Err(Error::AlreadyReserved {
                template_id,
                sequence_num,
            });
        }
        let id = self.reservations.keys().next_back().map_or(1, |last| last + 1);
        let reservation = Reservation {
            id,
            template_id,
            sequence_num,
            hostname,
            created_at: OffsetDateTime::now_utc(),
        };
        self.by_sequence.insert(key, id);
        self.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn get(&self, id: u64) -> Option<Reservation> {
        self.reservations.get(&id).cloned()
    }

    async fn list(&self, template_id: Option<u64>) -> Vec<Reservation> {
        self.reservations
            .values()
            .filter(|r| template_id.map_or(true, |id| r.template_id == id))
            .cloned()
            .collect()
    }

    async fn highest_sequence(&self, template_id: u64) -> Option<u64> {
        self.by_sequence
            .keys()
            .filter(|(t, _)| *t == template_id)
            .map(|(_, seq)| *seq)
            .max()
    }
}
