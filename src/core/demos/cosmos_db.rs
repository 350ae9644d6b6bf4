use crate::domain::model::Reservation;
use crate::domain::ports::{Demo, ReservationRepository};
use crate::utils::error::Result;
use async_trait::async_trait;

pub const RESERVATION_NAMES: [&str; 3] = ["A", "B", "C"];

pub struct CosmosDbDemo<R: ReservationRepository> {
    repository: R,
    create_collection: bool,
}

impl<R: ReservationRepository> CosmosDbDemo<R> {
    pub fn new(repository: R, create_collection: bool) -> Self {
        Self {
            repository,
            create_collection,
        }
    }
}

#[async_trait]
impl<R: ReservationRepository> Demo for CosmosDbDemo<R> {
    fn name(&self) -> &str {
        "cosmos-db"
    }

    async fn run(&self) -> Result<()> {
        if self.create_collection {
            self.repository.ensure_collection().await?;
        }

        let deleted = self.repository.delete_all().await?;
        tracing::debug!("Cleared {} reservations", deleted);

        for name in RESERVATION_NAMES {
            let saved = self.repository.save(Reservation::named(name)).await?;
            tracing::info!("{}", saved);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryReservations {
        calls: Mutex<Vec<String>>,
        docs: Mutex<Vec<Reservation>>,
    }

    #[async_trait]
    impl ReservationRepository for InMemoryReservations {
        async fn ensure_collection(&self) -> Result<()> {
            self.calls.lock().unwrap().push("ensure".to_string());
            Ok(())
        }

        async fn delete_all(&self) -> Result<usize> {
            self.calls.lock().unwrap().push("delete_all".to_string());
            let mut docs = self.docs.lock().unwrap();
            let n = docs.len();
            docs.clear();
            Ok(n)
        }

        async fn save(&self, mut reservation: Reservation) -> Result<Reservation> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("save {}", reservation.reservation_name));
            reservation.id.get_or_insert_with(|| "generated".to_string());
            self.docs.lock().unwrap().push(reservation.clone());
            Ok(reservation)
        }
    }

    #[tokio::test]
    async fn test_clears_then_inserts_three_reservations() {
        let repo = InMemoryReservations::default();
        repo.docs.lock().unwrap().push(Reservation {
            id: Some("old".to_string()),
            reservation_name: "Z".to_string(),
        });

        let demo = CosmosDbDemo::new(repo, false);
        demo.run().await.unwrap();

        assert_eq!(
            *demo.repository.calls.lock().unwrap(),
            vec!["delete_all", "save A", "save B", "save C"]
        );
        let names: Vec<String> = demo
            .repository
            .docs
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.reservation_name.clone())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_creates_collection_when_enabled() {
        let demo = CosmosDbDemo::new(InMemoryReservations::default(), true);
        demo.run().await.unwrap();
        assert_eq!(demo.repository.calls.lock().unwrap()[0], "ensure");
    }
}
