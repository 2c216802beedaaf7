#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use visit_booking::{
    cache::SessionCache,
    models::{RegistrationDetails, SessionStatus, VisitSession},
    service::{ReservationService, RetryPolicy},
    store::ReservationStore,
};

pub fn session(id: &str, total: i32, remaining: i32) -> VisitSession {
    VisitSession {
        id: id.to_string(),
        date: "2025-05-01".to_string(),
        time: "10:00-12:00".to_string(),
        total_seats: total,
        remaining_seats: remaining,
        order: 1,
        status: SessionStatus::Open,
    }
}

pub fn details(visitors: i32) -> RegistrationDetails {
    RegistrationDetails {
        name: "王小明".to_string(),
        cellphone: "0912345678".to_string(),
        visitors: Some(visitors),
        remark: None,
    }
}

pub fn service(store: Arc<dyn ReservationStore>) -> ReservationService {
    ReservationService::new(
        store,
        SessionCache::disabled(),
        RetryPolicy::new(2, Duration::from_millis(1)),
    )
}

pub async fn remaining(store: &dyn ReservationStore, id: &str) -> i32 {
    store
        .get_session(id)
        .await
        .unwrap()
        .expect("session exists")
        .remaining_seats
}
