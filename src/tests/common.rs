use std::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use chrono::NaiveDate;

use crate::{
    AdmissionController, AdmissionOptions, Capacity, Document, PollInterval, Product,
    SubmissionError, SubmissionExecutor, WindowDuration,
};

pub(super) fn options(window: Duration, capacity: u64) -> AdmissionOptions {
    AdmissionOptions::new(
        WindowDuration::try_from(window).unwrap(),
        Capacity::try_from(capacity).unwrap(),
    )
}

pub(super) fn options_with_poll(window: Duration, capacity: u64, poll: Duration) -> AdmissionOptions {
    AdmissionOptions {
        poll_interval: Some(PollInterval::try_from(poll).unwrap()),
        ..options(window, capacity)
    }
}

/// Controller whose window never elapses on its own during a test.
pub(super) fn manual_controller(capacity: u64) -> AdmissionController {
    AdmissionController::new(options(Duration::from_secs(3600), capacity)).unwrap()
}

pub(super) async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    while !condition() {
        tokio::task::yield_now().await;
    }
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(super) fn product(uit_code: Option<&str>, uitu_code: Option<&str>) -> Product {
    Product {
        certificate_document: "CONFORMITY_CERTIFICATE".to_string(),
        certificate_document_date: date(2024, 1, 10),
        certificate_document_number: "RU-0001".to_string(),
        owner_inn: "7700000001".to_string(),
        producer_inn: "7700000002".to_string(),
        production_date: date(2024, 1, 15),
        tnved_code: "6401100000".to_string(),
        uit_code: uit_code.map(str::to_string),
        uitu_code: uitu_code.map(str::to_string),
    }
}

pub(super) fn document(doc_id: &str) -> Document {
    Document {
        participant_inn: "7700000000".to_string(),
        doc_id: doc_id.to_string(),
        doc_status: "NEW".to_string(),
        doc_type: "LP_INTRODUCE_GOODS".to_string(),
        import_request: true,
        owner_inn: "7700000001".to_string(),
        producer_inn: "7700000002".to_string(),
        production_date: date(2024, 1, 15),
        production_type: "OWN_PRODUCTION".to_string(),
        products: vec![product(Some("uit-1"), None), product(None, Some("uitu-2"))],
        reg_date: date(2024, 2, 1),
        reg_number: "reg-42".to_string(),
    }
}

#[derive(Clone, Copy)]
pub(super) enum Outcome {
    Accept,
    Reject(u16, &'static str),
    Panic,
    Hang,
}

/// Executor that records calls and answers with a fixed outcome.
pub(super) struct ScriptedExecutor {
    outcome: Outcome,
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    pub(super) fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SubmissionExecutor for ScriptedExecutor {
    fn execute(
        &self,
        _token: &str,
        _document: &Document,
    ) -> impl Future<Output = Result<(), SubmissionError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome;

        async move {
            match outcome {
                Outcome::Accept => Ok(()),
                Outcome::Reject(status_code, body) => Err(SubmissionError::RemoteRejected {
                    status_code,
                    body: body.to_string(),
                }),
                Outcome::Panic => panic!("executor blew up"),
                Outcome::Hang => std::future::pending().await,
            }
        }
    }
}
