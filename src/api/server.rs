use crate::api::routes;
use crate::assembler::Assembler;
use crate::config::SharedConfig;
use crate::dns::{DnsChecker, DynResolver, Scanner};
use crate::reservation::{self, DynReservationStore};
use crate::sequence::{SequenceAllocator, SharedAllocator};
use crate::template::{GroupValidator, SharedTemplateStore, TemplateStore};
use axum::Router;
use std::future::Future;
use std::sync::Arc;

/// Everything the API handlers share.
#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub templates: SharedTemplateStore,
    pub allocator: SharedAllocator,
    pub assembler: Arc<Assembler>,
    pub reservations: DynReservationStore,
    pub checker: Arc<DnsChecker>,
    pub scanner: Arc<Scanner>,
}

impl AppState {
    /// Wire up the services. The sequence allocator is created here, once per process, and
    /// resumed past every sequence number already held by `reservations`.
    pub async fn build(
        config: SharedConfig,
        templates: TemplateStore,
        reservations: DynReservationStore,
        resolver: DynResolver,
    ) -> Self {
        let templates = Arc::new(templates);
        let allocator = Arc::new(SequenceAllocator::new());
        reservation::resume_allocator(&templates, &reservations, &allocator).await;

        let assembler = Arc::new(Assembler::new(
            Arc::clone(&templates),
            Arc::clone(&allocator),
            GroupValidator::new(config.case_insensitive_lists),
        ));
        let checker = Arc::new(DnsChecker::new(resolver, config.dns.lookup_timeout));
        let scanner = Arc::new(Scanner::new(
            Arc::clone(&assembler),
            Arc::clone(&checker),
            config.scan.clone(),
        ));

        AppState {
            config,
            templates,
            allocator,
            assembler,
            reservations,
            checker,
            scanner,
        }
    }
}

/// The API router, without a bound listener.
pub fn router(state: AppState) -> Router {
    routes::new(state)
}

/// Bind the API listener and serve until an error occurs.
pub fn new(state: AppState) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&state.config.api_bind_addr).serve(routes::new(state).into_make_service())
}
