use std::sync::Arc;

use crate::fetcher::Fetch;
use crate::pingback::{PingDispatcher, PingbackService, TrackbackService};
use crate::repositories::ContentRepository;
use crate::site::Site;

#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
    pub repository: Arc<dyn ContentRepository>,
    pub pingbacks: Arc<PingbackService>,
    pub trackbacks: Arc<TrackbackService>,
    pub dispatcher: PingDispatcher,
}

impl AppState {
    pub fn new(
        site: Arc<Site>,
        repository: Arc<dyn ContentRepository>,
        fetcher: Arc<dyn Fetch>,
        dispatcher: PingDispatcher,
        excerpt_length: usize,
    ) -> Self {
        Self {
            pingbacks: Arc::new(PingbackService::new(
                site.clone(),
                fetcher,
                repository.clone(),
                excerpt_length,
            )),
            trackbacks: Arc::new(TrackbackService::new(site.clone(), repository.clone())),
            site,
            repository,
            dispatcher,
        }
    }
}
