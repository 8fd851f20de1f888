pub mod directory;
pub mod discovery;
pub mod dispatcher;
pub mod errors;
pub mod inbound;
pub mod outbound;
pub mod trackback;

pub use directory::{DirectoryPingResult, DirectoryPinger};
pub use discovery::EndpointDiscoverer;
pub use dispatcher::{PingDispatcher, PingReport, PingWorker};
pub use errors::PingbackError;
pub use inbound::PingbackService;
pub use outbound::{ExternalUrlsPinger, PingOutcome};
pub use trackback::{TrackbackError, TrackbackForm, TrackbackService};
