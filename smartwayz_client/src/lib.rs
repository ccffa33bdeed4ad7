pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod geocode;
pub mod routes;
pub mod session_client;
pub mod token_store;
pub mod transport;

pub use api::{
    Category, CategoryWithSubcategories, NewReport, Report, ReportFilter, ResourceApi, SubCategory,
};
pub use auth::{
    AuthSessionManager, CredentialPair, RegistrationForm, SessionState, SessionStatus,
    StoredSession,
};
pub use config::{ApiConfig, GeocodeConfig};
pub use errors::{ClientError, ClientResult};
pub use geocode::{AddressSource, GeocodeProvider, GeocodeResolver, GeocodeResult};
pub use session_client::{RefreshPhase, SessionClient, SessionListener};
pub use token_store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
