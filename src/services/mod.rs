pub mod credentials;
pub mod normalizer;
pub mod orchestrator;
pub mod resolver;
pub mod spotify;

pub use credentials::CredentialManager;
pub use normalizer::QueryNormalizer;
pub use orchestrator::AddOrchestrator;
pub use spotify::SpotifyClient;
