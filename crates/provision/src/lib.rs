pub mod api;
pub mod project;
pub mod provisioner;

pub use api::ApiClient;
pub use project::ProjectSpec;
pub use provisioner::Provisioner;
