//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod company;
pub mod payment;
pub mod principal;
pub mod subscription;

pub use company::CompanyRepository;
pub use payment::PaymentRepository;
pub use principal::PrincipalRepository;
pub use subscription::SubscriptionEventRepository;
