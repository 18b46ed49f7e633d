pub mod identity;
pub mod response;
pub mod sentry;
