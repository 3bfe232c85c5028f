//! Page Components

mod home;
mod pricing;

pub use home::HomePage;
pub use pricing::PricingPage;
