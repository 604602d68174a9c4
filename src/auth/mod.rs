pub mod api_key;
pub mod middleware;


pub use api_key::*;
pub use middleware::*;
