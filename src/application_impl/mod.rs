mod session_store_memory;
mod token_service_impl;

pub use session_store_memory::*;
pub use token_service_impl::*;
