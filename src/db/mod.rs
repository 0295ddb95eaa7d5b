//! Database access: the repository port and its implementations

pub mod memory;
pub mod postgres;
pub mod queries;
pub mod repository;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;
pub use repository::HotelRepository;
