pub mod memory;
pub mod postgres;

pub use memory::InMemoryAuthRepository;
pub use postgres::PostgresAuthRepository;
