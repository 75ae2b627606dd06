pub mod database_migration;
pub mod manage_bookings;
