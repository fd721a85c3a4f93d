// Core trading domain entities and value objects.
pub mod fees;
pub mod types;
