// Application layer - services, DTOs and configuration
// Presentation layer - request handlers, response envelope and wiring
pub mod application;
pub mod presentation;
