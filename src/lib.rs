// ABOUTME: laws-chat web server library.
// ABOUTME: Exposes the chat router for the binary and for tests.

pub mod routes;
