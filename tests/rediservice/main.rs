//! rediservice integration tests.

mod support;
mod messaging;
mod text_services;
