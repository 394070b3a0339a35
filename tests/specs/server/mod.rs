mod auth;
mod commands;
mod shutdown;
