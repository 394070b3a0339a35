mod build;
mod reconnect;
mod shutdown;
