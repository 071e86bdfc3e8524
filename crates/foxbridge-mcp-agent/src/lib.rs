pub mod server;

pub use server::FirefoxAgent;
