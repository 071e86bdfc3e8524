mod mock_browser;

mod protocol_tests;
#[cfg(unix)]
mod server_tests;

pub(crate) use mock_browser::MockBrowser;
