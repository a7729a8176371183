//! Integration test infrastructure: a scripted IRC server and a helper that
//! runs the trompet binary against a generated configuration.

pub mod irc;
pub mod relay;

#[allow(unused_imports)]
pub use irc::FakeIrcServer;
#[allow(unused_imports)]
pub use relay::TestRelay;
