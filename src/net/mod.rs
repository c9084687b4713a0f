pub mod channel;
pub mod matchmaking;
pub mod protocol;
pub mod sync;
