//! # marvin-modules
//!
//! Modules bundled with the marvin IRC bot.
//!
//! | Module     | Trigger            | Effect                                   |
//! |------------|--------------------|------------------------------------------|
//! | `autojoin` | `001`              | joins the configured channels            |
//! | `rejoin`   | `KICK` of us       | rejoins the channel after a timeout      |
//! | `nickserv` | `NOTICE` from it   | identifies with the configured password  |
//! | `time`     | `!time`            | replies with the current UTC time        |
//! | `remind`   | `!remind DUR MSG`  | sends `MSG` back after `DUR`             |
//!
//! Every module implements [`ConfigurableModule`](marvin_core::ConfigurableModule),
//! so it can be built from its `[modules.<name>]` configuration section.

pub mod autojoin;
pub mod duration;
pub mod nickserv;
pub mod rejoin;
pub mod remind;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use autojoin::{Autojoin, AutojoinConfig};
pub use duration::{DurationError, format_duration, parse_duration};
pub use nickserv::{NickServ, NickServConfig};
pub use rejoin::{Rejoin, RejoinConfig};
pub use remind::{Remind, RemindConfig};
pub use time::{Time, TimeConfig};
