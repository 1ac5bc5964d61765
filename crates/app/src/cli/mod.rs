pub mod args;
pub mod op;
pub mod ops;

pub use ops::{
    Captcha, Health, History, Init, Keygen, Listen, Pubkey, Send, Version,
};
