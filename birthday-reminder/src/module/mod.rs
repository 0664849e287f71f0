pub mod age;
pub mod mailer;
pub mod matcher;
pub mod renderer;
pub mod roster;
